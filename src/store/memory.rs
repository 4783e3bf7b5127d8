use super::{ChangeEvent, DocPath, DocumentStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, RwLock};

/// In-process [`DocumentStore`] with genuine optimistic concurrency:
/// reads take no locks beyond a snapshot, commit acquires the write
/// lock once, validates every read version, then applies the writes.
/// Concurrent mutators therefore race exactly as they would against a
/// remote transactional store.
pub struct MemoryStore {
    docs: RwLock<BTreeMap<DocPath, (Value, u64)>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            docs: RwLock::new(BTreeMap::new()),
            events: tx,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_versioned(&self, path: &DocPath) -> Result<Option<(Value, u64)>, StoreError> {
        Ok(self.docs.read().await.get(path).cloned())
    }

    async fn put(&self, path: &DocPath, value: Value) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let version = docs.get(path).map(|(_, v)| v + 1).unwrap_or(1);
        docs.insert(path.clone(), (value.clone(), version));
        let _ = self.events.send(ChangeEvent {
            path: path.clone(),
            value,
            version,
        });
        Ok(())
    }

    async fn list_versioned(
        &self,
        collection: &DocPath,
    ) -> Result<Vec<(DocPath, Value, u64)>, StoreError> {
        let prefix = format!("{}/", collection.as_str());
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(path, _)| {
                path.as_str()
                    .strip_prefix(&prefix)
                    // Direct children only, not nested sub-documents
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(path, (value, version))| (path.clone(), value.clone(), *version))
            .collect())
    }

    async fn commit(
        &self,
        reads: Vec<(DocPath, u64)>,
        writes: Vec<(DocPath, Value)>,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;

        for (path, expected) in &reads {
            let current = docs.get(path).map(|(_, v)| *v).unwrap_or(0);
            if current != *expected {
                tracing::debug!(path = %path, expected, current, "commit conflict");
                return Err(StoreError::Conflict);
            }
        }

        for (path, value) in writes {
            let version = docs.get(&path).map(|(_, v)| v + 1).unwrap_or(1);
            docs.insert(path.clone(), (value.clone(), version));
            let _ = self.events.send(ChangeEvent {
                path,
                value,
                version,
            });
        }

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}
