//! Transactional document store abstraction.
//!
//! The game core never talks to a concrete backend; it is written
//! against [`DocumentStore`], which models the three primitives the
//! design relies on: versioned point reads, an atomic commit that
//! re-validates everything a transaction read, and a change feed.
//! [`MemoryStore`] is the in-process implementation used by tests and
//! the simulator, with real optimistic concurrency control.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A document read by the transaction changed before commit.
    #[error("transaction conflict")]
    Conflict,

    #[error("document serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Slash-separated document path, e.g. `rooms/ABCDE/players/p1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    pub fn new(segments: &[&str]) -> Self {
        Self(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The child document `{self}/{id}` of a collection path.
    pub fn child(&self, id: &str) -> DocPath {
        Self(format!("{}/{}", self.0, id))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DocPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A committed write, pushed to every subscriber.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: DocPath,
    pub value: Value,
    pub version: u64,
}

/// The external transactional document store contract.
///
/// Versions start at 1 on first write; version 0 means "absent", so a
/// transaction that read a missing document conflicts if someone
/// created it in the meantime.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read of a document with its current version.
    async fn get_versioned(&self, path: &DocPath) -> Result<Option<(Value, u64)>, StoreError>;

    /// Unconditional single-document write outside any transaction.
    async fn put(&self, path: &DocPath, value: Value) -> Result<(), StoreError>;

    /// All documents directly under `collection`, with versions.
    async fn list_versioned(
        &self,
        collection: &DocPath,
    ) -> Result<Vec<(DocPath, Value, u64)>, StoreError>;

    /// Atomically re-validate `reads` (path, version seen) and apply
    /// `writes`, or fail with [`StoreError::Conflict`] touching
    /// nothing.
    async fn commit(
        &self,
        reads: Vec<(DocPath, u64)>,
        writes: Vec<(DocPath, Value)>,
    ) -> Result<(), StoreError>;

    /// Change feed of committed writes.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// A single optimistic read-modify-write transaction.
///
/// Every read records the version it saw; writes are buffered until
/// [`Tx::commit`], which applies them only if nothing read has moved.
/// Collection membership is not conflict-checked, only the documents
/// that were actually listed.
pub struct Tx<'a> {
    store: &'a dyn DocumentStore,
    reads: Vec<(DocPath, u64)>,
    writes: Vec<(DocPath, Value)>,
}

impl<'a> Tx<'a> {
    pub fn begin(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Read a document into the transaction's read set. Absence is
    /// recorded too, so creating a document races correctly.
    pub async fn get<T: DeserializeOwned>(
        &mut self,
        path: &DocPath,
    ) -> Result<Option<T>, StoreError> {
        match self.store.get_versioned(path).await? {
            Some((value, version)) => {
                self.reads.push((path.clone(), version));
                Ok(Some(serde_json::from_value(value)?))
            }
            None => {
                self.reads.push((path.clone(), 0));
                Ok(None)
            }
        }
    }

    /// Read every document in a collection into the read set.
    pub async fn list<T: DeserializeOwned>(
        &mut self,
        collection: &DocPath,
    ) -> Result<Vec<T>, StoreError> {
        let docs = self.store.list_versioned(collection).await?;
        let mut out = Vec::with_capacity(docs.len());
        for (path, value, version) in docs {
            self.reads.push((path, version));
            out.push(serde_json::from_value(value)?);
        }
        Ok(out)
    }

    /// Buffer a full-document write.
    pub fn set<T: Serialize>(&mut self, path: &DocPath, doc: &T) -> Result<(), StoreError> {
        self.writes.push((path.clone(), serde_json::to_value(doc)?));
        Ok(())
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.store.commit(self.reads, self.writes).await
    }
}
