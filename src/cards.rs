//! Card deck building, set loading, and room code generation.

use crate::types::{CardSet, PromptCard};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

/// Generate a random 5-character room code.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Decode HTML entities embedded in card text (`&amp;`, `&quot;`, ...).
pub fn decode_card(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Merge the selected sets into one shuffled prompt deck and one
/// shuffled answer deck. Unknown set names are ignored; an empty
/// selection yields empty decks, which `start_game` rejects.
pub fn build_deck(sets: &[CardSet], selected: &[String]) -> (Vec<PromptCard>, Vec<String>) {
    let mut prompts = Vec::new();
    let mut answers = Vec::new();

    for set in sets.iter().filter(|s| selected.contains(&s.code_name)) {
        for card in &set.prompt_cards {
            prompts.push(PromptCard {
                text: decode_card(&card.text),
                pick: card.pick,
            });
        }
        for card in &set.answer_cards {
            answers.push(decode_card(card));
        }
    }

    let mut rng = rand::rng();
    prompts.shuffle(&mut rng);
    answers.shuffle(&mut rng);
    (prompts, answers)
}

/// Load every `*.json` card set in a directory. Files that fail to
/// parse are skipped with a warning rather than aborting the catalog.
pub fn load_sets_from_dir(dir: &Path) -> std::io::Result<Vec<CardSet>> {
    let mut sets = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<CardSet>(&raw) {
            Ok(set) => sets.push(set),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unparsable card set");
            }
        }
    }
    Ok(sets)
}

/// Parse a loosely-shaped uploaded set: prompt entries may be plain
/// strings (one blank) or `{text, pick}` objects, answers anything
/// stringly. Returns `None` when the JSON is not an object at all.
pub fn parse_custom_set(json: &serde_json::Value, fallback_name: &str) -> Option<CardSet> {
    let obj = json.as_object()?;
    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(fallback_name)
        .to_string();

    let prompt_cards = obj
        .get("promptCards")
        .and_then(|v| v.as_array())
        .map(|cards| {
            cards
                .iter()
                .filter_map(|c| match c {
                    serde_json::Value::String(text) => Some(PromptCard {
                        text: text.clone(),
                        pick: 1,
                    }),
                    serde_json::Value::Object(card) => Some(PromptCard {
                        text: card.get("text")?.as_str()?.to_string(),
                        pick: card.get("pick").and_then(|p| p.as_u64()).unwrap_or(1) as u32,
                    }),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let answer_cards = obj
        .get("answerCards")
        .and_then(|v| v.as_array())
        .map(|cards| {
            cards
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Some(CardSet {
        name,
        code_name: format!("custom-{}", ulid::Ulid::new().to_string().to_lowercase()),
        official: false,
        prompt_cards,
        answer_cards,
    })
}
