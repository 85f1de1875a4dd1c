//! Tag sets are stored as a JSON array in a TEXT column, sorted and
//! de-duplicated so that equal sets always serialise identically.

use std::collections::BTreeSet;
use tracing::warn;

pub fn normalize<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.as_ref().trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn encode<S: AsRef<str>>(tags: &[S]) -> String {
    serde_json::to_string(&normalize(tags)).unwrap_or_else(|_| "[]".to_string())
}

pub fn decode(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(tags) => tags,
        Err(err) => {
            warn!("Ignoring malformed tag column {:?}: {}", raw, err);
            Vec::new()
        }
    }
}

/// Apply a bulk-edit style add/remove to an encoded tag column.
pub fn apply_changes(current: &str, add: &[String], remove: &[String]) -> String {
    let removed: BTreeSet<String> = normalize(remove).into_iter().collect();
    let mut tags = decode(current);
    tags.extend(normalize(add));
    tags.retain(|tag| !removed.contains(tag));
    encode(&tags)
}

/// LIKE pattern matching rows whose encoded tag column contains `tag`.
pub fn like_pattern(tag: &str) -> String {
    let encoded = serde_json::to_string(tag.trim()).unwrap_or_default();
    format!("%{}%", super::filters::escape_like(&encoded))
}
