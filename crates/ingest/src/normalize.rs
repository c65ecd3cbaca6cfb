//! String sanitization and topic expansion.
//!
//! Identities and topic names arrive from a chat platform and may carry stray
//! control characters or padding. Both are stripped before the values are
//! used as registry keys or distribution keys.
use std::collections::{BTreeMap, BTreeSet};

use crate::error::IngestError;

/// Strip ASCII/Unicode control characters and trim surrounding whitespace.
/// Returns `None` when nothing is left.
pub(crate) fn sanitize(raw: &str) -> Option<String> {
    let filtered: String = raw.chars().filter(|c| !c.is_control()).collect();
    let trimmed = filtered.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn sanitize_identity(raw: &str) -> Result<String, IngestError> {
    sanitize(raw).ok_or(IngestError::EmptyIdentity)
}

/// Expand a topic set into an even distribution, `1/|topics|` per topic.
///
/// Topics that collapse to the same name after sanitization are counted once.
pub(crate) fn expand_topics(topics: &BTreeSet<String>) -> Result<BTreeMap<String, f64>, IngestError> {
    let mut names = BTreeSet::new();
    for topic in topics {
        let name = sanitize(topic).ok_or_else(|| IngestError::InvalidTopic(topic.clone()))?;
        names.insert(name.to_lowercase());
    }
    if names.is_empty() {
        return Err(IngestError::EmptyTopics);
    }

    let share = 1.0 / names.len() as f64;
    Ok(names.into_iter().map(|name| (name, share)).collect())
}
