//! State types for tracking sync progress
//!
//! The Singer state document: `{"bookmarks": {stream: {replication_key,
//! replication_key_value}}}`. Unknown keys are carried through untouched.

use crate::types::{JsonObject, JsonValue};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Complete state for the tap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,

    /// Other top-level keys from the input state
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark for a stream
    pub fn get_bookmark(&self, stream: &str) -> Option<&Bookmark> {
        self.bookmarks.get(stream)
    }

    /// Replication key value for a stream, rendered as a string
    pub fn get_cursor(&self, stream: &str) -> Option<String> {
        self.bookmarks.get(stream)?.cursor()
    }

    /// Set the bookmark of a stream unconditionally
    pub fn set_cursor(&mut self, stream: &str, replication_key: &str, value: &str) {
        let bookmark = self.bookmarks.entry(stream.to_string()).or_default();
        bookmark.replication_key = Some(replication_key.to_string());
        bookmark.replication_key_value = Some(JsonValue::String(value.to_string()));
    }

    /// Convert to a JSON value
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Bookmark of a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Name of the replication key property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Highest replication key value emitted so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<JsonValue>,

    /// Other keys stored for this stream
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl Bookmark {
    /// Replication key value as a string (numbers are rendered)
    pub fn cursor(&self) -> Option<String> {
        match self.replication_key_value.as_ref()? {
            JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Compare two replication key values
///
/// RFC 3339 timestamps are compared as instants; anything else falls back
/// to string ordering.
pub fn compare_cursors(a: &str, b: &str) -> Ordering {
    match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
