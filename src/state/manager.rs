//! State manager implementation
//!
//! Holds the bookmarks of the running sync. The tap never writes state
//! files itself; checkpoints leave the process as STATE messages.

use super::types::{compare_cursors, State};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// State manager shared by the sync engine
#[derive(Debug, Clone, Default)]
pub struct StateManager {
    /// Current state
    state: Arc<RwLock<State>>,
}

impl StateManager {
    /// Create a state manager holding the given state
    pub fn new(state: State) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Create an empty in-memory state manager
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load state from a file
    ///
    /// A missing file starts from empty state.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("State file {} not found, starting from empty state", path.display());
            return Ok(Self::in_memory());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| Error::State {
            message: format!("Failed to read state file: {e}"),
        })?;
        Self::from_json(&contents)
    }

    /// Parse state from a JSON string
    ///
    /// Accepts a bare state document, a STATE message, or an empty document.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::in_memory());
        }
        let value: JsonValue = serde_json::from_str(json).map_err(|e| Error::State {
            message: format!("Failed to parse state JSON: {e}"),
        })?;
        Self::from_value(value)
    }

    /// Build from a parsed JSON document
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let value = match value {
            JsonValue::Object(mut obj)
                if obj.get("type").and_then(JsonValue::as_str) == Some("STATE") =>
            {
                obj.remove("value").unwrap_or_default()
            }
            JsonValue::Null => return Ok(Self::in_memory()),
            other => other,
        };
        let state: State = serde_json::from_value(value).map_err(|e| Error::State {
            message: format!("Invalid state document: {e}"),
        })?;
        debug!("Loaded bookmarks for {} stream(s)", state.bookmarks.len());
        Ok(Self::new(state))
    }

    /// Get a read guard on the state
    pub async fn state(&self) -> tokio::sync::RwLockReadGuard<'_, State> {
        self.state.read().await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Current state as JSON
    pub async fn to_value(&self) -> JsonValue {
        self.state.read().await.to_value()
    }

    /// Get the cursor for a stream
    pub async fn get_cursor(&self, stream: &str) -> Option<String> {
        self.state.read().await.get_cursor(stream)
    }

    /// Move the bookmark forward if `value` is newer than the stored one
    ///
    /// Returns whether the bookmark changed.
    pub async fn advance_cursor(&self, stream: &str, replication_key: &str, value: &str) -> bool {
        let mut state = self.state.write().await;
        let newer = state
            .get_cursor(stream)
            .map_or(true, |current| compare_cursors(value, &current) == Ordering::Greater);
        if newer {
            state.set_cursor(stream, replication_key, value);
        }
        newer
    }

    /// Drop the bookmark of one stream
    pub async fn clear_stream(&self, stream: &str) {
        self.state.write().await.bookmarks.remove(stream);
    }
}
