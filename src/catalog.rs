//! Singer catalog
//!
//! Built from the stream definitions for `--discover`, and read back from
//! `--catalog` to decide which streams and properties are synced.

use crate::error::{Error, Result};
use crate::streams::StreamDefinition;
use crate::types::{JsonObject, JsonValue, ReplicationMethod};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;

/// Catalog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

/// One stream of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub schema: JsonValue,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_method: Option<ReplicationMethod>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

/// Metadata attached to a breadcrumb (`[]` for the stream itself)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: JsonObject,
}

impl MetadataEntry {
    fn new(breadcrumb: Vec<String>, metadata: JsonValue) -> Self {
        Self {
            breadcrumb,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    /// Property name when the breadcrumb is `["properties", name]`
    fn property(&self) -> Option<&str> {
        match self.breadcrumb.as_slice() {
            [kind, name] if kind == "properties" => Some(name.as_str()),
            _ => None,
        }
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.metadata.get(key).and_then(JsonValue::as_bool)
    }
}

impl Catalog {
    /// Build the discovery catalog
    pub fn discover(streams: &[StreamDefinition]) -> Self {
        Self {
            streams: streams.iter().map(CatalogEntry::discover).collect(),
        }
    }

    /// Read a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::catalog(format!("Invalid catalog: {e}")))
    }

    /// Find the entry of a stream
    pub fn entry(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|e| e.tap_stream_id == stream)
    }

    /// Names of the selected streams
    pub fn selected_streams(&self) -> Vec<&str> {
        self.streams
            .iter()
            .filter(|e| e.is_selected())
            .map(|e| e.tap_stream_id.as_str())
            .collect()
    }

    /// Convert to JSON value
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CatalogEntry {
    /// Discovery entry for one stream
    pub fn discover(stream: &StreamDefinition) -> Self {
        let automatic: HashSet<&str> = stream
            .primary_keys
            .iter()
            .copied()
            .chain(std::iter::once(stream.replication_key))
            .collect();

        let mut metadata = vec![MetadataEntry::new(
            Vec::new(),
            json!({
                "inclusion": "available",
                "selected-by-default": true,
                "table-key-properties": stream.primary_keys,
                "valid-replication-keys": [stream.replication_key],
                "forced-replication-method": stream.replication_method().as_str(),
            }),
        )];
        for name in stream.schema.properties.keys() {
            let inclusion = if automatic.contains(name.as_str()) {
                "automatic"
            } else {
                "available"
            };
            metadata.push(MetadataEntry::new(
                vec!["properties".to_string(), name.clone()],
                json!({"inclusion": inclusion}),
            ));
        }

        Self {
            tap_stream_id: stream.name.to_string(),
            stream: stream.name.to_string(),
            schema: stream.schema.to_json(),
            key_properties: stream.primary_keys.iter().map(ToString::to_string).collect(),
            replication_key: Some(stream.replication_key.to_string()),
            replication_method: Some(stream.replication_method()),
            metadata,
        }
    }

    fn stream_metadata(&self) -> Option<&MetadataEntry> {
        self.metadata.iter().find(|m| m.breadcrumb.is_empty())
    }

    /// `selected` on the stream breadcrumb, else `selected-by-default`
    pub fn is_selected(&self) -> bool {
        self.stream_metadata()
            .and_then(|m| m.flag("selected").or_else(|| m.flag("selected-by-default")))
            .unwrap_or(false)
    }

    /// Properties explicitly deselected (automatic properties are never deselected)
    pub fn deselected_properties(&self) -> HashSet<String> {
        self.metadata
            .iter()
            .filter(|m| m.flag("selected") == Some(false))
            .filter(|m| m.metadata.get("inclusion").and_then(JsonValue::as_str) != Some("automatic"))
            .filter_map(|m| m.property().map(ToString::to_string))
            .collect()
    }
}
