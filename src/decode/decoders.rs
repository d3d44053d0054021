//! Decoder implementations

use super::types::RecordDecoder;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde_json::Value;

// ============================================================================
// JSON:API Decoder
// ============================================================================

/// JSON:API document decoder
///
/// Reads the resources under `data` (an array, or a single resource object)
/// and merges each resource's `attributes` into the top level. Existing
/// top-level keys such as `id` and `type` win over attributes of the same name.
#[derive(Debug, Clone)]
pub struct JsonApiDecoder {
    /// Key holding the primary data
    record_path: String,
    /// Key holding the resource attributes
    attributes_key: String,
}

impl Default for JsonApiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonApiDecoder {
    /// Create a decoder for standard JSON:API documents
    pub fn new() -> Self {
        Self {
            record_path: "data".to_string(),
            attributes_key: "attributes".to_string(),
        }
    }

    /// Flatten one resource object
    fn flatten(&self, resource: JsonObject) -> JsonObject {
        let mut record = resource;
        if let Some(Value::Object(attributes)) = record.remove(&self.attributes_key) {
            for (key, value) in attributes {
                record.entry(key).or_insert(value);
            }
        }
        record
    }

    fn resource(&self, value: JsonValue, index: usize) -> Result<JsonObject> {
        match value {
            Value::Object(obj) => Ok(self.flatten(obj)),
            other => Err(Error::decode(format!(
                "{}[{index}] is not a resource object: {other}",
                self.record_path
            ))),
        }
    }
}

/// Render the `errors` member of a JSON:API error document
fn error_summary(errors: &[JsonValue]) -> String {
    let messages: Vec<String> = errors
        .iter()
        .map(|e| {
            e.get("detail")
                .or_else(|| e.get("title"))
                .and_then(Value::as_str)
                .map_or_else(|| e.to_string(), ToString::to_string)
        })
        .collect();
    messages.join("; ")
}

impl RecordDecoder for JsonApiDecoder {
    fn decode(&self, document: &JsonValue) -> Result<Vec<JsonObject>> {
        match document {
            Value::Null => return Ok(Vec::new()),
            Value::Object(_) => {}
            other => {
                return Err(Error::decode(format!(
                    "expected a JSON:API document object, got {other}"
                )))
            }
        }

        if let Some(errors) = document.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(Error::decode(format!(
                    "API returned errors: {}",
                    error_summary(errors)
                )));
            }
        }

        match document.get(&self.record_path) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, item)| self.resource(item, i))
                .collect(),
            Some(single @ Value::Object(_)) => Ok(vec![self.resource(single.clone(), 0)?]),
            Some(other) => Err(Error::decode(format!(
                "'{}' must be an array or object, got {other}",
                self.record_path
            ))),
        }
    }
}
