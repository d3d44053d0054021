//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use crate::error::Result;
use crate::types::{JsonObject, JsonValue};

/// Trait for decoding response documents into records
pub trait RecordDecoder: Send + Sync {
    /// Decode a parsed response document into a list of records
    fn decode(&self, document: &JsonValue) -> Result<Vec<JsonObject>>;
}
