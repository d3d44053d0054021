//! Record conformance
//!
//! Trims records down to the declared properties and reports values whose
//! type does not match the schema. Mismatched values are kept.

use super::types::JsonSchema;
use crate::types::{JsonObject, JsonValue};

/// A property whose value does not match its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Property name
    pub property: String,
    /// Declared type, e.g. `integer|null`
    pub expected: String,
    /// JSON kind of the received value
    pub actual: String,
}

impl std::fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "property '{}' expected {} but got {}",
            self.property, self.expected, self.actual
        )
    }
}

/// Outcome of conforming one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConformReport {
    /// Properties removed because the schema does not declare them
    pub removed: Vec<String>,
    /// Properties whose value does not match the declared type
    pub mismatches: Vec<TypeMismatch>,
}

impl ConformReport {
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.mismatches.is_empty()
    }
}

fn value_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_f64() => "number",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Conform a record to a schema in place
pub fn conform_record(schema: &JsonSchema, record: &mut JsonObject) -> ConformReport {
    let mut report = ConformReport::default();

    record.retain(|name, _| {
        let declared = schema.has_property(name);
        if !declared {
            report.removed.push(name.clone());
        }
        declared
    });

    for (name, value) in record.iter() {
        let Some(property) = schema.get_property(name) else {
            continue;
        };
        if !property.accepts(value) {
            report.mismatches.push(TypeMismatch {
                property: name.clone(),
                expected: property.describe(),
                actual: value_kind(value).to_string(),
            });
        }
    }

    report
}
