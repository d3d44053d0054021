//! Stream schema module
//!
//! JSON Schema documents declared for each stream, plus record conformance.
//!
//! # Features
//!
//! - **Nullable Properties**: Every builder helper declares `[type, "null"]`
//! - **Formats**: `date-time` strings are checked as RFC 3339
//! - **Conformance**: Undeclared properties are dropped, type mismatches reported

mod conform;
mod types;

pub use conform::{conform_record, ConformReport, TypeMismatch};
pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};
