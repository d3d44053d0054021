//! Response decoder module
//!
//! Supports: JSON:API documents
//!
//! # Overview
//!
//! Decoders turn a parsed response document into flat records ready to be
//! conformed to a stream schema.

mod decoders;
mod types;

pub use decoders::JsonApiDecoder;
pub use types::RecordDecoder;
