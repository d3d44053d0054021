//! Stream catalog
//!
//! Declarative definitions of every Optiply resource the tap replicates.
//! Each definition binds one API path to one schema; pagination, auth and
//! retries are shared by all streams.

mod definitions;

pub use definitions::{
    all_streams, find_stream, stream_names, StreamDefinition, DEFAULT_STREAM_TIMEOUT,
    LARGE_STREAM_TIMEOUT,
};
