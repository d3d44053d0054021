//! Output module
//!
//! Singer protocol messages and the newline-delimited JSON writer that
//! emits them on stdout.

mod messages;
mod writer;

pub use messages::Message;
pub use writer::{MessageWriter, WriterStats};
