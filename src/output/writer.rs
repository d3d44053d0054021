//! Message writer
//!
//! Writes Singer messages as newline-delimited JSON.

use super::messages::Message;
use crate::error::{Error, Result};
use std::io::{BufWriter, Stdout, Write};

/// Counts of messages written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub schemas: u64,
    pub records: u64,
    pub states: u64,
}

/// Newline-delimited JSON message writer
///
/// Output is flushed after every SCHEMA and STATE message so checkpoints
/// reach the consumer promptly.
#[derive(Debug)]
pub struct MessageWriter<W: Write> {
    out: W,
    stats: WriterStats,
}

impl MessageWriter<BufWriter<Stdout>> {
    /// Buffered writer on stdout
    pub fn stdout() -> Self {
        Self::new(BufWriter::new(std::io::stdout()))
    }
}

impl<W: Write> MessageWriter<W> {
    /// Wrap any writer
    pub fn new(out: W) -> Self {
        Self {
            out,
            stats: WriterStats::default(),
        }
    }

    /// Write one message
    pub fn write(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)
            .map_err(|e| Error::output(format!("Failed to serialize message: {e}")))?;
        self.out.write_all(b"\n")?;

        match message {
            Message::Record { .. } => self.stats.records += 1,
            Message::Schema { .. } => {
                self.stats.schemas += 1;
                self.out.flush()?;
            }
            Message::State { .. } => {
                self.stats.states += 1;
                self.out.flush()?;
            }
        }
        Ok(())
    }

    /// Flush buffered output
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Messages written so far
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}
