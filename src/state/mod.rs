//! State management module
//!
//! Handles bookmark tracking for incremental replication.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Singer state document with per-stream bookmarks
//! - `StateManager` - Shared, async-safe access to the running state
//! - `compare_cursors` - Timestamp-aware ordering of replication key values

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{compare_cursors, Bookmark, State};
