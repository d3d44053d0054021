//! Engine types
//!
//! Configuration and statistics for the sync engine.

use crate::pagination::DEFAULT_PAGE_SIZE;

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records requested per page
    pub page_size: u32,
    /// Sent as `filter[accountId]` when set
    pub account_id: Option<String>,
    /// Start value for streams without a bookmark
    pub start_date: Option<String>,
    /// Whether to emit state after each page that advanced a bookmark
    pub emit_state_per_page: bool,
    /// Whether to stop at the first failing stream
    pub fail_fast: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            account_id: None,
            start_date: None,
            emit_state_per_page: true,
            fail_fast: true,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Restrict requests to one account
    #[must_use]
    pub fn with_account_id(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Set the default start value
    #[must_use]
    pub fn with_start_date(mut self, start_date: Option<String>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Emit state after each page
    #[must_use]
    pub fn with_state_per_page(mut self, emit: bool) -> Self {
        self.emit_state_per_page = emit;
        self
    }

    /// Set fail fast mode
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Records emitted
    pub records_synced: usize,
    /// Records dropped for being older than the start value
    pub records_skipped: usize,
    /// Property values that did not match the schema
    pub schema_warnings: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Streams completed
    pub streams_synced: usize,
    /// Streams that failed
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add emitted records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a skipped record
    pub fn add_skipped(&mut self) {
        self.records_skipped += 1;
    }

    /// Add schema warnings
    pub fn add_schema_warnings(&mut self, count: usize) {
        self.schema_warnings += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
