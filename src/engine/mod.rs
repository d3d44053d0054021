//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Syncs streams page by page, emitting Singer messages
//! - `SyncConfig` - Configuration for sync operations
//! - `SyncStats` - Counters collected during a run

mod types;

pub use types::{SyncConfig, SyncStats};

use crate::decode::{JsonApiDecoder, RecordDecoder};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::output::{Message, MessageWriter};
use crate::pagination::{JsonApiPaginator, PaginationState, Paginator};
use crate::schema::{conform_record, JsonSchema};
use crate::state::{compare_cursors, StateManager};
use crate::streams::StreamDefinition;
use crate::types::JsonValue;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Query parameter carrying the account filter
pub const ACCOUNT_FILTER_PARAM: &str = "filter[accountId]";

/// Query parameter carrying the incremental start value
pub const UPDATED_AFTER_PARAM: &str = "filter[updatedAt][GT]";

/// A stream chosen for sync together with its deselected properties
#[derive(Debug, Clone)]
pub struct SelectedStream {
    pub definition: StreamDefinition,
    pub deselected: HashSet<String>,
}

impl SelectedStream {
    /// Sync every property of the stream
    pub fn all_properties(definition: StreamDefinition) -> Self {
        Self {
            definition,
            deselected: HashSet::new(),
        }
    }

    /// Schema emitted for this selection
    ///
    /// Primary keys and the replication key are always kept.
    pub fn effective_schema(&self) -> JsonSchema {
        let def = &self.definition;
        def.schema.clone().retain_properties(|name| {
            !self.deselected.contains(name)
                || def.primary_keys.iter().any(|key| *key == name)
                || def.replication_key == name
        })
    }
}

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// HTTP client
    client: HttpClient,
    /// State manager
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
    /// Response decoder
    decoder: JsonApiDecoder,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(client: HttpClient, state: StateManager) -> Self {
        Self {
            client,
            state,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
            decoder: JsonApiDecoder::new(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Filters shared by every request of a stream
    fn base_params(&self, start_value: Option<&str>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(account_id) = &self.config.account_id {
            params.insert(ACCOUNT_FILTER_PARAM.to_string(), account_id.clone());
        }
        if let Some(start) = start_value {
            params.insert(UPDATED_AFTER_PARAM.to_string(), start.to_string());
        }
        params
    }

    /// Sync all streams in order
    pub async fn sync_all<W: Write>(
        &mut self,
        streams: &[SelectedStream],
        writer: &mut MessageWriter<W>,
    ) -> Result<()> {
        let start = Instant::now();
        let mut first_error = None;

        for stream in streams {
            match self.sync_stream(stream, writer).await {
                Ok(_) => {}
                Err(e) if self.config.fail_fast => return Err(e),
                Err(e) => {
                    error!(stream = stream.definition.name, "Stream failed: {e}");
                    self.stats.add_error();
                    first_error.get_or_insert(e);
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Sync finished: {} records from {} stream(s) in {} pages ({} ms)",
            self.stats.records_synced,
            self.stats.streams_synced,
            self.stats.pages_fetched,
            self.stats.duration_ms
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Sync a single stream
    ///
    /// Emits SCHEMA, then RECORD messages page by page, a STATE after each
    /// page that advanced the bookmark, and a final STATE. Returns the
    /// number of records emitted.
    pub async fn sync_stream<W: Write>(
        &mut self,
        stream: &SelectedStream,
        writer: &mut MessageWriter<W>,
    ) -> Result<usize> {
        let def = &stream.definition;
        let name = def.name;
        let schema = stream.effective_schema();

        writer.write(&Message::schema(
            name,
            schema.to_json(),
            def.primary_keys.iter().map(ToString::to_string).collect(),
            vec![def.replication_key.to_string()],
        ))?;

        let start_value = match self.state.get_cursor(name).await {
            Some(bookmark) => Some(bookmark),
            None => self.config.start_date.clone(),
        };
        info!(stream = name, start = ?start_value, "Starting sync");

        let url = self.client.build_url(def.path);
        let base_params = self.base_params(start_value.as_deref());
        let paginator = JsonApiPaginator::new(self.config.page_size);
        let mut pagination = PaginationState::new();
        let mut emitted = 0usize;

        loop {
            let mut params = base_params.clone();
            params.extend(paginator.request_params(&pagination));
            let request = RequestConfig::new().queries(&params).timeout(def.timeout);

            let body = self.client.get_json_with_config(&url, request).await?;
            self.stats.add_page();

            let records = self.decoder.decode(&body)?;
            let record_count = records.len();
            let time_extracted = Utc::now();
            let mut page_max: Option<String> = None;

            for mut record in records {
                let cursor = record
                    .get(def.replication_key)
                    .and_then(JsonValue::as_str)
                    .map(ToString::to_string);

                if let (Some(start), Some(value)) = (start_value.as_deref(), cursor.as_deref()) {
                    if compare_cursors(value, start) == Ordering::Less {
                        debug!(stream = name, "Skipping record updated at {value}");
                        self.stats.add_skipped();
                        continue;
                    }
                }

                let report = conform_record(&schema, &mut record);
                for mismatch in &report.mismatches {
                    warn!(stream = name, "Record does not match schema: {mismatch}");
                }
                self.stats.add_schema_warnings(report.mismatches.len());

                writer.write(&Message::record(name, record, time_extracted))?;
                emitted += 1;
                self.stats.add_records(1);

                if let Some(value) = cursor {
                    let newer = page_max
                        .as_deref()
                        .map_or(true, |max| compare_cursors(&value, max) == Ordering::Greater);
                    if newer {
                        page_max = Some(value);
                    }
                }
            }

            if let Some(max) = page_max {
                let advanced = self
                    .state
                    .advance_cursor(name, def.replication_key, &max)
                    .await;
                if advanced && self.config.emit_state_per_page {
                    writer.write(&Message::state(self.state.to_value().await))?;
                }
            }

            debug!(
                stream = name,
                page = pagination.page + 1,
                records = record_count,
                "Fetched page"
            );

            if paginator
                .process_response(&body, record_count, &mut pagination)
                .is_done()
            {
                break;
            }
        }

        writer.write(&Message::state(self.state.to_value().await))?;
        writer.flush()?;
        self.stats.add_stream();

        info!(
            stream = name,
            "Completed sync: {emitted} records in {} pages", pagination.page
        );
        Ok(emitted)
    }

    /// Fetch a single one-record page to verify credentials and connectivity
    ///
    /// Returns the number of records in the response.
    pub async fn check_connection(&self, stream: &StreamDefinition) -> Result<usize> {
        let mut params = self.base_params(None);
        params.insert("page[limit]".to_string(), "1".to_string());

        let url = self.client.build_url(stream.path);
        let request = RequestConfig::new().queries(&params).timeout(stream.timeout);
        let body = self.client.get_json_with_config(&url, request).await?;
        Ok(self.decoder.decode(&body)?.len())
    }
}
