//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{NextPage, PaginationState, Paginator};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

// ============================================================================
// JSON:API Pagination
// ============================================================================

/// JSON:API offset pagination (`page[limit]` / `page[offset]`)
///
/// Stops on an empty page. When the document carries a `links` object the
/// `links.next` URL is followed and pagination ends once it disappears;
/// without `links` the offset is advanced and a short page ends it.
#[derive(Debug, Clone)]
pub struct JsonApiPaginator {
    /// Query parameter name for the page size
    pub limit_param: String,
    /// Query parameter name for the offset
    pub offset_param: String,
    /// Number of records per page
    pub page_size: u32,
}

impl Default for JsonApiPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl JsonApiPaginator {
    /// Create a paginator with the given page size
    pub fn new(page_size: u32) -> Self {
        Self {
            limit_param: "page[limit]".to_string(),
            offset_param: "page[offset]".to_string(),
            page_size: page_size.max(1),
        }
    }

    fn offset_params(&self, offset: u64) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.limit_param.clone(), self.page_size.to_string());
        params.insert(self.offset_param.clone(), offset.to_string());
        params
    }

    /// Query parameters carried by a `links.next` URL
    fn next_link_params(next: &str) -> Option<HashMap<String, String>> {
        let url = Url::parse(next)
            .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(next)))
            .ok()?;
        // First value wins for repeated keys
        let mut params = HashMap::new();
        for (key, value) in url.query_pairs() {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Some(params)
    }
}

impl Paginator for JsonApiPaginator {
    fn request_params(&self, state: &PaginationState) -> HashMap<String, String> {
        if state.params.is_empty() {
            self.offset_params(state.offset)
        } else {
            state.params.clone()
        }
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count as u64);
        state.next_page();

        if records_count == 0 {
            debug!("Empty page after {} records, pagination done", state.total_fetched);
            state.mark_done();
            return NextPage::Done;
        }

        if let Some(links) = body.get("links").and_then(Value::as_object) {
            let Some(next) = links.get("next").and_then(Value::as_str).filter(|s| !s.is_empty())
            else {
                state.mark_done();
                return NextPage::Done;
            };

            let Some(mut params) = Self::next_link_params(next) else {
                warn!("Could not parse next link '{next}', stopping pagination");
                state.mark_done();
                return NextPage::Done;
            };

            let next_offset = params
                .get(&self.offset_param)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(state.offset + records_count as u64);
            if next_offset <= state.offset {
                warn!("Next link does not advance past offset {}, stopping", state.offset);
                state.mark_done();
                return NextPage::Done;
            }

            params
                .entry(self.limit_param.clone())
                .or_insert_with(|| self.page_size.to_string());
            params.insert(self.offset_param.clone(), next_offset.to_string());

            state.offset = next_offset;
            state.params = params.clone();
            return NextPage::with_params(params);
        }

        // If we got fewer records than the limit, we're done
        if records_count < self.page_size as usize {
            state.mark_done();
            return NextPage::Done;
        }

        state.offset += u64::from(self.page_size);
        let params = self.offset_params(state.offset);
        state.params = params.clone();
        NextPage::with_params(params)
    }
}
