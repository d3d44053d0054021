//! Pagination module
//!
//! Supports: JSON:API offset pagination (`page[limit]` / `page[offset]`)
//!
//! # Overview
//!
//! Each strategy computes the query parameters of the next request from the
//! response document and tracks when pagination is complete.

mod strategies;
mod types;

pub use strategies::{JsonApiPaginator, DEFAULT_PAGE_SIZE};
pub use types::{NextPage, PaginationState, Paginator};
