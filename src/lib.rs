// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-optiply
//!
//! A Singer tap for the Optiply API. Reads products, suppliers, orders and
//! promotions over JSON:API and writes SCHEMA, RECORD and STATE messages
//! to stdout.
//!
//! ## Features
//!
//! - **OAuth2 password grant**: Tokens refreshed ahead of expiry and persisted to the config file
//! - **JSON:API pagination**: `page[limit]` / `page[offset]` with `links.next`
//! - **Incremental sync**: `updatedAt` bookmarks per stream, emitted as STATE messages
//! - **Catalog selection**: Streams and properties chosen with Singer metadata
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_optiply::cli::{Cli, Runner};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> tap_optiply::Result<()> {
//!     let cli = Cli::parse_from(["tap-optiply", "--config", "config.json"]);
//!     Runner::new(cli).run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          CLI Runner                             │
//! │  --about    --discover → Catalog    --test    sync → Messages   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Paginate    │  Streams  │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ OAuth2   │ Retry     │ JSON:API      │ Schemas   │ SCHEMA      │
//! │ Refresh  │ Rate Limit│ links.next    │ Bookmarks │ RECORD      │
//! │ Persist  │ Backoff   │ Offset        │ Conform   │ STATE       │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// OAuth2 authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// JSON:API pagination
pub mod pagination;

/// JSON:API response decoding
pub mod decode;

/// Stream schemas and record conformance
pub mod schema;

/// Optiply stream definitions
pub mod streams;

/// Bookmarks and state documents
pub mod state;

/// Singer catalog
pub mod catalog;

/// Singer message output
pub mod output;

/// Sync engine
pub mod engine;

/// Tap configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use catalog::Catalog;
pub use config::TapConfig;
pub use streams::{all_streams, StreamDefinition};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
