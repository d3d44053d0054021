//! CLI module
//!
//! Singer command-line interface.
//!
//! # Modes
//!
//! - `--about` - Print tap metadata and settings
//! - `--discover` - Print the catalog
//! - `--test` - Check the connection
//! - default - Sync the selected streams to stdout

mod commands;
mod runner;

pub use commands::{AboutFormat, Cli, Mode, ENV_CONFIG};
pub use runner::Runner;
