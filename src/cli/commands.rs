//! CLI commands and argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Value of `--config` that reads settings from the environment
pub const ENV_CONFIG: &str = "ENV";

/// Singer tap for the Optiply API
#[derive(Parser, Debug)]
#[command(name = "tap-optiply")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON). Repeat to merge several files in order,
    /// or pass `ENV` to read `TAP_OPTIPLY_*` environment variables
    #[arg(long, value_name = "PATH")]
    pub config: Vec<String>,

    /// State file (JSON) with bookmarks from a previous run
    #[arg(long, value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Catalog file (JSON) selecting streams and properties
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Print the catalog of available streams
    #[arg(long, conflicts_with_all = ["about", "test"])]
    pub discover: bool,

    /// Print tap metadata and the accepted settings
    #[arg(long)]
    pub about: bool,

    /// Output format for `--about`
    #[arg(long, value_enum, default_value = "json", requires = "about")]
    pub format: AboutFormat,

    /// Check credentials and connectivity, then exit
    #[arg(long, conflicts_with = "about")]
    pub test: bool,
}

/// What a CLI invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    About,
    Discover,
    Test,
    Sync,
}

impl Cli {
    /// Mode selected by the flags
    pub fn mode(&self) -> Mode {
        if self.about {
            Mode::About
        } else if self.discover {
            Mode::Discover
        } else if self.test {
            Mode::Test
        } else {
            Mode::Sync
        }
    }

    /// Whether settings come from the environment
    pub fn uses_env_config(&self) -> bool {
        self.config.iter().any(|c| c == ENV_CONFIG)
    }

    /// Config files named on the command line, in order
    pub fn config_files(&self) -> Vec<PathBuf> {
        self.config
            .iter()
            .filter(|c| *c != ENV_CONFIG)
            .map(PathBuf::from)
            .collect()
    }
}

/// Output format for `--about`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AboutFormat {
    /// JSON document
    Json,
    /// Markdown summary
    Markdown,
}
