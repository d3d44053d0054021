//! CLI runner - executes commands

use crate::auth::Authenticator;
use crate::catalog::Catalog;
use crate::cli::commands::{AboutFormat, Cli, Mode};
use crate::config::{
    load_config_files, load_env_config, merge_values, settings_schema, ConfigFileTokenStore,
    TapConfig, SETTINGS,
};
use crate::engine::{SelectedStream, SyncConfig, SyncEngine};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::MessageWriter;
use crate::state::StateManager;
use crate::streams::{all_streams, stream_names, StreamDefinition};
use crate::types::JsonValue;
use serde_json::json;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// Tap description used by `--about`
const DESCRIPTION: &str = "Singer tap extracting inventory data from the Optiply API";

/// Capabilities advertised by `--about`
const CAPABILITIES: &[&str] = &["catalog", "discover", "state", "about", "test"];

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, writing protocol output to stdout
    pub async fn run(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        self.run_to(&mut stdout).await
    }

    /// Run the CLI command, writing protocol output to `out`
    pub async fn run_to<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.cli.mode() {
            Mode::About => self.about(out),
            Mode::Discover => self.discover(out),
            Mode::Test => self.test().await,
            Mode::Sync => self.sync(out).await,
        }
    }

    // ========================================================================
    // Config
    // ========================================================================

    /// Load and validate the configuration
    ///
    /// Returns the config and the file that receives refreshed tokens.
    fn load_config(&self) -> Result<(TapConfig, Option<ConfigFileTokenStore>)> {
        let files = self.cli.config_files();
        if files.is_empty() && !self.cli.uses_env_config() {
            return Err(Error::config(
                "no configuration given; pass --config <PATH> or --config ENV",
            ));
        }

        let mut raw = load_config_files(&files)?;
        if self.cli.uses_env_config() {
            merge_values(&mut raw, load_env_config());
        }

        let config = TapConfig::from_value(&raw)?;
        let token_store = files.last().map(ConfigFileTokenStore::new);
        Ok((config, token_store))
    }

    /// HTTP client with the authenticator attached
    fn build_client(
        config: &TapConfig,
        token_store: Option<ConfigFileTokenStore>,
    ) -> Result<HttpClient> {
        let http_config = config.http_client_config();
        let mut authenticator = Authenticator::new(config.to_auth_config())
            .with_retry_policy(http_config.retry_policy());
        if let Some(store) = token_store {
            authenticator = authenticator.with_listener(Arc::new(store));
        }
        Ok(HttpClient::with_config(http_config)?.with_authenticator(Arc::new(authenticator)))
    }

    fn sync_config(config: &TapConfig) -> SyncConfig {
        SyncConfig::new()
            .with_page_size(config.page_size)
            .with_account_id(config.credentials.account_id.clone())
            .with_start_date(config.start_date.clone())
    }

    // ========================================================================
    // Modes
    // ========================================================================

    /// Print tap metadata
    fn about<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.cli.format {
            AboutFormat::Json => {
                let about = about_document();
                writeln!(out, "{}", serde_json::to_string_pretty(&about)?)?;
            }
            AboutFormat::Markdown => out.write_all(about_markdown().as_bytes())?,
        }
        Ok(())
    }

    /// Print the catalog
    fn discover<W: Write>(&self, out: &mut W) -> Result<()> {
        self.load_config()?;
        let catalog = Catalog::discover(&all_streams());
        writeln!(out, "{}", serde_json::to_string_pretty(&catalog.to_value())?)?;
        Ok(())
    }

    /// Fetch one record to check credentials and connectivity
    async fn test(&self) -> Result<()> {
        let (config, token_store) = self.load_config()?;
        let client = Self::build_client(&config, token_store)?;
        let engine = SyncEngine::new(client, StateManager::in_memory())
            .with_config(Self::sync_config(&config));

        let streams = all_streams();
        let stream = streams
            .first()
            .ok_or_else(|| Error::StreamNotFound {
                stream: "products".to_string(),
            })?;
        let count = engine.check_connection(stream).await?;
        info!(stream = stream.name, records = count, "Connection test succeeded");
        Ok(())
    }

    /// Sync the selected streams
    async fn sync<W: Write>(&self, out: &mut W) -> Result<()> {
        let (config, token_store) = self.load_config()?;

        let catalog = self.cli.catalog.as_ref().map(Catalog::from_file).transpose()?;
        let streams = select_streams(all_streams(), catalog.as_ref());
        if streams.is_empty() {
            warn!("No streams selected");
            return Ok(());
        }

        let state = match &self.cli.state {
            Some(path) => StateManager::from_file(path)?,
            None => StateManager::in_memory(),
        };

        let client = Self::build_client(&config, token_store)?;
        let mut engine = SyncEngine::new(client, state).with_config(Self::sync_config(&config));

        let mut writer = MessageWriter::new(out);
        let result = engine.sync_all(&streams, &mut writer).await;
        writer.flush()?;
        result
    }
}

/// Streams to sync, in definition order
///
/// Without a catalog every stream is synced with all properties.
pub fn select_streams(
    definitions: Vec<StreamDefinition>,
    catalog: Option<&Catalog>,
) -> Vec<SelectedStream> {
    let Some(catalog) = catalog else {
        return definitions
            .into_iter()
            .map(SelectedStream::all_properties)
            .collect();
    };

    let known: HashSet<&str> = definitions.iter().map(|d| d.name).collect();
    for entry in &catalog.streams {
        if !known.contains(entry.tap_stream_id.as_str()) {
            warn!("Ignoring unknown stream '{}' in catalog", entry.tap_stream_id);
        }
    }

    definitions
        .into_iter()
        .filter_map(|definition| {
            let entry = catalog.entry(definition.name)?;
            entry.is_selected().then(|| SelectedStream {
                deselected: entry.deselected_properties(),
                definition,
            })
        })
        .collect()
}

/// `--about` document
pub fn about_document() -> JsonValue {
    json!({
        "name": crate::NAME,
        "version": crate::VERSION,
        "description": DESCRIPTION,
        "capabilities": CAPABILITIES,
        "settings": settings_schema(),
        "streams": stream_names(),
    })
}

/// `--about --format markdown` output
pub fn about_markdown() -> String {
    let mut md = format!(
        "# {}\n\n{DESCRIPTION}\n\nVersion: {}\n\n## Capabilities\n\n",
        crate::NAME,
        crate::VERSION
    );
    for capability in CAPABILITIES {
        md.push_str(&format!("* `{capability}`\n"));
    }

    md.push_str("\n## Settings\n\n| Setting | Type | Required | Default | Description |\n");
    md.push_str("|:--------|:-----|:--------:|:--------|:------------|\n");
    for field in SETTINGS {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            field.name,
            field.field_type,
            if field.required { "True" } else { "False" },
            field.default.unwrap_or("None"),
            field.description
        ));
    }

    md.push_str("\n## Streams\n\n");
    for name in stream_names() {
        md.push_str(&format!("* `{name}`\n"));
    }
    md
}
