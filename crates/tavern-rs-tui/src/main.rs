//! `tavern`: terminal client for character chats.

use anyhow::{Context, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tavern_rs_client::{ApiClient, FileIdentity};
use tavern_rs_config::{LoggingConfig, TavernConfig};
use tavern_rs_core::{Collaborators, Orchestrator, OrchestratorOptions};
use tavern_rs_tui::RunOptions;

const DEFAULT_LOG_FILE: &str = "tavern.log";

/// Command-line options for the TUI client.
#[derive(Parser)]
#[command(name = "tavern", version)]
struct Cli {
    /// Optional path to a tavern.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend base url, overriding the config
    #[arg(long)]
    base_url: Option<String>,
    /// Character id to open first
    #[arg(long)]
    character: Option<String>,
    /// Store this bearer token before starting
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = if let Some(path) = cli.config.as_ref() {
        TavernConfig::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        TavernConfig::load_layered(&cwd)
            .context("failed to load layered config")?
            .config
    };
    if let Some(base_url) = cli.base_url.clone() {
        config.api.base_url = base_url;
        config.validate().context("invalid --base-url")?;
    }

    let token_path = config
        .identity
        .resolved_token_path()
        .context("no home directory; set identity.token_path")?;
    init_logging(&config.logging, &token_path)?;
    info!(
        "starting TUI (config_set={}, base_url={}, character_set={})",
        cli.config.is_some(),
        config.api.base_url,
        cli.character.is_some()
    );

    let identity = Arc::new(
        FileIdentity::load(&token_path)
            .with_context(|| format!("failed to read credential {}", token_path.display()))?,
    );
    if let Some(token) = cli.token {
        if token.trim().is_empty() {
            bail!("--token must not be empty");
        }
        identity.store(token, None).context("failed to store token")?;
        debug!("stored token (path={})", token_path.display());
    }

    let api = Arc::new(
        ApiClient::new(&config.api, identity.clone()).context("failed to build api client")?,
    );
    let orchestrator = Arc::new(Orchestrator::new(
        Collaborators {
            directory: api.clone(),
            gateway: api.clone(),
            identity,
            logout: api,
        },
        OrchestratorOptions::from(&config.chat),
    ));

    tavern_rs_tui::run(
        orchestrator,
        RunOptions {
            initial_character: cli.character,
        },
    )
    .await
}

/// Send logs to a file so they never draw over the alternate screen.
fn init_logging(logging: &LoggingConfig, token_path: &Path) -> anyhow::Result<()> {
    let path = logging.file.clone().unwrap_or_else(|| {
        token_path
            .parent()
            .map(|dir| dir.join(DEFAULT_LOG_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    });
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log dir {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    if let Some(level) = logging.level.as_deref() {
        builder.parse_filters(level);
    }
    let _ = builder
        .parse_default_env()
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
    Ok(())
}
