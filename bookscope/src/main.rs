/*
bookscope - single-binary main.rs
This binary wires the summary pipeline together and starts the Rocket HTTP server.
*/

use anyhow::Context;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use bookscope::counters::SqliteCounterStore;
use bookscope::invoker::SummaryInvoker;
use bookscope::language::LanguageGuard;
use bookscope::llm::remote::RemoteLlmProvider;
use bookscope::llm::LlmProvider;
use bookscope::server::launch_rocket;
use bookscope::storage;

#[derive(Parser, Debug)]
#[command(name = "bookscope", about = "Bookscope book-summary generation server")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    // Load configuration with defaults
    let config = match Config::load_with_defaults(
        if default_path.exists() {
            Some(&default_path)
        } else {
            None
        },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    // Initialize DB pool and schema
    let db_pool = match common::init_db_pool(&config.database.path).await {
        Ok(p) => p,
        Err(e) => {
            error!(%e, db_path = %config.database.path, "failed to initialize database pool");
            return Err(e);
        }
    };
    storage::ensure_schema(&db_pool).await?;

    // Build the generation provider from config
    let provider = create_llm_provider(&config)?;
    info!("LLM provider initialized");

    // Assemble the invoker: provider + counters + compiled guard tables
    let counters = Arc::new(SqliteCounterStore::new(db_pool.clone()));
    let guard = Arc::new(LanguageGuard::new());
    let mut invoker = SummaryInvoker::new(provider, counters, guard).with_limits(&config.limits);
    if let Some(timeout) = config.llm.as_ref().and_then(|l| l.timeout_seconds) {
        invoker = invoker.with_timeout(timeout);
    }

    // Launch the Rocket server (blocking until Rocket shuts down)
    info!("Launching Rocket HTTP server");
    if let Err(e) = launch_rocket(db_pool, Arc::new(config), Arc::new(invoker)).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Create the remote LLM provider from configuration. The API key is read
/// from the environment variable named in the config, never from the file
/// itself.
fn create_llm_provider(config: &Config) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let llm_config = config
        .llm
        .as_ref()
        .context("missing [llm] section in configuration")?;

    let api_key_env = llm_config
        .api_key_env
        .as_deref()
        .context("missing api_key_env in [llm] config")?;
    let api_key = std::env::var(api_key_env)
        .with_context(|| format!("LLM API key env var '{}' not set", api_key_env))?;

    let model = llm_config
        .model
        .clone()
        .unwrap_or_else(|| "gpt-4o-mini".to_string());
    let api_url = llm_config
        .api_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
    let timeout_secs = llm_config.timeout_seconds.unwrap_or(60);

    let provider = RemoteLlmProvider::new(api_url, api_key, model).with_timeout(timeout_secs);
    Ok(Arc::new(provider))
}
