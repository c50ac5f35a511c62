//! formulad - natural-language to spreadsheet formula daemon
//!
//! Serves `POST /generate-formula` and `GET /health`.

use anyhow::{Context, Result};
use clap::Parser;
use formula_shared::PatternTable;
use formulad::cache::ResultCache;
use formulad::config::Config;
use formulad::invoker::ModelInvoker;
use formulad::orchestrator::FormulaResolver;
use formulad::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "formulad", version, about = "Formula generation daemon")]
struct Cli {
    /// Config file (default: /etc/formulad/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides config and PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("formulad v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let patterns = PatternTable::builtin().context("Invalid built-in pattern table")?;
    for (earlier, later) in patterns.shadowed_phrases() {
        warn!("Pattern '{}' shadows later pattern '{}'", earlier, later);
    }
    info!("Loaded {} fallback patterns", patterns.len());

    let invoker = ModelInvoker::from_config(&config.model);
    if invoker.enabled() {
        info!(
            "Model {} enabled, deadline {}ms",
            config.model.model, config.model.timeout_ms
        );
        if invoker.check_availability().await {
            info!("Model runner '{}' is available", config.model.command);
        } else {
            warn!(
                "Model runner '{}' is not available, requests will use fallback patterns",
                config.model.command
            );
        }
    } else {
        info!("Model disabled, using fallback patterns only");
    }

    let cache = ResultCache::new(config.cache.ttl());
    let sweeper = cache.spawn_sweeper(config.cache.sweep_interval());

    let resolver = FormulaResolver::new(cache, invoker, Arc::new(patterns));
    server::run(&config, AppState::new(resolver), sweeper).await
}
