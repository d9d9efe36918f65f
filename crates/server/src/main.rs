//! rsyncit server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use rsyncit_core::AppConfig;
use rsyncit_rrdp::{HttpDownloader, State};
use rsyncit_server::metrics::PrometheusFetcherMetrics;
use rsyncit_server::{AppState, SyncService, create_router, spawn_scheduler};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// rsyncit - mirror an RRDP repository into an rsync directory tree
#[derive(Parser, Debug)]
#[command(name = "rsyncit")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "RSYNCIT_CONFIG",
        default_value = "config/rsyncit.toml"
    )]
    config: String,
}

/// Layer the optional config file under `RSYNCIT_` environment variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("RSYNCIT_") && key != "RSYNCIT_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: rsyncit --config /path/to/rsyncit.toml\n  \
             2. Environment variables: RSYNCIT_RRDP__URL=https://rrdp.example.net/notification.xml \
             RSYNCIT_RSYNC__PATH=/srv/rsync rsyncit\n\n\
             See config/rsyncit.example.toml for example configuration.\n\
             Set RSYNCIT_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("RSYNCIT_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("rsyncit v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    tracing::info!(
        rrdp_url = %config.rrdp.url,
        rsync_path = %config.rsync.path.display(),
        "Configuration loaded"
    );

    rsyncit_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let cycle = config
        .cycle_config()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    let downloader = HttpDownloader::from_config(&cycle).context("failed to build HTTP client")?;

    let sync = Arc::new(SyncService::new(
        config.clone(),
        Arc::new(downloader),
        Arc::new(State::new()),
        Arc::new(PrometheusFetcherMetrics),
    )?);
    let _scheduler = spawn_scheduler(sync.clone(), config.sync.interval());

    let app = create_router(AppState::new(config.clone(), sync));

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
