//! DeHug download tracker service

use anyhow::{Context, Result};
use clap::Parser;
use dehug_tracker::{build_router, DownloadStore, TrackerConfig};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dehug-tracker", about = "Counts dataset and model downloads")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = TrackerConfig::load(args.config.as_deref()).context("loading tracker config")?;

    let store = match &config.snapshot_path {
        Some(path) => DownloadStore::open(path)
            .await
            .with_context(|| format!("opening snapshot {}", path.display()))?,
        None => DownloadStore::in_memory(),
    };

    let app = build_router(Arc::new(store));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!("Download tracker listening on {}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
