use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cctvmap::api;
use cctvmap::Config;
use cctvmap::Session;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_CONFIG: &str = "cctvmap.toml";

/// Render CCTV devices on a map and serve the result.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Load the device feed from this file instead of the configured source
    #[arg(long, conflicts_with = "feed_url")]
    feed_path: Option<PathBuf>,

    /// Load the device feed from this URL instead of the configured source
    #[arg(long)]
    feed_url: Option<String>,

    /// Print the rendered map as JSON and exit instead of serving the API
    #[arg(long)]
    no_serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, used_defaults) = load_config(&args.config)?;
    if let Some(path) = args.feed_path {
        config.feed.path = Some(path);
        config.feed.url = None;
    }
    if let Some(url) = args.feed_url {
        config.feed.url = Some(url);
        config.feed.path = None;
    }
    config.validate().context("Invalid configuration")?;

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    tracing::info!("cctvmap starting");
    if used_defaults {
        tracing::warn!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
    } else {
        tracing::info!("Loaded config from: {}", args.config.display());
    }

    let session = Session::from_config(&config).context("Failed to set up map session")?;
    let report = session.run().await;

    for message in report.notice_messages() {
        tracing::warn!("Notice: {}", message);
    }

    if args.no_serve || !config.api.enabled {
        let json = serde_json::to_string_pretty(&report.map).context("Failed to encode map")?;
        println!("{}", json);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received shutdown signal"),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    api::serve(
        &config.api.listen,
        config.api.port,
        Arc::new(report),
        shutdown_rx,
    )
    .await
    .map_err(|e| anyhow::anyhow!("HTTP API server failed: {}", e))?;

    tracing::info!("cctvmap shutdown complete");
    Ok(())
}

/// Read the config file, falling back to defaults when the default path is
/// absent. Returns whether defaults were used.
fn load_config(path: &Path) -> anyhow::Result<(Config, bool)> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        return Ok((Config::default(), true));
    }

    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok((config, false))
}
