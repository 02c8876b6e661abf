//! trackersrv - PAJ GPS tracker bridge service

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use trackersrv::config::DEFAULT_CONFIG_PATH;
use trackersrv::{Config, TrackerService, SERVICE_NAME, SERVICE_VERSION};

#[derive(Debug, Parser)]
#[command(name = "trackersrv", version, about = "PAJ GPS tracker bridge")]
struct Args {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "TRACKERSRV_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single update cycle, print entity states as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let _log_guard = common::init_logging(&config.logging)?;

    info!(
        "Starting {} v{} - positions every {:?}, notifications every {:?}, devices every {:?}",
        SERVICE_NAME,
        SERVICE_VERSION,
        config.intervals.positions,
        config.intervals.notifications,
        config.intervals.devices
    );

    let mut service = TrackerService::from_config(&config)?;
    service.check_availability().await;
    service.start().await.context("Initial update failed")?;

    if args.once {
        service.coordinator().drain_tasks().await;
        println!("{}", serde_json::to_string_pretty(&service.snapshot())?);
        service.shutdown().await;
        return Ok(());
    }

    info!("Tracking {} entities", service.entities().len());
    service
        .run_until(config.intervals.fastest(), async {
            let signal = common::wait_for_shutdown().await;
            info!("Received {}, shutting down", signal);
        })
        .await;

    service.shutdown().await;
    info!("{} stopped", SERVICE_NAME);
    Ok(())
}
