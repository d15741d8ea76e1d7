//! Live hardware check: print a few snapshots from the configured GPU backend
//! without starting the poller or talking to the model server.
//!
//! Usage: `live_probe [count]` (default 3, one per second).

use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ocadvisor::config::AppConfig;
use ocadvisor::telemetry::{render_summary, SystemMonitor};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let count: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("count must be a number")?,
        None => 3,
    };

    let config = AppConfig::load_or_create(&AppConfig::path_from_env())?;
    tracing::info!("Probing {} GPU telemetry ({} samples)", config.gpu_brand, count);

    let brand = config.gpu_brand.clone();
    let monitor = tokio::task::spawn_blocking(move || SystemMonitor::for_brand(&brand)).await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    for i in 0..count {
        ticker.tick().await;
        let snapshot = monitor.capture();
        println!("--- sample {} ---", i + 1);
        println!(
            "{}",
            render_summary(
                monitor.profile(),
                &snapshot,
                Some(config.target_temperature_celsius)
            )
        );
        println!("{}", serde_json::to_string(&snapshot)?);
    }

    Ok(())
}
