use anyhow::{Context, Result};
use homesim::config::load_with_env;
use homesim::SmartHome;
use std::path::PathBuf;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homesim=info".into()),
        )
        .init();

    info!("homesim starting...");

    let config_path = std::env::var("HOMESIM_CONFIG").ok().map(PathBuf::from);
    let config = load_with_env(config_path.as_deref()).context("failed to load configuration")?;
    let source = config_path
        .as_ref()
        .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    info!(config = %source, seed = ?config.simulation.random_seed, "Configuration loaded");

    let home = SmartHome::new(config);
    let workers = home.start();

    let mut changes = home.subscribe();
    let logger = tokio::spawn(async move {
        while let Some(change) = changes.recv().await {
            debug!(event_type = %change.event_type, "World changed");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let report = workers.shutdown(home.config().limits.shutdown_timeout()).await;
    logger.abort();

    let summary = home.analytics();
    info!(
        devices = summary.total_devices,
        energy_kwh = summary.total_energy_usage_kwh,
        stopped = report.stopped,
        timed_out = report.timed_out,
        "homesim stopped"
    );

    Ok(())
}
