//! fleetwatchd - runs a fleet from a TOML config file.

use std::sync::Arc;

use fleetwatch::config::Config;
use fleetwatch::network::BridgeConnector;
use fleetwatch::notify::LogSink;
use fleetwatch::store::MemoryStore;
use fleetwatch::{Fleet, Scheduler, metrics, spawn_scan_scheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        host = %config.world.host,
        port = config.world.port,
        accounts = config.accounts.len(),
        scans = config.scans.len(),
        "Starting fleetwatchd"
    );

    metrics::init();

    let store = Arc::new(MemoryStore::from_config(&config));
    let sink = Arc::new(LogSink);
    let connector = Arc::new(BridgeConnector::new(config.bridge.address.clone()));

    let metrics_port = config.metrics_port;
    let scopes = config.scopes();
    let scans = config.scans.clone();

    let fleet = Fleet::start(config, store, sink, connector)?;

    if metrics_port != 0 {
        tokio::spawn(fleetwatch::http::run_http_server(metrics_port, fleet.clone()));
    }

    for scope in scopes {
        let fleet = fleet.clone();
        tokio::spawn(async move {
            match fleet.start_all_for_scope(&scope).await {
                Ok(results) => {
                    let online = results.iter().filter(|(_, o)| o.is_online()).count();
                    info!(scope = %scope, total = results.len(), online, "Scope started");
                }
                Err(e) => error!(scope = %scope, error = %e, "Failed to start scope"),
            }
        });
    }

    let scheduler = spawn_scan_scheduler(Arc::new(Scheduler::new(fleet.clone(), scans)));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    scheduler.abort();
    fleet.shutdown().await;

    info!("fleetwatchd stopped");
    Ok(())
}
