//! Sentinel Agent Daemon
//!
//! Multi-vault warning protocol monitor. Watches every registered vault,
//! raises warnings when heartbeats expire, escalates through the grace and
//! yield stages, and delivers liveness verdicts - all while the registry
//! remains the single source of truth.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! sentinel-agent
//!
//! # Custom data directory and faster polling
//! sentinel-agent --data-dir /var/lib/sentinel --poll-interval-ms 5000
//!
//! # Pause all agent-driven mutation without stopping the process
//! SENTINEL_KILL_SWITCH=true sentinel-agent
//! ```
//!
//! ## HTTP API
//!
//! - `POST /register-vault` - register a wallet for monitoring
//! - `GET  /vaults`         - list watched identities
//! - `GET  /health`         - liveness probe

use std::sync::Arc;

use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sentinel_agent::{
    ActivityProbe, Args, HttpApi, InProcessClient, InteractiveProbe, LivenessProbe, Monitor,
    Notifier, RegistryClient, TracingNotifier, Watchlist,
};
use sentinel_registry::SentinelRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sentinel_agent=info".parse()?)
                .add_directive("sentinel_registry=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = args.into_config();

    info!(
        node_id = %config.node_id,
        network = %config.network,
        contract = %config.contract_id,
        agent = %config.agent_id,
        "Starting sentinel-agent"
    );
    if let Some(key) = &config.agent_key {
        info!(key_prefix = %key.get(..8).unwrap_or(key), "Signing key loaded");
    }
    if config.kill_switch {
        warn!("Kill switch engaged: observing only, no agent-driven mutation");
    }

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let registry = Arc::new(SentinelRegistry::open(
        config.registry_path(),
        &config.agent_id,
    )?);
    let client: Arc<dyn RegistryClient> =
        Arc::new(InProcessClient::new(registry.clone(), &config.agent_id));
    let watchlist = Arc::new(Watchlist::load(config.watchlist_path())?);

    let probe: Arc<dyn LivenessProbe> = match config.liveness_probe.as_str() {
        "activity" => Arc::new(ActivityProbe::new(client.clone())),
        _ => Arc::new(InteractiveProbe::new()),
    };
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (nudge_tx, nudge_rx) = mpsc::channel::<String>(32);

    let http = Arc::new(HttpApi::new(
        watchlist.clone(),
        nudge_tx,
        config.listen,
    ));
    let monitor = Arc::new(Monitor::new(
        config.clone(),
        client,
        probe,
        notifier,
        watchlist,
    ));

    let http_shutdown = shutdown_tx.subscribe();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = http.run(http_shutdown).await {
            error!(error = %e, "HTTP API failed");
        }
    });

    let monitor_shutdown = shutdown_tx.subscribe();
    let monitor_handle = tokio::spawn(async move {
        monitor.run(monitor_shutdown, nudge_rx).await;
    });

    info!("Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await.ok();
    info!("Shutting down...");

    let _ = shutdown_tx.send(());
    let _ = monitor_handle.await;
    let _ = http_handle.await;

    if let Ok(stats) = registry.stats() {
        info!(
            vaults = stats.total_vaults,
            locked = %stats.total_locked,
            "Final registry stats"
        );
    }

    Ok(())
}
