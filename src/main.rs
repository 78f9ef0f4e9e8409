use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;

use voltwall::config::Config;
use voltwall::enrichment::Enricher;
use voltwall::node::lnd::LndConnector;
use voltwall::observability::init_tracing;
use voltwall::policy::{PolicyLoader, PolicyWatcher};
use voltwall::rules::RuleEngine;
use voltwall::session::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize tracing
    init_tracing(config.effective_log_level(), config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        "Starting voltwall"
    );

    // Load initial policy and start watching it
    let loader = PolicyLoader::new(&config.policy_path);
    let watcher = PolicyWatcher::new(loader, config.policy_reload_interval());
    let (policy_rx, policy_handle) = watcher.start()?;

    {
        let policy = policy_rx.borrow();
        info!(
            channel_mode = %policy.channel_mode,
            forward_mode = %policy.forward_mode,
            rules = policy.rules.apply,
            "Policy loaded"
        );
    }

    let connector = LndConnector::from_config(&config)?;
    let rules = RuleEngine::lua(&config.rules_dir);
    let enricher = Enricher::new()?;

    info!(rules_dir = %config.rules_dir.display(), "Rule scripts directory");

    let supervisor = Supervisor::new(
        Arc::new(connector),
        policy_rx,
        Arc::new(rules),
        Arc::new(enricher),
    )
    .with_reconnect_delay(config.reconnect_delay());

    tokio::select! {
        _ = supervisor.run() => {},
        _ = shutdown_signal() => {},
    }

    // Cleanup
    info!("Shutting down...");
    policy_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
