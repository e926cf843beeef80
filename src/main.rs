//! Dash Game Server - authoritative match core for Flappy Dash
//!
//! Entry point for the development host. It wires the storage, identity, and
//! notification collaborators, boots an initial waiting match so a joinable
//! match always exists, and drives match actors at the configured tick rate.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dash_game_server::config::Config;
use dash_game_server::game::{DashMatchHandler, MatchConfig};
use dash_game_server::host::{LocalHost, StaticAccounts};
use dash_game_server::notify::TelegramNotifier;
use dash_game_server::store::{
    InMemoryStorage, MatchResultStore, StorageClient, WaitingMatchRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&config.log_level);

    info!("Starting Dash Game Server");

    let storage: Arc<dyn StorageClient> = Arc::new(InMemoryStorage::new());
    let registry = WaitingMatchRegistry::new(storage.clone());
    let results = MatchResultStore::new(storage);
    let host = LocalHost::new();
    let handler = Arc::new(DashMatchHandler::new(
        MatchConfig::default(),
        config.app_base_url.clone(),
        registry.clone(),
        results,
        Arc::new(StaticAccounts),
        host.clone(),
        Arc::new(TelegramNotifier::from_config(&config)),
    ));

    // A joinable match must exist from the start.
    if registry.list()?.is_empty() {
        let match_id = host.spawn_now(&handler);
        info!(match_id = %match_id, "initial waiting match created");
    }

    let tick_rate = handler.config().tick_rate;
    info!(tick_rate, "host loop starting");

    let driver = tokio::spawn(host.clone().run(handler.clone(), tick_rate));

    shutdown_signal().await;
    driver.abort();
    host.shutdown(&handler, 0);

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
