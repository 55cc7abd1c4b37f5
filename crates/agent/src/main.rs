//! `autoprice-agent` -- pricing rule sync daemon.
//!
//! Loads the rule table and tracked settings from the pricing backend,
//! optionally seeds default rules, pushes local state on a fixed interval
//! and flushes the never-lose keys on Ctrl-C.
//!
//! # Environment variables
//!
//! See [`SyncConfig::from_env`] for the sync settings and
//! [`seed::from_env`] for the `SEED_*` variables. Logging follows
//! `RUST_LOG` (default `autoprice_agent=info,autoprice_sync=info`).

use std::sync::Arc;

use autoprice_agent::{lifecycle, seed};
use autoprice_sync::{HttpRemoteStore, SyncConfig, SyncEngine, SyncState};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoprice_agent=info,autoprice_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid sync configuration");
        std::process::exit(1);
    });

    let seed = seed::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid seed configuration");
        std::process::exit(1);
    });

    tracing::info!(
        api_url = %config.api_url,
        user_key = %config.user_key,
        interval_secs = config.sync_interval.as_secs(),
        seeding = seed.is_some(),
        "Starting autoprice-agent",
    );

    let remote = Arc::new(HttpRemoteStore::new(&config));
    let engine = SyncEngine::new(remote, Arc::new(SyncState::new()), config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    };

    match lifecycle::run(engine, seed, shutdown).await {
        Some(report) => tracing::info!(
            pushed = report.pushed(),
            failures = report.failures(),
            "autoprice-agent stopped"
        ),
        None => tracing::warn!("autoprice-agent stopped without a confirmed flush"),
    }
}
