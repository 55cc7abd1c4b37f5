//! Agent lifecycle: load, optional seeding, periodic sync, shutdown flush.

use std::future::Future;

use autoprice_core::SeedRequest;
use autoprice_sync::{PushReport, SyncEngine};
use tokio_util::sync::CancellationToken;

/// Run `engine` until `shutdown` resolves, then flush the always-tracked
/// keys within the configured grace period.
///
/// When `seed` is given, seeding happens once the remote rule table has been
/// read, so seeded defaults never replace remote rules. If the startup read
/// fails, seeding waits for the cycle whose retry succeeds. Returns the flush
/// report, or `None` if the flush did not finish in time.
pub async fn run(
    engine: SyncEngine,
    seed: Option<SeedRequest>,
    shutdown: impl Future<Output = ()>,
) -> Option<PushReport> {
    let cancel = CancellationToken::new();

    let engine = match seed {
        Some(request) => engine.with_seed(request),
        None => engine,
    };
    let sync_task = engine.spawn(cancel.clone());

    shutdown.await;
    tracing::info!("Shutdown signal received, stopping sync");

    cancel.cancel();
    if let Err(e) = sync_task.await {
        tracing::error!(error = %e, "Sync task ended abnormally");
    }

    let grace = engine.config().shutdown_grace;
    match tokio::time::timeout(grace, engine.shutdown_flush()).await {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Shutdown flush task failed");
            None
        }
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "Shutdown flush did not finish in time");
            None
        }
    }
}
