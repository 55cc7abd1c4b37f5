//! Append-only log of applied price adjustments.
//!
//! Each append is mirrored into the local learning value (so it travels with
//! the settings document) and sent to the remote log. A failed remote append
//! is logged and dropped; there is no replay queue.

use std::sync::Arc;
use std::time::Duration;

use autoprice_core::Adjustment;
use serde::Serialize;

use crate::error::SyncError;
use crate::remote::RemoteStore;
use crate::state::SyncState;

/// Result of a single append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendOutcome {
    /// The remote log accepted the record.
    Delivered,
    /// The remote append failed. The record is kept only in the local
    /// learning value.
    Dropped,
}

#[derive(Clone)]
pub struct LearningStore {
    remote: Arc<dyn RemoteStore>,
    state: Arc<SyncState>,
    save_timeout: Duration,
    max_entries: usize,
}

impl LearningStore {
    /// `max_entries` bounds the local mirror; `0` means unbounded.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        state: Arc<SyncState>,
        save_timeout: Duration,
        max_entries: usize,
    ) -> Self {
        Self {
            remote,
            state,
            save_timeout,
            max_entries,
        }
    }

    /// Record one applied price.
    pub async fn append(&self, adjustment: Adjustment) -> AppendOutcome {
        let dropped = self
            .state
            .record_adjustment(adjustment.clone(), self.max_entries)
            .await;
        if dropped > 0 {
            tracing::debug!(dropped, max_entries = self.max_entries, "Trimmed local learning log");
        }

        let send = self.remote.append_adjustment(&adjustment);
        let sent = tokio::time::timeout(self.save_timeout, send)
            .await
            .unwrap_or(Err(SyncError::Timeout(self.save_timeout)));

        match sent {
            Ok(()) => {
                tracing::debug!(
                    group = %adjustment.group,
                    days = adjustment.days,
                    "Adjustment recorded"
                );
                AppendOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!(
                    group = %adjustment.group,
                    days = adjustment.days,
                    error = %e,
                    "Failed to send adjustment, dropping"
                );
                AppendOutcome::Dropped
            }
        }
    }
}
