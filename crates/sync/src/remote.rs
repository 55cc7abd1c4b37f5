//! The remote store seam.
//!
//! [`SyncEngine`](crate::engine::SyncEngine) and
//! [`LearningStore`](crate::learning::LearningStore) talk to the backend only
//! through [`RemoteStore`], so tests can substitute an in-memory fake.

use async_trait::async_trait;
use autoprice_core::Adjustment;

use crate::error::SyncError;
use crate::state::SettingsDocument;

/// Key-value persistence exposed by the pricing backend.
///
/// Load methods return `Ok(None)` when the backend answered but holds no
/// value (or answered `ok: false`). Transport failures are `Err`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the per-user settings document.
    async fn load_settings(&self, user_key: &str) -> Result<Option<SettingsDocument>, SyncError>;

    /// Replace the per-user settings document.
    async fn save_settings(
        &self,
        user_key: &str,
        settings: &SettingsDocument,
    ) -> Result<(), SyncError>;

    /// Fetch the raw rule table document.
    async fn load_rules(&self) -> Result<Option<serde_json::Value>, SyncError>;

    /// Replace the rule table document.
    async fn save_rules(&self, rules: &serde_json::Value) -> Result<(), SyncError>;

    async fn load_automation_settings(&self) -> Result<Option<serde_json::Value>, SyncError>;

    async fn save_automation_settings(&self, settings: &serde_json::Value) -> Result<(), SyncError>;

    /// Fetch the full adjustment log.
    async fn load_adjustments(&self) -> Result<Option<Vec<Adjustment>>, SyncError>;

    /// Append one adjustment to the remote log.
    async fn append_adjustment(&self, adjustment: &Adjustment) -> Result<(), SyncError>;
}
