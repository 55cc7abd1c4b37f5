//! Local cache, remote persistence and synchronization for pricing rules.
//!
//! - [`SyncState`] -- process-local cache of the rule table and the tracked
//!   settings, with per-key pending tracking.
//! - [`RemoteStore`] / [`HttpRemoteStore`] -- the backend persistence seam and
//!   its reqwest implementation.
//! - [`SyncEngine`] -- startup load, periodic push and shutdown flush.
//! - [`LearningStore`] -- append-only adjustment log.
//! - [`PricingService`] -- resolve, evaluate and record one slot.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod learning;
pub mod pricing;
pub mod remote;
pub mod state;

pub use config::SyncConfig;
pub use engine::{LoadOutcome, LoadReport, PushOutcome, PushReport, SyncEngine, SyncPhase};
pub use error::{ConfigError, SyncError};
pub use http::HttpRemoteStore;
pub use learning::{AppendOutcome, LearningStore};
pub use pricing::{PricedSlot, PricingService};
pub use remote::RemoteStore;
pub use state::{ApplyOutcome, SettingsDocument, SyncState, TrackedKey};
