//! Periodic bidirectional synchronization between [`SyncState`] and a
//! [`RemoteStore`].
//!
//! Lifecycle: one startup load, then a push every `sync_interval` until the
//! cancellation token fires, then an optional shutdown flush of the
//! always-tracked keys. Every remote call is bounded by a deadline and every
//! failure is logged and confined to its key.
//!
//! Keys that replace a shared remote value (the rule table and the automation
//! settings) are not pushed until their remote copy has been read. A failed
//! startup read is retried at the start of every cycle.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use autoprice_core::{AiLearningData, CoreError, SeedRequest};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::learning::LearningStore;
use crate::remote::RemoteStore;
use crate::state::{settings_document, ApplyOutcome, PushItem, SyncState, TrackedKey};

// ---------------------------------------------------------------------------
// Phase state machine
// ---------------------------------------------------------------------------

/// Observable engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Loading,
    Ready,
    Saving,
    ShuttingDown,
}

pub mod phase_machine {
    use super::SyncPhase;

    /// Phases reachable from `from`. `ShuttingDown` is terminal.
    pub fn valid_transitions(from: SyncPhase) -> &'static [SyncPhase] {
        use SyncPhase::*;
        match from {
            Idle => &[Loading, Saving, ShuttingDown],
            Loading => &[Ready, ShuttingDown],
            Ready => &[Loading, Saving, ShuttingDown],
            Saving => &[Ready, ShuttingDown],
            ShuttingDown => &[],
        }
    }

    pub fn can_transition(from: SyncPhase, to: SyncPhase) -> bool {
        valid_transitions(from).contains(&to)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one key during the startup load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The remote value replaced the local one.
    Applied,
    /// The local value has unpushed writes and was kept.
    KeptLocal,
    /// The remote rule table was adopted under pending local rule edits.
    Merged,
    /// The remote store holds no value (or answered not-ok).
    Absent,
    /// Transport failure; the local value is untouched.
    Failed(String),
    /// The remote document did not match the expected shape; the local value
    /// is untouched.
    Corrupt(String),
}

/// What happened to one key during a push.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed,
    /// The key has no local value yet.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub outcomes: BTreeMap<TrackedKey, LoadOutcome>,
}

impl LoadReport {
    pub fn outcome(&self, key: TrackedKey) -> Option<&LoadOutcome> {
        self.outcomes.get(&key)
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, LoadOutcome::Failed(_) | LoadOutcome::Corrupt(_)))
            .count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    pub outcomes: BTreeMap<TrackedKey, PushOutcome>,
}

impl PushReport {
    pub fn outcome(&self, key: TrackedKey) -> Option<&PushOutcome> {
        self.outcomes.get(&key)
    }

    pub fn pushed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, PushOutcome::Pushed))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, PushOutcome::Failed(_)))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives load, periodic push and shutdown flush for one [`SyncState`].
///
/// Cheap to clone; clones share the state, the remote store and the phase.
#[derive(Clone)]
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    state: Arc<SyncState>,
    config: SyncConfig,
    phase: Arc<watch::Sender<SyncPhase>>,
    seed: Option<Arc<SeedRequest>>,
    seeded: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteStore>, state: Arc<SyncState>, config: SyncConfig) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            remote,
            state,
            config,
            phase: Arc::new(phase),
            seed: None,
            seeded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Seed default rules as soon as the remote rule table has been loaded.
    /// Seeding runs once; if the startup load fails it waits for a later
    /// cycle's retry.
    pub fn with_seed(mut self, request: SeedRequest) -> Self {
        self.seed = Some(Arc::new(request));
        self
    }

    /// Whether the configured seed has been applied.
    pub fn is_seeded(&self) -> bool {
        self.seeded.load(Ordering::Acquire)
    }

    pub fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// A [`LearningStore`] sharing this engine's state and remote store.
    pub fn learning_store(&self) -> LearningStore {
        LearningStore::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.state),
            self.config.save_timeout,
            self.config.learning_max_entries,
        )
    }

    fn is_shut_down(&self) -> bool {
        self.phase() == SyncPhase::ShuttingDown
    }

    /// Move to `to` if the phase machine allows it. Returns whether the
    /// phase changed.
    fn transition(&self, to: SyncPhase) -> bool {
        self.phase.send_if_modified(|phase| {
            if phase_machine::can_transition(*phase, to) {
                *phase = to;
                true
            } else {
                tracing::debug!(from = ?*phase, to = ?to, "Ignoring sync phase transition");
                false
            }
        })
    }

    // ---- load ----

    /// Fetch every tracked key concurrently and apply what came back.
    ///
    /// Never fails as a whole: each key's outcome is reported separately and
    /// failures leave the local value untouched. Does nothing once the engine
    /// is shutting down.
    pub async fn load_all(&self) -> LoadReport {
        if self.is_shut_down() {
            tracing::debug!("Engine shutting down, skipping load");
            return LoadReport::default();
        }
        self.transition(SyncPhase::Loading);
        let deadline = self.config.load_timeout;

        let (settings, rules, automation, adjustments) = tokio::join!(
            bounded(deadline, self.remote.load_settings(&self.config.user_key)),
            bounded(deadline, self.remote.load_rules()),
            bounded(deadline, self.remote.load_automation_settings()),
            bounded(deadline, self.remote.load_adjustments()),
        );

        let mut report = LoadReport::default();

        // Settings document: only always-tracked keys are applied.
        match settings {
            Ok(Some(mut document)) => {
                for key in TrackedKey::ALWAYS_TRACKED {
                    let outcome = match document.remove(key.name()) {
                        Some(value) if !value.is_null() => self.apply(key, value).await,
                        _ => LoadOutcome::Absent,
                    };
                    report.outcomes.insert(key, outcome);
                }
            }
            Ok(None) => {
                for key in TrackedKey::ALWAYS_TRACKED {
                    self.state.mark_loaded(key).await;
                    report.outcomes.insert(key, LoadOutcome::Absent);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load user settings");
                for key in TrackedKey::ALWAYS_TRACKED {
                    report.outcomes.insert(key, LoadOutcome::Failed(e.to_string()));
                }
            }
        }

        let rules = self
            .load_outcome(TrackedKey::AutomatedPriceRules, rules)
            .await;
        report.outcomes.insert(TrackedKey::AutomatedPriceRules, rules);

        let automation = self
            .load_outcome(TrackedKey::AutomationSettings, automation)
            .await;
        report.outcomes.insert(TrackedKey::AutomationSettings, automation);

        // The adjustment log supersedes the learning value from the settings
        // document when present. A failed log read does not undo a value the
        // settings document already applied.
        let adjustments = adjustments.and_then(|loaded| {
            loaded
                .map(|list| serde_json::to_value(AiLearningData::from_adjustments(list)))
                .transpose()
                .map_err(|e| SyncError::Malformed(e.to_string()))
        });
        let learning_applied = matches!(
            report.outcome(TrackedKey::AiLearningData),
            Some(LoadOutcome::Applied | LoadOutcome::KeptLocal)
        );
        match self.load_outcome(TrackedKey::AiLearningData, adjustments).await {
            LoadOutcome::Absent => {}
            LoadOutcome::Failed(_) | LoadOutcome::Corrupt(_) if learning_applied => {}
            outcome => {
                report.outcomes.insert(TrackedKey::AiLearningData, outcome);
            }
        }

        self.seed_if_ready().await;
        self.transition(SyncPhase::Ready);

        let leaves = self.state.rules().await.leaf_count();
        tracing::info!(failures = report.failures(), rules = leaves, "Startup load finished");
        report
    }

    /// Re-read every key whose remote copy has not been read yet, then seed
    /// if that made the rule table available.
    pub async fn reload_unloaded(&self) -> LoadReport {
        let mut report = LoadReport::default();
        if self.is_shut_down() {
            return report;
        }
        let unloaded = self.state.unloaded_keys().await;
        if unloaded.is_empty() {
            return report;
        }

        self.transition(SyncPhase::Loading);
        let deadline = self.config.load_timeout;
        let wants = |key: TrackedKey| unloaded.contains(&key);

        let (rules, automation) = tokio::join!(
            async {
                if !wants(TrackedKey::AutomatedPriceRules) {
                    return None;
                }
                Some(bounded(deadline, self.remote.load_rules()).await)
            },
            async {
                if !wants(TrackedKey::AutomationSettings) {
                    return None;
                }
                Some(bounded(deadline, self.remote.load_automation_settings()).await)
            },
        );

        for (key, loaded) in [
            (TrackedKey::AutomatedPriceRules, rules),
            (TrackedKey::AutomationSettings, automation),
        ] {
            if let Some(loaded) = loaded {
                let outcome = self.load_outcome(key, loaded).await;
                report.outcomes.insert(key, outcome);
            }
        }

        self.seed_if_ready().await;
        self.transition(SyncPhase::Ready);
        tracing::info!(
            retried = report.outcomes.len(),
            failures = report.failures(),
            "Reload of unread keys finished"
        );
        report
    }

    async fn seed_if_ready(&self) {
        let Some(request) = self.seed.as_deref() else {
            return;
        };
        if self.is_seeded() {
            return;
        }
        match self.state.seed_default(request).await {
            Some(report) => {
                self.seeded.store(true, Ordering::Release);
                tracing::info!(
                    created = report.created,
                    skipped = report.skipped,
                    "Default rules seeded"
                );
            }
            None => tracing::warn!("Remote rule table not loaded yet, deferring default seeding"),
        }
    }

    async fn load_outcome(
        &self,
        key: TrackedKey,
        loaded: Result<Option<serde_json::Value>, SyncError>,
    ) -> LoadOutcome {
        match loaded {
            Ok(Some(value)) => self.apply(key, value).await,
            Ok(None) => {
                tracing::debug!(key = %key, "No remote value");
                self.state.mark_loaded(key).await;
                LoadOutcome::Absent
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to load tracked key");
                LoadOutcome::Failed(e.to_string())
            }
        }
    }

    async fn apply(&self, key: TrackedKey, value: serde_json::Value) -> LoadOutcome {
        match self.state.apply_loaded(key, value).await {
            Ok(ApplyOutcome::Applied) => {
                tracing::debug!(key = %key, "Applied remote value");
                LoadOutcome::Applied
            }
            Ok(ApplyOutcome::KeptLocal) => {
                tracing::info!(key = %key, "Kept newer local value over remote copy");
                LoadOutcome::KeptLocal
            }
            Ok(ApplyOutcome::Merged) => {
                tracing::info!(key = %key, "Merged pending local rules into remote table");
                LoadOutcome::Merged
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding corrupt remote value");
                LoadOutcome::Corrupt(e.to_string())
            }
        }
    }

    // ---- push ----

    /// Push the settings document, the rule table and the automation
    /// settings concurrently. Each key succeeds or fails on its own.
    ///
    /// Once the engine is shutting down only [`shutdown_flush`] pushes, and
    /// every key is reported skipped.
    ///
    /// [`shutdown_flush`]: Self::shutdown_flush
    pub async fn push_all(&self) -> PushReport {
        if self.is_shut_down() {
            tracing::debug!("Engine shutting down, skipping periodic push");
            return PushReport {
                outcomes: TrackedKey::ALL
                    .into_iter()
                    .map(|key| (key, PushOutcome::Skipped))
                    .collect(),
            };
        }
        self.transition(SyncPhase::Saving);
        let report = self.push_keys(&TrackedKey::ALL).await;
        self.transition(SyncPhase::Ready);

        if report.failures() > 0 {
            tracing::warn!(
                pushed = report.pushed(),
                failures = report.failures(),
                "Periodic push finished with failures"
            );
        } else {
            tracing::debug!(pushed = report.pushed(), "Periodic push finished");
        }
        report
    }

    async fn push_keys(&self, keys: &[TrackedKey]) -> PushReport {
        let mut report = PushReport::default();

        let items = match self.state.snapshot(keys).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "Failed to snapshot local state for push");
                for &key in keys {
                    report.outcomes.insert(key, PushOutcome::Failed(e.to_string()));
                }
                return report;
            }
        };

        let (settings, others): (Vec<PushItem>, Vec<PushItem>) = items
            .into_iter()
            .partition(|item| item.key.is_always_tracked());
        let find = |key: TrackedKey| others.iter().find(|item| item.key == key);

        let (settings_result, rules_result, automation_result) = tokio::join!(
            self.push_settings(&settings),
            self.push_single(find(TrackedKey::AutomatedPriceRules)),
            self.push_single(find(TrackedKey::AutomationSettings)),
        );

        for item in &settings {
            self.record_push(&mut report, item, settings_result.as_ref()).await;
        }
        for (item, result) in [
            (find(TrackedKey::AutomatedPriceRules), rules_result),
            (find(TrackedKey::AutomationSettings), automation_result),
        ] {
            if let Some(item) = item {
                self.record_push(&mut report, item, result.as_ref()).await;
            }
        }

        for &key in keys {
            report.outcomes.entry(key).or_insert(PushOutcome::Skipped);
        }
        report
    }

    async fn push_settings(&self, items: &[PushItem]) -> Option<Result<(), SyncError>> {
        if items.is_empty() {
            return None;
        }
        let document = settings_document(items);
        Some(
            bounded(
                self.config.save_timeout,
                self.remote.save_settings(&self.config.user_key, &document),
            )
            .await,
        )
    }

    async fn push_single(&self, item: Option<&PushItem>) -> Option<Result<(), SyncError>> {
        let item = item?;
        let deadline = self.config.save_timeout;
        let result = match item.key {
            TrackedKey::AutomatedPriceRules => {
                bounded(deadline, self.remote.save_rules(&item.value)).await
            }
            TrackedKey::AutomationSettings => {
                bounded(deadline, self.remote.save_automation_settings(&item.value)).await
            }
            other => Err(SyncError::Core(CoreError::Validation(format!(
                "{other} is pushed through the settings document"
            )))),
        };
        Some(result)
    }

    async fn record_push(
        &self,
        report: &mut PushReport,
        item: &PushItem,
        result: Option<&Result<(), SyncError>>,
    ) {
        let outcome = match result {
            Some(Ok(())) => {
                self.state.mark_synced(item.key, item.revision).await;
                PushOutcome::Pushed
            }
            Some(Err(e)) => {
                tracing::warn!(key = %item.key, error = %e, "Failed to push tracked key");
                PushOutcome::Failed(e.to_string())
            }
            None => PushOutcome::Skipped,
        };
        report.outcomes.insert(item.key, outcome);
    }

    // ---- lifecycle ----

    /// Push every `sync_interval` until `cancel` fires. The first push
    /// happens one interval after this call. Each cycle first retries the
    /// reads that have not succeeded yet.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = self.config.sync_interval;
        tracing::info!(interval_secs = period.as_secs(), "Sync loop started");

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Sync loop stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.reload_unloaded().await;
                    self.push_all().await;
                }
            }
        }
    }

    /// Run the startup load followed by the periodic loop in a background
    /// task.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Sync cancelled during startup load");
                    return;
                }
                _ = engine.load_all() => {}
            }
            engine.run(cancel).await;
        })
    }

    /// Dispatch a final push of the always-tracked keys and return without
    /// waiting for it.
    ///
    /// The engine moves to [`SyncPhase::ShuttingDown`]. The returned handle
    /// may be awaited (ideally under a timeout) to give the push a grace
    /// period; dropping it lets the push race process exit. The flush is not
    /// retried.
    pub fn shutdown_flush(&self) -> JoinHandle<PushReport> {
        self.transition(SyncPhase::ShuttingDown);
        let engine = self.clone();
        tokio::spawn(async move {
            let report = engine.push_keys(&TrackedKey::ALWAYS_TRACKED).await;
            tracing::info!(
                pushed = report.pushed(),
                failures = report.failures(),
                "Shutdown flush finished"
            );
            report
        })
    }
}

/// Bound a remote call by `deadline`. Elapsed deadlines become
/// [`SyncError::Timeout`].
async fn bounded<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, SyncError>>,
) -> Result<T, SyncError> {
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(SyncError::Timeout(deadline)))
}
