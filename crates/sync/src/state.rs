//! Process-local cache of every tracked value.
//!
//! [`SyncState`] is created empty at startup, filled by the initial load,
//! mutated by local writers and read by the push paths. It is owned by the
//! host (usually behind an `Arc`) and discarded at exit.
//!
//! Each tracked key carries a local revision counter. A local write bumps the
//! revision; a successful push records the revision it carried. A key is
//! *pending* while its latest revision has not been pushed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use autoprice_core::{
    Adjustment, AiLearningData, CoreError, Rule, RuleStore, RuleTable, SeedReport, SeedRequest,
    SlotKey,
};
use serde::{Serialize, Serializer};
use tokio::sync::{RwLock, RwLockReadGuard};

// ---------------------------------------------------------------------------
// TrackedKey
// ---------------------------------------------------------------------------

/// Named local values subject to synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackedKey {
    /// User-defined day offsets (`customDias`).
    CustomDays,
    /// Adjustment log plus analytics output (`priceAIData`).
    AiLearningData,
    /// The rule table (`automatedPriceRules`).
    AutomatedPriceRules,
    /// Automation switches and thresholds (`priceAutomationSettings`).
    AutomationSettings,
}

impl TrackedKey {
    pub const ALL: [TrackedKey; 4] = [
        Self::CustomDays,
        Self::AiLearningData,
        Self::AutomatedPriceRules,
        Self::AutomationSettings,
    ];

    /// Keys carried in the per-user settings document. These must never be
    /// lost and are the ones flushed on shutdown.
    pub const ALWAYS_TRACKED: [TrackedKey; 2] = [Self::CustomDays, Self::AiLearningData];

    pub fn name(self) -> &'static str {
        match self {
            Self::CustomDays => "customDias",
            Self::AiLearningData => "priceAIData",
            Self::AutomatedPriceRules => "automatedPriceRules",
            Self::AutomationSettings => "priceAutomationSettings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    pub fn is_always_tracked(self) -> bool {
        Self::ALWAYS_TRACKED.contains(&self)
    }

    /// Keys saved as a whole-value replacement of a remote copy that other
    /// writers also edit. They are never pushed before the remote copy has
    /// been read once.
    pub fn requires_load(self) -> bool {
        !self.is_always_tracked()
    }
}

impl Serialize for TrackedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl fmt::Display for TrackedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// Flat settings document: tracked-key name to JSON value.
pub type SettingsDocument = BTreeMap<String, serde_json::Value>;

/// Snapshot of one key taken for a push, with the revision it reflects.
#[derive(Debug, Clone)]
pub struct PushItem {
    pub key: TrackedKey,
    pub value: serde_json::Value,
    pub revision: u64,
}

#[derive(Default)]
struct CacheInner {
    rules: RuleStore,
    /// The rule table has been loaded or written locally. An untouched empty
    /// table is never pushed, so a failed startup load cannot wipe the
    /// remote copy.
    rules_present: bool,
    custom_days: Option<serde_json::Value>,
    learning: Option<AiLearningData>,
    automation_settings: Option<serde_json::Value>,
    /// Keys whose remote copy has been read (or found absent) at least once.
    loaded: BTreeSet<TrackedKey>,
    revisions: BTreeMap<TrackedKey, u64>,
    synced: BTreeMap<TrackedKey, u64>,
}

impl CacheInner {
    fn revision(&self, key: TrackedKey) -> u64 {
        self.revisions.get(&key).copied().unwrap_or(0)
    }

    fn synced(&self, key: TrackedKey) -> u64 {
        self.synced.get(&key).copied().unwrap_or(0)
    }

    fn is_pending(&self, key: TrackedKey) -> bool {
        self.revision(key) > self.synced(key)
    }

    fn bump(&mut self, key: TrackedKey) {
        *self.revisions.entry(key).or_insert(0) += 1;
    }

    fn is_loaded(&self, key: TrackedKey) -> bool {
        self.loaded.contains(&key)
    }

    fn has_value(&self, key: TrackedKey) -> bool {
        match key {
            TrackedKey::CustomDays => self.custom_days.is_some(),
            TrackedKey::AiLearningData => self.learning.is_some(),
            TrackedKey::AutomatedPriceRules => self.rules_present,
            TrackedKey::AutomationSettings => self.automation_settings.is_some(),
        }
    }

    fn value(&self, key: TrackedKey) -> Result<Option<serde_json::Value>, CoreError> {
        let to_value = |v: &AiLearningData| {
            serde_json::to_value(v).map_err(|e| CoreError::Serialization(e.to_string()))
        };
        Ok(match key {
            TrackedKey::CustomDays => self.custom_days.clone(),
            TrackedKey::AiLearningData => self.learning.as_ref().map(to_value).transpose()?,
            TrackedKey::AutomatedPriceRules if self.rules_present => {
                Some(self.rules.to_document()?)
            }
            TrackedKey::AutomatedPriceRules => None,
            TrackedKey::AutomationSettings => self.automation_settings.clone(),
        })
    }

    /// Replace the value for `key`, parsing it into its typed form.
    fn store(&mut self, key: TrackedKey, value: serde_json::Value) -> Result<(), CoreError> {
        match key {
            TrackedKey::CustomDays => self.custom_days = Some(value),
            TrackedKey::AiLearningData => {
                let data: AiLearningData = serde_json::from_value(value)
                    .map_err(|e| CoreError::StructuralCorruption(e.to_string()))?;
                self.learning = Some(data);
            }
            TrackedKey::AutomatedPriceRules => {
                self.rules.replace(RuleTable::from_document(value)?);
                self.rules_present = true;
            }
            TrackedKey::AutomationSettings => self.automation_settings = Some(value),
        }
        Ok(())
    }

    /// Take the remote table as the base and lay every local leaf over it.
    fn merge_rules(&mut self, value: serde_json::Value) -> Result<(), CoreError> {
        let mut merged = RuleStore::from_document(value)?;
        for (key, rule) in self.rules.table().leaves() {
            merged.set_rule(&key, rule.clone());
        }
        self.rules = merged;
        self.rules_present = true;
        Ok(())
    }
}

/// Outcome of applying a remotely loaded value to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The key had unpushed local writes, which are newer than the remote
    /// copy. The loaded value was discarded.
    KeptLocal,
    /// First rule-table load while local rule edits were pending: the remote
    /// table was adopted with the local leaves laid over it. The table stays
    /// pending.
    Merged,
}

/// Process-wide cache of the rule table and the tracked settings.
///
/// All writes take the single write lock, so `ensure_path`, `set_rule` and
/// `seed_default` never run concurrently. Reads share the lock.
#[derive(Default)]
pub struct SyncState {
    inner: RwLock<CacheInner>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- rule table ----

    /// Shared read access to the rule store.
    pub async fn rules(&self) -> RwLockReadGuard<'_, RuleStore> {
        RwLockReadGuard::map(self.inner.read().await, |inner| &inner.rules)
    }

    /// Overwrite one rule. Marks the rule table pending.
    pub async fn set_rule(&self, key: &SlotKey, rule: Rule) -> Option<Rule> {
        self.edit_rules(|store| store.set_rule(key, rule)).await
    }

    /// Remove one rule. Marks the rule table pending only if something was
    /// removed.
    pub async fn remove_rule(&self, key: &SlotKey) -> Option<Rule> {
        let mut inner = self.inner.write().await;
        let removed = inner.rules.remove_rule(key);
        if removed.is_some() {
            inner.rules_present = true;
            inner.bump(TrackedKey::AutomatedPriceRules);
        }
        removed
    }

    /// Additive seeding. Marks the rule table pending only if a leaf was
    /// created.
    ///
    /// Returns `None` without touching the table until the remote rule table
    /// has been loaded, so seeded defaults never stand in for remote rules.
    pub async fn seed_default(&self, request: &SeedRequest) -> Option<SeedReport> {
        let mut inner = self.inner.write().await;
        if !inner.is_loaded(TrackedKey::AutomatedPriceRules) {
            return None;
        }
        let report = inner.rules.seed_default(request);
        if report.created > 0 {
            inner.rules_present = true;
            inner.bump(TrackedKey::AutomatedPriceRules);
        }
        Some(report)
    }

    /// Run an arbitrary edit against the rule store under the write lock.
    /// The rule table is always marked pending.
    pub async fn edit_rules<R>(&self, edit: impl FnOnce(&mut RuleStore) -> R) -> R {
        let mut inner = self.inner.write().await;
        let result = edit(&mut inner.rules);
        inner.rules_present = true;
        inner.bump(TrackedKey::AutomatedPriceRules);
        result
    }

    // ---- generic tracked values ----

    /// Current value of `key` rendered as JSON, or `None` if it has none.
    pub async fn value(&self, key: TrackedKey) -> Result<Option<serde_json::Value>, CoreError> {
        self.inner.read().await.value(key)
    }

    /// Local write of a whole tracked value. Rejected without side effects if
    /// the value does not fit the key's shape.
    pub async fn set_value(
        &self,
        key: TrackedKey,
        value: serde_json::Value,
    ) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        inner.store(key, value)?;
        inner.bump(key);
        Ok(())
    }

    /// Clone of the learning data, if any.
    pub async fn learning(&self) -> Option<AiLearningData> {
        self.inner.read().await.learning.clone()
    }

    /// Append an adjustment to the local learning log, keeping at most
    /// `max_entries` records (`0` = unbounded). Returns how many old records
    /// were dropped.
    pub async fn record_adjustment(&self, adjustment: Adjustment, max_entries: usize) -> usize {
        let mut inner = self.inner.write().await;
        let dropped = inner
            .learning
            .get_or_insert_with(AiLearningData::default)
            .push_bounded(adjustment, max_entries);
        inner.bump(TrackedKey::AiLearningData);
        dropped
    }

    // ---- sync bookkeeping ----

    pub async fn is_pending(&self, key: TrackedKey) -> bool {
        self.inner.read().await.is_pending(key)
    }

    pub async fn pending_keys(&self) -> Vec<TrackedKey> {
        let inner = self.inner.read().await;
        TrackedKey::ALL
            .into_iter()
            .filter(|key| inner.is_pending(*key))
            .collect()
    }

    /// Whether the remote copy of `key` has been read (or found absent).
    pub async fn is_loaded(&self, key: TrackedKey) -> bool {
        self.inner.read().await.is_loaded(key)
    }

    /// Keys that may not be pushed yet because their remote copy was never
    /// read.
    pub async fn unloaded_keys(&self) -> Vec<TrackedKey> {
        let inner = self.inner.read().await;
        TrackedKey::ALL
            .into_iter()
            .filter(|key| key.requires_load() && !inner.is_loaded(*key))
            .collect()
    }

    /// Record that the remote store holds no value for `key`.
    pub async fn mark_loaded(&self, key: TrackedKey) {
        self.inner.write().await.loaded.insert(key);
    }

    /// Apply a value loaded from the remote store.
    ///
    /// Keys with unpushed local writes keep their local value, except the
    /// rule table on its first load, which is merged. On success the key
    /// counts as loaded; an applied value is also in sync.
    pub async fn apply_loaded(
        &self,
        key: TrackedKey,
        value: serde_json::Value,
    ) -> Result<ApplyOutcome, CoreError> {
        let mut inner = self.inner.write().await;
        if inner.is_pending(key) {
            let outcome = if key == TrackedKey::AutomatedPriceRules && !inner.is_loaded(key) {
                inner.merge_rules(value)?;
                ApplyOutcome::Merged
            } else {
                ApplyOutcome::KeptLocal
            };
            inner.loaded.insert(key);
            return Ok(outcome);
        }
        inner.store(key, value)?;
        inner.loaded.insert(key);
        let revision = inner.revision(key);
        inner.synced.insert(key, revision);
        Ok(ApplyOutcome::Applied)
    }

    /// Snapshot the present values of `keys` for pushing. Keys without a
    /// value, and keys that require a load which has not happened, are left
    /// out.
    pub async fn snapshot(&self, keys: &[TrackedKey]) -> Result<Vec<PushItem>, CoreError> {
        let inner = self.inner.read().await;
        let mut items = Vec::with_capacity(keys.len());
        for &key in keys {
            if !inner.has_value(key) || (key.requires_load() && !inner.is_loaded(key)) {
                continue;
            }
            if let Some(value) = inner.value(key)? {
                items.push(PushItem {
                    key,
                    value,
                    revision: inner.revision(key),
                });
            }
        }
        Ok(items)
    }

    /// Record that `revision` of `key` reached the remote store. Writes made
    /// after the snapshot keep the key pending.
    pub async fn mark_synced(&self, key: TrackedKey, revision: u64) {
        let mut inner = self.inner.write().await;
        let synced = inner.synced.entry(key).or_insert(0);
        if revision > *synced {
            *synced = revision;
        }
    }
}

/// Build the per-user settings document from pushed items.
pub fn settings_document(items: &[PushItem]) -> SettingsDocument {
    items
        .iter()
        .map(|item| (item.key.name().to_string(), item.value.clone()))
        .collect()
}
