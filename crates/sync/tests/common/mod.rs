//! Shared fixtures for the sync integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use autoprice_core::{Adjustment, Month, Rule, SlotKey, Strategy};
use autoprice_sync::{RemoteStore, SettingsDocument, SyncConfig, SyncEngine, SyncError, SyncState};

pub const LOAD_SETTINGS: &str = "load_settings";
pub const SAVE_SETTINGS: &str = "save_settings";
pub const LOAD_RULES: &str = "load_rules";
pub const SAVE_RULES: &str = "save_rules";
pub const LOAD_AUTOMATION: &str = "load_automation_settings";
pub const SAVE_AUTOMATION: &str = "save_automation_settings";
pub const LOAD_ADJUSTMENTS: &str = "load_adjustments";
pub const APPEND_ADJUSTMENT: &str = "append_adjustment";

/// In-memory [`RemoteStore`] with per-operation failure and hang switches.
#[derive(Default)]
pub struct FakeRemote {
    pub settings: Mutex<Option<SettingsDocument>>,
    pub rules: Mutex<Option<serde_json::Value>>,
    pub automation: Mutex<Option<serde_json::Value>>,
    pub adjustments: Mutex<Option<Vec<Adjustment>>>,
    failing: Mutex<BTreeSet<&'static str>>,
    hanging: Mutex<BTreeSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `op` answer with a 503.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Make `op` never complete.
    pub fn hang(&self, op: &'static str) {
        self.hanging.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    async fn gate(&self, op: &'static str) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(op);
        let failing = self.failing.lock().unwrap().contains(op);
        if failing {
            return Err(SyncError::HttpStatus {
                status: 503,
                body: "backend sleeping".into(),
            });
        }
        let hanging = self.hanging.lock().unwrap().contains(op);
        if hanging {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn load_settings(&self, _user_key: &str) -> Result<Option<SettingsDocument>, SyncError> {
        self.gate(LOAD_SETTINGS).await?;
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn save_settings(
        &self,
        _user_key: &str,
        settings: &SettingsDocument,
    ) -> Result<(), SyncError> {
        self.gate(SAVE_SETTINGS).await?;
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(())
    }

    async fn load_rules(&self) -> Result<Option<serde_json::Value>, SyncError> {
        self.gate(LOAD_RULES).await?;
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn save_rules(&self, rules: &serde_json::Value) -> Result<(), SyncError> {
        self.gate(SAVE_RULES).await?;
        *self.rules.lock().unwrap() = Some(rules.clone());
        Ok(())
    }

    async fn load_automation_settings(&self) -> Result<Option<serde_json::Value>, SyncError> {
        self.gate(LOAD_AUTOMATION).await?;
        Ok(self.automation.lock().unwrap().clone())
    }

    async fn save_automation_settings(
        &self,
        settings: &serde_json::Value,
    ) -> Result<(), SyncError> {
        self.gate(SAVE_AUTOMATION).await?;
        *self.automation.lock().unwrap() = Some(settings.clone());
        Ok(())
    }

    async fn load_adjustments(&self) -> Result<Option<Vec<Adjustment>>, SyncError> {
        self.gate(LOAD_ADJUSTMENTS).await?;
        Ok(self.adjustments.lock().unwrap().clone())
    }

    async fn append_adjustment(&self, adjustment: &Adjustment) -> Result<(), SyncError> {
        self.gate(APPEND_ADJUSTMENT).await?;
        self.adjustments
            .lock()
            .unwrap()
            .get_or_insert_with(Vec::new)
            .push(adjustment.clone());
        Ok(())
    }
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        sync_interval: Duration::from_secs(30),
        load_timeout: Duration::from_secs(60),
        save_timeout: Duration::from_secs(10),
        learning_max_entries: 100,
        ..SyncConfig::default()
    }
}

pub fn engine(remote: &Arc<FakeRemote>) -> SyncEngine {
    let remote: Arc<dyn RemoteStore> = remote.clone();
    SyncEngine::new(remote, Arc::new(SyncState::new()), test_config())
}

pub fn slot(day: u32) -> SlotKey {
    SlotKey::new("Albufeira", "B1", Month::new(11).unwrap(), day)
}

pub fn half_euro_rule() -> Rule {
    Rule::single(Strategy::follow_lowest_absolute(0.50))
}

/// Persisted document with a single Albufeira/B1/November/7-day rule.
pub fn one_rule_document() -> serde_json::Value {
    serde_json::json!({
        "Albufeira": {
            "B1": {
                "months": {
                    "11": {
                        "days": {
                            "7": {
                                "strategies": [{
                                    "type": "follow_lowest",
                                    "diffType": "euros",
                                    "diffValue": 0.5,
                                    "minPriceDay": null,
                                    "minPriceMonth": null
                                }]
                            }
                        }
                    }
                }
            }
        }
    })
}
