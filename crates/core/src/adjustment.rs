//! Applied price adjustments and the learning data envelope they live in.

use serde::{Deserialize, Serialize};

use crate::types::{DayOffset, Group, Timestamp};

/// One applied price, recorded after evaluation.
///
/// Records are immutable once created and are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub group: Group,
    pub days: DayOffset,
    pub applied_price: f64,
    pub reference_price: f64,
    pub timestamp: Timestamp,
}

impl Adjustment {
    pub fn new(
        group: impl Into<Group>,
        days: DayOffset,
        applied_price: f64,
        reference_price: f64,
    ) -> Self {
        Self {
            group: group.into(),
            days,
            applied_price,
            reference_price,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Persisted shape of the learning data key.
///
/// `patterns` and `suggestions` are produced by an external analytics
/// collaborator and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiLearningData {
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    #[serde(default = "empty_object")]
    pub patterns: serde_json::Value,
    #[serde(default)]
    pub suggestions: Vec<serde_json::Value>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl Default for AiLearningData {
    fn default() -> Self {
        Self::from_adjustments(Vec::new())
    }
}

impl AiLearningData {
    /// Fresh envelope around a loaded adjustment log, with empty patterns and
    /// suggestions.
    pub fn from_adjustments(adjustments: Vec<Adjustment>) -> Self {
        Self {
            adjustments,
            patterns: empty_object(),
            suggestions: Vec::new(),
        }
    }

    /// Append a record, then drop the oldest entries beyond `max_entries`.
    ///
    /// `max_entries == 0` means unbounded. Returns how many entries were
    /// dropped.
    pub fn push_bounded(&mut self, adjustment: Adjustment, max_entries: usize) -> usize {
        self.adjustments.push(adjustment);
        if max_entries == 0 || self.adjustments.len() <= max_entries {
            return 0;
        }
        let excess = self.adjustments.len() - max_entries;
        self.adjustments.drain(..excess);
        excess
    }
}
