//! Pricing strategies and the rule leaf that holds them.
//!
//! Field names follow the persisted rule document (`type`, `diffType`,
//! `diffValue`, `minPriceDay`, `minPriceMonth`) so that the types can be
//! (de)serialized directly from what the remote store keeps.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Strategy kind
// ---------------------------------------------------------------------------

pub const KIND_FOLLOW_LOWEST: &str = "follow_lowest";

/// How a strategy derives its target from the reference price.
///
/// Only `FollowLowest` is evaluated today. Any other `type` string found in a
/// persisted document is kept verbatim in `Other` so that a load/save cycle
/// never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StrategyKind {
    FollowLowest,
    Other(String),
}

impl From<String> for StrategyKind {
    fn from(value: String) -> Self {
        if value == KIND_FOLLOW_LOWEST {
            Self::FollowLowest
        } else {
            Self::Other(value)
        }
    }
}

impl From<StrategyKind> for String {
    fn from(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::FollowLowest => KIND_FOLLOW_LOWEST.to_string(),
            StrategyKind::Other(s) => s,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FollowLowest => f.write_str(KIND_FOLLOW_LOWEST),
            Self::Other(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Diff type
// ---------------------------------------------------------------------------

/// Unit of `diff_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffType {
    /// Currency amount added to the reference price.
    #[serde(rename = "euros")]
    Absolute,
    /// Percentage of the reference price.
    #[serde(rename = "percent", alias = "percentage")]
    Percent,
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// One pricing directive.
///
/// A negative `diff_value` undercuts the reference price, a positive one marks
/// it up. The floors are absolute prices the result must never go below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    pub diff_type: DiffType,
    pub diff_value: f64,
    #[serde(default)]
    pub min_price_day: Option<f64>,
    #[serde(default)]
    pub min_price_month: Option<f64>,
}

impl Strategy {
    /// `FollowLowest` with an absolute difference and no floors.
    pub fn follow_lowest_absolute(diff_value: f64) -> Self {
        Self {
            kind: StrategyKind::FollowLowest,
            diff_type: DiffType::Absolute,
            diff_value,
            min_price_day: None,
            min_price_month: None,
        }
    }

    /// `FollowLowest` with a percentage difference and no floors.
    pub fn follow_lowest_percent(diff_value: f64) -> Self {
        Self {
            diff_type: DiffType::Percent,
            ..Self::follow_lowest_absolute(diff_value)
        }
    }

    pub fn with_min_price_day(mut self, floor: f64) -> Self {
        self.min_price_day = Some(floor);
        self
    }

    pub fn with_min_price_month(mut self, floor: f64) -> Self {
        self.min_price_month = Some(floor);
        self
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Leaf of the rule table: an ordered list of strategies.
///
/// Order is evaluation order. An empty list is a configured-but-empty rule,
/// which is not the same thing as a missing rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}

impl Rule {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn single(strategy: Strategy) -> Self {
        Self {
            strategies: vec![strategy],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
