//! The four-level rule table: `Location → Group → Month → DayOffset → Rule`.
//!
//! The persisted document shape is
//!
//! ```text
//! { [location]: { [group]: { months: { [month]: { days: { [day]: { strategies: [...] } } } } } } }
//! ```
//!
//! and these types (de)serialize to exactly that. Absence of a key at any
//! level means "no override configured". Empty containers are kept as-is so a
//! document survives a load/save cycle unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::strategy::Rule;
use crate::types::{DayOffset, Group, Location, Month, SlotKey};

/// Day level: rental duration → rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthRules {
    #[serde(default)]
    pub days: BTreeMap<DayOffset, Rule>,
}

/// Month level for one vehicle group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupRules {
    #[serde(default)]
    pub months: BTreeMap<Month, MonthRules>,
}

/// Group level for one location.
pub type LocationRules = BTreeMap<Group, GroupRules>;

/// The full rule table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    pub locations: BTreeMap<Location, LocationRules>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted rule document.
    ///
    /// Any shape mismatch (wrong nesting, month outside 1-12, non-numeric day
    /// key, malformed strategy) rejects the whole document rather than
    /// coercing parts of it.
    pub fn from_document(document: serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(document).map_err(|e| CoreError::StructuralCorruption(e.to_string()))
    }

    /// Render the table as its persisted document.
    pub fn to_document(&self) -> Result<serde_json::Value, CoreError> {
        serde_json::to_value(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Exact lookup of a leaf.
    pub fn get(&self, key: &SlotKey) -> Option<&Rule> {
        self.locations
            .get(&key.location)?
            .get(&key.group)?
            .months
            .get(&key.month)?
            .days
            .get(&key.day)
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Number of configured leaves (rules) across the whole table.
    pub fn leaf_count(&self) -> usize {
        self.locations
            .values()
            .flat_map(|groups| groups.values())
            .flat_map(|group| group.months.values())
            .map(|month| month.days.len())
            .sum()
    }

    /// Iterate over every configured leaf in key order.
    pub fn leaves(&self) -> impl Iterator<Item = (SlotKey, &Rule)> + '_ {
        self.locations.iter().flat_map(|(location, groups)| {
            groups.iter().flat_map(move |(group, group_rules)| {
                group_rules.months.iter().flat_map(move |(month, month_rules)| {
                    month_rules.days.iter().map(move |(day, rule)| {
                        (SlotKey::new(location.clone(), group.clone(), *month, *day), rule)
                    })
                })
            })
        })
    }
}
