//! In-memory owner of the [`RuleTable`] with structural write operations.
//!
//! All mutation goes through [`RuleStore`]: [`ensure_path`](RuleStore::ensure_path),
//! [`set_rule`](RuleStore::set_rule), [`remove_rule`](RuleStore::remove_rule)
//! and [`seed_default`](RuleStore::seed_default). None of them are
//! synchronised; a multi-threaded host wraps the store in a single lock.

use std::collections::btree_map::Entry;

use crate::error::CoreError;
use crate::rules::RuleTable;
use crate::seeding::{plan_seed, SeedPlan, SeedReport, SeedRequest};
use crate::strategy::Rule;
use crate::types::{DayOffset, SlotKey};

// ---------------------------------------------------------------------------
// RuleSlot
// ---------------------------------------------------------------------------

/// Handle to one leaf position returned by [`RuleStore::ensure_path`].
///
/// The intermediate levels already exist; the leaf itself may or may not.
pub struct RuleSlot<'a> {
    entry: Entry<'a, DayOffset, Rule>,
}

impl<'a> RuleSlot<'a> {
    /// The rule currently at this slot, if any.
    pub fn rule(&self) -> Option<&Rule> {
        match &self.entry {
            Entry::Occupied(occupied) => Some(occupied.get()),
            Entry::Vacant(_) => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.entry, Entry::Occupied(_))
    }

    /// Install `rule` only if the slot is vacant. Returns `true` if inserted.
    pub fn insert_if_absent(self, rule: Rule) -> bool {
        match self.entry {
            Entry::Vacant(vacant) => {
                vacant.insert(rule);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Overwrite the slot, returning the previous rule.
    pub fn set(self, rule: Rule) -> Option<Rule> {
        match self.entry {
            Entry::Vacant(vacant) => {
                vacant.insert(rule);
                None
            }
            Entry::Occupied(mut occupied) => Some(occupied.insert(rule)),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleStore {
    table: RuleTable,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: RuleTable) -> Self {
        Self { table }
    }

    /// Build a store from a persisted rule document.
    pub fn from_document(document: serde_json::Value) -> Result<Self, CoreError> {
        RuleTable::from_document(document).map(Self::from_table)
    }

    pub fn to_document(&self) -> Result<serde_json::Value, CoreError> {
        self.table.to_document()
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn into_table(self) -> RuleTable {
        self.table
    }

    /// Replace the whole table (used when a fresh snapshot is loaded).
    pub fn replace(&mut self, table: RuleTable) {
        self.table = table;
    }

    pub fn get(&self, key: &SlotKey) -> Option<&Rule> {
        self.table.get(key)
    }

    pub fn leaf_count(&self) -> usize {
        self.table.leaf_count()
    }

    /// Configured locations, in key order.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.table.locations.keys().map(String::as_str)
    }

    /// Create any missing intermediate levels for `key` and return a handle
    /// to the leaf position. Never touches an existing leaf.
    pub fn ensure_path(&mut self, key: &SlotKey) -> RuleSlot<'_> {
        let days = &mut self
            .table
            .locations
            .entry(key.location.clone())
            .or_default()
            .entry(key.group.clone())
            .or_default()
            .months
            .entry(key.month)
            .or_default()
            .days;

        RuleSlot {
            entry: days.entry(key.day),
        }
    }

    /// Unconditionally overwrite the leaf at `key`. Returns the previous rule.
    pub fn set_rule(&mut self, key: &SlotKey, rule: Rule) -> Option<Rule> {
        self.ensure_path(key).set(rule)
    }

    /// Remove the leaf at `key`, leaving the intermediate levels in place.
    pub fn remove_rule(&mut self, key: &SlotKey) -> Option<Rule> {
        self.table
            .locations
            .get_mut(&key.location)?
            .get_mut(&key.group)?
            .months
            .get_mut(&key.month)?
            .days
            .remove(&key.day)
    }

    /// Install the default strategy into every vacant leaf of the request's
    /// Cartesian product. Existing leaves are never modified.
    pub fn seed_default(&mut self, request: &SeedRequest) -> SeedReport {
        let plan = plan_seed(&self.table, request);
        self.apply_seed_plan(plan)
    }

    /// Apply a previously computed plan. Leaves that became occupied since
    /// the plan was computed are counted as skipped.
    pub fn apply_seed_plan(&mut self, plan: SeedPlan) -> SeedReport {
        let mut report = SeedReport {
            created: 0,
            skipped: plan.skipped,
        };

        for (key, rule) in plan.inserts {
            if self.ensure_path(&key).insert_if_absent(rule) {
                report.created += 1;
            } else {
                report.skipped += 1;
            }
        }

        report
    }
}
