//! Exact-match rule resolution.
//!
//! There is no fallback of any kind: a different group, location or day
//! offset is never substituted for the requested one, and day offsets are
//! not interpolated.

use crate::error::CoreError;
use crate::rules::RuleTable;
use crate::strategy::Rule;
use crate::types::SlotKey;

/// Read-only view over a [`RuleTable`] that answers lookups.
///
/// Holds only a shared borrow, so any number of resolvers can run against
/// the same table at once.
#[derive(Debug, Clone, Copy)]
pub struct RuleResolver<'a> {
    table: &'a RuleTable,
}

impl<'a> RuleResolver<'a> {
    pub fn new(table: &'a RuleTable) -> Self {
        Self { table }
    }

    /// Return the rule configured at exactly `key`.
    ///
    /// A present-but-empty rule is returned as-is; only a missing key yields
    /// [`CoreError::NotConfigured`].
    pub fn resolve(&self, key: &SlotKey) -> Result<&'a Rule, CoreError> {
        let not_configured = |missing: &'static str| CoreError::NotConfigured {
            key: key.clone(),
            missing,
        };

        let groups = self
            .table
            .locations
            .get(&key.location)
            .ok_or_else(|| not_configured("location"))?;
        let group = groups
            .get(&key.group)
            .ok_or_else(|| not_configured("group"))?;
        let month = group
            .months
            .get(&key.month)
            .ok_or_else(|| not_configured("month"))?;
        month
            .days
            .get(&key.day)
            .ok_or_else(|| not_configured("day"))
    }
}
