//! Table-driven default rule seeding.
//!
//! [`plan_seed`] is a pure function over the current table and a
//! [`SeedRequest`]: it returns the change-set ([`SeedPlan`]) of leaves that
//! would be created. Applying the plan is done by
//! [`RuleStore::apply_seed_plan`](crate::store::RuleStore::apply_seed_plan),
//! which only ever inserts into vacant leaves.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::rules::RuleTable;
use crate::strategy::{Rule, Strategy};
use crate::types::{DayOffset, Group, Location, Month, SlotKey};

/// Input sets for a seeding run. Every combination of the four sets is a
/// candidate leaf.
#[derive(Debug, Clone)]
pub struct SeedRequest {
    pub locations: Vec<Location>,
    pub groups: Vec<Group>,
    pub months: Vec<Month>,
    pub days: Vec<DayOffset>,
    pub strategy: Strategy,
}

impl SeedRequest {
    /// Number of combinations in the Cartesian product, after collapsing
    /// duplicate entries in each set.
    pub fn combinations(&self) -> usize {
        self.locations.iter().collect::<BTreeSet<_>>().len()
            * self.groups.iter().collect::<BTreeSet<_>>().len()
            * self.months.iter().collect::<BTreeSet<_>>().len()
            * self.days.iter().collect::<BTreeSet<_>>().len()
    }
}

/// Change-set produced by [`plan_seed`].
#[derive(Debug, Clone, Default)]
pub struct SeedPlan {
    /// Leaves to create, each holding one clone of the default strategy.
    pub inserts: Vec<(SlotKey, Rule)>,
    /// Combinations skipped because a rule already exists there.
    pub skipped: usize,
}

impl SeedPlan {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
    }
}

/// Outcome of applying a seed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// Compute which leaves a seeding run would create.
pub fn plan_seed(table: &RuleTable, request: &SeedRequest) -> SeedPlan {
    let locations: BTreeSet<&Location> = request.locations.iter().collect();
    let groups: BTreeSet<&Group> = request.groups.iter().collect();
    let months: BTreeSet<Month> = request.months.iter().copied().collect();
    let days: BTreeSet<DayOffset> = request.days.iter().copied().collect();

    let mut plan = SeedPlan::default();

    for location in &locations {
        for group in &groups {
            for month in &months {
                for day in &days {
                    let key = SlotKey::new(location.as_str(), group.as_str(), *month, *day);
                    if table.get(&key).is_some() {
                        plan.skipped += 1;
                    } else {
                        plan.inserts
                            .push((key, Rule::single(request.strategy.clone())));
                    }
                }
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(m: u8) -> Month {
        Month::new(m).unwrap()
    }

    fn request() -> SeedRequest {
        SeedRequest {
            locations: vec!["Albufeira".into(), "Aeroporto de Faro".into()],
            groups: vec!["B1".into(), "B2".into()],
            months: vec![month(11), month(12)],
            days: vec![1, 7, 14],
            strategy: Strategy::follow_lowest_absolute(0.5),
        }
    }

    #[test]
    fn empty_table_plans_full_product() {
        let plan = plan_seed(&RuleTable::new(), &request());
        assert_eq!(plan.inserts.len(), 2 * 2 * 2 * 3);
        assert_eq!(plan.skipped, 0);
        assert_eq!(request().combinations(), 24);
    }

    #[test]
    fn each_planned_rule_has_exactly_one_strategy() {
        let plan = plan_seed(&RuleTable::new(), &request());
        assert!(plan
            .inserts
            .iter()
            .all(|(_, rule)| rule.strategies == vec![Strategy::follow_lowest_absolute(0.5)]));
    }

    #[test]
    fn duplicate_inputs_are_collapsed() {
        let mut req = request();
        req.days = vec![7, 7, 7];
        req.groups = vec!["B1".into(), "B1".into()];
        let plan = plan_seed(&RuleTable::new(), &req);
        assert_eq!(plan.inserts.len(), 2 * 2);
        assert_eq!(req.combinations(), 4);
    }

    #[test]
    fn existing_leaves_are_skipped() {
        let mut table = RuleTable::new();
        table
            .locations
            .entry("Albufeira".into())
            .or_default()
            .entry("B1".into())
            .or_default()
            .months
            .entry(month(11))
            .or_default()
            .days
            .insert(7, Rule::default());

        let plan = plan_seed(&table, &request());
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.inserts.len(), 23);
        assert!(!plan
            .inserts
            .iter()
            .any(|(k, _)| *k == SlotKey::new("Albufeira", "B1", month(11), 7)));
    }

    #[test]
    fn empty_input_set_plans_nothing() {
        let mut req = request();
        req.months.clear();
        let plan = plan_seed(&RuleTable::new(), &req);
        assert!(plan.is_empty());
        assert_eq!(plan.skipped, 0);
    }
}
