//! Pure pricing-rule domain logic.
//!
//! This crate has no I/O and no async code. It provides:
//!
//! - [`RuleTable`] / [`RuleStore`] -- the `location → group → month → day`
//!   rule hierarchy and its structural write operations.
//! - [`plan_seed`] -- table-driven default rule seeding.
//! - [`RuleResolver`] -- exact-match rule lookup.
//! - [`evaluate`] -- strategy evaluation with price floors.
//! - [`Adjustment`] / [`AiLearningData`] -- the applied-price log.
//! - [`market`] and [`positioning`] -- competitor quote reduction and the
//!   rule-free positioning heuristic.

pub mod adjustment;
pub mod error;
pub mod evaluation;
pub mod market;
pub mod positioning;
pub mod resolution;
pub mod rules;
pub mod seeding;
pub mod store;
pub mod strategy;
pub mod types;

pub use adjustment::{Adjustment, AiLearningData};
pub use error::CoreError;
pub use evaluation::{apply_floors, apply_strategy, evaluate};
pub use resolution::RuleResolver;
pub use rules::{GroupRules, MonthRules, RuleTable};
pub use seeding::{plan_seed, SeedPlan, SeedReport, SeedRequest};
pub use store::{RuleSlot, RuleStore};
pub use strategy::{DiffType, Rule, Strategy, StrategyKind};
pub use types::{DayOffset, Group, Location, Month, SlotKey, Timestamp};
