//! Strategy evaluation: rule + reference price -> target price.

use crate::error::CoreError;
use crate::strategy::{DiffType, Rule, Strategy, StrategyKind};

/// Compute the target price for `rule` given the lowest observed competing
/// price.
///
/// Only the first strategy is applied. The sequence exists so additional
/// strategies can be added later without changing the persisted shape.
pub fn evaluate(rule: &Rule, reference_price: f64) -> Result<f64, CoreError> {
    let strategy = rule.strategies.first().ok_or(CoreError::EmptyRule)?;
    apply_strategy(strategy, reference_price)
}

/// Apply a single strategy, including its floors.
pub fn apply_strategy(strategy: &Strategy, reference_price: f64) -> Result<f64, CoreError> {
    validate_reference(reference_price)?;

    let raw = match &strategy.kind {
        StrategyKind::FollowLowest => match strategy.diff_type {
            DiffType::Absolute => reference_price + strategy.diff_value,
            DiffType::Percent => reference_price * (1.0 + strategy.diff_value / 100.0),
        },
        StrategyKind::Other(kind) => return Err(CoreError::UnsupportedStrategy(kind.clone())),
    };

    Ok(apply_floors(
        raw,
        strategy.min_price_day,
        strategy.min_price_month,
    ))
}

/// Clamp `price` to the day floor, then to the month floor.
///
/// Both floors apply, so the result is never below the larger of the two.
/// A NaN floor is ignored.
pub fn apply_floors(price: f64, min_price_day: Option<f64>, min_price_month: Option<f64>) -> f64 {
    let mut price = price;
    if let Some(floor) = min_price_day {
        price = price.max(floor);
    }
    if let Some(floor) = min_price_month {
        price = price.max(floor);
    }
    price
}

fn validate_reference(reference_price: f64) -> Result<(), CoreError> {
    if reference_price.is_finite() && reference_price >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidReference(reference_price))
    }
}
