//! Rule-free market positioning heuristic.
//!
//! Used when no rule is configured for a slot, or to sanity-check a rule's
//! output: classifies where the current price sits among competitors and
//! proposes a floor-respecting recommendation.

use serde::Serialize;

use crate::evaluation::apply_floors;
use crate::market::{BookingType, MarketStats};
use crate::types::DayOffset;

/// Below this percentile the price is considered too cheap.
pub const TOO_CHEAP_PERCENTILE: f64 = 30.0;
/// Above this percentile the price is considered too expensive.
pub const TOO_EXPENSIVE_PERCENTILE: f64 = 70.0;
/// Multiplier applied to the lowest competitor price when too cheap.
pub const RAISE_FACTOR: f64 = 1.10;
/// Multiplier applied to the market average when too expensive.
pub const LOWER_FACTOR: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPosition {
    TooCheap,
    Optimal,
    TooExpensive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionAssessment {
    pub position: MarketPosition,
    pub booking_type: BookingType,
    pub percentile: f64,
    pub current_price: f64,
    pub recommended_price: f64,
    /// Change from current to recommended, in percent of the current price.
    /// Zero when the current price is zero.
    pub price_change_percentage: f64,
    pub reasoning: String,
}

/// Assess `current_price` against `competitor_prices`.
///
/// Returns `None` when there are no usable competitor prices.
pub fn assess(
    current_price: f64,
    competitor_prices: &[f64],
    days: DayOffset,
    min_price_day: Option<f64>,
    min_price_month: Option<f64>,
) -> Option<PositionAssessment> {
    let stats = MarketStats::from_prices(competitor_prices)?;
    let percentile = stats.percentile_of(current_price);

    let (position, raw, reasoning) = if percentile < TOO_CHEAP_PERCENTILE {
        (
            MarketPosition::TooCheap,
            stats.lowest * RAISE_FACTOR,
            format!(
                "Currently too cheap ({percentile:.0}th percentile). \
                 Increase to capture margin."
            ),
        )
    } else if percentile > TOO_EXPENSIVE_PERCENTILE {
        (
            MarketPosition::TooExpensive,
            stats.average * LOWER_FACTOR,
            format!(
                "Currently too expensive ({percentile:.0}th percentile). \
                 Reduce to improve conversion."
            ),
        )
    } else {
        (
            MarketPosition::Optimal,
            current_price,
            format!("Well positioned at {percentile:.0}th percentile."),
        )
    };

    let recommended_price = apply_floors(raw, min_price_day, min_price_month);
    let price_change_percentage = if current_price > 0.0 {
        (recommended_price - current_price) / current_price * 100.0
    } else {
        0.0
    };

    Some(PositionAssessment {
        position,
        booking_type: BookingType::classify(days),
        percentile,
        current_price,
        recommended_price,
        price_change_percentage,
        reasoning,
    })
}
