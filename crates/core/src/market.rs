//! Competitor quote reduction and market statistics.
//!
//! The scraper delivers raw quotes (supplier, car, group, price string).
//! This module turns them into the reference price the evaluator needs
//! (cheapest quote per group) and into summary statistics used by the
//! positioning advisor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DayOffset, Group};

// ---------------------------------------------------------------------------
// Booking classification
// ---------------------------------------------------------------------------

/// Upper bound (inclusive) of a short-term / weekend rental, in days.
pub const SHORT_TERM_MAX_DAYS: DayOffset = 3;
/// Upper bound (inclusive) of a week rental.
pub const WEEK_MAX_DAYS: DayOffset = 7;
/// Upper bound (inclusive) of an extended rental.
pub const EXTENDED_MAX_DAYS: DayOffset = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    ShortTerm,
    Week,
    Extended,
    LongTerm,
}

impl BookingType {
    pub fn classify(days: DayOffset) -> Self {
        if days <= SHORT_TERM_MAX_DAYS {
            Self::ShortTerm
        } else if days <= WEEK_MAX_DAYS {
            Self::Week
        } else if days <= EXTENDED_MAX_DAYS {
            Self::Extended
        } else {
            Self::LongTerm
        }
    }
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// One competitor offer as scraped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorQuote {
    pub supplier: String,
    #[serde(default)]
    pub car: Option<String>,
    pub group: Group,
    pub price: f64,
}

/// Parse a scraped price string such as `"€ 20,50"` or `"1.234,50 €"`.
///
/// Currency symbols and whitespace are ignored. When both `.` and `,` are
/// present the last one is the decimal separator; a lone `,` is a decimal
/// comma. Returns `None` for anything that does not yield a finite,
/// non-negative number.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalised = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    normalised
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Cheapest quote per group. On equal prices the first quote seen wins.
pub fn best_by_group(quotes: &[CompetitorQuote]) -> BTreeMap<Group, CompetitorQuote> {
    let mut best: BTreeMap<Group, CompetitorQuote> = BTreeMap::new();
    for quote in quotes {
        if !quote.price.is_finite() || quote.price < 0.0 {
            continue;
        }
        match best.get(&quote.group) {
            Some(current) if current.price <= quote.price => {}
            _ => {
                best.insert(quote.group.clone(), quote.clone());
            }
        }
    }
    best
}

/// Lowest competing price for one group, if any quote exists for it.
pub fn reference_price(quotes: &[CompetitorQuote], group: &str) -> Option<f64> {
    quotes
        .iter()
        .filter(|q| q.group == group && q.price.is_finite() && q.price >= 0.0)
        .map(|q| q.price)
        .min_by(f64::total_cmp)
}

/// Competing prices for one group that can be ranked against. Zero marks an
/// unpriced listing and is left out with negative and non-finite values.
pub fn group_prices(quotes: &[CompetitorQuote], group: &str) -> Vec<f64> {
    quotes
        .iter()
        .filter(|q| q.group == group && q.price.is_finite() && q.price > 0.0)
        .map(|q| q.price)
        .collect()
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Summary of the competing prices for one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub count: usize,
    pub lowest: f64,
    pub highest: f64,
    pub average: f64,
    /// Upper median (element at `len / 2` of the sorted prices).
    pub median: f64,
    #[serde(skip)]
    sorted: Vec<f64>,
}

impl MarketStats {
    /// Compute statistics over the finite prices in `prices`. Returns `None`
    /// when there are none.
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = prices.iter().copied().filter(|p| p.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        Some(Self {
            count,
            lowest: sorted[0],
            highest: sorted[count - 1],
            average: sum / count as f64,
            median: sorted[count / 2],
            sorted,
        })
    }

    pub fn range(&self) -> f64 {
        self.highest - self.lowest
    }

    /// Percentage (0-100) of competitor prices strictly below `price`.
    pub fn percentile_of(&self, price: f64) -> f64 {
        let below = self.sorted.partition_point(|p| *p < price);
        below as f64 / self.count as f64 * 100.0
    }
}
