//! Resolve, evaluate and record: the per-slot pricing path used by hosts.

use std::sync::Arc;

use autoprice_core::market::{group_prices, reference_price, CompetitorQuote};
use autoprice_core::positioning::{assess, PositionAssessment};
use autoprice_core::{evaluate, Adjustment, CoreError, RuleResolver, SlotKey};
use serde::Serialize;

use crate::learning::{AppendOutcome, LearningStore};
use crate::state::SyncState;

/// Outcome of pricing one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedSlot {
    pub key: SlotKey,
    pub reference_price: f64,
    pub price: f64,
    pub recorded: AppendOutcome,
}

#[derive(Clone)]
pub struct PricingService {
    state: Arc<SyncState>,
    learning: LearningStore,
}

impl PricingService {
    pub fn new(state: Arc<SyncState>, learning: LearningStore) -> Self {
        Self { state, learning }
    }

    /// Price `key` against `reference_price` and record the applied price.
    ///
    /// Resolution and evaluation errors are returned before anything is
    /// recorded. A failed remote append does not fail the call; it shows up
    /// in [`PricedSlot::recorded`].
    pub async fn price_slot(
        &self,
        key: &SlotKey,
        reference_price: f64,
    ) -> Result<PricedSlot, CoreError> {
        let price = {
            let rules = self.state.rules().await;
            let rule = RuleResolver::new(rules.table()).resolve(key)?;
            evaluate(rule, reference_price)?
        };

        let recorded = self
            .learning
            .append(Adjustment::new(key.group.clone(), key.day, price, reference_price))
            .await;

        Ok(PricedSlot {
            key: key.clone(),
            reference_price,
            price,
            recorded,
        })
    }

    /// Price `key` using the cheapest quote for its group as the reference.
    pub async fn price_from_quotes(
        &self,
        key: &SlotKey,
        quotes: &[CompetitorQuote],
    ) -> Result<PricedSlot, CoreError> {
        let reference = reference_price(quotes, &key.group)
            .ok_or_else(|| CoreError::NoReferencePrice(key.group.clone()))?;
        self.price_slot(key, reference).await
    }

    /// Assess `current_price` against the group's competitor quotes.
    ///
    /// Floors come from the first strategy of the slot's rule when one is
    /// configured. Returns `None` when no quote exists for the group.
    pub async fn advise(
        &self,
        key: &SlotKey,
        current_price: f64,
        quotes: &[CompetitorQuote],
    ) -> Option<PositionAssessment> {
        let prices = group_prices(quotes, &key.group);

        let (min_day, min_month) = {
            let rules = self.state.rules().await;
            rules
                .get(key)
                .and_then(|rule| rule.strategies.first())
                .map(|s| (s.min_price_day, s.min_price_month))
                .unwrap_or((None, None))
        };

        assess(current_price, &prices, key.day, min_day, min_month)
    }
}
