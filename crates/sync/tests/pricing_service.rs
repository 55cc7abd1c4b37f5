//! Integration tests for [`LearningStore`] and [`PricingService`].

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use autoprice_core::market::CompetitorQuote;
use autoprice_core::positioning::MarketPosition;
use autoprice_core::{Adjustment, CoreError, Rule, Strategy};
use autoprice_sync::{
    AppendOutcome, LearningStore, PricingService, RemoteStore, SyncState, TrackedKey,
};

use common::*;

const EPS: f64 = 1e-9;

fn quote(supplier: &str, group: &str, price: f64) -> CompetitorQuote {
    CompetitorQuote {
        supplier: supplier.into(),
        car: None,
        group: group.into(),
        price,
    }
}

async fn service(remote: &Arc<FakeRemote>) -> (PricingService, Arc<SyncState>) {
    let engine = engine(remote);
    engine.state().set_rule(&slot(7), half_euro_rule()).await;
    let state = Arc::clone(engine.state());
    (PricingService::new(Arc::clone(&state), engine.learning_store()), state)
}

// ---------------------------------------------------------------------------
// Test: LearningStore
// ---------------------------------------------------------------------------

/// A delivered append reaches the remote log and the local mirror.
#[tokio::test]
async fn append_is_mirrored_and_delivered() {
    let remote = FakeRemote::new();
    let engine = engine(&remote);
    let learning = engine.learning_store();

    let outcome = learning.append(Adjustment::new("B1", 7, 20.5, 20.0)).await;

    assert_eq!(outcome, AppendOutcome::Delivered);
    assert_eq!(remote.adjustments.lock().unwrap().as_ref().unwrap().len(), 1);
    assert_eq!(engine.state().learning().await.unwrap().adjustments.len(), 1);
    assert!(engine.state().is_pending(TrackedKey::AiLearningData).await);
}

/// A failed remote append is dropped, not queued, but stays in the local
/// mirror.
#[tokio::test]
async fn failed_append_is_dropped() {
    let remote = FakeRemote::new();
    remote.fail(APPEND_ADJUSTMENT);
    let engine = engine(&remote);
    let learning = engine.learning_store();

    let outcome = learning.append(Adjustment::new("B1", 7, 20.5, 20.0)).await;
    remote.recover(APPEND_ADJUSTMENT);
    learning.append(Adjustment::new("B2", 3, 30.0, 29.5)).await;

    assert_eq!(outcome, AppendOutcome::Dropped);
    let delivered = remote.adjustments.lock().unwrap().clone().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].group, "B2");
    assert_eq!(engine.state().learning().await.unwrap().adjustments.len(), 2);
}

/// The local mirror keeps only the newest `max_entries` records.
#[tokio::test]
async fn local_mirror_is_bounded() {
    let remote = FakeRemote::new();
    let remote_dyn: Arc<dyn RemoteStore> = remote.clone();
    let state = Arc::new(SyncState::new());
    let learning = LearningStore::new(remote_dyn, Arc::clone(&state), Duration::from_secs(1), 3);

    for days in 1..=5 {
        learning.append(Adjustment::new("B1", days, 20.0, 19.5)).await;
    }

    let local = state.learning().await.unwrap();
    assert_eq!(
        local.adjustments.iter().map(|a| a.days).collect::<Vec<_>>(),
        vec![3, 4, 5]
    );
    assert_eq!(remote.adjustments.lock().unwrap().as_ref().unwrap().len(), 5);
}

// ---------------------------------------------------------------------------
// Test: PricingService
// ---------------------------------------------------------------------------

/// Pricing a configured slot evaluates the rule and records the adjustment.
#[tokio::test]
async fn price_slot_records_adjustment() {
    let remote = FakeRemote::new();
    let (service, _) = service(&remote).await;

    let priced = service.price_slot(&slot(7), 20.00).await.unwrap();

    assert!((priced.price - 20.50).abs() < EPS);
    assert_eq!(priced.recorded, AppendOutcome::Delivered);
    let log = remote.adjustments.lock().unwrap().clone().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].days, 7);
    assert!((log[0].applied_price - 20.50).abs() < EPS);
    assert!((log[0].reference_price - 20.00).abs() < EPS);
}

/// Resolution errors are returned without recording anything.
#[tokio::test]
async fn unconfigured_slot_records_nothing() {
    let remote = FakeRemote::new();
    let (service, state) = service(&remote).await;

    let err = service.price_slot(&slot(5), 20.00).await.unwrap_err();

    assert_matches!(err, CoreError::NotConfigured { missing: "day", .. });
    assert_eq!(remote.call_count(APPEND_ADJUSTMENT), 0);
    assert!(state.learning().await.is_none());
}

#[tokio::test]
async fn invalid_reference_records_nothing() {
    let remote = FakeRemote::new();
    let (service, _) = service(&remote).await;

    let err = service.price_slot(&slot(7), f64::NAN).await.unwrap_err();

    assert_matches!(err, CoreError::InvalidReference(_));
    assert_eq!(remote.call_count(APPEND_ADJUSTMENT), 0);
}

/// A remote outage does not fail pricing.
#[tokio::test]
async fn remote_outage_does_not_fail_pricing() {
    let remote = FakeRemote::new();
    remote.fail(APPEND_ADJUSTMENT);
    let (service, _) = service(&remote).await;

    let priced = service.price_slot(&slot(7), 20.00).await.unwrap();

    assert_eq!(priced.recorded, AppendOutcome::Dropped);
}

/// The cheapest quote of the slot's group is the reference price.
#[tokio::test]
async fn price_from_quotes_uses_cheapest_group_quote() {
    let remote = FakeRemote::new();
    let (service, _) = service(&remote).await;
    let quotes = [
        quote("Europcar", "B1", 24.10),
        quote("Goldcar", "B1", 19.80),
        quote("Sixt", "D", 15.00),
    ];

    let priced = service.price_from_quotes(&slot(7), &quotes).await.unwrap();

    assert!((priced.reference_price - 19.80).abs() < EPS);
    assert!((priced.price - 20.30).abs() < EPS);
}

#[tokio::test]
async fn price_from_quotes_without_group_quote_fails() {
    let remote = FakeRemote::new();
    let (service, _) = service(&remote).await;

    let err = service
        .price_from_quotes(&slot(7), &[quote("Sixt", "D", 15.00)])
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::NoReferencePrice(ref group) if group == "B1");
}

/// Advice takes its floors from the slot's configured rule.
#[tokio::test]
async fn advise_respects_rule_floors() {
    let remote = FakeRemote::new();
    let (service, state) = service(&remote).await;
    state
        .set_rule(
            &slot(7),
            Rule::single(Strategy::follow_lowest_absolute(0.50).with_min_price_day(30.0)),
        )
        .await;
    let quotes = [
        quote("A", "B1", 20.0),
        quote("B", "B1", 22.0),
        quote("C", "B1", 24.0),
        quote("D", "B1", 26.0),
    ];

    let advice = service.advise(&slot(7), 40.0, &quotes).await.unwrap();

    assert_eq!(advice.position, MarketPosition::TooExpensive);
    assert!((advice.recommended_price - 30.0).abs() < EPS);
    assert!(service.advise(&slot(7), 40.0, &[]).await.is_none());
}

/// Unpriced and negative quotes do not drag the market position.
#[tokio::test]
async fn advise_ignores_unpriced_quotes() {
    let remote = FakeRemote::new();
    let (service, _) = service(&remote).await;
    let priced = [
        quote("A", "B1", 20.0),
        quote("B", "B1", 22.0),
        quote("C", "B1", 24.0),
        quote("D", "B1", 26.0),
    ];
    let mut noisy = priced.to_vec();
    noisy.push(quote("E", "B1", 0.0));
    noisy.push(quote("F", "B1", -5.0));

    let clean = service.advise(&slot(7), 21.0, &priced).await.unwrap();
    let advice = service.advise(&slot(7), 21.0, &noisy).await.unwrap();

    assert_eq!(advice, clean);
    assert!(service
        .advise(&slot(7), 21.0, &[quote("E", "B1", 0.0)])
        .await
        .is_none());
}
