//! End-to-end tests for seeding, resolution and evaluation.
//!
//! Exercises the public API of `autoprice_core` the way a pricing host does:
//! seed a table, resolve a slot, evaluate against a reference price.

use assert_matches::assert_matches;
use autoprice_core::{
    evaluate, CoreError, Month, Rule, RuleResolver, RuleStore, RuleTable, SeedRequest, SlotKey,
    Strategy,
};

const EPS: f64 = 1e-9;

fn month(m: u8) -> Month {
    Month::new(m).unwrap()
}

fn albufeira_seed() -> SeedRequest {
    SeedRequest {
        locations: vec!["Albufeira".into()],
        groups: vec!["B1".into()],
        months: vec![month(11)],
        days: vec![7],
        strategy: Strategy::follow_lowest_absolute(0.50),
    }
}

/// Seed request mirroring the production default run: two locations, every
/// vehicle group, November and December, the common day offsets.
fn production_seed() -> SeedRequest {
    SeedRequest {
        locations: vec!["Albufeira".into(), "Aeroporto de Faro".into()],
        groups: ["B1", "B2", "D", "E1", "E2", "F", "G", "J1", "J2", "L1", "L2", "M1", "M2", "N"]
            .into_iter()
            .map(String::from)
            .collect(),
        months: vec![month(11), month(12)],
        days: vec![1, 2, 3, 4, 5, 6, 7, 14, 21, 30, 60, 90],
        strategy: Strategy::follow_lowest_absolute(0.50),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Seeded slot evaluates to reference + 0.50.
#[test]
fn seeded_slot_follows_lowest_plus_fifty_cents() {
    let mut store = RuleStore::new();
    let report = store.seed_default(&albufeira_seed());
    assert_eq!(report.created, 1);

    let key = SlotKey::new("Albufeira", "B1", month(11), 7);
    let rule = RuleResolver::new(store.table()).resolve(&key).unwrap();
    let price = evaluate(rule, 20.00).unwrap();
    assert!((price - 20.50).abs() < EPS);
}

/// Adding a day floor above the computed price clamps the result.
#[test]
fn day_floor_overrides_computed_price() {
    let mut store = RuleStore::new();
    store.seed_default(&albufeira_seed());

    let key = SlotKey::new("Albufeira", "B1", month(11), 7);
    store.set_rule(
        &key,
        Rule::single(Strategy::follow_lowest_absolute(0.50).with_min_price_day(21.00)),
    );

    let rule = RuleResolver::new(store.table()).resolve(&key).unwrap();
    assert!((evaluate(rule, 20.00).unwrap() - 21.00).abs() < EPS);
}

/// An unseeded day offset is never filled from a neighbouring day.
#[test]
fn unseeded_day_is_not_configured() {
    let mut store = RuleStore::new();
    store.seed_default(&albufeira_seed());

    let key = SlotKey::new("Albufeira", "B1", month(11), 5);
    assert_matches!(
        RuleResolver::new(store.table()).resolve(&key),
        Err(CoreError::NotConfigured { .. })
    );
}

// ---------------------------------------------------------------------------
// Seeding properties
// ---------------------------------------------------------------------------

#[test]
fn production_seed_creates_full_product() {
    let mut store = RuleStore::new();
    let report = store.seed_default(&production_seed());
    assert_eq!(report.created, 2 * 14 * 2 * 12);
    assert_eq!(report.skipped, 0);
    assert_eq!(store.leaf_count(), 672);
}

/// Seeding twice yields the same table and creates nothing the second time.
#[test]
fn seeding_is_idempotent() {
    let mut once = RuleStore::new();
    once.seed_default(&production_seed());

    let mut twice = RuleStore::new();
    twice.seed_default(&production_seed());
    let second = twice.seed_default(&production_seed());

    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 672);
    assert_eq!(once, twice);
}

/// Leaves set manually before seeding keep their exact value.
#[test]
fn seeding_never_touches_manual_rules() {
    let mut store = RuleStore::new();
    let manual = [
        (
            SlotKey::new("Albufeira", "B1", month(11), 7),
            Rule::single(Strategy::follow_lowest_percent(-3.0).with_min_price_month(18.0)),
        ),
        (SlotKey::new("Aeroporto de Faro", "N", month(12), 90), Rule::default()),
    ];
    for (key, rule) in &manual {
        store.set_rule(key, rule.clone());
    }

    let report = store.seed_default(&production_seed());
    assert_eq!(report.skipped, manual.len());

    for (key, rule) in &manual {
        assert_eq!(store.get(key), Some(rule));
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// A seeded table with manual edits and empty containers survives a
/// document round trip unchanged.
#[test]
fn document_round_trip_preserves_structure() {
    let mut store = RuleStore::new();
    store.seed_default(&production_seed());
    store.set_rule(
        &SlotKey::new("Albufeira", "B1", month(11), 7),
        Rule::single(Strategy::follow_lowest_absolute(-1.0).with_min_price_day(19.0)),
    );
    store.set_rule(&SlotKey::new("Albufeira", "G", month(1), 3), Rule::default());
    // Intermediate levels without a leaf.
    store.ensure_path(&SlotKey::new("Portimão", "B1", month(8), 2));

    let document = store.to_document().unwrap();
    let restored = RuleStore::from_document(document.clone()).unwrap();

    assert_eq!(restored, store);
    assert_eq!(restored.to_document().unwrap(), document);
    assert_eq!(
        restored.table().locations["Portimão"]["B1"].months[&month(8)]
            .days
            .len(),
        0
    );
}

#[test]
fn empty_table_round_trip() {
    let table = RuleTable::new();
    let document = table.to_document().unwrap();
    assert_eq!(document, serde_json::json!({}));
    assert_eq!(RuleTable::from_document(document).unwrap(), table);
}

// ---------------------------------------------------------------------------
// Evaluator properties
// ---------------------------------------------------------------------------

/// With an absolute diff and no binding floor, shifting the reference price
/// by delta shifts the result by exactly delta.
#[test]
fn absolute_strategy_is_shift_invariant() {
    let rule = Rule::single(Strategy::follow_lowest_absolute(-0.75));
    for reference in [1.0, 10.0, 19.99, 250.0] {
        for delta in [0.01, 1.0, 12.5] {
            let base = evaluate(&rule, reference).unwrap();
            let shifted = evaluate(&rule, reference + delta).unwrap();
            assert!((shifted - base - delta).abs() < 1e-6);
        }
    }
}

/// The result is never below max(day floor, month floor).
#[test]
fn result_never_below_stricter_floor() {
    let floors = [(10.0, 15.0), (15.0, 10.0), (12.0, 12.0)];
    for (day, month_floor) in floors {
        let rule = Rule::single(
            Strategy::follow_lowest_percent(-50.0)
                .with_min_price_day(day)
                .with_min_price_month(month_floor),
        );
        for reference in [0.0, 5.0, 20.0, 29.0, 100.0] {
            let price = evaluate(&rule, reference).unwrap();
            assert!(price >= f64::max(day, month_floor));
        }
    }
}
