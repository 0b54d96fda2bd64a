//! Determinism tests for the Sales Aggregator
//!
//! The aggregate state is a pure function of the baseline and the ordered
//! event sequence. Tests include:
//! - Dual replay comparison
//! - Arrival reordering detection
//! - Raw ingestion matching direct apply
//! - High volume run against the window bounds
//! - Property tests over random event streams

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use sales_aggregator::engine::{AggregationEngine, EngineConfig};
use sales_aggregator::events::RawSaleRecord;
use sales_aggregator::snapshot::{DashboardSnapshot, LinePoint, SnapshotLoader};
use sales_aggregator::state::AggregateState;
use sales_aggregator::window::{RECENT_FEED_WINDOW, TIME_SERIES_WINDOW};
use serde_json::json;
use types::ids::{ProductId, RegionId};
use types::numeric::Amount;
use types::sale::SaleEvent;

const PRODUCTS: [&str; 3] = ["Widget-A", "Gadget-B", "Gizmo-C"];
const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn make_sale(seq: i64, product: &str, region: &str, amount: &str) -> SaleEvent {
    SaleEvent::new(
        ProductId::new(product),
        RegionId::new(region),
        base_time() + Duration::minutes(seq),
        amount.parse().unwrap(),
        1,
    )
}

/// Build a realistic event sequence: steady sales, a burst of late
/// arrivals, and odd cent amounts.
fn build_scenario() -> Vec<SaleEvent> {
    let mut events = Vec::new();

    // Phase 1: steady sales across every product/region
    for i in 0..24 {
        let product = PRODUCTS[i % PRODUCTS.len()];
        let region = REGIONS[i % REGIONS.len()];
        events.push(make_sale(i as i64, product, region, &format!("{}.25", 10 + i)));
    }

    // Phase 2: late arrivals stamped before earlier sales
    events.push(make_sale(-30, "Widget-A", "North", "99.99"));
    events.push(make_sale(3, "Gadget-B", "West", "0.005"));

    // Phase 3: fractional cents
    events.push(make_sale(40, "Gizmo-C", "East", "33.335"));
    events.push(make_sale(41, "Gizmo-C", "East", "33.335"));

    events
}

fn baseline() -> AggregateState {
    SnapshotLoader::seed(DashboardSnapshot {
        pie: [(RegionId::new("South"), Amount::from_u64(500))]
            .into_iter()
            .collect(),
        line: vec![
            LinePoint {
                date: "2025-02-27".to_string(),
                sales: Amount::from_u64(120),
            },
            LinePoint {
                date: "2025-02-28".to_string(),
                sales: Amount::from_u64(80),
            },
        ],
        heatmap: Default::default(),
    })
}

fn raw_record(event: &SaleEvent) -> RawSaleRecord {
    RawSaleRecord {
        product: Some(event.product.as_str().to_string()),
        region: Some(event.region.as_str().to_string()),
        timestamp: Some(event.timestamp.to_rfc3339()),
        sales_amount: Some(json!(event.amount.as_decimal().to_string())),
        quantity_sold: Some(json!(event.quantity)),
    }
}

/// Test 1: Two identical replays produce identical state checksums.
#[test]
fn test_deterministic_replay_produces_identical_state() {
    let events = build_scenario();

    let first = AggregationEngine::replay(baseline(), EngineConfig::default(), events.clone());
    let second = AggregationEngine::replay(baseline(), EngineConfig::default(), events);

    assert_eq!(
        first.state().checksum(),
        second.state().checksum(),
        "Two replays of the same events must produce identical checksums"
    );
    assert_eq!(first.state(), second.state());
    assert_eq!(first.projector().dashboard(), second.projector().dashboard());
}

/// Test 2: Reordering arrivals changes the feed even when totals agree.
#[test]
fn test_reordered_arrivals_are_detected() {
    let events = build_scenario();
    let mut reordered = events.clone();
    let last = reordered.len() - 1;
    reordered.swap(last - 2, last);

    let original = AggregationEngine::replay(AggregateState::empty(), EngineConfig::default(), events);
    let swapped =
        AggregationEngine::replay(AggregateState::empty(), EngineConfig::default(), reordered);

    assert_eq!(original.state().total_sales, swapped.state().total_sales);
    assert_eq!(original.state().region_totals, swapped.state().region_totals);
    assert_ne!(
        original.state().checksum(),
        swapped.state().checksum(),
        "Arrival order must be visible in the recent feed"
    );
}

/// Test 3: Ingesting raw records gives the same state as applying events.
#[test]
fn test_ingest_matches_direct_apply() {
    let events = build_scenario();

    let direct = AggregationEngine::replay(baseline(), EngineConfig::default(), events.clone());

    let mut ingested = AggregationEngine::from_state(baseline(), EngineConfig::default());
    for event in &events {
        ingested.ingest(&raw_record(event)).unwrap();
    }

    assert_eq!(direct.state().checksum(), ingested.state().checksum());
    assert_eq!(ingested.stats().events_applied, events.len() as u64);
}

/// Test 4: A long run stays inside both windows and keeps the series sorted.
#[test]
fn test_high_volume_respects_windows() {
    let mut engine = AggregationEngine::from_state(baseline(), EngineConfig::default());

    for i in 0..500i64 {
        // every fifth sale arrives an hour late
        let offset = if i % 5 == 0 { i - 60 } else { i };
        let product = PRODUCTS[(i as usize) % PRODUCTS.len()];
        let region = REGIONS[(i as usize * 7) % REGIONS.len()];
        engine.apply(make_sale(offset, product, region, "1.01"));

        let state = engine.state();
        assert!(state.time_series.len() <= TIME_SERIES_WINDOW.max_size);
        assert!(state.recent_feed.len() <= RECENT_FEED_WINDOW.max_size);
        assert!(state.time_series_is_sorted());
    }

    let state = engine.state();
    assert_eq!(state.total_sales, "505.00".parse().unwrap());
    assert_eq!(state.time_series.len(), TIME_SERIES_WINDOW.max_size);
    assert_eq!(state.recent_feed.len(), RECENT_FEED_WINDOW.max_size);
    assert_eq!(state.region_totals.len(), REGIONS.len());
    // baseline South survives and keeps its first position
    assert_eq!(state.region_totals.keys().next(), Some(&RegionId::new("South")));
}

fn arb_sale() -> impl Strategy<Value = SaleEvent> {
    (
        0..PRODUCTS.len(),
        0..REGIONS.len(),
        -1_000i64..1_000,
        0u64..1_000_000,
    )
        .prop_map(|(p, r, minutes, mills)| {
            SaleEvent::new(
                ProductId::new(PRODUCTS[p]),
                RegionId::new(REGIONS[r]),
                base_time() + Duration::minutes(minutes),
                Amount::try_new(rust_decimal::Decimal::new(mills as i64, 3)).unwrap(),
                1,
            )
        })
}

proptest! {
    #[test]
    fn prop_windows_and_ordering_hold(
        events in prop::collection::vec(arb_sale(), 0..200),
        series_max in 1usize..20,
        feed_max in 1usize..8,
    ) {
        let config = EngineConfig {
            time_series: TIME_SERIES_WINDOW.with_max_size(series_max),
            recent_feed: RECENT_FEED_WINDOW.with_max_size(feed_max),
        };
        let mut engine = AggregationEngine::new(config);
        let mut previous_total = Amount::ZERO;

        for (i, event) in events.iter().enumerate() {
            engine.apply(event.clone());
            let state = engine.state();

            prop_assert!(state.time_series.len() <= series_max);
            prop_assert!(state.recent_feed.len() <= feed_max);
            prop_assert!(state.time_series_is_sorted());
            prop_assert!(state.total_sales >= previous_total);
            previous_total = state.total_sales;

            // newest arrival first
            let expected: Vec<_> = events[..=i]
                .iter()
                .rev()
                .take(feed_max)
                .map(|e| e.rounded())
                .collect();
            let actual: Vec<_> = state.recent_feed.iter().cloned().collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn prop_replay_is_deterministic(events in prop::collection::vec(arb_sale(), 0..100)) {
        let first = AggregationEngine::replay(AggregateState::empty(), EngineConfig::default(), events.clone());
        let second = AggregationEngine::replay(AggregateState::empty(), EngineConfig::default(), events);
        prop_assert_eq!(first.state().checksum(), second.state().checksum());
    }
}
