//! Baseline snapshot loading
//!
//! Fetches the `{pie, line, heatmap}` baseline once at session start and
//! turns it into the initial `AggregateState`. A failed fetch is logged and
//! replaced by an empty state: the session always starts valid, if empty.
//!
//! The running total is not seeded; it counts sales since session start.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use types::ids::{ProductId, RegionId};
use types::numeric::Amount;
use types::sale::parse_instant_or_date;

use crate::error::FetchError;
use crate::metrics::SessionMetrics;
use crate::ordered_map::OrderedMap;
use crate::state::{AggregateState, ProductRegionMatrix, RegionTotals, TimePoint};

/// One point of the baseline sales-over-time line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePoint {
    /// ISO-8601 instant or bare `YYYY-MM-DD` date.
    pub date: String,
    pub sales: Amount,
}

/// Baseline aggregates as served by the dashboard backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub pie: OrderedMap<RegionId, Amount>,
    #[serde(default)]
    pub line: Vec<LinePoint>,
    #[serde(default)]
    pub heatmap: OrderedMap<ProductId, OrderedMap<RegionId, Amount>>,
}

/// Response envelope: `{"data": {...}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotEnvelope {
    #[serde(default)]
    pub data: DashboardSnapshot,
}

/// Anything that can produce the baseline snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<DashboardSnapshot, FetchError>;
}

/// Source returning a fixed result, for replays and tests.
#[derive(Debug, Clone)]
pub struct StaticSnapshotSource {
    result: Result<DashboardSnapshot, FetchError>,
}

impl StaticSnapshotSource {
    pub fn ok(snapshot: DashboardSnapshot) -> Self {
        Self {
            result: Ok(snapshot),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self { result: Err(err) }
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<DashboardSnapshot, FetchError> {
        self.result.clone()
    }
}

/// Seeds the initial aggregate state from a snapshot source.
pub struct SnapshotLoader {
    metrics: Arc<SessionMetrics>,
}

impl SnapshotLoader {
    pub fn new(metrics: Arc<SessionMetrics>) -> Self {
        Self { metrics }
    }

    /// Fetch once and seed. Never fails: a fetch error yields empty state.
    pub async fn load(&self, source: &dyn SnapshotSource) -> AggregateState {
        match source.fetch_snapshot().await {
            Ok(snapshot) => {
                self.metrics.record_snapshot_loaded();
                Self::seed(snapshot)
            }
            Err(err) => {
                self.metrics.record_fetch_failure();
                warn!(
                    error = %err,
                    endpoint = err.endpoint(),
                    "Baseline snapshot unavailable, starting empty"
                );
                AggregateState::empty()
            }
        }
    }

    /// Build the initial state from a snapshot.
    ///
    /// Values are rounded to the money scale; the line is sorted ascending
    /// by timestamp (stable), and entries with an unparseable date are
    /// skipped.
    pub fn seed(snapshot: DashboardSnapshot) -> AggregateState {
        let region_totals: RegionTotals = snapshot
            .pie
            .iter()
            .map(|(region, total)| (region.clone(), total.rounded()))
            .collect();

        let product_region_matrix: ProductRegionMatrix = snapshot
            .heatmap
            .iter()
            .map(|(product, row)| {
                let row: OrderedMap<RegionId, Amount> = row
                    .iter()
                    .map(|(region, total)| (region.clone(), total.rounded()))
                    .collect();
                (product.clone(), row)
            })
            .collect();

        let mut points: Vec<TimePoint> = Vec::with_capacity(snapshot.line.len());
        for entry in &snapshot.line {
            match parse_instant_or_date(&entry.date) {
                Some(timestamp) => points.push(TimePoint::baseline(timestamp, entry.sales)),
                None => warn!(date = %entry.date, "Skipping baseline point with bad date"),
            }
        }
        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        info!(
            regions = region_totals.len(),
            products = product_region_matrix.len(),
            line_points = points.len(),
            "Baseline snapshot seeded"
        );

        AggregateState {
            region_totals,
            product_region_matrix,
            time_series: points.into(),
            ..AggregateState::empty()
        }
    }
}
