//! Aggregate state maintained by the engine
//!
//! One instance exists per session. It is created from a snapshot (possibly
//! empty), mutated only by `AggregationEngine::apply`, and dropped at the
//! end of the session without being persisted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use types::ids::{ProductId, RegionId};
use types::numeric::Amount;
use types::sale::SaleEvent;

use crate::ordered_map::OrderedMap;

/// Region → running total.
pub type RegionTotals = OrderedMap<RegionId, Amount>;

/// Product → region → running total (sparse).
pub type ProductRegionMatrix = OrderedMap<ProductId, OrderedMap<RegionId, Amount>>;

/// One point of the sales-over-time series.
///
/// Baseline points loaded from a snapshot carry no product or region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub amount: Amount,
    pub product: Option<ProductId>,
    pub region: Option<RegionId>,
}

impl TimePoint {
    /// Projection of a sale onto the time series (amount rounded).
    pub fn from_sale(event: &SaleEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            amount: event.amount.rounded(),
            product: Some(event.product.clone()),
            region: Some(event.region.clone()),
        }
    }

    /// Baseline point without product/region context.
    pub fn baseline(timestamp: DateTime<Utc>, amount: Amount) -> Self {
        Self {
            timestamp,
            amount: amount.rounded(),
            product: None,
            region: None,
        }
    }
}

/// Every derived view kept up to date by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateState {
    /// Sum of every applied sale since session start.
    pub total_sales: Amount,
    pub region_totals: RegionTotals,
    pub product_region_matrix: ProductRegionMatrix,
    /// Ascending by timestamp.
    pub time_series: VecDeque<TimePoint>,
    /// Newest arrival first.
    pub recent_feed: VecDeque<SaleEvent>,
}

impl AggregateState {
    /// Empty state, as used when no snapshot is available.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total_sales.is_zero()
            && self.region_totals.is_empty()
            && self.product_region_matrix.is_empty()
            && self.time_series.is_empty()
            && self.recent_feed.is_empty()
    }

    /// Whether the time series is sorted ascending by timestamp.
    pub fn time_series_is_sorted(&self) -> bool {
        self.time_series
            .iter()
            .zip(self.time_series.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp)
    }

    /// SHA-256 over a canonical rendering of the whole state.
    ///
    /// Two states with identical contents and key order hash identically,
    /// which lets replays be compared without deep equality.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(b"total:");
        hasher.update(self.total_sales.as_decimal().to_string().as_bytes());

        for (region, total) in self.region_totals.iter() {
            hasher.update(b"|region:");
            hasher.update(region.as_str().as_bytes());
            hasher.update(b"=");
            hasher.update(total.as_decimal().to_string().as_bytes());
        }

        for (product, regions) in self.product_region_matrix.iter() {
            hasher.update(b"|product:");
            hasher.update(product.as_str().as_bytes());
            for (region, total) in regions.iter() {
                hasher.update(b"/");
                hasher.update(region.as_str().as_bytes());
                hasher.update(b"=");
                hasher.update(total.as_decimal().to_string().as_bytes());
            }
        }

        for point in &self.time_series {
            hasher.update(b"|point:");
            hasher.update(point.timestamp.timestamp_micros().to_le_bytes());
            hasher.update(point.amount.as_decimal().to_string().as_bytes());
        }

        for sale in &self.recent_feed {
            hasher.update(b"|sale:");
            hasher.update(sale.product.as_str().as_bytes());
            hasher.update(sale.region.as_str().as_bytes());
            hasher.update(sale.timestamp.timestamp_micros().to_le_bytes());
            hasher.update(sale.amount.as_decimal().to_string().as_bytes());
        }

        format!("{:x}", hasher.finalize())
    }
}
