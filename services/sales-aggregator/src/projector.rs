//! Read-only projections of the aggregate state
//!
//! Computes the views the dashboard renders: pie slices per region, the
//! product×region heatmap (labels, min/max, per-cell ratio and color) and
//! the KPI summary. Nothing here mutates the state; every view is computed
//! on demand.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{ProductId, RegionId};
use types::numeric::{round_money, Amount};
use types::sale::SaleEvent;

use crate::state::{AggregateState, TimePoint};

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Heatmap gradient: light green → yellow → tomato red.
pub const HEATMAP_PALETTE: [Rgb; 3] = [
    Rgb::new(144, 238, 144),
    Rgb::new(255, 220, 70),
    Rgb::new(255, 99, 71),
];

/// Map a ratio in `[0, 1]` onto the heatmap palette.
///
/// `0 → green`, `0.5 → yellow` exactly, `1 → red`. Out-of-range and NaN
/// ratios are clamped first.
pub fn color_of(ratio: f64) -> Rgb {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let stops = (HEATMAP_PALETTE.len() - 1) as f64;
    let segment = ((ratio * stops).floor() as usize).min(HEATMAP_PALETTE.len() - 2);
    let local = ratio * stops - segment as f64;

    let from = HEATMAP_PALETTE[segment];
    let to = HEATMAP_PALETTE[segment + 1];
    let channel = |a: u8, b: u8| -> u8 {
        let v = a as f64 + (b as f64 - a as f64) * local;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgb::new(channel(from.r, to.r), channel(from.g, to.g), channel(from.b, to.b))
}

/// One pie slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieSlice {
    pub region: RegionId,
    pub value: Amount,
}

/// One heatmap cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub value: Amount,
    /// Normalized position between the grid's min and max, in `[0, 1]`.
    pub ratio: f64,
    pub color: Rgb,
}

/// Product×region grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    /// Regions, deduplicated and sorted lexicographically.
    pub x_labels: Vec<RegionId>,
    /// Products in first-seen order.
    pub y_labels: Vec<ProductId>,
    /// Row per product, column per region.
    pub cells: Vec<Vec<HeatmapCell>>,
    pub min: Amount,
    pub max: Amount,
}

impl Heatmap {
    pub fn is_empty(&self) -> bool {
        self.y_labels.is_empty()
    }

    /// Cell for a product/region pair, if both are on the axes.
    pub fn cell(&self, product: &ProductId, region: &RegionId) -> Option<&HeatmapCell> {
        let row = self.y_labels.iter().position(|p| p == product)?;
        let col = self.x_labels.iter().position(|r| r == region)?;
        self.cells.get(row).and_then(|cells| cells.get(col))
    }
}

/// KPI summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_sales_today: Amount,
    /// Mean of the recent feed amounts, 0 when the feed is empty.
    pub average_sale: Amount,
    /// Region with the highest total; `None` before any region exists.
    pub top_region: Option<RegionId>,
    pub recent_activity_count: usize,
}

/// Everything the renderer needs, computed from one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub pie: Vec<PieSlice>,
    pub heatmap: Heatmap,
    pub kpis: Kpis,
    pub time_series: Vec<TimePoint>,
    pub recent_feed: Vec<SaleEvent>,
}

/// Computes derived views from a borrowed state.
#[derive(Debug, Clone, Copy)]
pub struct StateProjector<'a> {
    state: &'a AggregateState,
}

impl<'a> StateProjector<'a> {
    pub fn new(state: &'a AggregateState) -> Self {
        Self { state }
    }

    /// One slice per region, insertion order.
    pub fn pie_slices(&self) -> Vec<PieSlice> {
        self.state
            .region_totals
            .iter()
            .map(|(region, value)| PieSlice {
                region: region.clone(),
                value: *value,
            })
            .collect()
    }

    pub fn heatmap(&self) -> Heatmap {
        let matrix = &self.state.product_region_matrix;

        let y_labels: Vec<ProductId> = matrix.keys().cloned().collect();
        let x_labels: Vec<RegionId> = matrix
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let values: Vec<Vec<Amount>> = matrix
            .values()
            .map(|row| {
                x_labels
                    .iter()
                    .map(|region| row.get(region).copied().unwrap_or(Amount::ZERO).rounded())
                    .collect()
            })
            .collect();

        let mut flat = values.iter().flatten().copied();
        let (min, max) = match flat.next() {
            Some(first) => flat.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))),
            None => (Amount::ZERO, Amount::ZERO),
        };

        let cells = values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| {
                        let ratio = Self::ratio(value, min, max);
                        HeatmapCell {
                            value,
                            ratio,
                            color: color_of(ratio),
                        }
                    })
                    .collect()
            })
            .collect();

        Heatmap {
            x_labels,
            y_labels,
            cells,
            min,
            max,
        }
    }

    pub fn kpis(&self) -> Kpis {
        let feed = &self.state.recent_feed;

        let average_sale = if feed.is_empty() {
            Amount::ZERO
        } else {
            let count = Decimal::from(feed.len() as u64);
            let amounts = || feed.iter().map(|sale| sale.amount.as_decimal());
            // near Decimal::MAX the plain sum overflows; sum per-item shares
            let mean = amounts()
                .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a))
                .map(|sum| sum / count)
                .unwrap_or_else(|| {
                    amounts()
                        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a / count))
                        .unwrap_or(Decimal::MAX)
                });
            Amount::try_new(round_money(mean)).unwrap_or(Amount::ZERO)
        };

        // First encountered wins ties, as a stable descending sort would.
        let mut top: Option<(&RegionId, Amount)> = None;
        for (region, total) in self.state.region_totals.iter() {
            if top.map_or(true, |(_, best)| *total > best) {
                top = Some((region, *total));
            }
        }

        Kpis {
            total_sales_today: self.state.total_sales,
            average_sale,
            top_region: top.map(|(region, _)| region.clone()),
            recent_activity_count: feed.len(),
        }
    }

    /// Every view bundled for the renderer.
    pub fn dashboard(&self) -> DashboardView {
        DashboardView {
            pie: self.pie_slices(),
            heatmap: self.heatmap(),
            kpis: self.kpis(),
            time_series: self.state.time_series.iter().cloned().collect(),
            recent_feed: self.state.recent_feed.iter().cloned().collect(),
        }
    }

    fn ratio(value: Amount, min: Amount, max: Amount) -> f64 {
        let span = max.as_decimal() - min.as_decimal();
        if span.is_zero() {
            return 0.0;
        }
        let ratio = ((value.as_decimal() - min.as_decimal()) / span)
            .to_f64()
            .unwrap_or(0.0);
        ratio.clamp(0.0, 1.0)
    }
}
