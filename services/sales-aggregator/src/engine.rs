//! Real-time aggregation engine
//!
//! Owns the `AggregateState` and applies one validated sale at a time.
//! Each `apply` runs to completion and never awaits, so a reader that is
//! serialized with the engine (see `session`) only ever observes states
//! between whole events.
//!
//! Per event, in order, every step rounding to the money scale:
//! 1. total sales
//! 2. region total (created at zero if absent)
//! 3. product×region cell (product row, then region cell, created at zero)
//! 4. time series insert (stable by timestamp) and front trim
//! 5. recent feed push-front and back trim

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::EventError;
use types::sale::SaleEvent;

use crate::events::RawSaleRecord;
use crate::projector::StateProjector;
use crate::state::{AggregateState, TimePoint};
use crate::validator::EventValidator;
use crate::window::{WindowPolicy, RECENT_FEED_WINDOW, TIME_SERIES_WINDOW};

/// Window bounds used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub time_series: WindowPolicy,
    pub recent_feed: WindowPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_series: TIME_SERIES_WINDOW,
            recent_feed: RECENT_FEED_WINDOW,
        }
    }
}

/// Evictions caused by one `apply`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub time_series_evicted: usize,
    pub feed_evicted: usize,
}

/// Running counters since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub events_applied: u64,
    pub events_rejected: u64,
    pub time_series_evictions: u64,
    pub feed_evictions: u64,
}

/// Single owner of the aggregate state.
#[derive(Debug)]
pub struct AggregationEngine {
    state: AggregateState,
    config: EngineConfig,
    validator: EventValidator,
    stats: EngineStats,
}

impl AggregationEngine {
    /// Create an engine over an empty state.
    pub fn new(config: EngineConfig) -> Self {
        Self::from_state(AggregateState::empty(), config)
    }

    /// Create an engine with the default 50/5 windows.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Create an engine seeded from a baseline state.
    ///
    /// The seeded time series is stably sorted and both windows are
    /// enforced before the first event.
    pub fn from_state(mut state: AggregateState, config: EngineConfig) -> Self {
        state
            .time_series
            .make_contiguous()
            .sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        config.time_series.enforce(&mut state.time_series);
        config.recent_feed.enforce(&mut state.recent_feed);

        info!(
            regions = state.region_totals.len(),
            products = state.product_region_matrix.len(),
            time_series_len = state.time_series.len(),
            time_series_window = config.time_series.max_size,
            recent_feed_window = config.recent_feed.max_size,
            "AggregationEngine initialized"
        );

        Self {
            state,
            config,
            validator: EventValidator::new(),
            stats: EngineStats::default(),
        }
    }

    /// Rebuild an engine by applying `events` in order over `seed`.
    ///
    /// Deterministic: the same seed and events always yield the same state.
    pub fn replay<I>(seed: AggregateState, config: EngineConfig, events: I) -> Self
    where
        I: IntoIterator<Item = SaleEvent>,
    {
        let mut engine = Self::from_state(seed, config);
        for event in events {
            engine.apply(event);
        }
        engine
    }

    /// Apply one validated sale to every derived view.
    ///
    /// Never fails: absent keys are created at zero.
    pub fn apply(&mut self, event: SaleEvent) -> ApplyOutcome {
        let amount = event.amount;
        let state = &mut self.state;

        // 1. running total
        state.total_sales = state.total_sales.accumulate(amount);

        // 2. region total
        let region_total = state.region_totals.entry_or_default(&event.region);
        *region_total = region_total.accumulate(amount);

        // 3. product × region cell
        let cell = state
            .product_region_matrix
            .entry_or_default(&event.product)
            .entry_or_default(&event.region);
        *cell = cell.accumulate(amount);

        // 4. time series: after every point with an equal or lower timestamp
        let point = TimePoint::from_sale(&event);
        let pos = state
            .time_series
            .partition_point(|p| p.timestamp <= point.timestamp);
        state.time_series.insert(pos, point);
        let time_series_evicted = self.config.time_series.enforce(&mut state.time_series);

        // 5. recent feed, newest arrival first
        state.recent_feed.push_front(event.rounded());
        let feed_evicted = self.config.recent_feed.enforce(&mut state.recent_feed);

        self.stats.events_applied += 1;
        self.stats.time_series_evictions += time_series_evicted as u64;
        self.stats.feed_evictions += feed_evicted as u64;

        debug!(
            product = %event.product,
            region = %event.region,
            amount = %amount,
            total_sales = %state.total_sales,
            time_series_len = state.time_series.len(),
            time_series_evicted,
            "Sale applied"
        );

        ApplyOutcome {
            time_series_evicted,
            feed_evicted,
        }
    }

    /// Validate and apply a raw record.
    ///
    /// On a validation error the state is left untouched and the error is
    /// returned for the caller to log or count.
    pub fn ingest(&mut self, raw: &RawSaleRecord) -> Result<ApplyOutcome, EventError> {
        match self.validator.validate(raw) {
            Ok(event) => Ok(self.apply(event)),
            Err(err) => {
                self.stats.events_rejected += 1;
                warn!(
                    error = %err,
                    kind = err.kind(),
                    "Dropping invalid sale record"
                );
                Err(err)
            }
        }
    }

    /// Read-only access to the current state.
    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    /// Derived views over the current state.
    pub fn projector(&self) -> StateProjector<'_> {
        StateProjector::new(&self.state)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Consume the engine, returning its final state.
    pub fn into_state(self) -> AggregateState {
        self.state
    }
}
