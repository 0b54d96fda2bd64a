//! Sales Aggregator
//!
//! Real-time aggregation core of the live sales dashboard. Seeds an
//! in-memory aggregate from a one-time baseline snapshot, then folds every
//! `new_sale` event from the feed into it:
//! - Running total since session start
//! - Per-region totals (pie)
//! - Product×region matrix (heatmap)
//! - Bounded time series, ascending by timestamp
//! - Bounded newest-first recent activity feed
//!
//! Views and KPIs are projected on demand from the current state.
//!
//! # Architecture
//!
//! ```text
//!  /dashboard-data          event feed
//!        │                      │
//!  ┌─────▼──────┐        ┌──────▼─────┐
//!  │  Snapshot  │        │ FeedHandle │
//!  │  Loader    │        └──────┬─────┘
//!  └─────┬──────┘               │
//!        │               ┌──────▼─────┐
//!        │               │ Validator  │  ← coerces, rejects bad records
//!        │               └──────┬─────┘
//!  ┌─────▼──────────────────────▼─────┐
//!  │ AggregationEngine (session task) │  ← single writer
//!  └────────────────┬─────────────────┘
//!                   │
//!            ┌──────▼──────┐
//!            │  Projector  │  → pie, heatmap, KPIs
//!            └─────────────┘
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod feed;
pub mod metrics;
pub mod ordered_map;
pub mod projector;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod validator;
pub mod window;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
