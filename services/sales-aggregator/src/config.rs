//! Session configuration
//!
//! Every knob has a default; `from_env` overrides individual values from
//! `SALES_*` environment variables and ignores ones that do not parse.

use std::env;
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::window::{RECENT_FEED_WINDOW, TIME_SERIES_WINDOW};

/// Configuration for one dashboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base URL of the dashboard backend.
    pub api_url: String,
    /// Per-request timeout for snapshot and secondary fetches.
    pub fetch_timeout_ms: u64,
    /// Capacity of the time-series window.
    pub time_series_window: usize,
    /// Capacity of the recent-activity feed.
    pub recent_feed_window: usize,
    /// Queue depth for view/shutdown commands sent to the session actor.
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000".to_string(),
            fetch_timeout_ms: 5000,
            time_series_window: TIME_SERIES_WINDOW.max_size,
            recent_feed_window: RECENT_FEED_WINDOW.max_size,
            command_buffer: 64,
        }
    }
}

impl SessionConfig {
    /// Load from environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            api_url: lookup("SALES_API_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.api_url),
            fetch_timeout_ms: lookup("SALES_FETCH_TIMEOUT_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.fetch_timeout_ms),
            time_series_window: lookup("SALES_TIME_SERIES_WINDOW")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.time_series_window),
            recent_feed_window: lookup("SALES_RECENT_FEED_WINDOW")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.recent_feed_window),
            command_buffer: lookup("SALES_COMMAND_BUFFER")
                .and_then(|s| s.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.command_buffer),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Window bounds for the aggregation engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            time_series: TIME_SERIES_WINDOW.with_max_size(self.time_series_window),
            recent_feed: RECENT_FEED_WINDOW.with_max_size(self.recent_feed_window),
        }
    }
}
