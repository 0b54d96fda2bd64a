//! Rolling window bounds for the capped collections
//!
//! Two collections in the aggregate state are bounded: the time series
//! (ascending by timestamp, oldest at the front) and the recent activity
//! feed (newest arrival at the front). A `WindowPolicy` names the bound and
//! which end is trimmed; the engine carries one policy per collection so
//! tests can vary the bounds.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Which end of a collection loses entries when the bound is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrimEnd {
    /// Drop from the front (lowest timestamp in an ascending series).
    Front,
    /// Drop from the back (oldest arrival in a newest-first feed).
    Back,
}

/// Size bound for one rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPolicy {
    pub max_size: usize,
    pub trim: TrimEnd,
}

/// Time series keeps the 50 latest points by timestamp.
pub const TIME_SERIES_WINDOW: WindowPolicy = WindowPolicy::new(50, TrimEnd::Front);

/// Recent feed keeps the 5 latest arrivals.
pub const RECENT_FEED_WINDOW: WindowPolicy = WindowPolicy::new(5, TrimEnd::Back);

impl WindowPolicy {
    pub const fn new(max_size: usize, trim: TrimEnd) -> Self {
        Self { max_size, trim }
    }

    /// Same trimming end, different bound.
    pub const fn with_max_size(self, max_size: usize) -> Self {
        Self::new(max_size, self.trim)
    }

    /// Trim `items` down to the bound. Returns how many entries were evicted.
    pub fn enforce<T>(&self, items: &mut VecDeque<T>) -> usize {
        let excess = items.len().saturating_sub(self.max_size);
        if excess == 0 {
            return 0;
        }
        match self.trim {
            TrimEnd::Front => {
                items.drain(..excess);
            }
            TrimEnd::Back => {
                items.truncate(self.max_size);
            }
        }
        excess
    }
}
