//! Observability and metrics for a dashboard session
//!
//! Tracks applied and rejected sale events, informational feed messages,
//! snapshot/fetch outcomes, and per-event apply latency. Counters are
//! atomics so the session actor and any reader can share one instance.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Core metrics for a session.
pub struct SessionMetrics {
    // Event processing
    pub events_applied: AtomicU64,
    pub events_rejected: AtomicU64,
    pub informational_messages: AtomicU64,
    pub apply_latency_ns: Mutex<LatencyTracker>,

    // Fetches
    pub snapshots_loaded: AtomicU64,
    pub fetch_failures: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            events_applied: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            informational_messages: AtomicU64::new(0),
            apply_latency_ns: Mutex::new(LatencyTracker::new(1000)),
            snapshots_loaded: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
        }
    }

    /// Record a sale applied to the aggregate state.
    pub fn record_event_applied(&self, latency_ns: u64) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tracker) = self.apply_latency_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    /// Record a sale record dropped by validation.
    pub fn record_event_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a `connected` or `data_update` message.
    pub fn record_informational(&self) {
        self.informational_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_loaded(&self) {
        self.snapshots_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed baseline or secondary fetch.
    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Check alert thresholds and generate alerts.
    pub fn check_thresholds(&self, thresholds: &AlertThresholds) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let rejected = self.events_rejected.load(Ordering::Relaxed);
        if rejected > thresholds.max_events_rejected {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                metric: "events_rejected".to_string(),
                message: format!(
                    "Events rejected: {} > threshold {}",
                    rejected, thresholds.max_events_rejected
                ),
            });
        }

        let failures = self.fetch_failures.load(Ordering::Relaxed);
        if failures > thresholds.max_fetch_failures {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                metric: "fetch_failures".to_string(),
                message: format!(
                    "Fetch failures: {} > threshold {}",
                    failures, thresholds.max_fetch_failures
                ),
            });
        }

        if let Ok(tracker) = self.apply_latency_ns.lock() {
            if let Some(p99) = tracker.percentile(99) {
                if p99 > thresholds.max_apply_p99_ns {
                    alerts.push(Alert {
                        level: AlertLevel::Warning,
                        metric: "apply_p99".to_string(),
                        message: format!(
                            "Apply p99: {}ns > threshold {}ns",
                            p99, thresholds.max_apply_p99_ns
                        ),
                    });
                }
            }
        }

        alerts
    }

    /// Export counters as a BTreeMap.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("events_applied".to_string(), self.events_applied.load(Ordering::Relaxed));
        m.insert("events_rejected".to_string(), self.events_rejected.load(Ordering::Relaxed));
        m.insert(
            "informational_messages".to_string(),
            self.informational_messages.load(Ordering::Relaxed),
        );
        m.insert("snapshots_loaded".to_string(), self.snapshots_loaded.load(Ordering::Relaxed));
        m.insert("fetch_failures".to_string(), self.fetch_failures.load(Ordering::Relaxed));
        if let Ok(tracker) = self.apply_latency_ns.lock() {
            m.insert("apply_latency_avg_ns".to_string(), tracker.average().unwrap_or(0));
        }
        m
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks latency samples for percentile calculation.
pub struct LatencyTracker {
    samples: Vec<u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record a latency sample.
    pub fn record(&mut self, value: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    /// Get a percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let idx = (p as f64 / 100.0 * (sorted.len() - 1) as f64) as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    /// Average latency.
    pub fn average(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as u64)
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

/// Alert severity level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// An alert triggered by threshold breach.
#[derive(Debug, Clone)]
pub struct Alert {
    pub level: AlertLevel,
    pub metric: String,
    pub message: String,
}

/// Configurable alert thresholds.
#[derive(Debug, Clone)]
pub struct AlertThresholds {
    /// Max rejected sale records before alert.
    pub max_events_rejected: u64,
    /// Max failed fetches before critical alert.
    pub max_fetch_failures: u64,
    /// Max apply p99 latency in nanoseconds.
    pub max_apply_p99_ns: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_events_rejected: 100,
            max_fetch_failures: 3,
            max_apply_p99_ns: 100_000, // 100µs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = SessionMetrics::new();

        metrics.record_event_applied(500);
        metrics.record_event_applied(1500);
        metrics.record_event_rejected();
        metrics.record_informational();

        let exported = metrics.export();
        assert_eq!(exported["events_applied"], 2);
        assert_eq!(exported["events_rejected"], 1);
        assert_eq!(exported["informational_messages"], 1);
        assert_eq!(exported["apply_latency_avg_ns"], 1000);
    }

    #[test]
    fn test_latency_tracker_percentile() {
        let mut tracker = LatencyTracker::new(100);

        for i in 1..=100 {
            tracker.record(i);
        }

        let p50 = tracker.percentile(50).unwrap();
        assert!(p50 >= 49 && p50 <= 51);

        let p99 = tracker.percentile(99).unwrap();
        assert!(p99 >= 98 && p99 <= 100);
    }

    #[test]
    fn test_latency_tracker_window_eviction() {
        let mut tracker = LatencyTracker::new(3);

        tracker.record(10);
        tracker.record(20);
        tracker.record(30);
        tracker.record(40);

        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.average().unwrap(), 30);
    }

    #[test]
    fn test_alert_thresholds() {
        let metrics = SessionMetrics::new();
        let thresholds = AlertThresholds {
            max_events_rejected: 2,
            max_fetch_failures: 0,
            max_apply_p99_ns: 1_000_000,
        };

        assert!(metrics.check_thresholds(&thresholds).is_empty());

        for _ in 0..3 {
            metrics.record_event_rejected();
        }
        metrics.record_fetch_failure();

        let alerts = metrics.check_thresholds(&thresholds);
        assert!(alerts.iter().any(|a| a.metric == "events_rejected"));
        assert!(alerts
            .iter()
            .any(|a| a.metric == "fetch_failures" && a.level == AlertLevel::Critical));
    }
}
