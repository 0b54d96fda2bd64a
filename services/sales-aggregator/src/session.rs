//! Dashboard session actor
//!
//! A session owns exactly one `AggregationEngine` and one `FeedHandle`.
//! After seeding from the baseline snapshot it is moved into a single tokio
//! task, the only writer of the state. That task interleaves feed messages
//! and read commands, so every read observes the state between whole
//! applies.
//!
//! Flow: start (snapshot) → spawn → feed/commands → shutdown (detach feed).

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{AggregationEngine, EngineConfig, EngineStats};
use crate::events::FeedMessage;
use crate::feed::FeedHandle;
use crate::metrics::SessionMetrics;
use crate::projector::DashboardView;
use crate::snapshot::{SnapshotLoader, SnapshotSource};
use crate::state::AggregateState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is no longer running")]
    Stopped,

    #[error("session task failed: {0}")]
    Join(String),
}

/// Requests served by the session task between applies.
#[derive(Debug)]
enum Command {
    View(oneshot::Sender<DashboardView>),
    State(oneshot::Sender<AggregateState>),
    Stats(oneshot::Sender<EngineStats>),
    /// Apply everything already queued on the feed, then reply.
    Drain(oneshot::Sender<usize>),
    Shutdown,
}

/// A seeded session, not yet running.
pub struct DashboardSession {
    engine: AggregationEngine,
    feed: FeedHandle,
    metrics: Arc<SessionMetrics>,
}

impl DashboardSession {
    /// Load the baseline and build the engine over it.
    ///
    /// A failed snapshot fetch starts the session empty; it never fails.
    pub async fn start(
        config: EngineConfig,
        source: &dyn SnapshotSource,
        feed: FeedHandle,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        let seed = SnapshotLoader::new(metrics.clone()).load(source).await;
        Self::with_engine(AggregationEngine::from_state(seed, config), feed, metrics)
    }

    pub fn with_engine(
        engine: AggregationEngine,
        feed: FeedHandle,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            engine,
            feed,
            metrics,
        }
    }

    /// Route one feed message. `new_sale` drives the engine; the other
    /// channels are informational.
    pub fn handle_message(&mut self, message: FeedMessage) {
        match message {
            FeedMessage::NewSale(raw) => {
                let started = Instant::now();
                match self.engine.ingest(&raw) {
                    Ok(_) => {
                        let latency_ns = started.elapsed().as_nanos() as u64;
                        self.metrics.record_event_applied(latency_ns);
                    }
                    Err(_) => self.metrics.record_event_rejected(),
                }
            }
            FeedMessage::Connected(payload) => {
                self.metrics.record_informational();
                info!(payload = %payload, "Feed connected");
            }
            FeedMessage::DataUpdate(payload) => {
                self.metrics.record_informational();
                debug!(payload = %payload, "Data update notice");
            }
        }
    }

    /// Handle every message already queued. Returns how many were handled.
    pub fn drain_feed(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.feed.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Move the session into its own task.
    ///
    /// `command_buffer` bounds the number of queued reads.
    pub fn spawn(self, command_buffer: usize) -> SessionHandle {
        let (tx, rx) = mpsc::channel(command_buffer.max(1));
        let metrics = self.metrics.clone();
        let task = tokio::spawn(self.run(rx));

        SessionHandle {
            commands: tx,
            task,
            metrics,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> AggregateState {
        info!("Dashboard session running");
        let mut feed_open = true;

        loop {
            tokio::select! {
                // commands win ties; a busy feed cannot starve shutdown
                biased;

                command = commands.recv() => match command {
                    Some(Command::View(reply)) => {
                        let _ = reply.send(self.engine.projector().dashboard());
                    }
                    Some(Command::State(reply)) => {
                        let _ = reply.send(self.engine.state().clone());
                    }
                    Some(Command::Stats(reply)) => {
                        let _ = reply.send(self.engine.stats());
                    }
                    Some(Command::Drain(reply)) => {
                        let _ = reply.send(self.drain_feed());
                    }
                    Some(Command::Shutdown) | None => break,
                },

                message = self.feed.recv(), if feed_open => match message {
                    Some(message) => self.handle_message(message),
                    None => {
                        feed_open = false;
                        warn!("Event feed ended, serving reads only");
                    }
                },
            }
        }

        self.feed.close();
        let stats = self.engine.stats();
        info!(
            events_applied = stats.events_applied,
            events_rejected = stats.events_rejected,
            "Dashboard session stopped"
        );
        self.engine.into_state()
    }
}

/// Client side of a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<AggregateState>,
    metrics: Arc<SessionMetrics>,
}

impl SessionHandle {
    /// Project the current state into renderer views.
    pub async fn dashboard(&self) -> Result<DashboardView, SessionError> {
        self.request(Command::View).await
    }

    /// Copy of the current aggregate state.
    pub async fn state(&self) -> Result<AggregateState, SessionError> {
        self.request(Command::State).await
    }

    pub async fn stats(&self) -> Result<EngineStats, SessionError> {
        self.request(Command::Stats).await
    }

    /// Wait until every message published so far has been handled.
    pub async fn drain(&self) -> Result<usize, SessionError> {
        self.request(Command::Drain).await
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    /// Detach the feed and stop the session, returning its final state.
    ///
    /// Once this returns no further event can reach the state.
    pub async fn shutdown(self) -> Result<AggregateState, SessionError> {
        if self.commands.send(Command::Shutdown).await.is_err() {
            debug!("Session already stopped before shutdown");
        }
        self.task
            .await
            .map_err(|err| SessionError::Join(err.to_string()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Stopped)?;
        rx.await.map_err(|_| SessionError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::events::RawSaleRecord;
    use crate::feed;
    use crate::snapshot::StaticSnapshotSource;
    use serde_json::json;
    use types::ids::RegionId;
    use types::numeric::Amount;

    fn sale(region: &str, amount: serde_json::Value) -> FeedMessage {
        FeedMessage::NewSale(RawSaleRecord {
            product: Some("Widget-A".to_string()),
            region: Some(region.to_string()),
            timestamp: Some("2025-01-01T10:00:00Z".to_string()),
            sales_amount: Some(amount),
            quantity_sold: Some(json!(1)),
        })
    }

    fn unreachable_backend() -> StaticSnapshotSource {
        StaticSnapshotSource::failing(FetchError::Transport {
            endpoint: "/dashboard-data".to_string(),
            message: "connection refused".to_string(),
        })
    }

    #[tokio::test]
    async fn test_handle_message_routes_by_channel() {
        let (_publisher, handle) = feed::channel();
        let metrics = Arc::new(SessionMetrics::new());
        let mut session =
            DashboardSession::with_engine(AggregationEngine::with_defaults(), handle, metrics.clone());

        session.handle_message(FeedMessage::Connected(json!({"status": "ok"})));
        session.handle_message(sale("North", json!(10)));
        session.handle_message(sale("North", json!("abc")));
        session.handle_message(FeedMessage::DataUpdate(json!({})));

        let exported = metrics.export();
        assert_eq!(exported["events_applied"], 1);
        assert_eq!(exported["events_rejected"], 1);
        assert_eq!(exported["informational_messages"], 2);
        assert_eq!(session.engine().state().total_sales, Amount::from_u64(10));
    }

    #[tokio::test]
    async fn test_session_applies_feed_and_serves_views() {
        let (publisher, handle) = feed::channel();
        let metrics = Arc::new(SessionMetrics::new());
        let session = DashboardSession::start(
            EngineConfig::default(),
            &unreachable_backend(),
            handle,
            metrics.clone(),
        )
        .await;
        let running = session.spawn(8);

        publisher.publish(sale("North", json!(100))).unwrap();
        publisher.publish(sale("South", json!("50.5"))).unwrap();
        running.drain().await.unwrap();

        let view = running.dashboard().await.unwrap();

        assert_eq!(view.kpis.recent_activity_count, 2);
        assert_eq!(view.kpis.total_sales_today, "150.50".parse().unwrap());
        assert_eq!(view.kpis.top_region, Some(RegionId::new("North")));
        assert_eq!(metrics.export()["fetch_failures"], 1);

        let state = running.shutdown().await.unwrap();
        assert_eq!(state.recent_feed.len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_later_events() {
        let (publisher, handle) = feed::channel();
        let metrics = Arc::new(SessionMetrics::new());
        let session =
            DashboardSession::with_engine(AggregationEngine::with_defaults(), handle, metrics);
        let running = session.spawn(4);

        let before = running.state().await.unwrap();
        let after = running.shutdown().await.unwrap();

        assert_eq!(before, after);
        assert!(publisher.publish(sale("North", json!(1))).is_err());
    }
}
