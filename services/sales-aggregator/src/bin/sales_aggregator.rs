use std::sync::Arc;

use anyhow::Context;
use sales_aggregator::api::{DashboardApi, SecondaryViews};
use sales_aggregator::config::SessionConfig;
use sales_aggregator::events::FeedMessage;
use sales_aggregator::feed;
use sales_aggregator::metrics::{AlertThresholds, SessionMetrics};
use sales_aggregator::projector::DashboardView;
use sales_aggregator::session::DashboardSession;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct Output<'a> {
    dashboard: &'a DashboardView,
    #[serde(flatten)]
    secondary: &'a SecondaryViews,
}

/// Reads `{"event": ..., "data": ...}` lines from stdin as the event feed.
/// On EOF or ctrl-c the session is shut down and the final dashboard is
/// printed to stdout as JSON.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = sales_aggregator::SERVICE_VERSION,
        types_version = types::LIB_VERSION,
        "Starting sales aggregator"
    );

    let config = SessionConfig::from_env();
    let metrics = Arc::new(SessionMetrics::new());
    let api = DashboardApi::new(&config).context("building HTTP client")?;

    let (publisher, handle) = feed::channel();
    let session =
        DashboardSession::start(config.engine_config(), &api, handle, metrics.clone()).await;
    let running = session.spawn(config.command_buffer);
    let secondary = SecondaryViews::load(&api, &metrics).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading event feed")? else {
                    tracing::info!("Event feed reached EOF");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match FeedMessage::from_json_line(&line) {
                    Ok(message) => {
                        if publisher.publish(message).is_err() {
                            tracing::warn!("Session feed closed, stopping input");
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "Skipping malformed feed line"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    let drained = running.drain().await?;
    tracing::debug!(drained, "Feed drained");
    let view = running.dashboard().await?;
    let state = running.shutdown().await?;

    for alert in metrics.check_thresholds(&AlertThresholds::default()) {
        tracing::warn!(metric = %alert.metric, level = ?alert.level, "{}", alert.message);
    }
    tracing::info!(
        checksum = %state.checksum(),
        metrics = ?metrics.export(),
        "Session finished"
    );

    let output = Output {
        dashboard: &view,
        secondary: &secondary,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
