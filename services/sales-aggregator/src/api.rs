//! HTTP client for the dashboard backend
//!
//! One-shot GETs against the backend, each wrapped in `{"data": ...}`:
//! - `/dashboard-data`: baseline snapshot (see `snapshot`)
//! - `/trends`: quarterly growth and alert strings
//! - `/insight-cards`: title/value pairs
//! - `/recommendations`: plain strings
//!
//! Every request is bounded by the configured timeout. Failures surface as
//! `FetchError`; `SecondaryViews::load` replaces them with empty defaults.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::numeric::Amount;

use crate::config::SessionConfig;
use crate::error::FetchError;
use crate::metrics::SessionMetrics;
use crate::snapshot::{DashboardSnapshot, SnapshotEnvelope, SnapshotSource};

pub const DASHBOARD_DATA_PATH: &str = "/dashboard-data";
pub const TRENDS_PATH: &str = "/trends";
pub const INSIGHT_CARDS_PATH: &str = "/insight-cards";
pub const RECOMMENDATIONS_PATH: &str = "/recommendations";

/// Sales for one quarter and its change over the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterGrowth {
    /// Quarter label, e.g. `2025Q1`.
    pub quarter: String,
    pub sales: Amount,
    /// Fractional change, 0 for the first quarter.
    #[serde(default)]
    pub growth: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendsView {
    #[serde(default)]
    pub quarterly_growth: Vec<QuarterGrowth>,
    #[serde(default)]
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightCard {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Client for the dashboard backend.
#[derive(Debug, Clone)]
pub struct DashboardApi {
    client: reqwest::Client,
    base_url: String,
}

impl DashboardApi {
    pub fn new(config: &SessionConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|err| FetchError::Transport {
                endpoint: config.api_url.clone(),
                message: err.to_string(),
            })?;

        info!(
            base_url = %config.api_url,
            timeout_ms = config.fetch_timeout_ms,
            "Dashboard API client ready"
        );

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn trends(&self) -> Result<TrendsView, FetchError> {
        self.get_data(TRENDS_PATH).await
    }

    pub async fn insight_cards(&self) -> Result<Vec<InsightCard>, FetchError> {
        self.get_data(INSIGHT_CARDS_PATH).await
    }

    pub async fn recommendations(&self) -> Result<Vec<String>, FetchError> {
        self.get_data(RECOMMENDATIONS_PATH).await
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let envelope: DataEnvelope<T> = self.get_json(path).await?;
        Ok(envelope.data)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| FetchError::Transport {
                endpoint: path.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|err| FetchError::Transport {
            endpoint: path.to_string(),
            message: err.to_string(),
        })?;

        serde_json::from_slice(&body).map_err(|err| FetchError::Decode {
            endpoint: path.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl SnapshotSource for DashboardApi {
    async fn fetch_snapshot(&self) -> Result<DashboardSnapshot, FetchError> {
        let envelope: SnapshotEnvelope = self.get_json(DASHBOARD_DATA_PATH).await?;
        Ok(envelope.data)
    }
}

/// Views fetched once alongside the baseline, independent of the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecondaryViews {
    pub trends: TrendsView,
    pub insight_cards: Vec<InsightCard>,
    pub recommendations: Vec<String>,
}

impl SecondaryViews {
    /// Fetch all three views concurrently. A failed view is left empty.
    pub async fn load(api: &DashboardApi, metrics: &SessionMetrics) -> Self {
        let (trends, insight_cards, recommendations) =
            tokio::join!(api.trends(), api.insight_cards(), api.recommendations());

        Self {
            trends: or_default(trends, metrics),
            insight_cards: or_default(insight_cards, metrics),
            recommendations: or_default(recommendations, metrics),
        }
    }
}

fn or_default<T: Default>(result: Result<T, FetchError>, metrics: &SessionMetrics) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            metrics.record_fetch_failure();
            warn!(error = %err, endpoint = err.endpoint(), "View unavailable, using empty default");
            T::default()
        }
    }
}
