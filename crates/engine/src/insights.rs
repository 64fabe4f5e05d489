// Client for the external AI insights service.
//
// `POST {base}/ai/insights` with the draft's content features; the
// response's recommendations and engagement confidence become
// `AiSuggestion` entries. The endpoint and its schema are owned by the
// external service — this module is only the input/output contract.
//
// Requests never run on the engine's event loop: `spawn_fetch` performs
// the call on a background task and forwards results into the inbound
// queue, so remote changes keep applying while a request is outstanding.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use draftsync_common::types::{AiSuggestion, SuggestionCategory};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::InsightsConfig;
use crate::engine::EngineEvent;

/// Analyzed features of the draft content sent to the insights service.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentFeatures {
    pub text: String,
    pub sentiment: f64,
    pub readability: f64,
    pub urgency: f64,
    pub call_to_action: bool,
    pub trending_topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// Request body for `POST /ai/insights`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightsRequest {
    pub content: ContentFeatures,
    pub platform: String,
    pub audience_data: serde_json::Value,
    pub historical_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightsResponse {
    recommendations: Vec<Recommendation>,
    engagement_confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recommendation {
    category: SuggestionCategory,
    title: String,
    description: String,
    #[serde(default)]
    payload: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InsightsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl InsightsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid insights base url: {base_url}"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build insights http client")?;
        Ok(Self { http, base_url })
    }

    /// Build from the global config. `Ok(None)` when no base URL is
    /// configured — suggestions are simply unavailable then.
    pub fn from_config(config: &InsightsConfig) -> Result<Option<Self>> {
        let Some(base_url) = config.base_url.as_deref() else {
            return Ok(None);
        };
        Ok(Some(Self::new(base_url, Duration::from_secs(config.timeout_secs))?))
    }

    /// Fetch suggestions for a draft.
    ///
    /// Every returned suggestion carries the response-level engagement
    /// confidence (clamped to [0, 1]) and starts unapplied.
    pub async fn fetch_suggestions(&self, request: &InsightsRequest) -> Result<Vec<AiSuggestion>> {
        let url = self
            .base_url
            .join("ai/insights")
            .context("failed to build insights endpoint url")?;

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .context("insights request failed to send")?
            .error_for_status()
            .context("insights service returned an error status")?;

        let body: InsightsResponse =
            response.json().await.context("failed to decode insights response")?;

        let confidence = body.engagement_confidence.clamp(0.0, 1.0);
        debug!(
            recommendations = body.recommendations.len(),
            confidence, "insights response received"
        );

        Ok(body
            .recommendations
            .into_iter()
            .map(|recommendation| AiSuggestion {
                id: Uuid::new_v4(),
                category: recommendation.category,
                title: recommendation.title,
                description: recommendation.description,
                payload: recommendation.payload.unwrap_or_default(),
                confidence,
                applied: false,
            })
            .collect())
    }
}

/// Run an insights request in the background and deliver the resulting
/// suggestions to the engine's inbound queue.
///
/// Failures are logged and swallowed: suggestion generation is advisory
/// and must never disturb the editing session.
pub fn spawn_fetch(
    client: InsightsClient,
    session_id: Uuid,
    request: InsightsRequest,
    inbound: mpsc::UnboundedSender<EngineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match client.fetch_suggestions(&request).await {
            Ok(suggestions) => {
                if inbound.send(EngineEvent::SuggestionsReady { session_id, suggestions }).is_err()
                {
                    debug!(%session_id, "engine loop gone, dropping insights result");
                }
            }
            Err(error) => warn!(%session_id, %error, "insights request failed"),
        }
    })
}
