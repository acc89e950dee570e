use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::NetworkError;
use crate::http_client::build_http_client_with_timeout;
use crate::models::{
    AnalysisPayload, AnalysisReport, HistoryEntry, NegotiateRequest, NegotiateResponse,
    SessionListing, TurnOutcome,
};
use crate::traits::{AnalysisClient, NegotiationClient};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

const PAYLOAD_PREVIEW_CHARS: usize = 500;

/// HTTP client for the negotiation backend.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn from_config(config: &ClientConfig) -> Result<Self, NetworkError> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, NetworkError> {
        let normalized = normalize_base_url(base_url);
        let parsed = Url::parse(&normalized).map_err(|e| NetworkError::InvalidEndpoint {
            url: normalized.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(NetworkError::InvalidEndpoint {
                url: normalized,
                reason: "expected an http(s) base address".to_string(),
            });
        }

        Ok(Self {
            http: build_http_client_with_timeout(timeout)?,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Recent sessions stored by the backend, newest first.
    pub async fn list_sessions(&self, limit: usize) -> Result<SessionListing, NetworkError> {
        let url = self.endpoint(&["sessions"])?;
        tracing::debug!("GET {} (limit {})", url, limit);

        let response = self.http.get(url).query(&[("limit", limit)]).send().await?;
        read_json::<SessionListing>(response, "session list").await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, NetworkError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| NetworkError::InvalidEndpoint {
                url: self.base_url.to_string(),
                reason: "base address cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl NegotiationClient for ApiClient {
    async fn submit_turn(
        &self,
        scenario: &str,
        history: &[HistoryEntry],
        current_leverage: f64,
        session_id: Option<&str>,
    ) -> Result<TurnOutcome, NetworkError> {
        let url = self.endpoint(&["negotiate"])?;
        tracing::debug!(
            "POST {} (history: {} messages, session: {:?})",
            url,
            history.len(),
            session_id
        );

        let request = NegotiateRequest {
            scenario,
            history,
            current_leverage,
            session_id,
        };
        let response = self.http.post(url).json(&request).send().await?;
        let decoded = read_json::<NegotiateResponse>(response, "negotiation response").await?;
        Ok(decoded.into())
    }
}

#[async_trait]
impl AnalysisClient for ApiClient {
    async fn fetch_analysis(&self, session_id: &str) -> Result<AnalysisReport, NetworkError> {
        let url = self.endpoint(&["analyze", session_id])?;
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let payload = read_json::<AnalysisPayload>(response, "analysis").await?;
        Ok(payload.into())
    }
}

/// Non-success statuses keep their raw body and are never decoded.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, NetworkError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::warn!("Backend returned {} for {}: {}", status, what, body);
        return Err(NetworkError::BadStatus {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await?;
    serde_json::from_str::<T>(&body).map_err(|e| {
        NetworkError::Parse(format!(
            "failed to decode {}: {}. Payload preview: {}",
            what,
            e,
            body.chars().take(PAYLOAD_PREVIEW_CHARS).collect::<String>()
        ))
    })
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_BACKEND_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
