//! Seams between the session controller and the remote service.
//!
//! `ApiClient` implements both traits over HTTP; tests swap in the mocks from
//! `testing`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::NetworkError;
use crate::models::{AnalysisReport, HistoryEntry, TurnOutcome};

/// Sends one negotiation turn with the full conversation so far.
#[async_trait]
pub trait NegotiationClient: Send + Sync {
    async fn submit_turn(
        &self,
        scenario: &str,
        history: &[HistoryEntry],
        current_leverage: f64,
        session_id: Option<&str>,
    ) -> Result<TurnOutcome, NetworkError>;
}

/// Retrieves the post-session report for a server-issued session id.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn fetch_analysis(&self, session_id: &str) -> Result<AnalysisReport, NetworkError>;
}

#[async_trait]
impl<T: NegotiationClient + ?Sized> NegotiationClient for Arc<T> {
    async fn submit_turn(
        &self,
        scenario: &str,
        history: &[HistoryEntry],
        current_leverage: f64,
        session_id: Option<&str>,
    ) -> Result<TurnOutcome, NetworkError> {
        (**self)
            .submit_turn(scenario, history, current_leverage, session_id)
            .await
    }
}

#[async_trait]
impl<T: AnalysisClient + ?Sized> AnalysisClient for Arc<T> {
    async fn fetch_analysis(&self, session_id: &str) -> Result<AnalysisReport, NetworkError> {
        (**self).fetch_analysis(session_id).await
    }
}
