//! Mock backend clients for controller tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::error::NetworkError;
use crate::models::{AnalysisPoint, AnalysisReport, HistoryEntry, Outcome, TurnOutcome};
use crate::traits::{AnalysisClient, NegotiationClient};

#[derive(Debug, Clone)]
pub struct RecordedTurn {
    pub scenario: String,
    pub history: Vec<HistoryEntry>,
    pub current_leverage: f64,
    pub session_id: Option<String>,
}

/// Negotiation client that answers from a queue.
///
/// A gated client parks every call until `release` is called, which lets tests
/// observe the controller while a turn is in flight.
pub struct MockNegotiationClient {
    responses: Mutex<VecDeque<Result<TurnOutcome, NetworkError>>>,
    requests: Mutex<Vec<RecordedTurn>>,
    gate: Option<Notify>,
    entered: Notify,
}

impl MockNegotiationClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            entered: Notify::new(),
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new()
        }
    }

    pub fn queue_outcome(&self, outcome: TurnOutcome) {
        self.responses.lock().unwrap().push_back(Ok(outcome));
    }

    pub fn queue_error(&self, error: NetworkError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Let one parked call continue.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Resolves once a call has reached the client.
    pub async fn wait_for_call(&self) {
        self.entered.notified().await;
    }

    pub fn recorded_requests(&self) -> Vec<RecordedTurn> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockNegotiationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NegotiationClient for MockNegotiationClient {
    async fn submit_turn(
        &self,
        scenario: &str,
        history: &[HistoryEntry],
        current_leverage: f64,
        session_id: Option<&str>,
    ) -> Result<TurnOutcome, NetworkError> {
        self.requests.lock().unwrap().push(RecordedTurn {
            scenario: scenario.to_string(),
            history: history.to_vec(),
            current_leverage,
            session_id: session_id.map(str::to_string),
        });
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NetworkError::Transport("No mock response queued".into())))
    }
}

/// Analysis client returning a fixed result and counting requests.
pub struct MockAnalysisClient {
    result: Result<AnalysisReport, NetworkError>,
    requests: Mutex<Vec<String>>,
}

impl MockAnalysisClient {
    pub fn returning(report: AnalysisReport) -> Self {
        Self {
            result: Ok(report),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: NetworkError) -> Self {
        Self {
            result: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_ids(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisClient for MockAnalysisClient {
    async fn fetch_analysis(&self, session_id: &str) -> Result<AnalysisReport, NetworkError> {
        self.requests.lock().unwrap().push(session_id.to_string());
        self.result.clone()
    }
}

pub fn outcome(reply: &str, new_leverage: f64, session_id: &str) -> TurnOutcome {
    TurnOutcome {
        reply: reply.to_string(),
        coach_tip: "Anchor on the value you delivered.".to_string(),
        new_leverage,
        new_mood: "neutral".to_string(),
        session_id: session_id.to_string(),
    }
}

pub fn sample_report() -> AnalysisReport {
    AnalysisReport {
        summary: "Opened strong, conceded too quickly at the end.".to_string(),
        outcome: Outcome::Other("Failure".to_string()),
        strengths: vec![AnalysisPoint {
            point: "Clear anchor".to_string(),
            explanation: "Named a concrete number first.".to_string(),
        }],
        mistakes: vec![AnalysisPoint {
            point: "Early concession".to_string(),
            explanation: "Dropped to 10% without getting anything back.".to_string(),
        }],
        skill_gaps: vec!["Trading concessions".to_string()],
        transcript_echo: None,
    }
}
