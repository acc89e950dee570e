//! Session state types

use crate::error::NetworkError;
use crate::models::AnalysisReport;
use crate::transcript::{Message, Transcript};

pub const INITIAL_LEVERAGE: f64 = 0.5;
pub const INITIAL_PATIENCE: f64 = 0.8;
/// Patience lost per answered turn.
pub const PATIENCE_DECAY: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingResponse,
    Ending,
    Terminated,
}

impl SessionPhase {
    pub fn is_closed(self) -> bool {
        matches!(self, SessionPhase::Ending | SessionPhase::Terminated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegotiationMetrics {
    /// Server-computed; stored as received, even outside [0, 1].
    pub leverage: f64,
    /// Local heuristic, never below zero.
    pub patience: f64,
}

impl Default for NegotiationMetrics {
    fn default() -> Self {
        Self {
            leverage: INITIAL_LEVERAGE,
            patience: INITIAL_PATIENCE,
        }
    }
}

impl NegotiationMetrics {
    pub fn after_turn(self, new_leverage: f64) -> Self {
        Self {
            leverage: new_leverage,
            patience: (self.patience - PATIENCE_DECAY).max(0.0),
        }
    }
}

/// Whole-number percentage shown next to a metric bar.
pub fn percent(value: f64) -> i64 {
    (value * 100.0).floor() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    User,
    TimeExpired,
}

/// What happened to the post-session analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisStatus {
    /// Session still open, or ending and not yet fetched
    Pending,
    /// Ended before the server ever issued a session id
    NotAttempted,
    Ready(AnalysisReport),
    Failed(NetworkError),
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    /// A reply arrived; message and metrics belong to the same turn.
    TurnCompleted {
        reply: Message,
        metrics: NegotiationMetrics,
        coach_tip: String,
        mood: String,
    },
    TurnFailed(NetworkError),
    TimeExpired,
    Ended(EndReason),
    AnalysisUpdated(AnalysisStatus),
}

pub(crate) struct SessionState {
    pub phase: SessionPhase,
    pub transcript: Transcript,
    pub metrics: NegotiationMetrics,
    pub session_id: Option<String>,
    pub coach_tip: Option<String>,
    pub mood: Option<String>,
    pub end_reason: Option<EndReason>,
    pub analysis: AnalysisStatus,
}

impl SessionState {
    pub fn new(opening_message: &str) -> Self {
        Self {
            phase: SessionPhase::Idle,
            transcript: Transcript::with_opening(opening_message),
            metrics: NegotiationMetrics::default(),
            session_id: None,
            coach_tip: None,
            mood: None,
            end_reason: None,
            analysis: AnalysisStatus::Pending,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            messages: self.transcript.all().to_vec(),
            metrics: self.metrics,
            session_id: self.session_id.clone(),
            coach_tip: self.coach_tip.clone(),
            mood: self.mood.clone(),
            end_reason: self.end_reason,
            analysis: self.analysis.clone(),
        }
    }

    /// True when the newest message is the user's and nothing answered it.
    pub fn has_unanswered_message(&self) -> bool {
        self.transcript.last().map(Message::is_user).unwrap_or(false)
    }
}

/// Consistent copy of a session taken under one read lock.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub messages: Vec<Message>,
    pub metrics: NegotiationMetrics,
    pub session_id: Option<String>,
    pub coach_tip: Option<String>,
    pub mood: Option<String>,
    pub end_reason: Option<EndReason>,
    pub analysis: AnalysisStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patience_decays_and_floors_at_zero() {
        let metrics = NegotiationMetrics::default().after_turn(0.55);
        assert_eq!(metrics.leverage, 0.55);
        assert!((metrics.patience - 0.75).abs() < 1e-9);

        let worn_out = NegotiationMetrics {
            leverage: 0.3,
            patience: 0.02,
        }
        .after_turn(0.3);
        assert_eq!(worn_out.patience, 0.0);
    }

    #[test]
    fn leverage_is_never_clamped() {
        let metrics = NegotiationMetrics::default().after_turn(1.7);
        assert_eq!(metrics.leverage, 1.7);
        let metrics = metrics.after_turn(-0.2);
        assert_eq!(metrics.leverage, -0.2);
    }

    #[test]
    fn percent_truncates_like_the_metric_pills() {
        assert_eq!(percent(0.5), 50);
        assert_eq!(percent(0.755), 75);
        assert_eq!(percent(0.0), 0);
    }

    #[test]
    fn fresh_state_has_only_the_opening_line() {
        let state = SessionState::new("Hello.");
        assert_eq!(state.phase, SessionPhase::Idle);
        assert_eq!(state.transcript.count(), 1);
        assert!(!state.has_unanswered_message());
        assert!(state.session_id.is_none());
        assert_eq!(state.analysis, AnalysisStatus::Pending);
    }
}
