use flume::{Receiver, Sender};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;

use super::clock::SessionClock;
use super::state::{
    AnalysisStatus, EndReason, NegotiationMetrics, SessionEvent, SessionPhase, SessionSnapshot,
    SessionState,
};
use crate::error::{ProtocolError, SessionError, ValidationError};
use crate::models::{AnalysisReport, HistoryEntry, TurnOutcome};
use crate::traits::{AnalysisClient, NegotiationClient};
use crate::transcript::Message;

/// Drives one rehearsal session against the negotiation backend.
///
/// Turns are strictly sequential: the turn gate admits one in-flight request
/// and `end` waits on the same gate, so no reply can land after the session
/// has started ending.
pub struct SessionController {
    scenario: String,
    negotiator: Arc<dyn NegotiationClient>,
    analyst: Arc<dyn AnalysisClient>,
    state: Arc<RwLock<SessionState>>,
    turn_gate: Arc<Mutex<()>>,
    event_tx: Sender<SessionEvent>,
}

struct PendingTurn {
    history: Vec<HistoryEntry>,
    leverage: f64,
    session_id: Option<String>,
}

/// Holds the turn gate while a request is outstanding.
///
/// If the caller drops the turn future before the reply is applied, the
/// phase goes back to `Idle` before the gate is released. The user message
/// stays, so the turn can be retried.
struct InFlightTurn {
    scenario: String,
    state: Arc<RwLock<SessionState>>,
    event_tx: Sender<SessionEvent>,
    gate: Option<OwnedMutexGuard<()>>,
}

impl InFlightTurn {
    fn new(controller: &SessionController, gate: OwnedMutexGuard<()>) -> Self {
        Self {
            scenario: controller.scenario.clone(),
            state: Arc::clone(&controller.state),
            event_tx: controller.event_tx.clone(),
            gate: Some(gate),
        }
    }

    /// The turn resolved normally; releases the gate without touching state.
    fn complete(mut self) {
        self.gate.take();
    }
}

impl Drop for InFlightTurn {
    fn drop(&mut self) {
        let Some(gate) = self.gate.take() else {
            return;
        };
        tracing::warn!(
            "Turn for '{}' abandoned before the backend replied",
            self.scenario
        );

        let reset_now = match self.state.try_write() {
            Ok(mut state) => {
                abandon_turn(&mut state, &self.event_tx);
                true
            }
            Err(_) => false,
        };
        if reset_now {
            return;
        }

        // A reader holds the lock; reset once it is free, still holding the gate.
        let state = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _gate = gate;
                let mut state = state.write().await;
                abandon_turn(&mut state, &event_tx);
            });
        }
    }
}

fn abandon_turn(state: &mut SessionState, event_tx: &Sender<SessionEvent>) {
    if state.phase == SessionPhase::AwaitingResponse {
        state.phase = SessionPhase::Idle;
        let _ = event_tx.send(SessionEvent::PhaseChanged(SessionPhase::Idle));
    }
}

impl SessionController {
    pub fn new(
        scenario: impl Into<String>,
        opening_message: &str,
        negotiator: Arc<dyn NegotiationClient>,
        analyst: Arc<dyn AnalysisClient>,
        event_tx: Sender<SessionEvent>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            negotiator,
            analyst,
            state: Arc::new(RwLock::new(SessionState::new(opening_message))),
            turn_gate: Arc::new(Mutex::new(())),
            event_tx,
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    pub async fn metrics(&self) -> NegotiationMetrics {
        self.state.read().await.metrics
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.read().await.session_id.clone()
    }

    /// Receives every message appended from now on.
    pub async fn subscribe_transcript(&self) -> Receiver<Message> {
        self.state.write().await.transcript.subscribe()
    }

    /// Append the user's message and send the whole conversation to the backend.
    ///
    /// Whitespace-only text is rejected before anything changes. A failed
    /// request keeps the user's message and leaves metrics untouched.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, SessionError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptySubmission.into());
        }

        let gate = Arc::clone(&self.turn_gate)
            .try_lock_owned()
            .map_err(|_| SessionError::TurnInFlight)?;

        let pending = {
            let mut state = self.state.write().await;
            if state.phase.is_closed() {
                return Err(SessionError::SessionClosed);
            }
            state.transcript.append(Message::user(text));
            state.phase = SessionPhase::AwaitingResponse;
            PendingTurn {
                history: state.transcript.history(),
                leverage: state.metrics.leverage,
                session_id: state.session_id.clone(),
            }
        };
        let turn = InFlightTurn::new(self, gate);
        self.emit(SessionEvent::PhaseChanged(SessionPhase::AwaitingResponse));

        self.run_turn(pending, turn).await
    }

    /// Resend the conversation when the last user message never got a reply.
    pub async fn retry_last_turn(&self) -> Result<TurnOutcome, SessionError> {
        let gate = Arc::clone(&self.turn_gate)
            .try_lock_owned()
            .map_err(|_| SessionError::TurnInFlight)?;

        let pending = {
            let mut state = self.state.write().await;
            if state.phase.is_closed() {
                return Err(SessionError::SessionClosed);
            }
            if !state.has_unanswered_message() {
                return Err(SessionError::NothingToRetry);
            }
            state.phase = SessionPhase::AwaitingResponse;
            PendingTurn {
                history: state.transcript.history(),
                leverage: state.metrics.leverage,
                session_id: state.session_id.clone(),
            }
        };
        let turn = InFlightTurn::new(self, gate);
        self.emit(SessionEvent::PhaseChanged(SessionPhase::AwaitingResponse));
        tracing::info!("Retrying unanswered turn for '{}'", self.scenario);

        self.run_turn(pending, turn).await
    }

    async fn run_turn(
        &self,
        pending: PendingTurn,
        turn: InFlightTurn,
    ) -> Result<TurnOutcome, SessionError> {
        let result = self
            .negotiator
            .submit_turn(
                &self.scenario,
                &pending.history,
                pending.leverage,
                pending.session_id.as_deref(),
            )
            .await;

        let mut state = self.state.write().await;
        if state.phase == SessionPhase::AwaitingResponse {
            state.phase = SessionPhase::Idle;
        }
        turn.complete();

        match result {
            Ok(outcome) => {
                let reply = Message::counterpart(outcome.reply.clone());
                state.transcript.append(reply.clone());
                state.metrics = state.metrics.after_turn(outcome.new_leverage);
                if let Some(previous) = state.session_id.as_deref() {
                    if previous != outcome.session_id {
                        tracing::warn!(
                            "Backend replaced session id {} with {}",
                            previous,
                            outcome.session_id
                        );
                    }
                }
                state.session_id = Some(outcome.session_id.clone());
                state.coach_tip = Some(outcome.coach_tip.clone());
                state.mood = Some(outcome.new_mood.clone());

                let metrics = state.metrics;
                let phase = state.phase;
                drop(state);

                tracing::info!(
                    "Turn complete (session {}, leverage {:.2}, patience {:.2})",
                    outcome.session_id,
                    metrics.leverage,
                    metrics.patience
                );
                self.emit(SessionEvent::TurnCompleted {
                    reply,
                    metrics,
                    coach_tip: outcome.coach_tip.clone(),
                    mood: outcome.new_mood.clone(),
                });
                self.emit(SessionEvent::PhaseChanged(phase));
                Ok(outcome)
            }
            Err(error) => {
                let phase = state.phase;
                drop(state);

                tracing::warn!("Turn failed for '{}': {}", self.scenario, error);
                self.emit(SessionEvent::TurnFailed(error.clone()));
                self.emit(SessionEvent::PhaseChanged(phase));
                Err(error.into())
            }
        }
    }

    /// Move to `Ending`, first waiting for any in-flight turn to resolve.
    pub async fn end(&self, reason: EndReason) -> Result<(), SessionError> {
        let _turn = self.turn_gate.lock().await;

        let mut state = self.state.write().await;
        if state.phase.is_closed() {
            return Err(SessionError::SessionClosed);
        }
        state.phase = SessionPhase::Ending;
        state.end_reason = Some(reason);
        let message_count = state.transcript.count();
        drop(state);

        tracing::info!(
            "Session '{}' ending ({:?}, {} messages)",
            self.scenario,
            reason,
            message_count
        );
        self.emit(SessionEvent::Ended(reason));
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Ending));
        Ok(())
    }

    /// Fetch the analysis and move to `Terminated`.
    ///
    /// An open session is ended first. Without a session id no request is
    /// made and the analysis is marked not attempted. Calling this again on a
    /// terminated session returns the stored status.
    pub async fn finish(&self) -> AnalysisStatus {
        if !self.phase().await.is_closed() {
            if let Err(error) = self.end(EndReason::User).await {
                tracing::debug!("Session already ending: {}", error);
            }
        }

        let _turn = self.turn_gate.lock().await;
        let session_id = {
            let state = self.state.read().await;
            if state.phase == SessionPhase::Terminated {
                return state.analysis.clone();
            }
            state.session_id.clone()
        };

        let status = match session_id {
            None => {
                tracing::info!(
                    "Session '{}' ended before the backend assigned an id; skipping analysis",
                    self.scenario
                );
                AnalysisStatus::NotAttempted
            }
            Some(session_id) => match self.analyst.fetch_analysis(&session_id).await {
                Ok(report) => AnalysisStatus::Ready(report),
                Err(error) => {
                    tracing::warn!("Analysis for session {} failed: {}", session_id, error);
                    AnalysisStatus::Failed(error)
                }
            },
        };

        {
            let mut state = self.state.write().await;
            state.analysis = status.clone();
            state.phase = SessionPhase::Terminated;
        }
        self.emit(SessionEvent::AnalysisUpdated(status.clone()));
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Terminated));
        status
    }

    /// Request the analysis again, e.g. after a failed or slow first attempt.
    pub async fn fetch_analysis(&self) -> Result<AnalysisReport, SessionError> {
        let (phase, session_id) = {
            let state = self.state.read().await;
            (state.phase, state.session_id.clone())
        };
        if !phase.is_closed() {
            return Err(SessionError::StillOpen);
        }
        let session_id = session_id.ok_or(ProtocolError::MissingSessionIdentity)?;

        let result = self.analyst.fetch_analysis(&session_id).await;
        let status = match &result {
            Ok(report) => AnalysisStatus::Ready(report.clone()),
            Err(error) => AnalysisStatus::Failed(error.clone()),
        };

        let mut state = self.state.write().await;
        if state.phase == SessionPhase::Terminated {
            state.analysis = status.clone();
            drop(state);
            self.emit(SessionEvent::AnalysisUpdated(status));
        }

        result.map_err(SessionError::from)
    }

    /// Run the session countdown in the background.
    ///
    /// Expiry is announced with `SessionEvent::TimeExpired`; with `enforce`
    /// set it also ends the session exactly as a user would. The countdown
    /// never fetches the analysis itself.
    pub fn spawn_countdown(self: &Arc<Self>, clock: SessionClock, enforce: bool) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(clock.deadline()).await;
            if controller.phase().await.is_closed() {
                return;
            }

            tracing::info!("Session clock for '{}' expired", controller.scenario);
            controller.emit(SessionEvent::TimeExpired);
            if enforce {
                if let Err(error) = controller.end(EndReason::TimeExpired).await {
                    tracing::debug!("Countdown could not end session: {}", error);
                }
            }
        })
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
