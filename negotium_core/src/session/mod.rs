//! Negotiation session state machine
//!
//! `Idle -> AwaitingResponse -> Idle ... -> Ending -> Terminated`

pub mod clock;
mod controller;
pub mod state;

pub use clock::{format_countdown, SessionClock};
pub use controller::SessionController;
pub use state::{
    percent, AnalysisStatus, EndReason, NegotiationMetrics, SessionEvent, SessionPhase,
    SessionSnapshot, INITIAL_LEVERAGE, INITIAL_PATIENCE, PATIENCE_DECAY,
};
