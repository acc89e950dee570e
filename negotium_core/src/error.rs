//! Error types for the negotiation core.

use thiserror::Error;

/// Failure talking to the negotiation backend.
///
/// Causes are kept as text so the error can be cloned into session snapshots
/// and events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// The configured backend address could not be turned into a request URL
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    /// Connection, TLS, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(String),
    /// Server answered with a non-success status
    #[error("server returned {status}: {body}")]
    BadStatus { status: u16, body: String },
    /// Body did not match the expected payload shape
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl NetworkError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Transport failures and 5xx answers may succeed when sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::BadStatus { status, .. } => *status >= 500,
            Self::InvalidEndpoint { .. } | Self::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Transport(format!("request timed out: {}", error))
        } else {
            Self::Transport(error.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message is empty")]
    EmptySubmission,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("no session identity has been assigned yet; analysis is unavailable")]
    MissingSessionIdentity,
}

/// Everything a session controller operation can report back to its caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("a turn is already awaiting the counterpart's reply")]
    TurnInFlight,
    #[error("the session has ended")]
    SessionClosed,
    #[error("the session must end before its analysis is requested")]
    StillOpen,
    #[error("there is no unanswered message to retry")]
    NothingToRetry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_retryable_errors() {
        assert!(NetworkError::Transport("reset".into()).is_retryable());
        assert!(NetworkError::BadStatus {
            status: 503,
            body: "busy".into()
        }
        .is_retryable());
        assert!(!NetworkError::BadStatus {
            status: 404,
            body: "Session not found".into()
        }
        .is_retryable());
        assert!(!NetworkError::Parse("missing field".into()).is_retryable());
    }

    #[test]
    fn not_found_only_matches_404() {
        let missing = NetworkError::BadStatus {
            status: 404,
            body: "{\"detail\":\"Session not found\"}".into(),
        };
        assert!(missing.is_not_found());
        assert_eq!(missing.status(), Some(404));
        assert!(!NetworkError::Transport("refused".into()).is_not_found());
    }

    #[test]
    fn session_error_wraps_network_error_message() {
        let err = SessionError::from(NetworkError::BadStatus {
            status: 400,
            body: "Invalid ID".into(),
        });
        assert_eq!(err.to_string(), "server returned 400: Invalid ID");
    }
}
