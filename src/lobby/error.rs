use crate::game::{ReviewAssignmentError, TransitionError};

/// Failure taxonomy for lobby operations.
///
/// Wrong-phase and wrong-actor conditions never surface here; the state
/// machine swallows those as silent no-ops. What remains is: a referenced
/// entity that does not exist where one was required, a broken invariant
/// that must fail loudly, and collaborator failures passed through.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("broadcast error: {0}")]
    Broadcast(String),
}

impl From<TransitionError> for LobbyError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::PlayerNotFound(_) => LobbyError::NotFound("player"),
        }
    }
}

impl From<ReviewAssignmentError> for LobbyError {
    fn from(err: ReviewAssignmentError) -> Self {
        LobbyError::InvariantViolation(err.to_string())
    }
}
