//! Lobby phase definitions and transitions

use serde::{Deserialize, Serialize};

/// Phases a lobby cycles through during one round of the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Players type in their guesses and vote ready
    #[serde(rename = "GuessPhase")]
    Guess,
    /// Players watch and tick off their own guesses as they come true
    #[serde(rename = "WatchPhase")]
    Watch,
    /// Each player reviews the guesses of one assigned peer
    #[serde(rename = "ReviewPhase")]
    Review,
    /// Scores are tallied and shown
    #[serde(rename = "ResultPhase")]
    Result,
}

impl Phase {
    /// Get the next phase in the forward sequence, if any.
    ///
    /// `reset` is not part of the forward sequence; any phase may jump
    /// back to [`Phase::Guess`] through it.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Guess => Some(Phase::Watch),
            Phase::Watch => Some(Phase::Review),
            Phase::Review => Some(Phase::Result),
            Phase::Result => None,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &str {
        match self {
            Phase::Guess => "Players submitting guesses",
            Phase::Watch => "Players ticking guesses",
            Phase::Review => "Players reviewing assigned peers",
            Phase::Result => "Round complete",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Guess
    }
}
