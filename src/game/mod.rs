//! Core game logic: the lobby phase state machine and review assignment.

pub mod phase;
pub mod review;
pub mod transition;
pub mod types;


pub use phase::Phase;
pub use review::{assign_reviewers, ReviewAssignment, ReviewAssignmentError};
pub use transition::{apply, Effect, LobbyEvent, Transition, TransitionError};
pub use types::{Guess, Lobby, Player};
