//! Lobby aggregate types.
//!
//! Field names on the wire follow the established client protocol
//! (`lobbyName`, `vote_status`, ...), so several fields carry explicit
//! serde renames rather than a blanket rename_all.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase::Phase;

/// A single guess, owned by exactly one player.
///
/// `ticked` and `accepted` are independent: the owner ticks a guess
/// during the watch phase, the reviewer accepts it during review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    pub guess: String,
    pub ticked: bool,
    pub accepted: bool,
}

impl Guess {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            guess: text.into(),
            ticked: false,
            accepted: false,
        }
    }
}

/// A lobby member. Identified by `name`, which is unique within a lobby.
///
/// `session` is the transport session currently attached to this player.
/// It changes across reconnects and is never part of identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    #[serde(rename = "socketId")]
    pub session: Uuid,
    pub color: String,
    pub guesses: Vec<Guess>,
    #[serde(rename = "vote_status")]
    pub ready: bool,
    pub reviewed: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, session: Uuid, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session,
            color: color.into(),
            guesses: Vec::new(),
            ready: false,
            reviewed: false,
        }
    }

    pub fn guess(&self, text: &str) -> Option<&Guess> {
        self.guesses.iter().find(|g| g.guess == text)
    }

    pub fn guess_mut(&mut self, text: &str) -> Option<&mut Guess> {
        self.guesses.iter_mut().find(|g| g.guess == text)
    }
}

/// The full lobby aggregate: roster plus current phase.
///
/// This is the unit the state machine reads and writes, and the snapshot
/// that gets broadcast to every member after each mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lobby {
    #[serde(rename = "lobbyName")]
    pub name: String,
    #[serde(rename = "lobbyOwner")]
    pub owner: String,
    pub phase: Phase,
    pub players: Vec<Player>,
}

impl Lobby {
    /// A fresh lobby with its creator as owner and sole member.
    pub fn new(name: impl Into<String>, creator: Player) -> Self {
        Self {
            name: name.into(),
            owner: creator.name.clone(),
            phase: Phase::Guess,
            players: vec![creator],
        }
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn contains_player(&self, name: &str) -> bool {
        self.player(name).is_some()
    }
}
