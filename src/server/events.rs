//! Wire protocol: one explicit tagged payload type per event.
//!
//! Frames are JSON envelopes `{"event": "...", "data": {...}}` with
//! kebab-case event names. Inbound payloads carry plain player names; the
//! one exception is `accept-guess`, whose target is a nested
//! `{owner, guess}` pair because acceptance addresses another player's
//! guess.

use serde::{Deserialize, Serialize};

use crate::game::{Lobby, LobbyEvent, ReviewAssignment};
use crate::lobby::RoomMessage;

/// Events a client may send over the socket.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinGame {
        #[serde(rename = "lobbyName")]
        lobby_name: String,
        name: String,
        color: String,
    },
    FetchGame,
    SubmitGuess {
        name: String,
        guess: String,
    },
    DeleteGuess {
        name: String,
        guess: String,
    },
    TickGuess {
        name: String,
        guess: String,
    },
    PlayerReady {
        name: String,
    },
    PlayerUnready {
        name: String,
    },
    EndWatchPhase,
    AcceptGuess {
        guess: AcceptTarget,
    },
    PlayerReviewed {
        name: String,
    },
    ResetGame,
}

/// Target of an `accept-guess` event: another player's guess.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AcceptTarget {
    pub owner: String,
    pub guess: String,
}

impl ClientEvent {
    /// Translate a wire event into a state-machine event.
    ///
    /// `JoinGame` and `FetchGame` are session-level concerns handled by the
    /// socket loop itself and have no state-machine counterpart.
    pub fn into_lobby_event(self) -> Option<LobbyEvent> {
        match self {
            ClientEvent::JoinGame { .. } | ClientEvent::FetchGame => None,
            ClientEvent::SubmitGuess { name, guess } => Some(LobbyEvent::SubmitGuess {
                player: name,
                text: guess,
            }),
            ClientEvent::DeleteGuess { name, guess } => Some(LobbyEvent::DeleteGuess {
                player: name,
                text: guess,
            }),
            ClientEvent::TickGuess { name, guess } => Some(LobbyEvent::TickGuess {
                player: name,
                text: guess,
            }),
            ClientEvent::PlayerReady { name } => Some(LobbyEvent::SetReady {
                player: name,
                ready: true,
            }),
            ClientEvent::PlayerUnready { name } => Some(LobbyEvent::SetReady {
                player: name,
                ready: false,
            }),
            ClientEvent::EndWatchPhase => Some(LobbyEvent::EndWatchPhase),
            ClientEvent::AcceptGuess { guess } => Some(LobbyEvent::ToggleAccept {
                owner: guess.owner,
                text: guess.guess,
            }),
            ClientEvent::PlayerReviewed { name } => Some(LobbyEvent::MarkReviewed { player: name }),
            ClientEvent::ResetGame => Some(LobbyEvent::Reset),
        }
    }
}

/// Events the server pushes to a lobby's room.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    GameState(Lobby),
    ReviewInfo(ReviewAssignment),
}

impl From<RoomMessage> for ServerEvent {
    fn from(message: RoomMessage) -> Self {
        match message {
            RoomMessage::State(snapshot) => ServerEvent::GameState(snapshot),
            RoomMessage::ReviewAssignment(assignment) => ServerEvent::ReviewInfo(assignment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Player;
    use uuid::Uuid;

    #[test]
    fn join_game_frame_parses() {
        let frame = r##"{"event":"join-game","data":{"lobbyName":"quiz","name":"ana","color":"#f00"}}"##;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinGame {
                lobby_name: "quiz".into(),
                name: "ana".into(),
                color: "#f00".into(),
            }
        );
    }

    #[test]
    fn accept_guess_frame_parses_nested_target() {
        let frame =
            r#"{"event":"accept-guess","data":{"guess":{"owner":"bo","guess":"rain starts"}}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(
            event.into_lobby_event(),
            Some(LobbyEvent::ToggleAccept {
                owner: "bo".into(),
                text: "rain starts".into(),
            })
        );
    }

    #[test]
    fn dataless_frames_parse_as_unit_events() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"end-watch-phase"}"#).unwrap();
        assert_eq!(event, ClientEvent::EndWatchPhase);
        let event: ClientEvent = serde_json::from_str(r#"{"event":"reset-game"}"#).unwrap();
        assert_eq!(event.into_lobby_event(), Some(LobbyEvent::Reset));
    }

    #[test]
    fn game_state_serializes_with_envelope() {
        let lobby = Lobby::new("quiz", Player::new("ana", Uuid::nil(), "#f00"));
        let json = serde_json::to_value(ServerEvent::GameState(lobby)).unwrap();
        assert_eq!(json["event"], "game-state");
        assert_eq!(json["data"]["lobbyName"], "quiz");
    }
}
