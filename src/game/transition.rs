//! Pure lobby state machine.
//!
//! Every mutating operation is expressed as a [`LobbyEvent`] applied to a
//! loaded [`Lobby`] aggregate through [`apply`]. The function never touches
//! storage or the network; it returns either an updated aggregate plus the
//! effects the caller must run, or [`Transition::Unchanged`] when the event
//! is not legal in the current phase.
//!
//! Phase and actor preconditions deliberately fail *silently*: an operation
//! attempted in the wrong phase, or a tick from a session that does not own
//! the guess, is a no-op that must not error, mutate, or broadcast. Only a
//! reference to a player that does not exist at all is reported back as an
//! error, so the caller can tell "target missing" apart from "target exists
//! but the action is disallowed".

use thiserror::Error;

use super::phase::Phase;
use super::types::{Guess, Lobby};

/// One inbound lobby operation, with its phase-specific payload.
///
/// The acting player is passed to [`apply`] separately: events name the
/// player they *target*, which for everything except `TickGuess` is also
/// the actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LobbyEvent {
    /// Append a new unticked, unaccepted guess for `player`.
    SubmitGuess { player: String, text: String },
    /// Remove `player`'s first guess matching `text` exactly.
    DeleteGuess { player: String, text: String },
    /// Flip the `ticked` marker on `player`'s guess. Owner only.
    TickGuess { player: String, text: String },
    /// Set `player`'s ready flag; unanimity advances to the watch phase.
    SetReady { player: String, ready: bool },
    /// Move to the review phase and request a fresh review assignment.
    EndWatchPhase,
    /// Flip the `accepted` marker on `owner`'s guess matching `text`.
    ToggleAccept { owner: String, text: String },
    /// Set `player`'s reviewed flag; unanimity advances to results.
    MarkReviewed { player: String },
    /// Back to the guess phase with all guesses and flags cleared.
    Reset,
}

/// Side effects the service must run after persisting an updated lobby.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Broadcast the post-mutation snapshot to the lobby's room.
    PublishState,
    /// Run the review assignment algorithm and publish its result.
    AssignReviews,
}

/// Outcome of applying one event to a lobby aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Updated { lobby: Lobby, effects: Vec<Effect> },
    Unchanged,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("player {0:?} not found in lobby")]
    PlayerNotFound(String),
}

/// Apply `event` to `lobby` on behalf of `actor` (the player name the
/// calling session is bound to).
pub fn apply(
    lobby: &Lobby,
    actor: &str,
    event: &LobbyEvent,
) -> Result<Transition, TransitionError> {
    match event {
        LobbyEvent::SubmitGuess { player, text } => submit_guess(lobby, player, text),
        LobbyEvent::DeleteGuess { player, text } => delete_guess(lobby, player, text),
        LobbyEvent::TickGuess { player, text } => tick_guess(lobby, actor, player, text),
        LobbyEvent::SetReady { player, ready } => set_ready(lobby, player, *ready),
        LobbyEvent::EndWatchPhase => end_watch_phase(lobby),
        LobbyEvent::ToggleAccept { owner, text } => toggle_accept(lobby, owner, text),
        LobbyEvent::MarkReviewed { player } => mark_reviewed(lobby, player),
        LobbyEvent::Reset => Ok(reset(lobby)),
    }
}

fn submit_guess(lobby: &Lobby, player: &str, text: &str) -> Result<Transition, TransitionError> {
    if lobby.phase != Phase::Guess {
        return Ok(Transition::Unchanged);
    }
    require_player(lobby, player)?;
    let mut updated = lobby.clone();
    let member = updated
        .player_mut(player)
        .expect("player existence checked above");
    if member.ready {
        return Ok(Transition::Unchanged);
    }
    member.guesses.push(Guess::new(text));
    Ok(updated_state(updated))
}

fn delete_guess(lobby: &Lobby, player: &str, text: &str) -> Result<Transition, TransitionError> {
    if lobby.phase != Phase::Guess {
        return Ok(Transition::Unchanged);
    }
    let member = require_player(lobby, player)?;
    if member.ready {
        return Ok(Transition::Unchanged);
    }
    // First exact-text match only; a duplicate submission keeps its siblings.
    let Some(index) = member.guesses.iter().position(|g| g.guess == text) else {
        return Ok(Transition::Unchanged);
    };
    let mut updated = lobby.clone();
    updated
        .player_mut(player)
        .expect("player existence checked above")
        .guesses
        .remove(index);
    Ok(updated_state(updated))
}

fn tick_guess(
    lobby: &Lobby,
    actor: &str,
    player: &str,
    text: &str,
) -> Result<Transition, TransitionError> {
    if lobby.phase != Phase::Watch {
        return Ok(Transition::Unchanged);
    }
    // Only the guess's own owner may tick it.
    if actor != player {
        return Ok(Transition::Unchanged);
    }
    let member = require_player(lobby, player)?;
    if member.guess(text).is_none() {
        return Ok(Transition::Unchanged);
    }
    let mut updated = lobby.clone();
    let guess = updated
        .player_mut(player)
        .and_then(|p| p.guess_mut(text))
        .expect("guess existence checked above");
    guess.ticked = !guess.ticked;
    Ok(updated_state(updated))
}

fn set_ready(lobby: &Lobby, player: &str, ready: bool) -> Result<Transition, TransitionError> {
    if lobby.phase != Phase::Guess {
        return Ok(Transition::Unchanged);
    }
    require_player(lobby, player)?;
    let mut updated = lobby.clone();
    updated
        .player_mut(player)
        .expect("player existence checked above")
        .ready = ready;
    // Unanimous consent over the whole roster, no minimum count: a lobby of
    // one ready player advances immediately.
    if updated.players.iter().all(|p| p.ready) {
        updated.phase = Phase::Watch;
    }
    Ok(updated_state(updated))
}

fn end_watch_phase(lobby: &Lobby) -> Result<Transition, TransitionError> {
    // Idempotent trigger: re-sending it in the review phase must not
    // produce a second assignment.
    if lobby.phase == Phase::Review {
        return Ok(Transition::Unchanged);
    }
    let mut updated = lobby.clone();
    updated.phase = Phase::Review;
    Ok(Transition::Updated {
        lobby: updated,
        effects: vec![Effect::PublishState, Effect::AssignReviews],
    })
}

fn toggle_accept(lobby: &Lobby, owner: &str, text: &str) -> Result<Transition, TransitionError> {
    if lobby.phase != Phase::Review {
        return Ok(Transition::Unchanged);
    }
    let member = require_player(lobby, owner)?;
    if member.guess(text).is_none() {
        return Ok(Transition::Unchanged);
    }
    let mut updated = lobby.clone();
    let guess = updated
        .player_mut(owner)
        .and_then(|p| p.guess_mut(text))
        .expect("guess existence checked above");
    guess.accepted = !guess.accepted;
    Ok(updated_state(updated))
}

fn mark_reviewed(lobby: &Lobby, player: &str) -> Result<Transition, TransitionError> {
    if lobby.phase != Phase::Review {
        return Ok(Transition::Unchanged);
    }
    require_player(lobby, player)?;
    let mut updated = lobby.clone();
    updated
        .player_mut(player)
        .expect("player existence checked above")
        .reviewed = true;
    if updated.players.iter().all(|p| p.reviewed) {
        updated.phase = Phase::Result;
    }
    Ok(updated_state(updated))
}

fn reset(lobby: &Lobby) -> Transition {
    let mut updated = lobby.clone();
    updated.phase = Phase::Guess;
    for player in &mut updated.players {
        player.guesses.clear();
        player.ready = false;
        player.reviewed = false;
    }
    updated_state(updated)
}

fn updated_state(lobby: Lobby) -> Transition {
    Transition::Updated {
        lobby,
        effects: vec![Effect::PublishState],
    }
}

fn require_player<'a>(
    lobby: &'a Lobby,
    name: &str,
) -> Result<&'a super::types::Player, TransitionError> {
    lobby
        .player(name)
        .ok_or_else(|| TransitionError::PlayerNotFound(name.to_string()))
}
