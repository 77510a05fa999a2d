//! Persistence seam for lobby aggregates.

use async_trait::async_trait;

use crate::game::{Guess, Lobby, Player};
use crate::lobby::error::LobbyError;

pub mod in_memory;

pub use in_memory::InMemoryLobbyStore;

/// Storage collaborator for lobby state.
///
/// `load_lobby` must return the aggregate fully populated: every member
/// with all their guesses, since the loaded value is both the state
/// machine's input and the snapshot broadcast to the room. The engine
/// behind the trait is a deliberate non-concern of the core; retries and
/// backoff, if any, belong to the implementation.
#[async_trait]
pub trait LobbyStore: Send + Sync {
    async fn load_lobby(&self, name: &str) -> Result<Option<Lobby>, LobbyError>;

    async fn save_lobby(&self, lobby: &Lobby) -> Result<(), LobbyError>;

    async fn load_player(&self, lobby: &str, name: &str) -> Result<Option<Player>, LobbyError>;

    /// Insert or replace one player within an existing lobby.
    async fn save_player(&self, lobby: &str, player: &Player) -> Result<(), LobbyError>;

    /// Insert or replace one guess record owned by `owner`.
    async fn save_guess(&self, lobby: &str, owner: &str, guess: &Guess)
        -> Result<(), LobbyError>;
}
