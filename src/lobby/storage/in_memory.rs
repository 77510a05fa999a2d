use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::game::{Guess, Lobby, Player};
use crate::lobby::error::LobbyError;

use super::LobbyStore;

#[derive(Default)]
struct Inner {
    lobbies: HashMap<String, Lobby>,
}

/// Reference [`LobbyStore`] keeping fully-populated aggregates in memory.
///
/// Lock scope is one whole operation; callers already serialize writes per
/// lobby, so the coarse lock never contends on the hot path.
pub struct InMemoryLobbyStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryLobbyStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl Default for InMemoryLobbyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LobbyStore for InMemoryLobbyStore {
    async fn load_lobby(&self, name: &str) -> Result<Option<Lobby>, LobbyError> {
        Ok(self.inner.read().lobbies.get(name).cloned())
    }

    async fn save_lobby(&self, lobby: &Lobby) -> Result<(), LobbyError> {
        self.inner
            .write()
            .lobbies
            .insert(lobby.name.clone(), lobby.clone());
        Ok(())
    }

    async fn load_player(&self, lobby: &str, name: &str) -> Result<Option<Player>, LobbyError> {
        Ok(self
            .inner
            .read()
            .lobbies
            .get(lobby)
            .and_then(|l| l.player(name))
            .cloned())
    }

    async fn save_player(&self, lobby: &str, player: &Player) -> Result<(), LobbyError> {
        let mut inner = self.inner.write();
        let lobby = inner
            .lobbies
            .get_mut(lobby)
            .ok_or(LobbyError::NotFound("lobby"))?;
        match lobby.player_mut(&player.name) {
            Some(existing) => *existing = player.clone(),
            None => lobby.players.push(player.clone()),
        }
        Ok(())
    }

    async fn save_guess(
        &self,
        lobby: &str,
        owner: &str,
        guess: &Guess,
    ) -> Result<(), LobbyError> {
        let mut inner = self.inner.write();
        let player = inner
            .lobbies
            .get_mut(lobby)
            .and_then(|l| l.player_mut(owner))
            .ok_or(LobbyError::NotFound("player"))?;
        match player.guess_mut(&guess.guess) {
            Some(existing) => *existing = guess.clone(),
            None => player.guesses.push(guess.clone()),
        }
        Ok(())
    }
}
