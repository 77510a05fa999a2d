//! Lobby coordination: session routing, per-lobby serialization, and the
//! read → apply → persist → broadcast cycle around the pure state machine.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::{apply, assign_reviewers, Effect, Lobby, LobbyEvent, Player, Transition};

use super::broadcast::Broadcaster;
use super::error::LobbyError;
use super::storage::LobbyStore;

const LOG_TARGET: &str = "lobby::service";

/// The lobby and player a transport session is currently attached to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionBinding {
    pub lobby: String,
    pub player: String,
}

/// Service surface consumed by the transport layer.
#[async_trait]
pub trait LobbyService: Send + Sync {
    /// Join (or create) a lobby. Player names are idempotent within a
    /// lobby: rejoining under an existing name attaches to that player and
    /// refreshes its session instead of duplicating it.
    async fn join_lobby(
        &self,
        lobby: &str,
        player: &str,
        session: Uuid,
        color: &str,
    ) -> Result<Lobby, LobbyError>;

    /// Validate and apply one inbound event on behalf of `session`'s bound
    /// player, then broadcast the post-mutation snapshot. Illegal-phase and
    /// wrong-actor events complete silently without a broadcast.
    async fn handle_event(&self, session: Uuid, event: LobbyEvent) -> Result<(), LobbyError>;

    /// Current fully-populated snapshot of a lobby.
    async fn snapshot(&self, lobby: &str) -> Result<Lobby, LobbyError>;

    fn session_binding(&self, session: Uuid) -> Option<SessionBinding>;

    /// Drop the session registration. The player stays on the roster and
    /// keeps counting toward unanimity; removal on disconnect is reserved
    /// for a future iteration. Unknown sessions are accepted quietly.
    fn disconnect(&self, session: Uuid);
}

/// Default [`LobbyService`] implementation over pluggable storage and
/// broadcast collaborators.
///
/// Every mutating operation reads the full aggregate, evaluates unanimity
/// predicates, and writes back, so operations on one lobby name are
/// serialized behind a per-name mutex held across the whole cycle. Distinct
/// lobbies proceed fully in parallel.
pub struct LobbyCoordinator {
    store: Arc<dyn LobbyStore>,
    broadcaster: Arc<dyn Broadcaster>,
    sessions: DashMap<Uuid, SessionBinding>,
    // One entry per lobby name ever seen, kept for the process lifetime;
    // there is no lobby-delete operation to hang eviction on.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LobbyCoordinator {
    pub fn new(store: Arc<dyn LobbyStore>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            store,
            broadcaster,
            sessions: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    fn lobby_lock(&self, lobby: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(lobby.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl LobbyService for LobbyCoordinator {
    async fn join_lobby(
        &self,
        lobby: &str,
        player: &str,
        session: Uuid,
        color: &str,
    ) -> Result<Lobby, LobbyError> {
        let lock = self.lobby_lock(lobby);
        let _guard = lock.lock().await;

        let snapshot = match self.store.load_lobby(lobby).await? {
            None => {
                let created = Lobby::new(lobby, Player::new(player, session, color));
                self.store.save_lobby(&created).await?;
                info!(
                    target = LOG_TARGET,
                    %lobby,
                    owner = %player,
                    "created lobby"
                );
                created
            }
            Some(mut existing) => {
                match existing.player_mut(player) {
                    Some(member) => {
                        // Rejoin: same identity, fresh transport session.
                        member.session = session;
                        let refreshed = member.clone();
                        self.store.save_player(lobby, &refreshed).await?;
                        debug!(
                            target = LOG_TARGET,
                            %lobby,
                            %player,
                            "player re-attached"
                        );
                    }
                    None => {
                        let joined = Player::new(player, session, color);
                        existing.players.push(joined.clone());
                        self.store.save_player(lobby, &joined).await?;
                        info!(
                            target = LOG_TARGET,
                            %lobby,
                            %player,
                            members = existing.players.len(),
                            "player joined lobby"
                        );
                    }
                }
                existing
            }
        };

        self.sessions.insert(
            session,
            SessionBinding {
                lobby: lobby.to_string(),
                player: player.to_string(),
            },
        );
        self.broadcaster.publish_state(lobby, &snapshot).await?;
        Ok(snapshot)
    }

    async fn handle_event(&self, session: Uuid, event: LobbyEvent) -> Result<(), LobbyError> {
        let binding = self
            .session_binding(session)
            .ok_or(LobbyError::NotFound("session"))?;

        let lock = self.lobby_lock(&binding.lobby);
        let _guard = lock.lock().await;

        let lobby = self
            .store
            .load_lobby(&binding.lobby)
            .await?
            .ok_or(LobbyError::NotFound("lobby"))?;

        let (updated, effects) = match apply(&lobby, &binding.player, &event)? {
            Transition::Unchanged => {
                debug!(
                    target = LOG_TARGET,
                    lobby = %binding.lobby,
                    actor = %binding.player,
                    ?event,
                    "event not legal in current phase; ignored"
                );
                return Ok(());
            }
            Transition::Updated { lobby, effects } => (lobby, effects),
        };

        // Compute the assignment before persisting: if the roster is too
        // small the whole operation fails loudly and the lobby never enters
        // the review phase without an assignment.
        let assignment = if effects.contains(&Effect::AssignReviews) {
            Some(assign_reviewers(
                &updated.players,
                &mut rand::thread_rng(),
            )?)
        } else {
            None
        };

        self.store.save_lobby(&updated).await?;
        if let LobbyEvent::SubmitGuess { player, text } = &event {
            if let Some(guess) = updated.player(player).and_then(|p| p.guess(text)) {
                self.store.save_guess(&updated.name, player, guess).await?;
            }
        }

        for effect in &effects {
            match effect {
                Effect::PublishState => {
                    self.broadcaster
                        .publish_state(&updated.name, &updated)
                        .await?;
                }
                Effect::AssignReviews => {
                    let assignment = assignment
                        .as_ref()
                        .expect("assignment computed before persisting");
                    info!(
                        target = LOG_TARGET,
                        lobby = %updated.name,
                        reviewers = assignment.len(),
                        "review assignment published"
                    );
                    self.broadcaster
                        .publish_review_assignment(&updated.name, assignment)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn snapshot(&self, lobby: &str) -> Result<Lobby, LobbyError> {
        self.store
            .load_lobby(lobby)
            .await?
            .ok_or(LobbyError::NotFound("lobby"))
    }

    fn session_binding(&self, session: Uuid) -> Option<SessionBinding> {
        self.sessions.get(&session).map(|entry| entry.value().clone())
    }

    fn disconnect(&self, session: Uuid) {
        if let Some((_, binding)) = self.sessions.remove(&session) {
            debug!(
                target = LOG_TARGET,
                lobby = %binding.lobby,
                player = %binding.player,
                "session detached; player kept on roster"
            );
        }
    }
}
