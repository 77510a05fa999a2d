//! Broadcast seam: fan a post-mutation snapshot out to a lobby's room.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::game::{Lobby, ReviewAssignment};
use crate::lobby::error::LobbyError;

const LOG_TARGET: &str = "lobby::broadcast";
const ROOM_CHANNEL_CAPACITY: usize = 64;

/// Broadcast collaborator. Implementations deliver a state snapshot (taken
/// after the mutation that triggered it) to every member of a room, and the
/// review assignment on its own side channel.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish_state(&self, lobby: &str, snapshot: &Lobby) -> Result<(), LobbyError>;

    async fn publish_review_assignment(
        &self,
        lobby: &str,
        assignment: &ReviewAssignment,
    ) -> Result<(), LobbyError>;
}

/// One message on a lobby's room channel.
#[derive(Clone, Debug)]
pub enum RoomMessage {
    State(Lobby),
    ReviewAssignment(ReviewAssignment),
}

/// In-process [`Broadcaster`] backed by one `tokio::sync::broadcast`
/// channel per lobby name. Websocket sessions subscribe on join; a publish
/// with no live subscribers is fine and simply dropped.
pub struct RoomChannels {
    // One channel per lobby name ever seen, kept for the process lifetime;
    // lobbies are never deleted, only reset.
    rooms: DashMap<String, broadcast::Sender<RoomMessage>>,
}

impl RoomChannels {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Subscribe to a lobby's room, creating the channel on first use.
    pub fn subscribe(&self, lobby: &str) -> broadcast::Receiver<RoomMessage> {
        self.sender(lobby).subscribe()
    }

    fn sender(&self, lobby: &str) -> broadcast::Sender<RoomMessage> {
        self.rooms
            .entry(lobby.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn publish(&self, lobby: &str, message: RoomMessage) {
        let receivers = self.sender(lobby).send(message).unwrap_or(0);
        debug!(
            target = LOG_TARGET,
            %lobby,
            receivers,
            "published room message"
        );
    }
}

impl Default for RoomChannels {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for RoomChannels {
    async fn publish_state(&self, lobby: &str, snapshot: &Lobby) -> Result<(), LobbyError> {
        self.publish(lobby, RoomMessage::State(snapshot.clone()));
        Ok(())
    }

    async fn publish_review_assignment(
        &self,
        lobby: &str,
        assignment: &ReviewAssignment,
    ) -> Result<(), LobbyError> {
        self.publish(lobby, RoomMessage::ReviewAssignment(assignment.clone()));
        Ok(())
    }
}
