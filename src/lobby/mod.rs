//! Lobby coordination layer: service, storage and broadcast seams.

pub mod broadcast;
pub mod error;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use broadcast::{Broadcaster, RoomChannels, RoomMessage};
pub use error::LobbyError;
pub use service::{LobbyCoordinator, LobbyService, SessionBinding};
pub use storage::{InMemoryLobbyStore, LobbyStore};
