pub mod game;
pub mod lobby;
pub mod server;

pub use game::{Lobby, LobbyEvent, Phase, Player, ReviewAssignment};
pub use lobby::{LobbyCoordinator, LobbyError, LobbyService};
