//! HTTP and websocket surface over the lobby coordinator.

pub mod bootstrap;
pub mod error;
pub mod events;
pub mod logging;
pub mod routes;
pub mod ws;

pub use bootstrap::{run_server, ServerConfig};
pub use events::{ClientEvent, ServerEvent};
pub use routes::{PartyServer, ServerContext};
