//! Websocket session loop.
//!
//! Each connection gets a fresh session id. A writer task drains an
//! outbound queue into the socket; joining a lobby spawns a forwarder that
//! relays the room's broadcast channel into that queue. Malformed frames
//! and rejected events are logged and dropped, never fatal to the
//! connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::Extension;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::lobby::RoomMessage;

use super::events::{ClientEvent, ServerEvent};
use super::routes::ServerContext;

const LOG_TARGET: &str = "server::ws";
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<ServerContext>) {
    let session = Uuid::new_v4();
    info!(target = LOG_TARGET, %session, "websocket connected");

    let (sink, mut stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);
    let writer = tokio::spawn(write_outbound(sink, out_rx));
    let mut forwarder: Option<JoinHandle<()>> = None;

    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                debug!(target = LOG_TARGET, %session, error = %err, "socket read failed");
                break;
            }
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Ping/pong are answered by axum; binary frames are not part
            // of the protocol.
            _ => continue,
        };

        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    target = LOG_TARGET,
                    %session,
                    error = %err,
                    "malformed client frame dropped"
                );
                continue;
            }
        };

        match event {
            ClientEvent::JoinGame {
                lobby_name,
                name,
                color,
            } => {
                handle_join(
                    &ctx,
                    session,
                    &lobby_name,
                    &name,
                    &color,
                    &out_tx,
                    &mut forwarder,
                )
                .await;
            }
            ClientEvent::FetchGame => {
                let Some(binding) = ctx.service.session_binding(session) else {
                    warn!(
                        target = LOG_TARGET,
                        %session,
                        "fetch-game before join dropped"
                    );
                    continue;
                };
                match ctx.service.snapshot(&binding.lobby).await {
                    Ok(snapshot) => {
                        send_event(&out_tx, &ServerEvent::GameState(snapshot)).await;
                    }
                    Err(err) => {
                        warn!(
                            target = LOG_TARGET,
                            %session,
                            lobby = %binding.lobby,
                            error = %err,
                            "fetch-game failed"
                        );
                    }
                }
            }
            other => {
                let Some(lobby_event) = other.into_lobby_event() else {
                    continue;
                };
                if let Err(err) = ctx.service.handle_event(session, lobby_event).await {
                    warn!(
                        target = LOG_TARGET,
                        %session,
                        error = %err,
                        "event dropped"
                    );
                }
            }
        }
    }

    ctx.service.disconnect(session);
    if let Some(handle) = forwarder {
        handle.abort();
    }
    writer.abort();
    info!(target = LOG_TARGET, %session, "websocket disconnected");
}

async fn handle_join(
    ctx: &Arc<ServerContext>,
    session: Uuid,
    lobby_name: &str,
    name: &str,
    color: &str,
    out_tx: &mpsc::Sender<String>,
    forwarder: &mut Option<JoinHandle<()>>,
) {
    match ctx.service.join_lobby(lobby_name, name, session, color).await {
        Ok(snapshot) => {
            // Rejoining a (possibly different) lobby replaces the previous
            // room subscription.
            if let Some(handle) = forwarder.take() {
                handle.abort();
            }
            let room_rx = ctx.rooms.subscribe(lobby_name);
            *forwarder = Some(tokio::spawn(forward_room(room_rx, out_tx.clone(), session)));
            // The join broadcast fired before this subscription existed, so
            // the joiner gets its own snapshot delivered directly.
            send_event(out_tx, &ServerEvent::GameState(snapshot)).await;
        }
        Err(err) => {
            warn!(
                target = LOG_TARGET,
                %session,
                lobby = %lobby_name,
                error = %err,
                "join rejected"
            );
        }
    }
}

async fn write_outbound(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<String>) {
    while let Some(text) = rx.recv().await {
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}

async fn forward_room(
    room_rx: broadcast::Receiver<RoomMessage>,
    out_tx: mpsc::Sender<String>,
    session: Uuid,
) {
    let mut room = BroadcastStream::new(room_rx);
    while let Some(item) = room.next().await {
        let message = match item {
            Ok(message) => message,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(
                    target = LOG_TARGET,
                    %session,
                    skipped,
                    "lagged on room broadcasts"
                );
                continue;
            }
        };
        if !send_event(&out_tx, &ServerEvent::from(message)).await {
            break;
        }
    }
}

async fn send_event(out_tx: &mpsc::Sender<String>, event: &ServerEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(text) => out_tx.send(text).await.is_ok(),
        Err(err) => {
            warn!(
                target = LOG_TARGET,
                error = %err,
                "failed to serialize server event"
            );
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::{
        Broadcaster, InMemoryLobbyStore, LobbyCoordinator, LobbyStore, RoomChannels,
    };
    use serde_json::Value;

    fn context() -> Arc<ServerContext> {
        let store: Arc<dyn LobbyStore> = Arc::new(InMemoryLobbyStore::new());
        let rooms = Arc::new(RoomChannels::new());
        let broadcaster: Arc<dyn Broadcaster> = rooms.clone();
        Arc::new(ServerContext {
            service: Arc::new(LobbyCoordinator::new(store, broadcaster)),
            rooms,
        })
    }

    async fn next_frame(out_rx: &mut mpsc::Receiver<String>) -> Value {
        let text = out_rx.recv().await.expect("expected an outbound frame");
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn joiner_receives_the_snapshot_its_own_join_produced() {
        let ctx = context();
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let mut forwarder = None;
        let session = Uuid::new_v4();

        handle_join(&ctx, session, "quiz", "ana", "#f00", &out_tx, &mut forwarder).await;

        // The join broadcast predates the room subscription, so the frame
        // must arrive on the direct path.
        let frame = next_frame(&mut out_rx).await;
        assert_eq!(frame["event"], "game-state");
        assert_eq!(frame["data"]["lobbyName"], "quiz");
        assert_eq!(frame["data"]["players"][0]["name"], "ana");
        assert!(forwarder.is_some());
    }

    #[tokio::test]
    async fn rejoin_gets_a_snapshot_and_a_live_room_subscription() {
        let ctx = context();
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let mut forwarder = None;
        let session = Uuid::new_v4();

        handle_join(&ctx, session, "quiz", "ana", "#f00", &out_tx, &mut forwarder).await;
        next_frame(&mut out_rx).await;

        // Moving to a different lobby replaces the subscription but still
        // delivers the post-join snapshot.
        handle_join(&ctx, session, "trivia", "ana", "#f00", &out_tx, &mut forwarder).await;
        let frame = next_frame(&mut out_rx).await;
        assert_eq!(frame["event"], "game-state");
        assert_eq!(frame["data"]["lobbyName"], "trivia");

        // Broadcasts on the new room reach the socket through the forwarder.
        ctx.service
            .join_lobby("trivia", "bo", Uuid::new_v4(), "#0f0")
            .await
            .unwrap();
        let frame = next_frame(&mut out_rx).await;
        assert_eq!(frame["event"], "game-state");
        assert_eq!(frame["data"]["players"].as_array().unwrap().len(), 2);
    }
}
