//! WebSocket server and connection handling.

use crate::config::{DisconnectPolicy, ServerConfig};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{RoomRegistry, SharedRoom};
use crate::room::{ConnectionId, Departure, ForfeitCheck, Outcome};
use crate::store::{RoomRecord, RoomStore, StoreError};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{StatusCode, Uri};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::form_urlencoded;
use uuid::Uuid;

const GAME_PATH_PREFIX: &str = "/ws/game/";

/// Why a connection was refused before its message loop started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("room not found")]
    RoomNotFound,

    #[error("unauthorized player")]
    Unauthorized,
}

impl From<StoreError> for ConnectError {
    fn from(_: StoreError) -> Self {
        ConnectError::RoomNotFound
    }
}

/// Room and player named by the upgrade request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTarget {
    pub room_id: String,
    pub player_id: String,
}

impl GameTarget {
    /// Parse `/ws/game/{roomID}?playerID={playerID}`
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        let room_id = uri.path().strip_prefix(GAME_PATH_PREFIX)?;
        if room_id.is_empty() || room_id.contains('/') {
            return None;
        }

        let player_id = form_urlencoded::parse(uri.query()?.as_bytes())
            .find(|(key, _)| key == "playerID")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())?;

        Some(Self {
            room_id: room_id.to_string(),
            player_id,
        })
    }
}

/// Server state shared across all connections.
pub struct ServerState {
    pub registry: RoomRegistry,
    pub store: Arc<dyn RoomStore>,
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(store: Arc<dyn RoomStore>, config: ServerConfig) -> Self {
        Self {
            registry: RoomRegistry::new(),
            store,
            config,
        }
    }

    /// Check the player holds a seat in the room
    pub fn authorize(&self, target: &GameTarget) -> Result<RoomRecord, ConnectError> {
        let record = self.store.room(&target.room_id)?;
        if record.has_player(&target.player_id) {
            Ok(record)
        } else {
            Err(ConnectError::Unauthorized)
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(state.config.addr).await?;
    info!("Binary Reversi server listening on {}", state.config.addr);
    serve(listener, state).await
}

/// Accept connections from an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) -> anyhow::Result<()> {
    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let mut target = None;
    let mut ws_stream = accept_hdr_async(stream, |req: &Request, resp: Response| {
        target = GameTarget::from_uri(req.uri());
        if target.is_some() {
            Ok(resp)
        } else {
            let mut reject = ErrorResponse::new(Some("unknown endpoint".into()));
            *reject.status_mut() = StatusCode::NOT_FOUND;
            Err(reject)
        }
    })
    .await?;
    let Some(target) = target else {
        return Ok(());
    };
    info!(
        "New connection from {} for room {} as {}",
        addr, target.room_id, target.player_id
    );

    let record = match state.authorize(&target) {
        Ok(record) => record,
        Err(ConnectError::RoomNotFound) => {
            warn!("Room {} not found", target.room_id);
            let text = serde_json::to_string(&ServerMessage::error(ConnectError::RoomNotFound))?;
            ws_stream.send(Message::Text(text)).await?;
            ws_stream.close(None).await?;
            return Ok(());
        }
        Err(e @ ConnectError::Unauthorized) => {
            warn!(
                "Refusing {} for room {}: {}",
                target.player_id, target.room_id, e
            );
            ws_stream
                .close(Some(CloseFrame {
                    code: CloseCode::Policy,
                    reason: e.to_string().into(),
                }))
                .await?;
            return Ok(());
        }
    };

    match state.store.player(&target.player_id) {
        Ok(player) => debug!("Player {} is {}", player.id, player.name),
        Err(e) => debug!("No player record: {}", e),
    }

    let room = state.registry.get_or_create(&record);
    let connection_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let reply = tx.clone();
    {
        let mut guard = room.lock().await;
        guard.seat_players(&record);
        guard.connect(connection_id, &target.player_id, tx)?;
        debug!(
            "Room {} now has {} connections",
            guard.id,
            guard.connection_count()
        );
    }

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match ClientMessage::parse(&text) {
                Ok(client_msg) => {
                    handle_message(connection_id, &target, client_msg, &room, &reply, &state)
                        .await;
                }
                Err(e) => {
                    warn!("Invalid message from {}: {}", target.player_id, e);
                    let _ = reply.send(ServerMessage::error(e));
                }
            },
            Ok(Message::Binary(_)) => {
                let _ = reply.send(ServerMessage::error("invalid JSON"));
            }
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", target.player_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", target.player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    let departure = room.lock().await.disconnect(connection_id);
    if let (Some(departure), DisconnectPolicy::Forfeit { grace }) =
        (departure, state.config.disconnect_policy)
    {
        schedule_forfeit(Arc::clone(&room), departure, grace);
    }
    send_task.abort();

    info!("Connection closed for {}", target.player_id);
    Ok(())
}

/// Handle a client message under the room lock.
async fn handle_message(
    connection_id: ConnectionId,
    target: &GameTarget,
    msg: ClientMessage,
    room: &SharedRoom,
    reply: &mpsc::UnboundedSender<ServerMessage>,
    state: &ServerState,
) {
    let outcome = {
        let mut guard = room.lock().await;
        match guard.handle(connection_id, msg) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Rejected message from {}: {}", target.player_id, e);
                guard.send_to(connection_id, ServerMessage::error(e));
                Outcome::Continue
            }
        }
    };

    if let Outcome::Exit { player_id } = outcome {
        if let Err(e) = state.store.delete_room(&target.room_id) {
            warn!("Failed to delete room {}: {}", target.room_id, e);
        }
        state.registry.remove(&target.room_id);
        info!(
            "Room {} closed by {} ({} rooms open)",
            target.room_id,
            player_id,
            state.registry.len()
        );
        let _ = reply.send(ServerMessage::ExitedRoom {
            room_id: target.room_id.clone(),
            player_id,
        });
    }
}

/// Give the game away if the player has not come back after `grace`.
///
/// While the second seat is still empty the check is repeated every `grace`.
fn schedule_forfeit(room: SharedRoom, departure: Departure, grace: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(grace).await;
            match room.lock().await.forfeit(&departure) {
                ForfeitCheck::Applied => {
                    info!("Forfeit applied for {}", departure.player_id);
                    break;
                }
                ForfeitCheck::Deferred => {
                    debug!("Forfeit for {} waits for an opponent", departure.player_id);
                }
                ForfeitCheck::Stale => break,
            }
        }
    });
}
