//! WebSocket server and connection handling.

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::directory::InMemoryDirectory;
use crate::fanout::SocketFanout;
use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::session::{SessionConfig, SessionDriver, SessionError};

/// Server state shared across all connections.
pub struct ServerState {
    /// Open connections and the rooms they sit in
    pub connections: Arc<SocketFanout>,
    pub sessions: SessionDriver,
}

impl ServerState {
    pub fn new(config: SessionConfig) -> Self {
        let connections = Arc::new(SocketFanout::new());
        let sessions = SessionDriver::new(
            Arc::new(InMemoryDirectory::new()),
            connections.clone(),
            config,
        );
        Self {
            connections,
            sessions,
        }
    }

    /// Get list of waiting rooms.
    pub fn get_waiting_rooms(&self) -> Result<Vec<RoomInfo>, SessionError> {
        Ok(self
            .sessions
            .list_rooms()?
            .iter()
            .filter(|r| r.status() == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect())
    }

    fn send_error(&self, player_id: Uuid, err: impl Display) {
        self.connections.send_to_player(
            player_id,
            ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Monopoly server listening on {}", addr);

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
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a player ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.connections.connect(player_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

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
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state).await,
                Err(_) => warn!("Invalid message from {}: {}", player_id, text),
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(player_id, &state).await;
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
async fn handle_message(player_id: Uuid, msg: ClientMessage, state: &ServerState) {
    let player = player_id.to_string();
    let sessions = &state.sessions;
    let connections = &state.connections;

    match msg {
        ClientMessage::CreateRoom { player_name } => {
            if connections.room_of(player_id).is_some() {
                state.send_error(player_id, "Already in a room");
                return;
            }
            match sessions.create_room(&player, &player_name) {
                Ok(room) => {
                    connections.enter_room(player_id, room.id);
                    connections.send_to_player(player_id, ServerMessage::RoomCreated { room_id: room.id });
                    connections.send_to_player(player_id, ServerMessage::JoinedRoom { room: room.to_info() });
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            if connections.room_of(player_id).is_some() {
                state.send_error(player_id, "Already in a room");
                return;
            }
            match sessions.join_room(room_id, &player, &player_name).await {
                Ok(room) => {
                    let room_info = room.to_info();
                    connections.enter_room(player_id, room_id);
                    connections.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                        },
                    );

                    // Notify other players
                    connections.broadcast_to_room_except(
                        room_id,
                        player_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::AddAiPlayer => {
            let Some(room_id) = current_room(player_id, state) else {
                return;
            };
            match sessions.add_ai_player(room_id, &player).await {
                Ok(room) => {
                    connections.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room.to_info() })
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::LeaveRoom => {
            if let Some(room_id) = connections.leave_room(player_id) {
                leave(player_id, room_id, state).await;
                connections.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::StartGame => {
            let Some(room_id) = current_room(player_id, state) else {
                return;
            };
            // The game start itself reaches everyone through the fanout
            if let Err(e) = sessions.start_game(room_id, &player).await {
                state.send_error(player_id, e);
            }
        }

        ClientMessage::RollDice => {
            let Some(room_id) = current_room(player_id, state) else {
                return;
            };
            let result = sessions.roll_dice(room_id, &player).await;
            reject_on_error(player_id, result, state);
        }

        ClientMessage::BuyProperty { property_id } => {
            let Some(room_id) = current_room(player_id, state) else {
                return;
            };
            let result = sessions.buy_property(room_id, &player, property_id).await;
            reject_on_error(player_id, result, state);
        }

        ClientMessage::EndTurn => {
            let Some(room_id) = current_room(player_id, state) else {
                return;
            };
            let result = sessions.end_turn(room_id, &player).await;
            reject_on_error(player_id, result, state);
        }

        ClientMessage::TriggerAiTurn => {
            let Some(room_id) = current_room(player_id, state) else {
                return;
            };
            let result = sessions.ai_turn(room_id).await;
            reject_on_error(player_id, result, state);
        }

        ClientMessage::GetValidActions => {
            let Some(room_id) = current_room(player_id, state) else {
                return;
            };
            match sessions.valid_actions(room_id, &player) {
                Ok(actions) => connections.send_to_player(player_id, ServerMessage::ValidActions { actions }),
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::ListRooms => match state.get_waiting_rooms() {
            Ok(rooms) => connections.send_to_player(player_id, ServerMessage::RoomList { rooms }),
            Err(e) => state.send_error(player_id, e),
        },

        ClientMessage::Ping => {
            connections.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// The room this connection is in, or an error sent back to it.
fn current_room(player_id: Uuid, state: &ServerState) -> Option<Uuid> {
    let room_id = state.connections.room_of(player_id);
    if room_id.is_none() {
        state.send_error(player_id, "Not in a room");
    }
    room_id
}

fn reject_on_error<T>(player_id: Uuid, result: Result<T, SessionError>, state: &ServerState) {
    if let Err(e) = result {
        state.connections.send_to_player(
            player_id,
            ServerMessage::ActionRejected {
                reason: e.to_string(),
            },
        );
    }
}

/// Drop a player from a room and tell whoever is left.
async fn leave(player_id: Uuid, room_id: Uuid, state: &ServerState) {
    match state.sessions.leave_room(room_id, &player_id.to_string()).await {
        Ok(Some(room)) => state
            .connections
            .broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room.to_info() }),
        Ok(None) => {}
        Err(e) => warn!("Failed to remove {} from room {}: {}", player_id, room_id, e),
    }
}

/// Handle player disconnect.
async fn handle_disconnect(player_id: Uuid, state: &ServerState) {
    if let Some(room_id) = state.connections.disconnect(player_id) {
        leave(player_id, room_id, state).await;
    }
}
