//! WebSocket protocol messages for Monopoly multiplayer.

use monopoly_core::{GameAction, PlayerId, PlayerToken, PropertyId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fanout::Notification;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom { player_name: String },

    /// Join an existing room
    JoinRoom { room_id: Uuid, player_name: String },

    /// Seat a computer player (host only)
    AddAiPlayer,

    /// Leave current room
    LeaveRoom,

    /// Start the game (host only)
    StartGame,

    RollDice,

    BuyProperty { property_id: PropertyId },

    EndTurn,

    /// Ask the server to play the current AI player's turn now
    TriggerAiTurn,

    /// Request the actions currently legal for this player
    GetValidActions,

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned player ID
    Welcome { player_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room successfully
    JoinedRoom { room: RoomInfo },

    /// Left room successfully
    LeftRoom,

    /// Room roster changed (player joined/left, AI added)
    RoomUpdated { room: RoomInfo },

    /// Something happened in the game
    Event { notification: Notification },

    /// A game action was refused; the game state is unchanged
    ActionRejected { reason: String },

    /// Valid actions for the requesting player
    ValidActions { actions: Vec<GameAction> },

    /// List of available rooms
    RoomList { rooms: Vec<RoomInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: usize,
    pub host_id: PlayerId,
    pub status: RoomStatus,
}

/// Player information in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub token: PlayerToken,
    pub is_ai: bool,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_shape() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"BuyProperty","payload":{"property_id":3}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::BuyProperty { property_id: 3 }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"EndTurn"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::EndTurn));
    }

    #[test]
    fn test_event_message_shape() {
        let msg = ServerMessage::Event {
            notification: Notification::TurnEnded {
                next_player_id: "bob".into(),
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "Event",
                "payload": {
                    "notification": {
                        "type": "turnEnded",
                        "payload": { "nextPlayerId": "bob" }
                    }
                }
            })
        );
    }
}
