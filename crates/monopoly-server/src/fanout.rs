//! Delivery of game notifications to the clients in a room.

use dashmap::DashMap;
use monopoly_core::{GameEvent, GameState, PlayerId, PropertyId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Named events pushed to every client in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Notification {
    GameStarted {
        game_state: GameState,
    },
    DiceRolled {
        player_id: PlayerId,
        dice: [u8; 2],
    },
    PlayerMoved {
        player_id: PlayerId,
        position: u8,
    },
    PropertyPurchased {
        player_id: PlayerId,
        property_id: PropertyId,
        price: i64,
    },
    RentPaid {
        from_player_id: PlayerId,
        to_player_id: PlayerId,
        amount: i64,
    },
    TurnEnded {
        next_player_id: PlayerId,
    },
    GameStateUpdated {
        game_state: GameState,
    },
    GameEnded {
        winner_id: PlayerId,
    },
}

impl Notification {
    /// Translate engine events into the notifications clients see, followed
    /// by the full state snapshot. The end-of-game notice always comes last.
    pub fn from_events(events: &[GameEvent], game: &GameState) -> Vec<Notification> {
        let mut notifications = Vec::new();
        let mut winner = None;

        for event in events {
            match event {
                GameEvent::DiceRolled { player, dice } => {
                    notifications.push(Notification::DiceRolled {
                        player_id: player.clone(),
                        dice: *dice,
                    });
                }
                GameEvent::PlayerMoved { player, position } => {
                    notifications.push(Notification::PlayerMoved {
                        player_id: player.clone(),
                        position: *position,
                    });
                }
                GameEvent::PropertyPurchased {
                    player,
                    property,
                    price,
                } => {
                    notifications.push(Notification::PropertyPurchased {
                        player_id: player.clone(),
                        property_id: *property,
                        price: *price,
                    });
                }
                GameEvent::RentPaid {
                    from, to, amount, ..
                } => {
                    notifications.push(Notification::RentPaid {
                        from_player_id: from.clone(),
                        to_player_id: to.clone(),
                        amount: *amount,
                    });
                }
                GameEvent::TurnEnded { next_player, .. } => {
                    notifications.push(Notification::TurnEnded {
                        next_player_id: next_player.clone(),
                    });
                }
                GameEvent::GameWon { player } => winner = Some(player.clone()),
                _ => {}
            }
        }

        notifications.push(Notification::GameStateUpdated {
            game_state: game.clone(),
        });
        if let Some(winner_id) = winner {
            notifications.push(Notification::GameEnded { winner_id });
        }

        notifications
    }
}

/// Pushes notifications to whoever is watching a room
pub trait EventFanout: Send + Sync {
    fn publish(&self, room_id: Uuid, notification: Notification);
}

/// Fanout over the open WebSocket connections.
///
/// Tracks which connection sits in which room and holds the outgoing
/// channel of every connection.
#[derive(Debug, Default)]
pub struct SocketFanout {
    /// Mapping from connection ID to their room ID
    player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from connection ID to their message sender
    player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl SocketFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, player_id: Uuid, sender: mpsc::UnboundedSender<ServerMessage>) {
        self.player_senders.insert(player_id, sender);
    }

    /// Forget a connection. Returns the room it was in, if any.
    pub fn disconnect(&self, player_id: Uuid) -> Option<Uuid> {
        self.player_senders.remove(&player_id);
        self.leave_room(player_id)
    }

    pub fn enter_room(&self, player_id: Uuid, room_id: Uuid) {
        self.player_rooms.insert(player_id, room_id);
    }

    pub fn leave_room(&self, player_id: Uuid) -> Option<Uuid> {
        self.player_rooms.remove(&player_id).map(|(_, room_id)| room_id)
    }

    pub fn room_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.player_rooms.get(&player_id).map(|r| *r.value())
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    fn members(&self, room_id: Uuid) -> Vec<Uuid> {
        self.player_rooms
            .iter()
            .filter(|entry| *entry.value() == room_id)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Broadcast a message to all players in a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        for player_id in self.members(room_id) {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Broadcast a message to all players in a room except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        for player_id in self.members(room_id) {
            if player_id != except {
                self.send_to_player(player_id, msg.clone());
            }
        }
    }
}

impl EventFanout for SocketFanout {
    fn publish(&self, room_id: Uuid, notification: Notification) {
        self.broadcast_to_room(room_id, ServerMessage::Event { notification });
    }
}

/// Fanout that keeps everything it was handed, for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingFanout {
    published: std::sync::Mutex<Vec<(Uuid, Notification)>>,
}

#[cfg(test)]
impl RecordingFanout {
    pub fn take(&self) -> Vec<(Uuid, Notification)> {
        std::mem::take(&mut *self.published.lock().unwrap())
    }
}

#[cfg(test)]
impl EventFanout for RecordingFanout {
    fn publish(&self, room_id: Uuid, notification: Notification) {
        self.published.lock().unwrap().push((room_id, notification));
    }
}
