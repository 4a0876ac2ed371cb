//! Player state.
//!
//! This module contains:
//! - Player struct with money, board position, holdings and status flags
//! - Cosmetic player tokens

use serde::{Deserialize, Serialize};

use crate::board::PropertyId;

/// Player identifier (UUID string for humans, `ai-<uuid>` for bots)
pub type PlayerId = String;

/// Money every player starts with
pub const STARTING_MONEY: i64 = 1500;

/// Token shown on the board for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerToken {
    Car,
    Boot,
    Hat,
    Ship,
    Dog,
    Cat,
    Iron,
    Thimble,
}

impl PlayerToken {
    /// All tokens in assignment order
    pub const ALL: [PlayerToken; 8] = [
        PlayerToken::Car,
        PlayerToken::Boot,
        PlayerToken::Hat,
        PlayerToken::Ship,
        PlayerToken::Dog,
        PlayerToken::Cat,
        PlayerToken::Iron,
        PlayerToken::Thimble,
    ];

    /// First token not already taken, falling back to the car
    pub fn first_available(taken: &[PlayerToken]) -> PlayerToken {
        Self::ALL
            .into_iter()
            .find(|t| !taken.contains(t))
            .unwrap_or(PlayerToken::Car)
    }
}

/// A player in the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub token: PlayerToken,
    /// Board position (0-39)
    pub position: u8,
    /// Cash on hand; negative only until bankruptcy is resolved
    pub money: i64,
    /// Ids of owned properties, in acquisition order
    pub properties: Vec<PropertyId>,
    pub in_jail: bool,
    /// Failed attempts to roll out of jail
    #[serde(default)]
    pub jail_turns: u8,
    pub bankrupt: bool,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
}

impl Player {
    /// Create a human player on GO with starting money
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, token: PlayerToken) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            token,
            position: 0,
            money: STARTING_MONEY,
            properties: Vec::new(),
            in_jail: false,
            jail_turns: 0,
            bankrupt: false,
            is_ai: false,
        }
    }

    /// Create a computer-controlled player
    pub fn new_ai(id: impl Into<PlayerId>, name: impl Into<String>, token: PlayerToken) -> Self {
        Self {
            is_ai: true,
            ..Self::new(id, name, token)
        }
    }

    /// Whether the player is still in the game
    pub fn is_active(&self) -> bool {
        !self.bankrupt
    }

    /// Whether the player has enough cash for a purchase
    pub fn can_afford(&self, amount: i64) -> bool {
        self.money >= amount
    }

    /// Whether the player holds the given property
    pub fn owns(&self, property: PropertyId) -> bool {
        self.properties.contains(&property)
    }

    /// Put the player in jail
    pub fn send_to_jail(&mut self, jail_position: u8) {
        self.position = jail_position;
        self.in_jail = true;
        self.jail_turns = 0;
    }

    /// Release the player from jail
    pub fn release_from_jail(&mut self) {
        self.in_jail = false;
        self.jail_turns = 0;
    }
}
