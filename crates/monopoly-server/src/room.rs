//! Game room management.
//!
//! A [`Room`] is the unit the directory stores: the pre-game roster, the
//! host, and once started the authoritative [`GameState`].

use monopoly_core::{GameError, GameState, Player, PlayerId, PlayerToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Player already in room")]
    DuplicatePlayer,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Game not started")]
    GameNotStarted,

    #[error(transparent)]
    Game(#[from] GameError),
}

fn default_max_players() -> usize {
    8
}

/// A game room that can hold multiple players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    /// Player id of the host
    pub host: PlayerId,
    /// Pre-game roster, in join order
    pub players: Vec<Player>,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    pub game_started: bool,
    /// The game state (once started)
    pub game_state: Option<GameState>,
}

impl Room {
    pub fn new(
        id: Uuid,
        host_id: impl Into<PlayerId>,
        host_name: impl Into<String>,
        max_players: usize,
    ) -> Self {
        let host_name = host_name.into();
        let host = Player::new(host_id, host_name.clone(), PlayerToken::first_available(&[]));

        Self {
            id,
            name: format!("{}'s Room", host_name),
            host: host.id.clone(),
            players: vec![host],
            max_players: max_players.clamp(2, 8),
            game_started: false,
            game_state: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Whether any human is still seated
    pub fn has_humans(&self) -> bool {
        self.players.iter().any(|p| !p.is_ai)
    }

    pub fn status(&self) -> RoomStatus {
        match &self.game_state {
            Some(game) if game.is_finished() => RoomStatus::Finished,
            Some(_) => RoomStatus::InGame,
            None => RoomStatus::Waiting,
        }
    }

    fn next_token(&self) -> PlayerToken {
        let taken: Vec<PlayerToken> = self.players.iter().map(|p| p.token).collect();
        PlayerToken::first_available(&taken)
    }

    fn check_joinable(&self) -> Result<(), RoomError> {
        if self.game_started {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        Ok(())
    }

    pub fn add_player(
        &mut self,
        player_id: impl Into<PlayerId>,
        name: impl Into<String>,
    ) -> Result<&Player, RoomError> {
        let player_id = player_id.into();
        if self.contains(&player_id) {
            return Err(RoomError::DuplicatePlayer);
        }
        self.check_joinable()?;

        let player = Player::new(player_id, name, self.next_token());
        self.players.push(player);
        Ok(&self.players[self.players.len() - 1])
    }

    /// Seat a computer-controlled player. Host only.
    pub fn add_ai_player(&mut self, requester: &str) -> Result<&Player, RoomError> {
        if requester != self.host {
            return Err(RoomError::NotHost);
        }
        self.check_joinable()?;

        let player = Player::new_ai(
            format!("ai-{}", Uuid::new_v4()),
            format!("AI Player {}", self.players.len() + 1),
            self.next_token(),
        );
        self.players.push(player);
        Ok(&self.players[self.players.len() - 1])
    }

    /// Remove a player from the roster. Returns true when no human is
    /// left and the room should be torn down.
    ///
    /// Only the roster changes here. Taking the player out of a running
    /// game is [`GameState::forfeit`].
    pub fn remove_player(&mut self, player_id: &str) -> Result<bool, RoomError> {
        if !self.contains(player_id) {
            return Err(RoomError::PlayerNotInRoom);
        }

        self.players.retain(|p| p.id != player_id);

        // If host left, hand the room to the first remaining human
        if self.host == player_id {
            if let Some(next) = self
                .players
                .iter()
                .find(|p| !p.is_ai)
                .or_else(|| self.players.first())
            {
                self.host = next.id.clone();
            }
        }

        Ok(!self.has_humans())
    }

    pub fn start_game(&mut self, requester: &str) -> Result<&GameState, RoomError> {
        if requester != self.host {
            return Err(RoomError::NotHost);
        }
        if self.game_started {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }

        self.game_started = true;
        let game = self
            .game_state
            .insert(GameState::new(Uuid::new_v4().to_string(), self.players.clone()));
        Ok(game)
    }

    pub fn game(&self) -> Result<&GameState, RoomError> {
        self.game_state.as_ref().ok_or(RoomError::GameNotStarted)
    }

    pub fn game_mut(&mut self) -> Result<&mut GameState, RoomError> {
        self.game_state.as_mut().ok_or(RoomError::GameNotStarted)
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerInfo {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    token: p.token,
                    is_ai: p.is_ai,
                })
                .collect(),
            max_players: self.max_players,
            host_id: self.host.clone(),
            status: self.status(),
        }
    }
}
