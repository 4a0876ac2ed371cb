//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all turn logic:
//! rolling and moving, resolving the space landed on, buying, ending turns,
//! bankruptcy and win detection.

use crate::actions::{Creditor, GameAction, GameEvent};
use crate::board::{
    self, Property, PropertyId, Space, SpecialSpace, BOARD_SIZE, GO_SALARY, JAIL_POSITION,
};
use crate::dice::DiceRoller;
use crate::player::{Player, PlayerId, PlayerToken};
use crate::rent::calculate_rent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fine for leaving jail after the last failed doubles attempt
const JAIL_FINE: i64 = 50;

/// Failed doubles attempts allowed before the fine is charged
const MAX_JAIL_ATTEMPTS: u8 = 3;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GamePhase {
    /// Start of a turn, dice not rolled yet
    Waiting,
    /// Landed on an unowned property the player can afford
    PropertyDecision,
    /// Roll resolved, nothing left but ending the turn
    EndTurn,
    /// Game is over
    GameOver,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Property not found")]
    PropertyNotFound,

    #[error("You are not standing on that property")]
    PropertyNotAtPosition,

    #[error("Property already owned")]
    PropertyAlreadyOwned,

    #[error("Not enough money")]
    InsufficientFunds,

    #[error("Game is over")]
    GameOver,
}

/// Outcome of a roll made from jail
enum JailRoll {
    /// Free to move this roll
    Released,
    Stayed,
    /// The fine could not be paid
    Bankrupt,
}

/// What a roll landed on, detached from the borrow of `properties`
enum Landing {
    Property {
        id: PropertyId,
        price: i64,
        owner: Option<PlayerId>,
        mortgaged: bool,
        rent: i64,
    },
    Special(SpecialSpace),
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: String,
    /// All players, in turn order
    pub players: Vec<Player>,
    /// Every purchasable property, one authoritative copy each
    pub properties: Vec<Property>,
    pub current_player_index: usize,
    /// Last dice roll (`[0, 0]` before the first roll)
    pub dice: [u8; 2],
    pub game_phase: GamePhase,
    pub winner: Option<PlayerId>,
    /// Human-readable audit trail, append-only
    pub action_log: Vec<String>,
}

impl GameState {
    /// Start a new game with the given players in turn order
    pub fn new(id: impl Into<String>, players: Vec<Player>) -> Self {
        Self {
            id: id.into(),
            players,
            properties: board::standard_properties(),
            current_player_index: 0,
            dice: [0, 0],
            game_phase: GamePhase::Waiting,
            winner: None,
            action_log: vec!["Game started".to_string()],
        }
    }

    /// Start a local game with generated ids (`player-1`, `player-2`, ...)
    pub fn with_names(names: &[&str]) -> Self {
        let mut taken = Vec::new();
        let players = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let token = PlayerToken::first_available(&taken);
                taken.push(token);
                Player::new(format!("player-{}", i + 1), *name, token)
            })
            .collect();
        Self::new("local", players)
    }

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// The player whose turn it is
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    /// Get a player by ID
    pub fn get_player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_index(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Players who are not bankrupt
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active())
    }

    /// Get a property by ID
    pub fn get_property(&self, id: PropertyId) -> Option<&Property> {
        board::property_by_id(&self.properties, id)
    }

    /// The property awaiting a buy decision, if any
    pub fn pending_property(&self) -> Option<&Property> {
        if self.game_phase != GamePhase::PropertyDecision {
            return None;
        }
        let player = self.current_player()?;
        board::property_at(&self.properties, player.position)
    }

    /// The unowned property the current player just landed on but cannot
    /// pay for
    pub fn unaffordable_property(&self) -> Option<&Property> {
        if self.game_phase != GamePhase::EndTurn {
            return None;
        }
        let player = self.current_player()?;
        board::property_at(&self.properties, player.position)
            .filter(|p| p.owner.is_none() && !player.can_afford(p.price))
    }

    /// Record that `player` passes on a property they cannot afford.
    /// Returns false when they are not up or are not standing on one.
    pub fn note_unaffordable(&mut self, player: &str) -> bool {
        let entry = match (self.current_player(), self.unaffordable_property()) {
            (Some(current), Some(property)) if current.id == player => {
                format!("{} can't afford {}", current.name, property.name)
            }
            _ => return false,
        };
        self.log(entry);
        true
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        self.game_phase == GamePhase::GameOver
    }

    /// Get the winner if the game is finished
    pub fn get_winner(&self) -> Option<&Player> {
        self.winner.as_deref().and_then(|id| self.get_player(id))
    }

    /// Whether every owned property appears in exactly its owner's holdings
    /// and every holding points back at its holder
    pub fn ownership_consistent(&self) -> bool {
        let owners_agree = self.properties.iter().all(|property| {
            let holders: Vec<&Player> = self
                .players
                .iter()
                .filter(|p| p.owns(property.id))
                .collect();
            match &property.owner {
                Some(owner) => holders.len() == 1 && holders[0].id == *owner,
                None => holders.is_empty(),
            }
        });
        let holdings_agree = self.players.iter().all(|player| {
            player.properties.iter().all(|id| {
                self.get_property(*id)
                    .map_or(false, |p| p.is_owned_by(&player.id))
            })
        });
        owners_agree && holdings_agree
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: &str) -> Vec<GameAction> {
        let mut actions = Vec::new();

        let current = match self.current_player() {
            Some(p) if p.id == player => p,
            _ => return actions,
        };

        match self.game_phase {
            GamePhase::GameOver => {}
            GamePhase::Waiting => actions.push(GameAction::RollDice),
            GamePhase::PropertyDecision => {
                if let Some(property) = self.pending_property() {
                    if property.owner.is_none() && current.can_afford(property.price) {
                        actions.push(GameAction::BuyProperty(property.id));
                    }
                }
                actions.push(GameAction::EndTurn);
            }
            GamePhase::EndTurn => actions.push(GameAction::EndTurn),
        }

        actions
    }

    /// Apply an action to the game state.
    ///
    /// On error the state is left untouched.
    pub fn apply_action(
        &mut self,
        player: &str,
        action: GameAction,
        dice: &mut dyn DiceRoller,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.game_phase == GamePhase::GameOver {
            return Err(GameError::GameOver);
        }

        let index = match self.current_player() {
            Some(p) if p.id == player => self.current_player_index,
            _ => return Err(GameError::NotYourTurn),
        };

        match action {
            GameAction::RollDice => {
                if self.game_phase != GamePhase::Waiting {
                    return Err(GameError::InvalidPhase);
                }
                Ok(self.roll_and_move(index, dice))
            }
            GameAction::BuyProperty(property) => self.buy_property(index, property),
            GameAction::EndTurn => self.end_turn(index),
        }
    }

    // ==================== Rolling ====================

    fn roll_and_move(&mut self, index: usize, dice: &mut dyn DiceRoller) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let (die1, die2) = dice.roll();
        self.dice = [die1, die2];

        let player_id = self.players[index].id.clone();
        let name = self.players[index].name.clone();

        events.push(GameEvent::DiceRolled {
            player: player_id.clone(),
            dice: self.dice,
        });

        if self.players[index].in_jail {
            match self.try_leave_jail(index, &mut events) {
                JailRoll::Released => {}
                JailRoll::Stayed => {
                    self.log(format!("{} rolled {}+{} and stayed in Jail", name, die1, die2));
                    self.game_phase = GamePhase::EndTurn;
                    return events;
                }
                JailRoll::Bankrupt => {
                    if self.game_phase != GamePhase::GameOver {
                        self.game_phase = GamePhase::EndTurn;
                    }
                    return events;
                }
            }
        }

        let old_position = self.players[index].position;
        let steps = u16::from(die1) + u16::from(die2);
        let new_position = ((u16::from(old_position) + steps) % u16::from(BOARD_SIZE)) as u8;

        if new_position < old_position {
            self.players[index].money += GO_SALARY;
            self.log(format!("{} passed GO and collected ${}", name, GO_SALARY));
            events.push(GameEvent::PassedGo {
                player: player_id.clone(),
                amount: GO_SALARY,
            });
        }

        self.players[index].position = new_position;
        events.push(GameEvent::PlayerMoved {
            player: player_id,
            position: new_position,
        });

        let space_name = self.resolve_landing(index, new_position, &mut events);

        let landed = space_name
            .map(|space| format!(" and landed on {}", space))
            .unwrap_or_default();
        self.log(format!(
            "{} rolled {}+{} and moved to position {}{}",
            name, die1, die2, new_position, landed
        ));

        events
    }

    fn try_leave_jail(&mut self, index: usize, events: &mut Vec<GameEvent>) -> JailRoll {
        let [die1, die2] = self.dice;
        let player_id = self.players[index].id.clone();
        let name = self.players[index].name.clone();

        if die1 == die2 {
            self.players[index].release_from_jail();
            self.log(format!("{} rolled doubles and left Jail", name));
            events.push(GameEvent::ReleasedFromJail {
                player: player_id,
                fine: 0,
            });
            return JailRoll::Released;
        }

        self.players[index].jail_turns += 1;
        if self.players[index].jail_turns < MAX_JAIL_ATTEMPTS {
            return JailRoll::Stayed;
        }

        self.players[index].money -= JAIL_FINE;
        self.players[index].release_from_jail();
        self.log(format!("{} paid ${} to get out of Jail", name, JAIL_FINE));
        events.push(GameEvent::ReleasedFromJail {
            player: player_id,
            fine: JAIL_FINE,
        });

        if self.players[index].money < 0 {
            self.declare_bankruptcy(index, None, events);
            return JailRoll::Bankrupt;
        }
        JailRoll::Released
    }

    /// Apply the effect of the space at `position`, set the next phase and
    /// return the space's name for the movement log line.
    fn resolve_landing(
        &mut self,
        index: usize,
        position: u8,
        events: &mut Vec<GameEvent>,
    ) -> Option<String> {
        self.game_phase = GamePhase::EndTurn;

        let space = board::space_at(&self.properties, position)?;
        let name = space.name().to_string();
        let landing = match space {
            Space::Property(property) => Landing::Property {
                id: property.id,
                price: property.price,
                owner: property.owner.clone(),
                mortgaged: property.mortgaged,
                rent: calculate_rent(&self.properties, property, self.dice),
            },
            Space::Special { kind, .. } => Landing::Special(kind),
        };

        match landing {
            Landing::Property {
                id,
                price,
                owner,
                mortgaged,
                rent,
            } => match owner {
                None if self.players[index].can_afford(price) => {
                    self.game_phase = GamePhase::PropertyDecision;
                }
                Some(owner) if owner != self.players[index].id && !mortgaged => {
                    if let Some(owner_index) = self.player_index(&owner) {
                        self.pay_rent(index, owner_index, id, &name, rent, events);
                    }
                }
                _ => {}
            },
            Landing::Special(kind) => match kind {
                SpecialSpace::Tax { amount } => self.pay_tax(index, amount, events),
                SpecialSpace::GoToJail => {
                    let player = &mut self.players[index];
                    player.send_to_jail(JAIL_POSITION);
                    let (player_id, player_name) = (player.id.clone(), player.name.clone());
                    self.log(format!("{} was sent to Jail", player_name));
                    events.push(GameEvent::SentToJail {
                        player: player_id.clone(),
                    });
                    events.push(GameEvent::PlayerMoved {
                        player: player_id,
                        position: JAIL_POSITION,
                    });
                }
                SpecialSpace::Go
                | SpecialSpace::Jail
                | SpecialSpace::Chance
                | SpecialSpace::CommunityChest
                | SpecialSpace::FreeParking => {}
            },
        }

        Some(name)
    }

    fn pay_rent(
        &mut self,
        payer: usize,
        owner: usize,
        property: PropertyId,
        property_name: &str,
        amount: i64,
        events: &mut Vec<GameEvent>,
    ) {
        self.players[payer].money -= amount;
        self.players[owner].money += amount;

        let from = self.players[payer].id.clone();
        let to = self.players[owner].id.clone();
        let entry = format!(
            "{} paid ${} rent to {} for {}",
            self.players[payer].name, amount, self.players[owner].name, property_name
        );
        self.log(entry);
        events.push(GameEvent::RentPaid {
            from,
            to,
            property,
            amount,
        });

        if self.players[payer].money < 0 {
            self.declare_bankruptcy(payer, Some(owner), events);
        }
    }

    fn pay_tax(&mut self, index: usize, amount: i64, events: &mut Vec<GameEvent>) {
        self.players[index].money -= amount;
        let entry = format!("{} paid ${} in taxes", self.players[index].name, amount);
        self.log(entry);
        events.push(GameEvent::TaxPaid {
            player: self.players[index].id.clone(),
            amount,
        });

        if self.players[index].money < 0 {
            self.declare_bankruptcy(index, None, events);
        }
    }

    // ==================== Buying ====================

    fn buy_property(
        &mut self,
        index: usize,
        property_id: PropertyId,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.game_phase != GamePhase::PropertyDecision {
            return Err(GameError::InvalidPhase);
        }

        let property = self
            .properties
            .iter_mut()
            .find(|p| p.id == property_id)
            .ok_or(GameError::PropertyNotFound)?;
        let player = &mut self.players[index];

        if property.position != player.position {
            return Err(GameError::PropertyNotAtPosition);
        }
        if property.owner.is_some() {
            return Err(GameError::PropertyAlreadyOwned);
        }
        if !player.can_afford(property.price) {
            return Err(GameError::InsufficientFunds);
        }

        player.money -= property.price;
        player.properties.push(property.id);
        property.owner = Some(player.id.clone());

        let entry = format!("{} bought {} for ${}", player.name, property.name, property.price);
        let event = GameEvent::PropertyPurchased {
            player: player.id.clone(),
            property: property.id,
            price: property.price,
        };

        self.log(entry);
        self.game_phase = GamePhase::EndTurn;
        Ok(vec![event])
    }

    // ==================== Turn Management ====================

    fn end_turn(&mut self, index: usize) -> Result<Vec<GameEvent>, GameError> {
        if !matches!(
            self.game_phase,
            GamePhase::EndTurn | GamePhase::PropertyDecision
        ) {
            return Err(GameError::InvalidPhase);
        }

        let next = self.next_active_index(index);
        self.current_player_index = next;
        self.game_phase = GamePhase::Waiting;

        let player = &self.players[index];
        let next_player = &self.players[next];
        let event = GameEvent::TurnEnded {
            player: player.id.clone(),
            next_player: next_player.id.clone(),
        };
        let entry = format!(
            "{} ended their turn. {}'s turn now.",
            player.name, next_player.name
        );

        self.log(entry);
        Ok(vec![event])
    }

    /// Next non-bankrupt player after `from`, cycling through the table.
    /// Falls back to `from` itself when nobody else is left.
    fn next_active_index(&self, from: usize) -> usize {
        let count = self.player_count();
        (1..=count)
            .map(|step| (from + step) % count)
            .find(|&i| self.players[i].is_active())
            .unwrap_or(from)
    }

    // ==================== Bankruptcy ====================

    /// Take a departed player out of a running game. Their cash and
    /// properties go to the bank, and if it was their turn play passes on.
    ///
    /// Does nothing for unknown or already bankrupt players, or once the
    /// game is over.
    pub fn forfeit(&mut self, player: &str) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.is_finished() {
            return events;
        }
        let index = match self.player_index(player) {
            Some(i) if self.players[i].is_active() => i,
            _ => return events,
        };

        let entry = format!("{} left the game", self.players[index].name);
        self.log(entry);
        self.players[index].money = 0;
        self.declare_bankruptcy(index, None, &mut events);

        if index == self.current_player_index && !self.is_finished() {
            self.game_phase = GamePhase::EndTurn;
            if let Ok(ended) = self.end_turn(index) {
                events.extend(ended);
            }
        }
        events
    }

    /// Mark a player bankrupt and hand their assets to the creditor
    /// (`None` = the bank), then check whether the game is over.
    fn declare_bankruptcy(
        &mut self,
        index: usize,
        creditor: Option<usize>,
        events: &mut Vec<GameEvent>,
    ) {
        let debtor_id = self.players[index].id.clone();
        self.players[index].bankrupt = true;
        self.players[index].properties.clear();

        let creditor_id = creditor.map(|c| self.players[c].id.clone());
        let mut transferred = Vec::new();
        for property in self
            .properties
            .iter_mut()
            .filter(|p| p.is_owned_by(&debtor_id))
        {
            match &creditor_id {
                Some(id) => property.owner = Some(id.clone()),
                None => {
                    property.owner = None;
                    property.houses = 0;
                    property.mortgaged = false;
                }
            }
            transferred.push(property.id);
        }

        let creditor_event = match creditor {
            Some(c) => {
                self.players[c].properties.extend(transferred);
                let remainder = self.players[index].money;
                if remainder > 0 {
                    self.players[c].money += remainder;
                    self.players[index].money = 0;
                }
                let entry = format!(
                    "{} went bankrupt to {}",
                    self.players[index].name, self.players[c].name
                );
                self.log(entry);
                Creditor::Player(self.players[c].id.clone())
            }
            None => {
                let entry = format!("{} went bankrupt to the bank", self.players[index].name);
                self.log(entry);
                Creditor::Bank
            }
        };

        events.push(GameEvent::PlayerBankrupt {
            player: debtor_id,
            creditor: creditor_event,
        });

        events.extend(self.check_win_condition());
    }

    fn check_win_condition(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let last_standing = {
            let mut active = self.active_players();
            match (active.next(), active.next()) {
                (Some(winner), None) => Some((winner.id.clone(), winner.name.clone())),
                _ => None,
            }
        };

        if let Some((id, name)) = last_standing {
            self.winner = Some(id.clone());
            self.game_phase = GamePhase::GameOver;
            self.log(format!("{} wins the game!", name));
            events.push(GameEvent::GameWon { player: id });
        }

        events
    }

    fn log(&mut self, entry: String) {
        self.action_log.push(entry);
    }
}
