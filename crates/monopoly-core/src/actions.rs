//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions.

use crate::board::PropertyId;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Roll the dice and resolve the space landed on (start of turn)
    RollDice,
    /// Buy the unowned property under the player's token
    BuyProperty(PropertyId),
    /// End your turn (also declines a pending purchase)
    EndTurn,
}

/// Who a bankrupt player owed money to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Creditor {
    Bank,
    Player(PlayerId),
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled { player: PlayerId, dice: [u8; 2] },

    /// A player's token moved
    PlayerMoved { player: PlayerId, position: u8 },

    /// A player passed GO and collected the salary
    PassedGo { player: PlayerId, amount: i64 },

    /// Rent changed hands
    RentPaid {
        from: PlayerId,
        to: PlayerId,
        property: PropertyId,
        amount: i64,
    },

    /// Tax was paid to the bank
    TaxPaid { player: PlayerId, amount: i64 },

    /// A player was sent to jail
    SentToJail { player: PlayerId },

    /// A player left jail
    ReleasedFromJail { player: PlayerId, fine: i64 },

    /// A property was bought from the bank
    PropertyPurchased {
        player: PlayerId,
        property: PropertyId,
        price: i64,
    },

    /// A player could not cover a debt
    PlayerBankrupt { player: PlayerId, creditor: Creditor },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// Only one solvent player remains
    GameWon { player: PlayerId },
}
