//! Monopoly game engine
//!
//! This crate provides the core game logic, including:
//! - The static board catalog (properties, taxes, jail, GO)
//! - Rent calculation for streets, railroads and utilities
//! - The turn state machine: rolling, buying, rent, tax, jail, bankruptcy
//! - A greedy automated player that plays through the same rules
//!
//! # Architecture
//!
//! The engine is synchronous and performs no I/O. A [`GameState`] is owned by
//! its caller and mutated in place by [`GameState::apply_action`]; dice come
//! from an injected [`DiceRoller`] so games are reproducible. It can be
//! compiled to:
//! - Native Rust for server-side game hosting
//! - WebAssembly for client-side local games
//!
//! # Modules
//!
//! - [`board`]: Board catalog and lookups
//! - [`rent`]: Rent calculator
//! - [`player`]: Player state
//! - [`game`]: Game state machine
//! - [`bot`]: Automated player policy

pub mod actions;
pub mod board;
pub mod bot;
pub mod dice;
pub mod game;
pub mod player;
pub mod rent;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{Creditor, GameAction, GameEvent};
pub use board::{Property, PropertyGroup, PropertyId, Space, SpecialSpace};
pub use bot::Bot;
pub use dice::{DiceRoller, LoadedDice, RandomDice};
pub use game::{GameError, GamePhase, GameState};
pub use player::{Player, PlayerId, PlayerToken, STARTING_MONEY};
pub use rent::calculate_rent;
