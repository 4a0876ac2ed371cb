//! Dice sources.
//!
//! The engine never reaches for a global RNG: every roll goes through a
//! [`DiceRoller`], so games can be replayed from a seed or scripted in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Something that can roll a pair of six-sided dice
pub trait DiceRoller {
    /// Roll two independent dice, each in 1..=6
    fn roll(&mut self) -> (u8, u8);
}

/// Uniformly random dice backed by a seedable RNG
#[derive(Debug, Clone)]
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomDice {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceRoller for RandomDice {
    fn roll(&mut self) -> (u8, u8) {
        (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6))
    }
}

/// Dice that replay a fixed script of rolls.
///
/// Once the script runs out every roll is `(1, 2)`, which is never doubles.
#[derive(Debug, Clone, Default)]
pub struct LoadedDice {
    rolls: VecDeque<(u8, u8)>,
}

impl LoadedDice {
    pub fn new(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    /// Queue another roll
    pub fn push(&mut self, roll: (u8, u8)) {
        self.rolls.push_back(roll);
    }

    /// Rolls still queued
    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl DiceRoller for LoadedDice {
    fn roll(&mut self) -> (u8, u8) {
        self.rolls.pop_front().unwrap_or((1, 2))
    }
}
