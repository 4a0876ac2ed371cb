//! Automated players.
//!
//! The bot is a greedy, deterministic policy: always roll, buy whatever it
//! lands on when it can pay for it, then end the turn. It goes through the
//! same [`GameState::apply_action`] entry point as a human, so every rule is
//! shared. The only line of its own it writes is the "can't afford" pass.

use crate::actions::{GameAction, GameEvent};
use crate::dice::DiceRoller;
use crate::game::{GameError, GamePhase, GameState};
use crate::player::PlayerId;

/// Upper bound on actions in a single bot turn (roll, buy, end)
const MAX_ACTIONS_PER_TURN: usize = 3;

/// A bot player that can decide on actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bot {
    pub player_id: PlayerId,
}

impl Bot {
    pub fn new(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
        }
    }

    /// The bot for whoever is up, if that player is computer-controlled
    pub fn for_current_player(game: &GameState) -> Option<Self> {
        game.current_player()
            .filter(|p| p.is_ai && !game.is_finished())
            .map(|p| Self::new(p.id.clone()))
    }

    /// Whether it is this bot's turn in an unfinished game
    pub fn is_turn(&self, game: &GameState) -> bool {
        !game.is_finished()
            && game
                .current_player()
                .map_or(false, |p| p.id == self.player_id)
    }

    /// Choose the next action, or `None` when it is not this bot's turn
    pub fn choose_action(&self, game: &GameState) -> Option<GameAction> {
        if !self.is_turn(game) {
            return None;
        }

        let valid_actions = game.valid_actions(&self.player_id);
        match game.game_phase {
            GamePhase::Waiting => Some(GameAction::RollDice),
            GamePhase::PropertyDecision => valid_actions
                .iter()
                .find(|a| matches!(a, GameAction::BuyProperty(_)))
                .cloned()
                .or(Some(GameAction::EndTurn)),
            GamePhase::EndTurn => Some(GameAction::EndTurn),
            GamePhase::GameOver => None,
        }
    }

    /// Take the next action of the turn. Returns `None` when it is not this
    /// bot's turn.
    ///
    /// After a roll that lands on a property the bot cannot pay for, the
    /// pass is written to the game log.
    pub fn step(
        &self,
        game: &mut GameState,
        dice: &mut dyn DiceRoller,
    ) -> Result<Option<Vec<GameEvent>>, GameError> {
        let action = match self.choose_action(game) {
            Some(action) => action,
            None => return Ok(None),
        };
        let rolled = action == GameAction::RollDice;

        let events = game.apply_action(&self.player_id, action, dice)?;
        if rolled {
            game.note_unaffordable(&self.player_id);
        }
        Ok(Some(events))
    }

    /// Play one whole turn: roll, maybe buy, end turn.
    ///
    /// Stops early if the game ends mid-turn.
    pub fn take_turn(
        &self,
        game: &mut GameState,
        dice: &mut dyn DiceRoller,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();

        for _ in 0..MAX_ACTIONS_PER_TURN {
            let ends_turn = self.choose_action(game) == Some(GameAction::EndTurn);
            match self.step(game, dice)? {
                Some(step_events) => events.extend(step_events),
                None => break,
            }
            if ends_turn {
                break;
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::LoadedDice;
    use crate::player::{Player, PlayerToken};

    fn game_with_bot() -> GameState {
        GameState::new(
            "g",
            vec![
                Player::new_ai("ai-1", "Robo", PlayerToken::Car),
                Player::new("human", "Alice", PlayerToken::Hat),
            ],
        )
    }

    #[test]
    fn test_bot_only_for_ai_players() {
        let mut game = game_with_bot();
        assert_eq!(Bot::for_current_player(&game), Some(Bot::new("ai-1")));

        game.current_player_index = 1;
        assert_eq!(Bot::for_current_player(&game), None);
    }

    #[test]
    fn test_bot_prioritizes_roll() {
        let game = game_with_bot();
        let bot = Bot::new("ai-1");
        assert_eq!(bot.choose_action(&game), Some(GameAction::RollDice));
        assert_eq!(Bot::new("human").choose_action(&game), None);
    }

    #[test]
    fn test_bot_buys_affordable_property() {
        let mut game = game_with_bot();
        let bot = Bot::new("ai-1");
        let mut dice = LoadedDice::new([(1, 2)]);
        game.apply_action("ai-1", GameAction::RollDice, &mut dice)
            .unwrap();
        assert_eq!(bot.choose_action(&game), Some(GameAction::BuyProperty(3)));
    }

    #[test]
    fn test_bot_turn_roll_buy_end() {
        let mut game = game_with_bot();
        let bot = Bot::new("ai-1");
        let mut dice = LoadedDice::new([(1, 2)]);
        let log_before = game.action_log.len();

        bot.take_turn(&mut game, &mut dice).unwrap();

        let new_lines = &game.action_log[log_before..];
        assert_eq!(
            new_lines,
            [
                "Robo rolled 1+2 and moved to position 3 and landed on Baltic Avenue",
                "Robo bought Baltic Avenue for $60",
                "Robo ended their turn. Alice's turn now.",
            ]
        );
        assert_eq!(game.current_player_index, 1);
        assert_eq!(game.game_phase, GamePhase::Waiting);
    }

    #[test]
    fn test_bot_cannot_afford() {
        let mut game = game_with_bot();
        game.players[0].money = 20;
        let bot = Bot::new("ai-1");
        let mut dice = LoadedDice::new([(1, 2)]);
        let log_before = game.action_log.len();

        bot.take_turn(&mut game, &mut dice).unwrap();

        assert!(game.players[0].properties.is_empty());
        assert_eq!(
            &game.action_log[log_before..],
            [
                "Robo rolled 1+2 and moved to position 3 and landed on Baltic Avenue",
                "Robo can't afford Baltic Avenue",
                "Robo ended their turn. Alice's turn now.",
            ]
        );
        assert_eq!(game.current_player_index, 1);
    }

    #[test]
    fn test_bot_step_by_step() {
        let mut game = game_with_bot();
        game.players[0].money = 20;
        let bot = Bot::new("ai-1");
        let mut dice = LoadedDice::new([(1, 2)]);

        let events = bot.step(&mut game, &mut dice).unwrap().unwrap();
        assert!(matches!(events[0], GameEvent::DiceRolled { .. }));
        assert_eq!(game.game_phase, GamePhase::EndTurn);
        assert_eq!(game.action_log.last().unwrap(), "Robo can't afford Baltic Avenue");

        bot.step(&mut game, &mut dice).unwrap().unwrap();
        assert_eq!(game.current_player_index, 1);

        // Alice is up now
        assert_eq!(bot.step(&mut game, &mut dice).unwrap(), None);
    }
}
