//! WebAssembly bindings for the game engine.
//!
//! This module exposes a local (single browser) game to JavaScript through
//! wasm-bindgen. Everything crosses the boundary as JSON.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::bot::Bot;
use crate::dice::RandomDice;
use crate::game::GameState;
use crate::player::{Player, PlayerToken};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
    dice: RandomDice,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game. `players_json` is an array of
    /// `{"name": "...", "isAI": bool}` objects.
    #[wasm_bindgen(constructor)]
    pub fn new(players_json: &str) -> Result<WasmGame, JsValue> {
        #[derive(serde::Deserialize)]
        struct Seat {
            name: String,
            #[serde(default, rename = "isAI")]
            is_ai: bool,
        }

        let seats: Vec<Seat> = serde_json::from_str(players_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid players: {}", e)))?;
        if seats.len() < 2 {
            return Err(JsValue::from_str("Need at least 2 players"));
        }

        let players = seats
            .into_iter()
            .zip(PlayerToken::ALL.into_iter().cycle())
            .enumerate()
            .map(|(i, (seat, token))| {
                let id = format!("player-{}", i + 1);
                if seat.is_ai {
                    Player::new_ai(id, seat.name, token)
                } else {
                    Player::new(id, seat.name, token)
                }
            })
            .collect();

        Ok(WasmGame {
            state: GameState::new("local", players),
            dice: RandomDice::new(),
        })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current player ID
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> Option<String> {
        self.state.current_player().map(|p| p.id.clone())
    }

    /// Get valid actions for a player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self, player: &str) -> String {
        let actions = self.state.valid_actions(player);
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: &str, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(player, action, &mut self.dice) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Let the computer play its turn if the current player is an AI.
    /// Returns events JSON (empty array when a human is up).
    #[wasm_bindgen(js_name = playBotTurn)]
    pub fn play_bot_turn(&mut self) -> Result<String, JsValue> {
        let bot = match Bot::for_current_player(&self.state) {
            Some(bot) => bot,
            None => return Ok("[]".to_string()),
        };
        let events = bot
            .take_turn(&mut self.state, &mut self.dice)
            .map_err(|e| JsValue::from_str(&format!("Bot turn failed: {}", e)))?;
        Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Get the winner's id (if game is finished)
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<String> {
        self.state.get_winner().map(|p| p.id.clone())
    }

    /// Get the action log as a JSON array of strings
    #[wasm_bindgen(js_name = getLog)]
    pub fn get_log(&self) -> String {
        serde_json::to_string(&self.state.action_log).unwrap_or_else(|_| "[]".to_string())
    }
}
