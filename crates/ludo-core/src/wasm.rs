//! WebAssembly bindings for the Ludo game engine.
//!
//! This module exposes the game engine to JavaScript through wasm-bindgen.
//! State, actions and events cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::actions::{GameAction, GameEvent};
use crate::board::{PlayerId, PLAYER_COUNT};
use crate::bot::Bot;
use crate::dice::{animation_frames, RandomDice};
use crate::game::{GameState, PlayerSetup, TurnState};
use rand::rngs::StdRng;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
    dice: RandomDice<StdRng>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game. `human_seats_json` lists the seats (0-3) played by
    /// people, e.g. `[0]` for one player against three AI opponents.
    #[wasm_bindgen(constructor)]
    pub fn new(human_seats_json: &str) -> Result<WasmGame, JsValue> {
        let human_seats: Vec<PlayerId> = serde_json::from_str(human_seats_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid seat list: {}", e)))?;

        if human_seats.iter().any(|&s| s as usize >= PLAYER_COUNT) {
            return Err(JsValue::from_str("Seats must be between 0 and 3"));
        }

        let setups = std::array::from_fn(|i| {
            let name = format!("Player {}", i + 1);
            if human_seats.contains(&(i as PlayerId)) {
                PlayerSetup::human(name)
            } else {
                PlayerSetup::ai(name)
            }
        });

        Ok(WasmGame {
            state: GameState::new(setups),
            dice: RandomDice::from_entropy(),
        })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the board geometry as JSON (for rendering)
    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> String {
        serde_json::to_string(self.state.board()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current player ID
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.current_player
    }

    /// Get valid actions for the current player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self) -> String {
        let actions = self.state.valid_actions(self.state.current_player);
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;
        self.act(player, action)
    }

    /// Roll for the current player
    pub fn roll(&mut self) -> Result<String, JsValue> {
        self.act(self.state.current_player, GameAction::RollDice)
    }

    /// Move a piece of the current player
    #[wasm_bindgen(js_name = movePiece)]
    pub fn move_piece(&mut self, index: u8) -> Result<String, JsValue> {
        self.act(self.state.current_player, GameAction::MovePiece(index))
    }

    /// Hand the turn to the next seat
    #[wasm_bindgen(js_name = endTurn)]
    pub fn end_turn(&mut self) -> Result<String, JsValue> {
        self.act(self.state.current_player, GameAction::EndTurn)
    }

    /// Play AI seats until a human is to act or the game ends.
    /// Returns all events JSON.
    #[wasm_bindgen(js_name = playAiTurn)]
    pub fn play_ai_turn(&mut self) -> String {
        let mut events: Vec<GameEvent> = Vec::new();

        while !self.state.is_finished() && self.state.current().is_ai {
            let bot = Bot::new(self.state.current_player);
            let Some(action) = bot.choose_action(&self.state) else {
                break;
            };
            match self
                .state
                .apply_action_with(bot.player_id, action, &mut self.dice)
            {
                Ok(batch) => events.extend(batch),
                Err(_) => break,
            }
        }

        serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())
    }

    /// Dice faces to flash while rolling; the last one is `committed`
    #[wasm_bindgen(js_name = getRollFrames)]
    pub fn get_roll_frames(&self, committed: u8) -> Vec<u8> {
        animation_frames(&mut rand::thread_rng(), committed)
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Get the winner (if game is finished)
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.state.get_winner()
    }
}

impl WasmGame {
    /// Apply an action and, if that completed the turn, hand it on
    fn act(&mut self, player: PlayerId, action: GameAction) -> Result<String, JsValue> {
        let mut events = self
            .state
            .apply_action_with(player, action, &mut self.dice)
            .map_err(|e| JsValue::from_str(&format!("Action failed: {}", e)))?;

        if action != GameAction::EndTurn && self.state.turn_state == TurnState::TurnComplete {
            if let Ok(more) =
                self.state
                    .apply_action_with(player, GameAction::EndTurn, &mut self.dice)
            {
                events.extend(more);
            }
        }

        Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
    }
}
