//! Local game driver.
//!
//! [`LocalGame`] runs a single-device game: one or more human seats acting
//! through [`LocalGame::roll`] and [`LocalGame::select_piece`], every other seat
//! played by a [`Bot`]. Drawing and sound are delegated to the host application
//! through the [`Renderer`] and [`AudioSink`] traits; the driver only tells them
//! what changed.

use crate::actions::{AudioCue, GameAction, GameEvent};
use crate::board::{BoardPath, PlayerId};
use crate::bot::{Bot, FirstMovable, PiecePolicy};
use crate::dice::DiceRoller;
use crate::game::{GameError, GameState, TurnState};
use crate::player::Piece;
use tracing::{error, warn};

/// Upper bound on actions taken in one run of AI turns
const AI_ACTION_LIMIT: usize = 100_000;

/// Draws the board and pieces
pub trait Renderer {
    /// Called once when the session starts
    fn draw_board(&mut self, board: &BoardPath);

    /// Redraw all pieces of one player
    fn draw_pieces(&mut self, player: PlayerId, pieces: &[Piece]);
}

/// Plays sound cues
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// Renderer that draws nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw_board(&mut self, _board: &BoardPath) {}
    fn draw_pieces(&mut self, _player: PlayerId, _pieces: &[Piece]) {}
}

/// An audio sink behind an on/off switch
#[derive(Debug, Clone)]
pub struct Audio<S: AudioSink> {
    sink: S,
    enabled: bool,
}

impl<S: AudioSink> Audio<S> {
    /// Wrap a sink, sound on
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip the switch, returning the new setting
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Play a cue if sound is on
    pub fn play(&mut self, cue: AudioCue) {
        if self.enabled {
            self.sink.play(cue);
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// A game played on one device against AI opponents
pub struct LocalGame<D: DiceRoller, R: Renderer, A: AudioSink, P: PiecePolicy = FirstMovable> {
    state: GameState,
    dice: D,
    renderer: R,
    audio: Audio<A>,
    policy: P,
}

impl<D: DiceRoller, R: Renderer, A: AudioSink> LocalGame<D, R, A> {
    /// Start a session with the default AI policy
    pub fn new(state: GameState, dice: D, renderer: R, sink: A) -> Self {
        Self::with_policy(state, dice, renderer, sink, FirstMovable)
    }
}

impl<D: DiceRoller, R: Renderer, A: AudioSink, P: PiecePolicy + Clone> LocalGame<D, R, A, P> {
    /// Start a session: draw the board, draw every player's pieces, and let
    /// the AI act if an AI seat moves first.
    pub fn with_policy(state: GameState, dice: D, renderer: R, sink: A, policy: P) -> Self {
        let mut game = Self {
            state,
            dice,
            renderer,
            audio: Audio::new(sink),
            policy,
        };

        game.renderer.draw_board(BoardPath::standard());
        for player in &game.state.players {
            game.renderer.draw_pieces(player.id, &player.pieces);
        }
        game.play_ai_turns();
        game
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn audio(&self) -> &Audio<A> {
        &self.audio
    }

    /// Turn sound on or off, returning the new setting
    pub fn toggle_sound(&mut self) -> bool {
        self.audio.toggle()
    }

    /// Whether a human is expected to act right now
    pub fn is_human_turn(&self) -> bool {
        !self.state.is_finished() && !self.state.current().is_ai
    }

    /// Roll for the human seat whose turn it is.
    ///
    /// If nothing can move, the turn is handed on and the AI seats play until
    /// a human is to act again.
    pub fn roll(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.human_action(GameAction::RollDice)
    }

    /// Move the chosen piece of the human seat whose turn it is
    pub fn select_piece(&mut self, index: u8) -> Result<Vec<GameEvent>, GameError> {
        self.human_action(GameAction::MovePiece(index))
    }

    /// Play AI seats until a human is to act or the game ends
    pub fn play_ai_turns(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();

        for _ in 0..AI_ACTION_LIMIT {
            if self.state.is_finished() {
                return events;
            }
            let current = self.state.current();
            if !current.is_ai {
                return events;
            }

            let bot = Bot::with_policy(current.id, self.policy.clone());
            let Some(action) = bot.choose_action(&self.state) else {
                return events;
            };
            match self.step(bot.player_id, action) {
                Ok(batch) => events.extend(batch),
                Err(e) => {
                    error!(player = bot.player_id, ?action, "AI action rejected: {}", e);
                    return events;
                }
            }
        }

        warn!("AI turns stopped after {} actions", AI_ACTION_LIMIT);
        events
    }

    // ==================== Helper Methods ====================

    fn human_action(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        if self.state.is_finished() {
            return Err(GameError::GameOver);
        }
        if self.state.current().is_ai {
            return Err(GameError::NotYourTurn);
        }

        let player = self.state.current_player;
        let mut events = self.step(player, action)?;
        if self.state.turn_state == TurnState::TurnComplete {
            events.extend(self.step(player, GameAction::EndTurn)?);
            events.extend(self.play_ai_turns());
        }
        Ok(events)
    }

    /// Apply one action and tell the renderer and audio about it
    fn step(&mut self, player: PlayerId, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        let events = self
            .state
            .apply_action_with(player, action, &mut self.dice)?;
        self.dispatch(&events);
        Ok(events)
    }

    fn dispatch(&mut self, events: &[GameEvent]) {
        for event in events {
            if let Some(cue) = event.audio_cue() {
                self.audio.play(cue);
            }
            for id in event.touched_players() {
                if let Some(player) = self.state.get_player(id) {
                    self.renderer.draw_pieces(id, &player.pieces);
                }
            }
        }
    }
}
