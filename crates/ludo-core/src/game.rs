//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all game logic:
//! rolling, moving, captures, win detection and turn rotation.

use crate::actions::{GameAction, GameEvent};
use crate::board::{BoardPath, Coord, PlayerId, PIECES_PER_PLAYER, PLAYER_COUNT};
use crate::dice::{DiceRoller, RandomDice};
use crate::player::{Advance, Piece, Player};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Turn state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// Start of turn, waiting for the current player to roll
    AwaitingRoll,

    /// Dice animation in progress; the value is not committed yet
    Rolling,

    /// Dice committed, one movable piece must be chosen
    AwaitingMove,

    /// Move done (or nothing could move); waiting for the turn to be handed on
    TurnComplete,

    /// Game is over
    Finished { winner: PlayerId },
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current turn state")]
    InvalidPhase,

    #[error("No such piece")]
    NoSuchPiece,

    #[error("That piece cannot move with this roll")]
    PieceNotMovable,

    #[error("Game is over")]
    GameOver,
}

/// How a seat is filled when a game starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub name: String,
    pub is_ai: bool,
}

impl PlayerSetup {
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ai: false,
        }
    }

    pub fn ai(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ai: true,
        }
    }
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// All four players in seat order
    pub players: Vec<Player>,
    /// Seat whose turn it is
    pub current_player: PlayerId,
    /// Committed dice value for the current turn
    pub dice_value: Option<u8>,
    /// Where in the turn we are
    pub turn_state: TurnState,
    /// Completed turns so far
    pub turn_number: u32,
}

impl GameState {
    /// Create a new game, red starts
    pub fn new(setups: [PlayerSetup; PLAYER_COUNT]) -> Self {
        let players = setups
            .into_iter()
            .enumerate()
            .map(|(i, setup)| Player::new(i as PlayerId, setup.name, setup.is_ai))
            .collect();

        Self {
            players,
            current_player: 0,
            dice_value: None,
            turn_state: TurnState::AwaitingRoll,
            turn_number: 0,
        }
    }

    /// One human (red) against three AI seats
    pub fn new_vs_ai() -> Self {
        Self::new([
            PlayerSetup::human("Player 1"),
            PlayerSetup::ai("Player 2"),
            PlayerSetup::ai("Player 3"),
            PlayerSetup::ai("Player 4"),
        ])
    }

    /// Four human seats
    pub fn new_all_human() -> Self {
        Self::new(std::array::from_fn(|i| {
            PlayerSetup::human(format!("Player {}", i + 1))
        }))
    }

    /// The constant board geometry
    pub fn board(&self) -> &'static BoardPath {
        BoardPath::standard()
    }

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    /// The player whose turn it is
    pub fn current(&self) -> &Player {
        &self.players[self.current_player as usize]
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.turn_state, TurnState::Finished { .. })
    }

    /// Get the winner if the game is finished
    pub fn get_winner(&self) -> Option<PlayerId> {
        if let TurnState::Finished { winner } = self.turn_state {
            Some(winner)
        } else {
            None
        }
    }

    /// Find any piece by id
    pub fn piece(&self, id: &str) -> Option<&Piece> {
        self.players.iter().find_map(|p| p.piece(id))
    }

    /// All pieces standing on a cell
    pub fn pieces_at(&self, coord: Coord) -> Vec<&Piece> {
        self.players
            .iter()
            .flat_map(|p| p.pieces.iter())
            .filter(|piece| piece.position == coord)
            .collect()
    }

    /// Pieces the player could move with the committed dice value
    pub fn movable_pieces(&self, player: PlayerId) -> Vec<u8> {
        match (self.get_player(player), self.dice_value) {
            (Some(p), Some(dice)) => p.movable_pieces(dice),
            _ => Vec::new(),
        }
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        if player != self.current_player {
            return Vec::new();
        }

        match self.turn_state {
            TurnState::Finished { .. } => Vec::new(),
            TurnState::AwaitingRoll | TurnState::Rolling => vec![GameAction::RollDice],
            TurnState::AwaitingMove => self
                .movable_pieces(player)
                .into_iter()
                .map(GameAction::MovePiece)
                .collect(),
            TurnState::TurnComplete => vec![GameAction::EndTurn],
        }
    }

    /// Mark the dice as rolling while an animation plays.
    ///
    /// Purely cosmetic: `RollDice` is accepted with or without this step.
    pub fn begin_roll(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.check_turn(player)?;
        if self.turn_state != TurnState::AwaitingRoll {
            return Err(GameError::InvalidPhase);
        }
        self.turn_state = TurnState::Rolling;
        Ok(())
    }

    /// Apply an action, rolling with the thread RNG
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action_with(player, action, &mut RandomDice::thread())
    }

    /// Apply an action to the game state, drawing dice values from `dice`
    pub fn apply_action_with(
        &mut self,
        player: PlayerId,
        action: GameAction,
        dice: &mut dyn DiceRoller,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.check_turn(player)?;

        match action {
            GameAction::RollDice => {
                if !matches!(
                    self.turn_state,
                    TurnState::AwaitingRoll | TurnState::Rolling
                ) {
                    return Err(GameError::InvalidPhase);
                }
                Ok(self.roll_dice(player, dice.roll()))
            }

            GameAction::MovePiece(index) => {
                if self.turn_state != TurnState::AwaitingMove {
                    return Err(GameError::InvalidPhase);
                }
                let value = self.dice_value.ok_or(GameError::InvalidPhase)?;
                if index as usize >= PIECES_PER_PLAYER {
                    return Err(GameError::NoSuchPiece);
                }
                if !self.players[player as usize].pieces[index as usize].can_move(value) {
                    return Err(GameError::PieceNotMovable);
                }
                Ok(self.move_piece(player, index as usize, value))
            }

            GameAction::EndTurn => {
                if self.turn_state != TurnState::TurnComplete {
                    return Err(GameError::InvalidPhase);
                }
                Ok(self.end_turn(player))
            }
        }
    }

    // ==================== Helper Methods ====================

    fn check_turn(&self, player: PlayerId) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn roll_dice(&mut self, player: PlayerId, value: u8) -> Vec<GameEvent> {
        let value = value.clamp(1, 6);
        self.dice_value = Some(value);

        let mut events = vec![GameEvent::DiceRolled { player, value }];

        if self.movable_pieces(player).is_empty() {
            events.push(GameEvent::NoMovablePieces { player, value });
            self.turn_state = TurnState::TurnComplete;
        } else {
            self.turn_state = TurnState::AwaitingMove;
        }

        events
    }

    fn move_piece(&mut self, player: PlayerId, index: usize, value: u8) -> Vec<GameEvent> {
        let board = BoardPath::standard();
        let mut events = Vec::new();

        let piece = &mut self.players[player as usize].pieces[index];
        let advance = piece.advance(board, value);
        let piece_id = piece.id.clone();
        let landed = piece.position;
        let path_index = piece.path_index;

        match advance {
            Advance::Entered => {
                events.push(GameEvent::PieceEntered {
                    player,
                    piece: piece_id,
                    position: landed,
                });
            }
            Advance::Shared { from } => {
                events.push(GameEvent::PieceMoved {
                    player,
                    piece: piece_id.clone(),
                    from,
                    to: landed,
                    path_index,
                });
                events.extend(self.resolve_captures(player, &piece_id, landed));
            }
            Advance::HomeStretch { from } => {
                events.push(GameEvent::PieceEnteredHomeStretch {
                    player,
                    piece: piece_id,
                    from,
                    to: landed,
                    path_index,
                });
            }
            Advance::Finished { .. } => {
                let finished_count = self.players[player as usize].finished_count() as u8;
                events.push(GameEvent::PieceFinished {
                    player,
                    piece: piece_id,
                    finished_count,
                });
            }
        }

        if self.players[player as usize].has_won() {
            self.turn_state = TurnState::Finished { winner: player };
            events.push(GameEvent::GameWon { player });
        } else {
            self.turn_state = TurnState::TurnComplete;
        }

        events
    }

    /// Send every opposing piece on `at` back to base, unless `at` is a safe zone
    fn resolve_captures(
        &mut self,
        mover: PlayerId,
        mover_piece: &str,
        at: Coord,
    ) -> Vec<GameEvent> {
        let board = BoardPath::standard();
        if board.is_safe(&at) {
            return Vec::new();
        }

        let mut events = Vec::new();
        for other in self.players.iter_mut().filter(|p| p.id != mover) {
            for victim in other
                .pieces
                .iter_mut()
                .filter(|p| p.is_on_shared_path() && p.position == at)
            {
                victim.send_home(board);
                events.push(GameEvent::PieceCaptured {
                    by_player: mover,
                    by_piece: mover_piece.to_string(),
                    player: other.id,
                    piece: victim.id.clone(),
                    at,
                });
            }
        }
        events
    }

    fn end_turn(&mut self, player: PlayerId) -> Vec<GameEvent> {
        let next_player = (self.current_player + 1) % self.player_count() as PlayerId;
        self.current_player = next_player;
        self.turn_number += 1;
        self.dice_value = None;
        self.turn_state = TurnState::AwaitingRoll;

        vec![GameEvent::TurnEnded {
            player,
            next_player,
        }]
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new_vs_ai()
    }
}
