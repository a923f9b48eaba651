//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions.

use crate::board::{Coord, PlayerId};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Roll the dice (must be done at start of turn)
    RollDice,
    /// Move one of your pieces by the rolled value (piece index 0-3)
    MovePiece(u8),
    /// Hand the turn to the next seat
    EndTurn,
}

/// Sound cues the engine asks for. Playback is up to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioCue {
    DiceRoll,
    PieceMove,
    Capture,
    Win,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled { player: PlayerId, value: u8 },

    /// The roll left the player with nothing to move; the turn passes
    NoMovablePieces { player: PlayerId, value: u8 },

    /// A piece left its base onto the entry cell
    PieceEntered {
        player: PlayerId,
        piece: String,
        position: Coord,
    },

    /// A piece moved along the shared path
    PieceMoved {
        player: PlayerId,
        piece: String,
        from: Coord,
        to: Coord,
        path_index: u8,
    },

    /// A piece moved into or along its home stretch
    PieceEnteredHomeStretch {
        player: PlayerId,
        piece: String,
        from: Coord,
        to: Coord,
        path_index: u8,
    },

    /// A piece completed the path
    PieceFinished {
        player: PlayerId,
        piece: String,
        finished_count: u8,
    },

    /// A piece was sent back to its base
    PieceCaptured {
        by_player: PlayerId,
        by_piece: String,
        player: PlayerId,
        piece: String,
        at: Coord,
    },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// A player won the game
    GameWon { player: PlayerId },
}

impl GameEvent {
    /// Sound to play for this event, if any
    pub fn audio_cue(&self) -> Option<AudioCue> {
        match self {
            GameEvent::DiceRolled { .. } => Some(AudioCue::DiceRoll),
            GameEvent::PieceEntered { .. }
            | GameEvent::PieceMoved { .. }
            | GameEvent::PieceEnteredHomeStretch { .. }
            | GameEvent::PieceFinished { .. } => Some(AudioCue::PieceMove),
            GameEvent::PieceCaptured { .. } => Some(AudioCue::Capture),
            GameEvent::GameWon { .. } => Some(AudioCue::Win),
            GameEvent::NoMovablePieces { .. } | GameEvent::TurnEnded { .. } => None,
        }
    }

    /// Seats whose pieces changed, so a renderer knows what to redraw
    pub fn touched_players(&self) -> Vec<PlayerId> {
        match self {
            GameEvent::PieceEntered { player, .. }
            | GameEvent::PieceMoved { player, .. }
            | GameEvent::PieceEnteredHomeStretch { player, .. }
            | GameEvent::PieceFinished { player, .. } => vec![*player],
            GameEvent::PieceCaptured {
                by_player, player, ..
            } => vec![*by_player, *player],
            _ => Vec::new(),
        }
    }
}
