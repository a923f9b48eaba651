//! Player and piece state.
//!
//! This module contains:
//! - Piece placement (base, shared path, home stretch, finished)
//! - Player struct owning exactly four pieces
//!
//! A piece's `position` is never written directly: every mutation goes through
//! a method here that recomputes it from the board.

use crate::board::{
    BoardPath, Color, Coord, PlayerId, ENTRY_ROLL, LAST_PATH_INDEX,
    PIECES_PER_PLAYER, SHARED_PATH_LEN,
};
use serde::{Deserialize, Serialize};

/// Where a piece currently is, derived from its raw fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceLocation {
    /// Waiting in base, never entered or captured
    Base,
    /// On the shared loop, steps past the color's entry cell
    SharedPath(u8),
    /// On the color's home stretch (0-4)
    HomeStretch(u8),
    /// Completed the full path
    Finished,
}

/// Outcome of advancing a piece by a dice value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Left base onto the entry cell
    Entered,
    /// Moved along the shared loop
    Shared { from: Coord },
    /// Moved into or along the home stretch
    HomeStretch { from: Coord },
    /// Ran past the last home stretch cell
    Finished { from: Coord },
}

/// A single playing piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// Unique id, `"{color}-{index}"`
    pub id: String,
    pub color: Color,
    /// Index within the owner's pieces, also its base slot
    pub index: u8,
    /// True while the piece rests in its base
    pub is_home: bool,
    /// True once the piece has completed the path
    pub finished: bool,
    /// Steps past the color's entry cell (0-56); 0 while home
    pub path_index: u8,
    /// Board cell, always consistent with the fields above
    pub position: Coord,
}

impl Piece {
    /// Create a piece resting in its base slot
    pub fn new(color: Color, index: u8) -> Self {
        Self {
            id: Self::make_id(color, index),
            color,
            index,
            is_home: true,
            finished: false,
            path_index: 0,
            position: color.base_slot(index as usize),
        }
    }

    /// Build the id for a piece
    pub fn make_id(color: Color, index: u8) -> String {
        format!("{}-{}", color.name(), index)
    }

    /// Decode the current placement
    pub fn location(&self) -> PieceLocation {
        if self.finished {
            PieceLocation::Finished
        } else if self.is_home {
            PieceLocation::Base
        } else if self.path_index < SHARED_PATH_LEN {
            PieceLocation::SharedPath(self.path_index)
        } else {
            PieceLocation::HomeStretch(self.path_index - SHARED_PATH_LEN)
        }
    }

    /// Whether the piece is on the shared loop, where it can capture or be captured
    pub fn is_on_shared_path(&self) -> bool {
        matches!(self.location(), PieceLocation::SharedPath(_))
    }

    /// Whether this piece can move with the given dice value.
    ///
    /// Only a 6 brings a piece out of base. Pieces on the board can always
    /// move: running past the last home stretch cell finishes them.
    pub fn can_move(&self, dice: u8) -> bool {
        if self.finished {
            return false;
        }
        !self.is_home || dice == ENTRY_ROLL
    }

    /// Advance this piece by `dice`. The caller checks [`Piece::can_move`] first.
    pub fn advance(&mut self, board: &BoardPath, dice: u8) -> Advance {
        let from = self.position;

        if self.is_home {
            self.is_home = false;
            self.path_index = 0;
            self.refresh_position(board);
            return Advance::Entered;
        }

        let target = self.path_index as u16 + dice as u16;
        if target > LAST_PATH_INDEX as u16 {
            self.finish(board);
            return Advance::Finished { from };
        }

        self.path_index = target as u8;
        self.refresh_position(board);
        if self.path_index < SHARED_PATH_LEN {
            Advance::Shared { from }
        } else {
            Advance::HomeStretch { from }
        }
    }

    /// Send the piece back to its base slot (captured)
    pub fn send_home(&mut self, board: &BoardPath) {
        self.is_home = true;
        self.finished = false;
        self.path_index = 0;
        self.refresh_position(board);
    }

    /// Mark the piece as having completed the path
    pub fn finish(&mut self, board: &BoardPath) {
        self.is_home = true;
        self.finished = true;
        self.path_index = 0;
        self.refresh_position(board);
    }

    /// Overwrite placement fields, clamping to a valid state
    pub fn set_placement(
        &mut self,
        board: &BoardPath,
        is_home: bool,
        finished: bool,
        path_index: u8,
    ) {
        self.finished = finished;
        self.is_home = is_home || finished;
        self.path_index = if self.is_home { 0 } else { path_index.min(LAST_PATH_INDEX) };
        self.refresh_position(board);
    }

    /// Recompute `position` from the placement fields
    pub fn refresh_position(&mut self, board: &BoardPath) {
        self.position =
            board.position_of(self.color, self.index as usize, self.is_home, self.path_index);
    }
}

/// A player's full state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub color: Color,
    pub name: String,
    /// Whether the engine plays this seat
    pub is_ai: bool,
    pub pieces: [Piece; PIECES_PER_PLAYER],
}

impl Player {
    /// Create a player with all pieces in base
    pub fn new(id: PlayerId, name: String, is_ai: bool) -> Self {
        let color = Color::for_player(id);
        Self {
            id,
            color,
            name,
            is_ai,
            pieces: std::array::from_fn(|i| Piece::new(color, i as u8)),
        }
    }

    /// Indices of pieces that can move with `dice`, in index order
    pub fn movable_pieces(&self, dice: u8) -> Vec<u8> {
        crate::bot::movable_pieces(&self.pieces, dice)
    }

    /// Number of finished pieces
    pub fn finished_count(&self) -> usize {
        self.pieces.iter().filter(|p| p.finished).count()
    }

    /// All four pieces completed the path
    pub fn has_won(&self) -> bool {
        self.pieces.iter().all(|p| p.finished)
    }

    /// Look up a piece by id
    pub fn piece(&self, id: &str) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == id)
    }
}
