//! Board geometry for the classic 15x15 Ludo board.
//!
//! This module contains:
//! - Grid coordinates and the four player colors
//! - The 52-cell shared path, split into four arms of 13 cells
//! - Safe zones where captures cannot happen
//! - Per-color home stretches and base slots
//!
//! The shared path is the cross-shaped loop around the center. Arm 0 runs from
//! red's entry cell `(1, 6)` up the left side of the top column; every other
//! arm is arm 0 rotated a quarter turn clockwise about the center `(7, 7)`, so
//! arm `k` starts at shared index `13 * k`, which is also the entry cell of
//! seat `k`.
//!
//! Everything here is constant. The path is computed once and shared through
//! [`BoardPath::standard`].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Player identifier (seat index 0-3)
pub type PlayerId = u8;

/// Width and height of the board grid
pub const BOARD_SIZE: i32 = 15;

/// Number of players at the table
pub const PLAYER_COUNT: usize = 4;

/// Pieces owned by each player
pub const PIECES_PER_PLAYER: usize = 4;

/// Cells in the shared loop
pub const SHARED_PATH_LEN: u8 = 52;

/// Cells in one arm of the shared loop
pub const ARM_LEN: u8 = 13;

/// Cells in each color's home stretch
pub const HOME_STRETCH_LEN: u8 = 5;

/// The only roll that brings a piece out of base
pub const ENTRY_ROLL: u8 = 6;

/// Highest path index a piece can occupy while still on the board
pub const LAST_PATH_INDEX: u8 = SHARED_PATH_LEN + HOME_STRETCH_LEN - 1;

/// Arm 0 of the shared loop: along the top row of the left arm, up the left
/// column of the top arm, then across its far end.
const FIRST_ARM: [(i32, i32); ARM_LEN as usize] = [
    (1, 6),
    (2, 6),
    (3, 6),
    (4, 6),
    (5, 6),
    (6, 5),
    (6, 4),
    (6, 3),
    (6, 2),
    (6, 1),
    (6, 0),
    (7, 0),
    (8, 0),
];

/// A cell on the board grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset this coordinate by another
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Rotate a quarter turn clockwise about the board center
    pub const fn rotate_cw(&self) -> Self {
        Self::new(BOARD_SIZE - 1 - self.y, self.x)
    }

    /// Rotate `turns` quarter turns clockwise about the board center
    pub fn rotated(&self, turns: u8) -> Self {
        (0..turns % 4).fold(*self, |c, _| c.rotate_cw())
    }

    /// Whether this cell lies on the 15x15 grid
    pub fn on_board(&self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }
}

/// Player colors, in seat order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Color {
    /// All colors in seat order
    pub const ALL: [Color; PLAYER_COUNT] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];

    /// Get the color sitting at a seat
    pub fn for_player(id: PlayerId) -> Self {
        Self::ALL[id as usize % PLAYER_COUNT]
    }

    /// Seat index of this color
    pub fn seat(&self) -> PlayerId {
        match self {
            Color::Red => 0,
            Color::Blue => 1,
            Color::Green => 2,
            Color::Yellow => 3,
        }
    }

    /// Lowercase name, as used in piece ids
    pub fn name(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
        }
    }

    /// Parse a lowercase color name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Shared-path cell where this color's pieces enter play
    pub fn start_index(&self) -> u8 {
        self.seat() * ARM_LEN
    }

    /// Top-left cell of the 3x3 base area drawn for this color
    pub fn base_area(&self) -> Coord {
        match self {
            Color::Red => Coord::new(1, 1),
            Color::Blue => Coord::new(11, 1),
            Color::Green => Coord::new(11, 11),
            Color::Yellow => Coord::new(1, 11),
        }
    }

    /// Cell occupied by a piece resting in its base slot
    pub fn base_slot(&self, slot: usize) -> Coord {
        const SLOT_OFFSETS: [(i32, i32); PIECES_PER_PLAYER] = [(0, 0), (1, 0), (0, 1), (1, 1)];
        let (dx, dy) = SLOT_OFFSETS[slot % PIECES_PER_PLAYER];
        self.base_area().offset(1 + dx, 1 + dy)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The fixed path geometry of the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPath {
    /// Shared loop, index 0 is red's entry cell
    pub common_path: Vec<Coord>,
    /// Cells where no capture can occur
    pub safe_zones: [Coord; 4],
    /// Final approach of each color toward the center, indexed by seat
    pub home_stretches: [[Coord; HOME_STRETCH_LEN as usize]; PLAYER_COUNT],
}

static STANDARD_BOARD: Lazy<BoardPath> = Lazy::new(BoardPath::build);

impl BoardPath {
    /// The standard board, computed once per process
    pub fn standard() -> &'static BoardPath {
        &STANDARD_BOARD
    }

    fn build() -> Self {
        let common_path = (0..SHARED_PATH_LEN).map(Self::shared_cell).collect();

        let mut home_stretches = [[Coord::default(); HOME_STRETCH_LEN as usize]; PLAYER_COUNT];
        for (seat, stretch) in home_stretches.iter_mut().enumerate() {
            for (step, cell) in stretch.iter_mut().enumerate() {
                *cell = Coord::new(1 + step as i32, 7).rotated(seat as u8);
            }
        }

        Self {
            common_path,
            safe_zones: [
                Coord::new(6, 1),
                Coord::new(1, 6),
                Coord::new(6, 9),
                Coord::new(9, 6),
            ],
            home_stretches,
        }
    }

    /// Cell `i` of the shared loop
    fn shared_cell(i: u8) -> Coord {
        let arm = i / ARM_LEN;
        let (x, y) = FIRST_ARM[(i % ARM_LEN) as usize];
        Coord::new(x, y).rotated(arm)
    }

    /// Shared-path cell for a piece of `color` that is `path_index` steps past its entry
    pub fn shared_position(&self, color: Color, path_index: u8) -> Coord {
        let absolute =
            (color.start_index() as usize + path_index as usize) % SHARED_PATH_LEN as usize;
        self.common_path[absolute]
    }

    /// Home stretch cell `step` (0-4) of a color
    pub fn home_stretch(&self, color: Color, step: u8) -> Coord {
        self.home_stretches[color.seat() as usize][step as usize]
    }

    /// Whether a cell is a safe zone
    pub fn is_safe(&self, coord: &Coord) -> bool {
        self.safe_zones.contains(coord)
    }

    /// Resolve a board cell from a piece's placement.
    ///
    /// Pieces at home (waiting or finished) rest in their own base slot. Path
    /// indices below 52 are on the shared loop, 52-56 on the home stretch.
    pub fn position_of(&self, color: Color, slot: usize, is_home: bool, path_index: u8) -> Coord {
        if is_home {
            return color.base_slot(slot);
        }
        if path_index < SHARED_PATH_LEN {
            self.shared_position(color, path_index)
        } else {
            let step = (path_index - SHARED_PATH_LEN).min(HOME_STRETCH_LEN - 1);
            self.home_stretch(color, step)
        }
    }
}
