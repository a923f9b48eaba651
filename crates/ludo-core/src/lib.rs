//! Ludo - a four-seat Ludo game engine
//!
//! This crate provides the core game logic, including:
//! - The cross-shaped board path with safe zones and home stretches
//! - Piece and player state
//! - Turn state machine with capture and win rules
//! - A simple AI policy and injectable dice
//!
//! # Architecture
//!
//! The game engine is designed to be platform-agnostic. It can be compiled to:
//! - Native Rust, driven by [`session::LocalGame`] or a multiplayer host
//! - WebAssembly for the browser client (feature `wasm`)
//!
//! # Modules
//!
//! - [`board`]: Board geometry, colors and coordinates
//! - [`player`]: Piece placement and player state
//! - [`game`]: Game state machine
//! - [`bot`]: AI piece selection
//! - [`dice`]: Dice sources and the rolling animation
//! - [`session`]: Local game driver with renderer and audio hooks
//! - [`sync`]: Snapshot publication and application for multiplayer

pub mod actions;
pub mod board;
pub mod bot;
pub mod dice;
pub mod game;
pub mod player;
pub mod session;
pub mod sync;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{AudioCue, GameAction, GameEvent};
pub use board::{BoardPath, Color, Coord, PlayerId};
pub use bot::{Bot, FirstMovable, PiecePolicy};
pub use dice::{DiceRoller, FixedDice, RandomDice};
pub use game::{GameError, GameState, PlayerSetup, TurnState};
pub use player::{Piece, PieceLocation, Player};
pub use session::{Audio, AudioSink, LocalGame, Renderer};
pub use sync::{
    Intent, MultiplayerSession, PieceSnapshot, PieceState, RosterEntry, SessionContext,
    SyncError, SyncMessage, SyncPublisher, TurnSnapshot,
};
