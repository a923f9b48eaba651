//! Game room management.
//!
//! A room is the shared store for one game: the roster of seated players,
//! plus the turn and piece snapshots that only the host may write. The server
//! never runs the rules itself.

use ludo_core::sync::{seat_key, PieceSnapshot, RosterEntry, TurnSnapshot};
use ludo_core::{Color, PlayerId};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::RoomStatus;

/// Seats per room
pub const MAX_SEATS: PlayerId = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Only the host can write game state")]
    NotHost,
}

/// A player seated in a room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub connection: Uuid,
    pub seat: PlayerId,
    pub name: String,
    pub ready: bool,
    pub connected: bool,
}

impl RoomPlayer {
    pub fn new(connection: Uuid, seat: PlayerId, name: String) -> Self {
        Self {
            connection,
            seat,
            name,
            ready: false,
            connected: true,
        }
    }

    /// Roster key, `player1`..`player4`
    pub fn key(&self) -> String {
        seat_key(self.seat)
    }

    pub fn color(&self) -> Color {
        Color::for_player(self.seat)
    }

    pub fn to_entry(&self) -> RosterEntry {
        RosterEntry {
            id: self.key(),
            name: self.name.clone(),
            color: self.color(),
            ready: self.ready,
            connected: self.connected,
        }
    }
}

/// A room holding up to four seated players.
pub struct GameRoom {
    pub code: String,
    pub host: Uuid,
    pub status: RoomStatus,
    /// Seated players by seat
    pub players: BTreeMap<PlayerId, RoomPlayer>,
    pub turn: Option<TurnSnapshot>,
    pub pieces: Option<PieceSnapshot>,
}

impl GameRoom {
    pub fn new(code: String, host: Uuid, host_name: String) -> Self {
        let mut players = BTreeMap::new();
        players.insert(0, RoomPlayer::new(host, 0, host_name));

        Self {
            code,
            host,
            status: RoomStatus::Waiting,
            players,
            turn: None,
            pieces: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_SEATS as usize
    }

    pub fn is_host(&self, connection: Uuid) -> bool {
        self.host == connection
    }

    /// Find a player by connection
    pub fn player(&self, connection: Uuid) -> Option<&RoomPlayer> {
        self.players.values().find(|p| p.connection == connection)
    }

    fn player_mut(&mut self, connection: Uuid) -> Option<&mut RoomPlayer> {
        self.players.values_mut().find(|p| p.connection == connection)
    }

    /// Connections of everyone in the room
    pub fn connections(&self) -> Vec<Uuid> {
        self.players.values().map(|p| p.connection).collect()
    }

    /// Roster key of the current host
    pub fn host_key(&self) -> String {
        self.player(self.host).map(|p| p.key()).unwrap_or_default()
    }

    /// Seat a new player in the first free seat. A connection that is
    /// already seated keeps its seat.
    pub fn add_player(
        &mut self,
        connection: Uuid,
        name: String,
    ) -> Result<&RoomPlayer, RoomError> {
        if let Some(seat) = self.player(connection).map(|p| p.seat) {
            return self.players.get(&seat).ok_or(RoomError::PlayerNotInRoom);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        let seat = (0..MAX_SEATS)
            .find(|s| !self.players.contains_key(s))
            .ok_or(RoomError::RoomFull)?;

        Ok(self
            .players
            .entry(seat)
            .or_insert_with(|| RoomPlayer::new(connection, seat, name)))
    }

    /// Free a player's seat. Returns true if the room is now empty.
    pub fn remove_player(&mut self, connection: Uuid) -> Result<bool, RoomError> {
        let seat = self
            .player(connection)
            .map(|p| p.seat)
            .ok_or(RoomError::PlayerNotInRoom)?;
        self.players.remove(&seat);

        if connection == self.host {
            self.reassign_host();
        }

        Ok(self.players.is_empty())
    }

    /// Mark a player as dropped or back. Returns true if nobody is connected.
    pub fn set_player_connected(&mut self, connection: Uuid, connected: bool) -> bool {
        if let Some(player) = self.player_mut(connection) {
            player.connected = connected;
        }
        if !connected && connection == self.host {
            self.reassign_host();
        }
        !self.players.values().any(|p| p.connected)
    }

    /// Hand the host role to the lowest connected seat
    fn reassign_host(&mut self) {
        if let Some(next) = self
            .players
            .values()
            .find(|p| p.connected && p.connection != self.host)
        {
            self.host = next.connection;
        }
    }

    /// Write the caller's own ready flag
    pub fn set_ready(&mut self, connection: Uuid, ready: bool) -> Result<(), RoomError> {
        let player = self
            .player_mut(connection)
            .ok_or(RoomError::PlayerNotInRoom)?;
        player.ready = ready;
        Ok(())
    }

    /// At least two players, all of them ready
    pub fn all_ready(&self) -> bool {
        self.players.len() >= 2 && self.players.values().all(|p| p.ready)
    }

    /// Replace the turn snapshot. Returns true if the room status changed.
    pub fn write_turn(
        &mut self,
        connection: Uuid,
        turn: TurnSnapshot,
    ) -> Result<bool, RoomError> {
        self.check_host(connection)?;

        let status = if turn.winner.is_some() {
            RoomStatus::Finished
        } else if turn.started {
            RoomStatus::InGame
        } else {
            self.status
        };
        let changed = status != self.status;

        self.status = status;
        self.turn = Some(turn);
        Ok(changed)
    }

    /// Replace the piece snapshot
    pub fn write_pieces(
        &mut self,
        connection: Uuid,
        pieces: PieceSnapshot,
    ) -> Result<(), RoomError> {
        self.check_host(connection)?;
        self.pieces = Some(pieces);
        Ok(())
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players.values().map(|p| p.to_entry()).collect()
    }

    fn check_host(&self, connection: Uuid) -> Result<(), RoomError> {
        if self.player(connection).is_none() {
            return Err(RoomError::PlayerNotInRoom);
        }
        if !self.is_host(connection) {
            return Err(RoomError::NotHost);
        }
        Ok(())
    }
}
