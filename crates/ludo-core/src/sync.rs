//! Multiplayer synchronization.
//!
//! A room in the shared store holds three projections: the roster (who sits
//! where and whether they are ready), the turn snapshot, and the piece
//! snapshot. The host is the single writer of the last two: it runs the
//! authoritative [`GameState`] and publishes both after every change. Other
//! participants only apply what they receive and forward their own roll and
//! move requests to the host as [`Intent`]s.
//!
//! Publishing is fire-and-forget. A failed write is logged and the game
//! carries on; the next successful publish replaces the stale projection.

use crate::actions::{GameAction, GameEvent};
use crate::board::{Color, Coord, PlayerId, PLAYER_COUNT};
use crate::bot::{Bot, FirstMovable};
use crate::dice::DiceRoller;
use crate::game::{GameState, TurnState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Roster keys are `player1` through `player4`
const SEAT_KEY_PREFIX: &str = "player";

/// Upper bound on actions taken for unseated colors in one go
const AI_ACTION_LIMIT: usize = 100_000;

/// Errors raised by the sync layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Missing room code or player id for this session")]
    MissingSession,

    #[error("Store write failed: {0}")]
    Transport(String),

    #[error("Only the host can do that")]
    NotHost,

    #[error("Player id does not name a seat")]
    UnknownSeat,
}

/// Roster key for a seat
pub fn seat_key(seat: PlayerId) -> String {
    format!("{}{}", SEAT_KEY_PREFIX, seat as usize + 1)
}

/// Seat named by a roster key, if any
pub fn seat_from_key(key: &str) -> Option<PlayerId> {
    let n: usize = key.strip_prefix(SEAT_KEY_PREFIX)?.parse().ok()?;
    (1..=PLAYER_COUNT).contains(&n).then(|| (n - 1) as PlayerId)
}

/// Who this participant is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub room_code: String,
    pub player_id: String,
    pub is_host: bool,
}

impl SessionContext {
    /// Build the context from whatever the client stored when joining.
    /// A session without a room or a player id cannot start.
    pub fn new(
        room_code: Option<String>,
        player_id: Option<String>,
        is_host: bool,
    ) -> Result<Self, SyncError> {
        let room_code = room_code
            .filter(|s| !s.is_empty())
            .ok_or(SyncError::MissingSession)?;
        let player_id = player_id
            .filter(|s| !s.is_empty())
            .ok_or(SyncError::MissingSession)?;

        Ok(Self {
            room_code,
            player_id,
            is_host,
        })
    }

    /// The seat this participant occupies
    pub fn seat(&self) -> Option<PlayerId> {
        seat_from_key(&self.player_id)
    }
}

/// One seated participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Roster key, `player1`..`player4`
    pub id: String,
    pub name: String,
    pub color: Color,
    pub ready: bool,
    /// False once the participant dropped out of a running game
    #[serde(default = "connected_by_default")]
    pub connected: bool,
}

fn connected_by_default() -> bool {
    true
}

impl RosterEntry {
    pub fn seat(&self) -> Option<PlayerId> {
        seat_from_key(&self.id)
    }
}

/// The turn projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnSnapshot {
    pub current_player_id: PlayerId,
    pub dice_value: Option<u8>,
    pub started: bool,
    #[serde(default)]
    pub winner: Option<PlayerId>,
}

/// Placement of one piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceState {
    pub position: Coord,
    pub is_home: bool,
    pub path_index: u8,
    #[serde(default)]
    pub finished: bool,
}

/// The piece projection, keyed by piece id
pub type PieceSnapshot = BTreeMap<String, PieceState>;

/// A request a participant sends to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Roll,
    Move(u8),
}

impl From<Intent> for GameAction {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Roll => GameAction::RollDice,
            Intent::Move(piece) => GameAction::MovePiece(piece),
        }
    }
}

/// Updates arriving from the shared store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Everyone seated, and the roster key of the current host
    Roster {
        players: Vec<RosterEntry>,
        host: String,
    },
    Turn(TurnSnapshot),
    Pieces(PieceSnapshot),
    Intent { from: String, intent: Intent },
}

/// Writes to the shared store
pub trait SyncPublisher {
    fn publish_turn(&mut self, turn: &TurnSnapshot) -> Result<(), SyncError>;
    fn publish_pieces(&mut self, pieces: &PieceSnapshot) -> Result<(), SyncError>;
    fn publish_ready(&mut self, ready: bool) -> Result<(), SyncError>;
    fn send_intent(&mut self, intent: Intent) -> Result<(), SyncError>;
}

// ==================== Snapshots ====================

impl GameState {
    /// Current placement of every piece
    pub fn piece_snapshot(&self) -> PieceSnapshot {
        self.players
            .iter()
            .flat_map(|p| p.pieces.iter())
            .map(|piece| {
                (
                    piece.id.clone(),
                    PieceState {
                        position: piece.position,
                        is_home: piece.is_home,
                        path_index: piece.path_index,
                        finished: piece.finished,
                    },
                )
            })
            .collect()
    }

    /// Replace every piece's placement with the snapshot.
    ///
    /// Pieces the snapshot does not mention go back to base. Positions are
    /// always recomputed; a stored position that disagrees is logged and ignored.
    pub fn apply_piece_snapshot(&mut self, snapshot: &PieceSnapshot) {
        let board = self.board();
        for piece in self.players.iter_mut().flat_map(|p| p.pieces.iter_mut()) {
            match snapshot.get(&piece.id) {
                Some(state) => {
                    piece.set_placement(board, state.is_home, state.finished, state.path_index);
                    if piece.position != state.position {
                        warn!(
                            piece = %piece.id,
                            stored = ?state.position,
                            computed = ?piece.position,
                            "Piece position disagrees with its path index"
                        );
                    }
                }
                None => piece.send_home(board),
            }
        }
    }

    /// Current turn projection
    pub fn turn_snapshot(&self, started: bool) -> TurnSnapshot {
        TurnSnapshot {
            current_player_id: self.current_player,
            dice_value: self.dice_value,
            started,
            winner: self.get_winner(),
        }
    }

    /// Adopt a turn projection written by the host
    pub fn apply_turn_snapshot(&mut self, snapshot: &TurnSnapshot) {
        self.current_player = snapshot.current_player_id % PLAYER_COUNT as PlayerId;
        self.dice_value = snapshot.dice_value.map(|v| v.clamp(1, 6));

        self.turn_state = match (snapshot.winner, self.dice_value) {
            (Some(winner), _) => TurnState::Finished {
                winner: winner % PLAYER_COUNT as PlayerId,
            },
            (None, None) => TurnState::AwaitingRoll,
            (None, Some(_)) if self.movable_pieces(self.current_player).is_empty() => {
                TurnState::TurnComplete
            }
            (None, Some(_)) => TurnState::AwaitingMove,
        };
    }
}

// ==================== Session ====================

/// A participant in a multiplayer room
pub struct MultiplayerSession<P: SyncPublisher, D: DiceRoller> {
    context: SessionContext,
    state: GameState,
    roster: Vec<RosterEntry>,
    started: bool,
    publisher: P,
    dice: D,
}

impl<P: SyncPublisher, D: DiceRoller> MultiplayerSession<P, D> {
    pub fn new(context: SessionContext, publisher: P, dice: D) -> Self {
        Self {
            context,
            state: GameState::new_all_human(),
            roster: Vec::new(),
            started: false,
            publisher,
            dice,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// At least two participants, all of them ready
    pub fn everyone_ready(&self) -> bool {
        self.roster.len() >= 2 && self.roster.iter().all(|e| e.ready)
    }

    /// Write our own ready flag
    pub fn set_ready(&mut self, ready: bool) {
        if let Err(e) = self.publisher.publish_ready(ready) {
            warn!(player = %self.context.player_id, "Failed to publish ready flag: {}", e);
        }
    }

    /// Apply one update from the store, returning any events the host produced
    pub fn handle(&mut self, message: SyncMessage) -> Vec<GameEvent> {
        match message {
            SyncMessage::Roster { players, host } => {
                self.roster = players;
                if !self.context.is_host && host == self.context.player_id {
                    info!(
                        room = %self.context.room_code,
                        player = %self.context.player_id,
                        "Taking over as host"
                    );
                    self.context.is_host = true;
                }
                self.seat_roster();

                if !self.context.is_host {
                    Vec::new()
                } else if self.started {
                    self.resume()
                } else if self.everyone_ready() {
                    self.start().unwrap_or_default()
                } else {
                    Vec::new()
                }
            }

            SyncMessage::Turn(turn) => {
                if !self.context.is_host {
                    if turn.started && !self.started {
                        info!(room = %self.context.room_code, "Game started");
                    }
                    self.started |= turn.started;
                    self.state.apply_turn_snapshot(&turn);
                }
                Vec::new()
            }

            SyncMessage::Pieces(pieces) => {
                if !self.context.is_host {
                    self.state.apply_piece_snapshot(&pieces);
                }
                Vec::new()
            }

            SyncMessage::Intent { from, intent } => {
                if !self.context.is_host {
                    return Vec::new();
                }
                match seat_from_key(&from) {
                    Some(seat) => self.apply_intent(seat, intent),
                    None => {
                        warn!(from = %from, "Intent from unknown seat");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Start the game on the host once everyone is ready
    pub fn start(&mut self) -> Result<Vec<GameEvent>, SyncError> {
        if !self.context.is_host {
            return Err(SyncError::NotHost);
        }

        self.state = GameState::new_all_human();
        self.seat_roster();
        self.started = true;
        info!(
            room = %self.context.room_code,
            players = self.roster.len(),
            "Starting game"
        );

        let events = self.play_ai_turns();
        self.publish();
        Ok(events)
    }

    /// Roll for our own seat
    pub fn roll(&mut self) -> Result<Vec<GameEvent>, SyncError> {
        self.request(Intent::Roll)
    }

    /// Move one of our own pieces
    pub fn move_piece(&mut self, index: u8) -> Result<Vec<GameEvent>, SyncError> {
        self.request(Intent::Move(index))
    }

    // ==================== Helper Methods ====================

    fn request(&mut self, intent: Intent) -> Result<Vec<GameEvent>, SyncError> {
        let seat = self.context.seat().ok_or(SyncError::UnknownSeat)?;

        if self.context.is_host {
            return Ok(self.apply_intent(seat, intent));
        }

        if let Err(e) = self.publisher.send_intent(intent) {
            warn!(player = %self.context.player_id, ?intent, "Failed to send intent: {}", e);
        }
        Ok(Vec::new())
    }

    /// Connected participants play their own color; every other color is AI
    fn seat_roster(&mut self) {
        for player in self.state.players.iter_mut() {
            match self.roster.iter().find(|e| e.seat() == Some(player.id)) {
                Some(entry) => {
                    player.name = entry.name.clone();
                    player.is_ai = !entry.connected;
                }
                None => {
                    player.name = format!("Player {}", player.id as usize + 1);
                    player.is_ai = true;
                }
            }
        }
    }

    /// Host only: apply a participant's request if it is their turn
    fn apply_intent(&mut self, seat: PlayerId, intent: Intent) -> Vec<GameEvent> {
        if !self.started {
            debug!(seat, ?intent, "Ignoring intent before the game started");
            return Vec::new();
        }
        if seat != self.state.current_player {
            debug!(
                seat,
                current = self.state.current_player,
                "Ignoring intent from a seat that is not on turn"
            );
            return Vec::new();
        }

        let mut events = match self.state.apply_action_with(seat, intent.into(), &mut self.dice) {
            Ok(events) => events,
            Err(e) => {
                debug!(seat, ?intent, "Rejected intent: {}", e);
                return Vec::new();
            }
        };

        events.extend(self.end_turn_if_complete());
        events.extend(self.play_ai_turns());
        self.publish();
        events
    }

    /// Host only: carry on after the roster changed mid-game, playing any
    /// color that lost its participant
    fn resume(&mut self) -> Vec<GameEvent> {
        let mut events = self.end_turn_if_complete();
        events.extend(self.play_ai_turns());
        if !events.is_empty() {
            self.publish();
        }
        events
    }

    fn end_turn_if_complete(&mut self) -> Vec<GameEvent> {
        if self.state.turn_state != TurnState::TurnComplete {
            return Vec::new();
        }
        let player = self.state.current_player;
        self.state
            .apply_action_with(player, GameAction::EndTurn, &mut self.dice)
            .unwrap_or_default()
    }

    /// Play unseated colors until a participant is on turn
    fn play_ai_turns(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();

        for _ in 0..AI_ACTION_LIMIT {
            if self.state.is_finished() || !self.state.current().is_ai {
                return events;
            }

            let bot = Bot::with_policy(self.state.current_player, FirstMovable);
            let Some(action) = bot.choose_action(&self.state) else {
                return events;
            };
            match self
                .state
                .apply_action_with(bot.player_id, action, &mut self.dice)
            {
                Ok(batch) => events.extend(batch),
                Err(e) => {
                    warn!(seat = bot.player_id, ?action, "AI action rejected: {}", e);
                    return events;
                }
            }
        }

        warn!("Unseated colors stopped after {} actions", AI_ACTION_LIMIT);
        events
    }

    fn publish(&mut self) {
        let pieces = self.state.piece_snapshot();
        if let Err(e) = self.publisher.publish_pieces(&pieces) {
            warn!(room = %self.context.room_code, "Failed to publish pieces: {}", e);
        }

        let turn = self.state.turn_snapshot(self.started);
        if let Err(e) = self.publisher.publish_turn(&turn) {
            warn!(room = %self.context.room_code, "Failed to publish turn: {}", e);
        }
    }
}
