//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, RoomStatus, ServerMessage};
use crate::room::{GameRoom, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use ludo_core::sync::{seat_key, Intent, PieceSnapshot, TurnSnapshot};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Length of a room code
const ROOM_CODE_LEN: usize = 4;

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms by code
    pub rooms: DashMap<String, GameRoom>,
    /// Mapping from connection ID to its room code
    pub player_rooms: DashMap<Uuid, String>,
    /// Mapping from connection ID to its message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to all players in a room.
    ///
    /// Must not be called while holding a guard on that room.
    pub fn broadcast_to_room(&self, room_code: &str, msg: ServerMessage) {
        let connections = match self.rooms.get(room_code) {
            Some(room) => room.connections(),
            None => return,
        };
        for player_id in connections {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Broadcast the roster of a room.
    pub fn broadcast_roster(&self, room_code: &str) {
        let roster = match self.rooms.get(room_code) {
            Some(room) => roster_message(&room),
            None => return,
        };
        self.broadcast_to_room(room_code, roster);
    }

    /// Pick an unused room code: four uppercase letters or digits.
    pub fn new_room_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(ROOM_CODE_LEN)
                .map(|b| char::from(b).to_ascii_uppercase())
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// Room code the connection is seated in
    fn room_of(&self, player_id: Uuid) -> Result<String, RoomError> {
        self.player_rooms
            .get(&player_id)
            .map(|code| code.value().clone())
            .ok_or(RoomError::PlayerNotInRoom)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

fn roster_message(room: &GameRoom) -> ServerMessage {
    ServerMessage::Roster {
        players: room.roster(),
        host: room.host_key(),
        status: room.status,
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Ludo server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(connection_id, tx);

    let welcome = ServerMessage::Welcome { connection_id };
    ws_sender
        .send(Message::Text(serde_json::to_string(&welcome)?.into()))
        .await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(connection_id, client_msg, &state),
                Err(e) => warn!("Invalid message from {}: {}", connection_id, e),
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", connection_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(connection_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", connection_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(connection_id, &state);
    state.player_senders.remove(&connection_id);
    send_task.abort();

    info!("Connection closed for {}", connection_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    let result = match msg {
        ClientMessage::CreateRoom { player_name } => {
            create_room(player_id, player_name, state);
            Ok(())
        }
        ClientMessage::JoinRoom {
            room_code,
            player_name,
        } => join_room(player_id, &room_code, player_name, state),
        ClientMessage::LeaveRoom => {
            leave_room(player_id, state);
            Ok(())
        }
        ClientMessage::SetReady { ready } => set_ready(player_id, ready, state),
        ClientMessage::PublishTurn { turn } => publish_turn(player_id, turn, state),
        ClientMessage::PublishPieces { pieces } => publish_pieces(player_id, pieces, state),
        ClientMessage::SendIntent { intent } => send_intent(player_id, intent, state),
        ClientMessage::Chat { message } => chat(player_id, message, state),
        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
            Ok(())
        }
    };

    if let Err(e) = result {
        debug!("Request from {} refused: {}", player_id, e);
        state.send_to_player(
            player_id,
            ServerMessage::Error {
                message: e.to_string(),
            },
        );
    }
}

fn create_room(player_id: Uuid, player_name: String, state: &Arc<ServerState>) {
    // One room per connection
    leave_room(player_id, state);

    let room_code = state.new_room_code();
    let room = GameRoom::new(room_code.clone(), player_id, player_name);
    let roster = roster_message(&room);
    info!("Room {} created by {}", room.code, player_id);

    state.rooms.insert(room_code.clone(), room);
    state.player_rooms.insert(player_id, room_code.clone());

    state.send_to_player(
        player_id,
        ServerMessage::JoinedRoom {
            room_code,
            player_id: seat_key(0),
            color: ludo_core::Color::Red,
            is_host: true,
        },
    );
    state.send_to_player(player_id, roster);
}

fn join_room(
    player_id: Uuid,
    room_code: &str,
    player_name: String,
    state: &Arc<ServerState>,
) -> Result<(), RoomError> {
    let room_code = room_code.trim().to_ascii_uppercase();

    // Seat first so a refused join leaves the current room untouched
    let (joined, seated, turn, pieces) = {
        let mut room = state
            .rooms
            .get_mut(&room_code)
            .ok_or(RoomError::RoomNotFound)?;
        let player = room.add_player(player_id, player_name)?;
        let (key, color) = (player.key(), player.color());
        let joined = ServerMessage::JoinedRoom {
            room_code: room_code.clone(),
            player_id: key,
            color,
            is_host: room.is_host(player_id),
        };
        (
            joined,
            room.player_count(),
            room.turn.clone(),
            room.pieces.clone(),
        )
    };

    if state
        .room_of(player_id)
        .is_ok_and(|previous| previous != room_code)
    {
        leave_room(player_id, state);
    }
    state.player_rooms.insert(player_id, room_code.clone());
    info!("{} joined room {} ({} seated)", player_id, room_code, seated);

    state.send_to_player(player_id, joined);
    if let Some(turn) = turn {
        state.send_to_player(player_id, ServerMessage::TurnState { turn });
    }
    if let Some(pieces) = pieces {
        state.send_to_player(player_id, ServerMessage::Pieces { pieces });
    }
    state.broadcast_roster(&room_code);
    Ok(())
}

fn leave_room(player_id: Uuid, state: &Arc<ServerState>) {
    if let Some((_, room_code)) = state.player_rooms.remove(&player_id) {
        depart(player_id, &room_code, state);
        state.send_to_player(player_id, ServerMessage::LeftRoom);
    }
}

fn set_ready(player_id: Uuid, ready: bool, state: &Arc<ServerState>) -> Result<(), RoomError> {
    let room_code = state.room_of(player_id)?;
    state
        .rooms
        .get_mut(&room_code)
        .ok_or(RoomError::RoomNotFound)?
        .set_ready(player_id, ready)?;

    state.broadcast_roster(&room_code);
    Ok(())
}

fn publish_turn(
    player_id: Uuid,
    turn: TurnSnapshot,
    state: &Arc<ServerState>,
) -> Result<(), RoomError> {
    let room_code = state.room_of(player_id)?;
    let status_changed = state
        .rooms
        .get_mut(&room_code)
        .ok_or(RoomError::RoomNotFound)?
        .write_turn(player_id, turn.clone())?;

    state.broadcast_to_room(&room_code, ServerMessage::TurnState { turn });
    if status_changed {
        info!("Room {} changed status", room_code);
        state.broadcast_roster(&room_code);
    }
    Ok(())
}

fn publish_pieces(
    player_id: Uuid,
    pieces: PieceSnapshot,
    state: &Arc<ServerState>,
) -> Result<(), RoomError> {
    let room_code = state.room_of(player_id)?;
    state
        .rooms
        .get_mut(&room_code)
        .ok_or(RoomError::RoomNotFound)?
        .write_pieces(player_id, pieces.clone())?;

    state.broadcast_to_room(&room_code, ServerMessage::Pieces { pieces });
    Ok(())
}

fn send_intent(player_id: Uuid, intent: Intent, state: &Arc<ServerState>) -> Result<(), RoomError> {
    let room_code = state.room_of(player_id)?;
    let (from, host) = {
        let room = state
            .rooms
            .get(&room_code)
            .ok_or(RoomError::RoomNotFound)?;
        let player = room.player(player_id).ok_or(RoomError::PlayerNotInRoom)?;
        (player.key(), room.host)
    };

    state.send_to_player(host, ServerMessage::Intent { from, intent });
    Ok(())
}

fn chat(player_id: Uuid, message: String, state: &Arc<ServerState>) -> Result<(), RoomError> {
    let room_code = state.room_of(player_id)?;
    let player_name = state
        .rooms
        .get(&room_code)
        .and_then(|r| r.player(player_id).map(|p| p.name.clone()))
        .unwrap_or_else(|| "Unknown".to_string());

    state.broadcast_to_room(
        &room_code,
        ServerMessage::ChatMessage {
            player_name,
            message,
        },
    );
    Ok(())
}

/// Take a connection out of its room: its seat is freed while the room is
/// waiting, and it is only marked as dropped once a game is under way.
fn depart(player_id: Uuid, room_code: &str, state: &Arc<ServerState>) {
    let remove_room = {
        let Some(mut room) = state.rooms.get_mut(room_code) else {
            return;
        };
        if room.status == RoomStatus::Waiting {
            room.remove_player(player_id).unwrap_or(false)
        } else {
            room.set_player_connected(player_id, false)
        }
    };

    if remove_room {
        state.rooms.remove(room_code);
        info!("Room {} closed", room_code);
    } else {
        state.broadcast_roster(room_code);
    }
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    if let Some((_, room_code)) = state.player_rooms.remove(&player_id) {
        depart(player_id, &room_code, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludo_core::{Color, GameState};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connect(state: &Arc<ServerState>) -> (Uuid, UnboundedReceiver<ServerMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.player_senders.insert(id, tx);
        (id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn create(state: &Arc<ServerState>, id: Uuid) -> String {
        handle_message(
            id,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
            },
            state,
        );
        state.room_of(id).unwrap()
    }

    fn join(state: &Arc<ServerState>, id: Uuid, code: &str) {
        handle_message(
            id,
            ClientMessage::JoinRoom {
                room_code: code.into(),
                player_name: "Guest".into(),
            },
            state,
        );
    }

    fn errors(msgs: &[ServerMessage]) -> Vec<String> {
        msgs.iter()
            .filter_map(|m| match m {
                ServerMessage::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_room_codes() {
        let state = ServerState::new();
        for _ in 0..50 {
            let code = state.new_room_code();
            assert_eq!(code.len(), 4);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_create_and_join() {
        let state = Arc::new(ServerState::new());
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);

        let code = create(&state, host);
        let msgs = drain(&mut host_rx);
        assert!(matches!(
            &msgs[0],
            ServerMessage::JoinedRoom { is_host: true, .. }
        ));

        join(&state, guest, &code.to_lowercase());
        let msgs = drain(&mut guest_rx);
        match &msgs[0] {
            ServerMessage::JoinedRoom {
                room_code,
                player_id,
                color,
                is_host,
            } => {
                assert_eq!(room_code, &code);
                assert_eq!(player_id, "player2");
                assert_eq!(*color, Color::Blue);
                assert!(!is_host);
            }
            other => panic!("unexpected {:?}", other),
        }

        // The host hears about the new roster
        let msgs = drain(&mut host_rx);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Roster { players, .. } if players.len() == 2
        )));
    }

    #[test]
    fn test_join_errors() {
        let state = Arc::new(ServerState::new());
        let (host, _host_rx) = connect(&state);
        let code = create(&state, host);

        let (lost, mut lost_rx) = connect(&state);
        join(&state, lost, "ZZZZ9");
        assert_eq!(errors(&drain(&mut lost_rx)), vec!["Room not found"]);

        for _ in 0..3 {
            let (id, _rx) = connect(&state);
            join(&state, id, &code);
        }
        let (late, mut late_rx) = connect(&state);
        join(&state, late, &code);
        assert_eq!(errors(&drain(&mut late_rx)), vec!["Room is full"]);
    }

    #[test]
    fn test_refused_join_keeps_current_seat() {
        let state = Arc::new(ServerState::new());
        let (host, _host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        let code = create(&state, host);
        join(&state, guest, &code);
        drain(&mut guest_rx);

        join(&state, guest, "NOPE");

        let full = {
            let (owner, _rx) = connect(&state);
            let full = create(&state, owner);
            for _ in 0..3 {
                let (id, _rx) = connect(&state);
                join(&state, id, &full);
            }
            full
        };
        join(&state, guest, &full);

        let msgs = drain(&mut guest_rx);
        assert_eq!(errors(&msgs), vec!["Room not found", "Room is full"]);
        assert!(!msgs.iter().any(|m| matches!(m, ServerMessage::LeftRoom)));
        assert_eq!(state.room_of(guest), Ok(code.clone()));

        let room = state.rooms.get(&code).unwrap();
        assert_eq!(room.player_count(), 2);
        assert_eq!(room.player(guest).unwrap().seat, 1);
        assert!(room.is_host(host));
    }

    #[test]
    fn test_join_moves_between_rooms() {
        let state = Arc::new(ServerState::new());
        let (first, _first_rx) = connect(&state);
        let (second, _second_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        let old = create(&state, first);
        let new = create(&state, second);
        join(&state, guest, &old);

        // Joining the room we already sit in keeps the seat
        join(&state, guest, &old);
        assert_eq!(state.rooms.get(&old).unwrap().player_count(), 2);
        drain(&mut guest_rx);

        join(&state, guest, &new);
        let msgs = drain(&mut guest_rx);
        assert!(matches!(msgs[0], ServerMessage::LeftRoom));
        assert!(matches!(msgs[1], ServerMessage::JoinedRoom { .. }));
        assert_eq!(state.room_of(guest), Ok(new.clone()));
        assert_eq!(state.rooms.get(&old).unwrap().player_count(), 1);
        assert_eq!(state.rooms.get(&new).unwrap().player_count(), 2);
    }

    #[test]
    fn test_only_host_publishes() {
        let state = Arc::new(ServerState::new());
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        let code = create(&state, host);
        join(&state, guest, &code);
        drain(&mut host_rx);
        drain(&mut guest_rx);

        let game = GameState::new_all_human();
        handle_message(
            guest,
            ClientMessage::PublishTurn {
                turn: game.turn_snapshot(true),
            },
            &state,
        );
        assert_eq!(
            errors(&drain(&mut guest_rx)),
            vec!["Only the host can write game state"]
        );

        handle_message(
            host,
            ClientMessage::PublishPieces {
                pieces: game.piece_snapshot(),
            },
            &state,
        );
        handle_message(
            host,
            ClientMessage::PublishTurn {
                turn: game.turn_snapshot(true),
            },
            &state,
        );
        let msgs = drain(&mut guest_rx);
        assert!(matches!(msgs[0], ServerMessage::Pieces { .. }));
        assert!(matches!(msgs[1], ServerMessage::TurnState { .. }));
        assert!(matches!(
            msgs[2],
            ServerMessage::Roster {
                status: RoomStatus::InGame,
                ..
            }
        ));

        // No joining once the game is running
        let (late, mut late_rx) = connect(&state);
        join(&state, late, &code);
        assert_eq!(errors(&drain(&mut late_rx)), vec!["Game already started"]);
    }

    #[test]
    fn test_intent_goes_to_host_only() {
        let state = Arc::new(ServerState::new());
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        let code = create(&state, host);
        join(&state, guest, &code);
        drain(&mut host_rx);
        drain(&mut guest_rx);

        handle_message(
            guest,
            ClientMessage::SendIntent {
                intent: Intent::Move(1),
            },
            &state,
        );

        let msgs = drain(&mut host_rx);
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            ServerMessage::Intent { from, intent } => {
                assert_eq!(from, "player2");
                assert_eq!(*intent, Intent::Move(1));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(drain(&mut guest_rx).is_empty());
    }

    #[test]
    fn test_host_drop_mid_game_hands_over_intents() {
        let state = Arc::new(ServerState::new());
        let (host, _host_rx) = connect(&state);
        let (second, mut second_rx) = connect(&state);
        let (third, _third_rx) = connect(&state);
        let code = create(&state, host);
        join(&state, second, &code);
        join(&state, third, &code);
        handle_message(
            host,
            ClientMessage::PublishTurn {
                turn: GameState::new_all_human().turn_snapshot(true),
            },
            &state,
        );
        drain(&mut second_rx);

        handle_disconnect(host, &state);
        let msgs = drain(&mut second_rx);
        match msgs.last() {
            Some(ServerMessage::Roster { players, host, .. }) => {
                assert_eq!(host, "player2");
                assert!(!players[0].connected);
                assert!(players[1].connected && players[2].connected);
            }
            other => panic!("unexpected {:?}", other),
        }

        handle_message(
            third,
            ClientMessage::SendIntent {
                intent: Intent::Roll,
            },
            &state,
        );
        let msgs = drain(&mut second_rx);
        assert!(matches!(
            &msgs[..],
            [ServerMessage::Intent { from, intent: Intent::Roll }] if from == "player3"
        ));
    }

    #[test]
    fn test_ready_and_leave() {
        let state = Arc::new(ServerState::new());
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        let code = create(&state, host);
        join(&state, guest, &code);

        handle_message(guest, ClientMessage::SetReady { ready: true }, &state);
        assert!(state.rooms.get(&code).unwrap().player(guest).unwrap().ready);

        handle_message(host, ClientMessage::LeaveRoom, &state);
        assert!(drain(&mut host_rx)
            .iter()
            .any(|m| matches!(m, ServerMessage::LeftRoom)));
        assert!(state.rooms.get(&code).unwrap().is_host(guest));

        let msgs = drain(&mut guest_rx);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Roster { host, .. } if host == "player2"
        )));

        handle_disconnect(guest, &state);
        assert!(state.rooms.get(&code).is_none());
    }

    #[test]
    fn test_not_in_room() {
        let state = Arc::new(ServerState::new());
        let (id, mut rx) = connect(&state);
        handle_message(id, ClientMessage::SetReady { ready: true }, &state);
        handle_message(id, ClientMessage::Ping, &state);
        let msgs = drain(&mut rx);
        assert_eq!(errors(&msgs), vec!["Player not in room"]);
        assert!(matches!(msgs[1], ServerMessage::Pong));
    }
}
