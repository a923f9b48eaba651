//! WebSocket protocol messages for Ludo multiplayer.

use ludo_core::sync::{Intent, PieceSnapshot, RosterEntry, TurnSnapshot};
use ludo_core::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Create a new room and take the first seat as host
    CreateRoom { player_name: String },

    /// Join an existing room by its code
    JoinRoom {
        room_code: String,
        player_name: String,
    },

    /// Leave current room
    LeaveRoom,

    /// Set our own ready flag
    SetReady { ready: bool },

    /// Replace the room's turn snapshot (host only)
    PublishTurn { turn: TurnSnapshot },

    /// Replace the room's piece snapshot (host only)
    PublishPieces { pieces: PieceSnapshot },

    /// Ask the host to roll or move for us
    SendIntent { intent: Intent },

    /// Send chat message
    Chat { message: String },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Welcome message with the connection's ID
    Welcome { connection_id: Uuid },

    /// Seated in a room
    JoinedRoom {
        room_code: String,
        player_id: String,
        color: Color,
        is_host: bool,
    },

    /// Left room successfully
    LeftRoom,

    /// Roster changed (join, leave, ready, host change)
    Roster {
        players: Vec<RosterEntry>,
        host: String,
        status: RoomStatus,
    },

    /// The room's turn snapshot
    TurnState { turn: TurnSnapshot },

    /// The room's piece snapshot
    Pieces { pieces: PieceSnapshot },

    /// A participant's request, delivered to the host only
    Intent { from: String, intent: Intent },

    /// Chat message received
    ChatMessage { player_name: String, message: String },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_client_message_shape() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"JoinRoom","payload":{"roomCode":"K3ZQ","playerName":"Ana"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::JoinRoom {
                room_code,
                player_name,
            } => {
                assert_eq!(room_code, "K3ZQ");
                assert_eq!(player_name, "Ana");
            }
            other => panic!("unexpected {:?}", other),
        }

        let ping: ClientMessage = serde_json::from_str(r#"{"type":"Ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));
    }

    #[test]
    fn test_intent_message_shape() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"SendIntent","payload":{"intent":{"Move":3}}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::SendIntent {
                intent: Intent::Move(3)
            }
        ));
    }

    #[test]
    fn test_server_message_shape() {
        let msg = ServerMessage::JoinedRoom {
            room_code: "AB12".into(),
            player_id: "player2".into(),
            color: Color::Blue,
            is_host: false,
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"JoinedRoom","payload":{"roomCode":"AB12","playerId":"player2","color":"blue","isHost":false}}"#
        );
    }
}
