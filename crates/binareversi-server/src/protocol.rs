//! WebSocket protocol messages for Binary Reversi.
//!
//! Every frame is one JSON object with a `type` field. Inbound frames are
//! decoded in two steps so that an unknown `type` and a known `type` with bad
//! fields produce different errors.

use binareversi_core::{BoardView, Color, Winner};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid JSON")]
    InvalidJson,

    #[error("missing or invalid type")]
    MissingType,

    #[error("invalid {kind} message: {reason}")]
    Malformed { kind: String, reason: String },

    #[error("unknown message type")]
    UnknownMessageType(String),
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the current view of the game
    Join,

    /// Place a disc
    Move { x: i32, y: i32 },

    /// Rewrite a row with `+` or `*`
    Operation {
        row: i32,
        value: u32,
        operator: String,
    },

    /// Skip this turn
    Pass,

    /// Concede the game
    Surrender,

    /// Request the legal-move overlay
    GetValidMoves,

    /// Request remaining quotas
    GetStatus,

    /// Delete the room
    ExitRoom,
}

impl ClientMessage {
    /// Every recognised value of the `type` field
    pub const TYPES: [&'static str; 8] = [
        "join",
        "move",
        "operation",
        "pass",
        "surrender",
        "get_valid_moves",
        "get_status",
        "exit_room",
    ];

    /// Decode one text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();
        if !Self::TYPES.contains(&kind.as_str()) {
            return Err(ProtocolError::UnknownMessageType(kind));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed {
            kind,
            reason: e.to_string(),
        })
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to `join`
    GameStart {
        #[serde(rename = "playerID")]
        player_id: String,
        #[serde(rename = "yourColor")]
        your_color: Color,
        board: BoardView,
        #[serde(rename = "currentTurn")]
        current_turn: u32,
        #[serde(rename = "isYourTurn")]
        is_your_turn: bool,
    },

    /// Board after a move; overlay and flag are per recipient
    BoardUpdate {
        board: BoardView,
        #[serde(rename = "currentTurn")]
        current_turn: u32,
        #[serde(rename = "isYourTurn")]
        is_your_turn: bool,
    },

    /// Legal-move overlay for the requester
    ValidMoves { moves_map: BoardView },

    /// Remaining quotas for the requester
    StatusInfo {
        remaining_plus: u8,
        remaining_mul: u8,
        remaining_pass: u8,
    },

    /// Game finished
    GameOver { winner: Winner },

    /// Room deleted on the requester's behalf
    ExitedRoom {
        #[serde(rename = "roomID")]
        room_id: String,
        #[serde(rename = "playerID")]
        player_id: String,
    },

    /// Request failed; only the sender sees this
    Error { error: String },
}

impl ServerMessage {
    pub fn error(err: impl std::fmt::Display) -> Self {
        ServerMessage::Error {
            error: err.to_string(),
        }
    }
}
