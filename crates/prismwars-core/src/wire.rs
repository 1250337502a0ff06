// Wire protocol between the client and the game authority.
//
// Every frame is a JSON text message of the form
// `{"event": "<name>", "data": {...}}`. Components produce `GameCommand`s,
// which carry no identity; the connection layer stamps them with the
// session's `SessionIds` to build the outbound `ClientMessage`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::{GameSnapshot, PieceKind, Rotation, ScoreBreakdown, ScoreEntry, TerritoryGrid};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed server message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Identity attached to every outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIds {
    pub game_id: String,
    pub player_id: String,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A request to the authority, before identity is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    JoinRoom,
    Heartbeat,
    PlacePiece {
        x: usize,
        y: usize,
        kind: PieceKind,
        rotation: Rotation,
    },
    PickupPiece {
        x: usize,
        y: usize,
    },
    PassTurn,
    CancelPairedPlacement,
    RequestPreview {
        x: usize,
        y: usize,
        kind: PieceKind,
        rotation: Rotation,
        request_id: u64,
    },
}

impl GameCommand {
    pub fn stamp(self, ids: &SessionIds) -> ClientMessage {
        let game_id = ids.game_id.clone();
        let player_id = ids.player_id.clone();
        match self {
            GameCommand::JoinRoom => ClientMessage::JoinGameRoom { game_id, player_id },
            GameCommand::Heartbeat => ClientMessage::Heartbeat { game_id, player_id },
            GameCommand::PlacePiece {
                x,
                y,
                kind,
                rotation,
            } => ClientMessage::PlacePiece {
                game_id,
                player_id,
                x,
                y,
                piece_type: kind,
                rotation,
            },
            GameCommand::PickupPiece { x, y } => ClientMessage::PickupPiece {
                game_id,
                player_id,
                x,
                y,
            },
            GameCommand::PassTurn => ClientMessage::PassTurn { game_id, player_id },
            GameCommand::CancelPairedPlacement => {
                ClientMessage::CancelPortalPlacement { game_id, player_id }
            }
            GameCommand::RequestPreview {
                x,
                y,
                kind,
                rotation,
                request_id,
            } => ClientMessage::RequestPreview {
                game_id,
                player_id,
                x,
                y,
                piece_type: kind,
                rotation,
                request_id,
            },
        }
    }
}

/// Outbound frame as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGameRoom {
        game_id: String,
        player_id: String,
    },
    Heartbeat {
        game_id: String,
        player_id: String,
    },
    PlacePiece {
        game_id: String,
        player_id: String,
        x: usize,
        y: usize,
        piece_type: PieceKind,
        rotation: Rotation,
    },
    PickupPiece {
        game_id: String,
        player_id: String,
        x: usize,
        y: usize,
    },
    PassTurn {
        game_id: String,
        player_id: String,
    },
    CancelPortalPlacement {
        game_id: String,
        player_id: String,
    },
    RequestPreview {
        game_id: String,
        player_id: String,
        x: usize,
        y: usize,
        piece_type: PieceKind,
        rotation: Rotation,
        request_id: u64,
    },
}

impl ClientMessage {
    pub fn to_json(&self) -> String {
        // Serializing plain owned strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Speculative territory computed by the authority for a hypothetical
/// placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub territory: TerritoryGrid,
    /// Echo of the request's id, when the authority supports it.
    #[serde(default)]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    #[serde(alias = "username")]
    pub name: String,
    pub score: u32,
    pub color: String,
    #[serde(default)]
    pub breakdown: ScoreBreakdown,
}

impl Winner {
    pub fn is_tie(&self) -> bool {
        self.name == "Tie"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub winner: Winner,
    pub final_scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Inbound frame as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    GameStateUpdate(Box<GameSnapshot>),
    PreviewResult(PreviewResponse),
    GameOver(GameOverPayload),
    Error { message: String },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
