//! Core error types

use shakmaty::Color;
use thiserror::Error;

/// Why the position source could not produce a trustworthy position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    #[error("Malformed FEN {fen:?}: {reason}")]
    MalformedFen { fen: String, reason: String },

    #[error("Malformed initial FEN {fen:?}: {reason}")]
    MalformedInitialFen { fen: String, reason: String },

    #[error("Move {ply} ({token}) does not apply to the replayed board")]
    CorruptMoveList { ply: usize, token: String },

    #[error("Unreadable PGN: {0}")]
    UnreadablePgn(String),

    #[error("Snapshot carries neither a FEN nor a move list")]
    NoPositionData,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Position unavailable: {0}")]
    PositionUnavailable(#[from] Unavailable),

    #[error("Not the crowd's turn ({turn:?} to move)")]
    NotCrowdTurn { turn: Color },
}

#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("Failed to read lexicon: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse lexicon: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid lexicon: {0}")]
    Invalid(String),
}
