//! Relay error types

use crowd_core::{LexiconError, PipelineError, Unavailable};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Lichess rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lexicon error: {0}")]
    Lexicon(#[from] LexiconError),

    #[error("Position unavailable: {0}")]
    Position(#[from] Unavailable),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("No game id: set RELAY_GAME_ID or create a state file first")]
    NoGame,

    #[error("Opponent did not move after {0} polls")]
    OpponentTimeout(u32),
}
