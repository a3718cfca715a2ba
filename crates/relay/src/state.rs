//! On-disk relay state: which game, how far the comments were read, and
//! the positions seen so far.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crowd_core::CurrentPosition;
use serde::{Deserialize, Serialize};
use shakmaty::Color;
use tracing::{debug, info};

use crate::error::RelayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Side that made the move (`white` / `black`).
    pub color: String,
    #[serde(rename = "move")]
    pub mv: Option<String>,
    pub fen_after: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayState {
    pub game_id: Option<String>,
    /// Publish time of the newest comment already counted.
    pub watermark: Option<DateTime<Utc>>,
    pub fen: Option<String>,
    pub last_move: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl RelayState {
    /// Store a freshly fetched position. A history entry is added when the
    /// position changed and a last move is known.
    pub fn record_position(&mut self, position: &CurrentPosition) {
        if self.fen.as_deref() == Some(position.fen()) {
            debug!(fen = position.fen(), "Position unchanged");
            return;
        }
        self.fen = Some(position.fen().to_string());
        self.last_move = position.last_move().map(String::from);

        let Some(mv) = position.last_move() else {
            return;
        };
        // The side that just moved is the one not to move now
        let mover = match position.turn() {
            Color::White => "black",
            Color::Black => "white",
        };
        self.history.push(HistoryEntry {
            color: mover.to_string(),
            mv: Some(mv.to_string()),
            fen_after: position.fen().to_string(),
            recorded_at: Utc::now(),
        });
    }
}

/// JSON file holding a `RelayState`.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, or an empty one when the file does not exist yet.
    pub fn load(&self) -> Result<RelayState, RelayError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No state file yet");
            return Ok(RelayState::default());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the state through a temp file and rename so a crash never
    /// leaves a half-written file behind.
    pub fn save(&self, state: &RelayState) -> Result<(), RelayError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), "Relay state saved");
        Ok(())
    }
}
