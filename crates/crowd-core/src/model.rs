use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Move, Role, Square};
use std::fmt;

/// A spectator comment as delivered by the comment feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub published_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            published_at,
        }
    }
}

/// A move in from/to/promotion form, checked legal against the position it
/// was resolved on. Castling is the king's two-square move (`e1g1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl ResolvedMove {
    /// Canonical form of a board move. `None` only for drops, which standard
    /// chess never generates.
    pub fn from_move(mv: &Move) -> Option<Self> {
        match mv.to_uci(CastlingMode::Standard) {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => Some(Self {
                from,
                to,
                promotion,
            }),
            _ => None,
        }
    }

    pub fn uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResolvedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

// Hand-off shape: {"from": "e7", "to": "e8", "promotion": "q"}
impl Serialize for ResolvedMove {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResolvedMove", 3)?;
        state.serialize_field("from", &self.from.to_string())?;
        state.serialize_field("to", &self.to.to_string())?;
        state.serialize_field("promotion", &self.promotion.map(|r| r.char().to_string()))?;
        state.end()
    }
}

/// The move chosen by one aggregation pass, with the votes it received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MajorityResult {
    #[serde(rename = "move")]
    pub mv: Option<ResolvedMove>,
    pub vote_count: usize,
}

impl MajorityResult {
    pub fn none() -> Self {
        Self {
            mv: None,
            vote_count: 0,
        }
    }
}
