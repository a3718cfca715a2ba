//! Candidate token + position → at most one legal move.
//!
//! Each `Interpretation` is one way of reading a token. The resolver tries
//! them in order and keeps the first that yields a legal move; a token that
//! no interpretation accepts is dropped, never forced onto a move.

use regex::Regex;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Move, Position, Square};
use std::sync::LazyLock;
use tracing::debug;

use crate::model::ResolvedMove;
use crate::normalizer::NormalizedToken;

static UCI_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-h][1-8][a-h][1-8][qrbn]?$").unwrap());
static SQUARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-h][1-8]$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpretation {
    /// Standard algebraic notation: `Nxe4`, `e8=Q+`, `O-O-O`, `Rad1`.
    Standard,
    /// Explicit from/to/promotion: `e2e4`, `e7e8q`.
    Uci,
    /// A bare square, accepted when exactly one legal move lands there.
    Destination,
}

impl Interpretation {
    pub const ALL: [Interpretation; 3] = [
        Interpretation::Standard,
        Interpretation::Uci,
        Interpretation::Destination,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Interpretation::Standard => "standard",
            Interpretation::Uci => "uci",
            Interpretation::Destination => "destination",
        }
    }

    /// Read `token` this way against `pos`. Only legal moves come back.
    pub fn attempt(self, token: &str, pos: &Chess) -> Option<Move> {
        let mv = match self {
            Interpretation::Standard => standard(token, pos),
            Interpretation::Uci => uci(token, pos),
            Interpretation::Destination => destination(token, pos),
        }?;
        pos.is_legal(mv).then_some(mv)
    }
}

fn standard(token: &str, pos: &Chess) -> Option<Move> {
    let san: SanPlus = token.parse().ok()?;
    san.san.to_move(pos).ok()
}

fn uci(token: &str, pos: &Chess) -> Option<Move> {
    if !UCI_SHAPE_RE.is_match(token) {
        return None;
    }
    let uci: UciMove = token.to_ascii_lowercase().parse().ok()?;
    uci.to_move(pos).ok()
}

fn destination(token: &str, pos: &Chess) -> Option<Move> {
    if !SQUARE_RE.is_match(token) {
        return None;
    }
    let target: Square = token.parse().ok()?;
    let mut landing = pos
        .legal_moves()
        .into_iter()
        .filter(|m| ResolvedMove::from_move(m).is_some_and(|r| r.to == target));

    // Two pieces able to reach the square is a guess we refuse to make.
    match (landing.next(), landing.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// A resolved move and the interpretation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub mv: ResolvedMove,
    pub via: Interpretation,
}

pub struct Resolver {
    strategies: Vec<Interpretation>,
}

impl Resolver {
    pub fn new(strategies: Vec<Interpretation>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[Interpretation] {
        &self.strategies
    }

    /// Resolve one raw token string.
    pub fn resolve(&self, token: &str, pos: &Chess) -> Option<Resolution> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        self.strategies.iter().find_map(|&via| {
            let mv = via.attempt(token, pos)?;
            let mv = ResolvedMove::from_move(&mv)?;
            Some(Resolution { mv, via })
        })
    }

    /// Resolve a normalizer token, trying each of its readings in turn.
    pub fn resolve_token(&self, token: &NormalizedToken, pos: &Chess) -> Option<Resolution> {
        let resolution = token.readings().find_map(|reading| self.resolve(reading, pos));
        match &resolution {
            Some(r) => debug!(token = %token, mv = %r.mv, via = r.via.name(), "Token resolved"),
            None => debug!(token = %token, "Token matches no legal move"),
        }
        resolution
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Interpretation::ALL.to_vec())
    }
}
