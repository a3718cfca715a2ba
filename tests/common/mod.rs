use chrono::{DateTime, TimeZone, Utc};
use crowd_core::{Comment, CurrentPosition, PositionState};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

/// A fixed instant plus `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_735_689_600 + secs, 0).unwrap()
}

/// Comments published one second apart, in the given order.
pub fn comments(texts: &[&str]) -> Vec<Comment> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| Comment::new(*text, at(i as i64 + 1)))
        .collect()
}

/// Parse a FEN that the test knows is valid.
pub fn board(fen: &str) -> Chess {
    let fen: Fen = fen.parse().unwrap_or_else(|e| panic!("invalid FEN {fen}: {e}"));
    fen.into_position(CastlingMode::Standard)
        .unwrap_or_else(|e| panic!("illegal position {e}"))
}

#[allow(dead_code)]
pub fn available(state: PositionState) -> CurrentPosition {
    match state {
        PositionState::Available(position) => position,
        PositionState::Unavailable(reason) => panic!("position unavailable: {reason}"),
    }
}
