//! Position source reconciliation.
//!
//! The chess server is only eventually consistent: its game export sometimes
//! carries the current FEN and sometimes only a move list or a PGN. A
//! `GameSnapshot` is driven through a small state machine that ends in one of
//! two outcomes: a verified position, or `Unavailable` with the reason. A
//! move that does not replay legally is never skipped.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::error::Unavailable;
use crate::model::ResolvedMove;
use crate::pgn;
use crate::resolver::Interpretation;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// What the chess server reported about a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Current position, when the server includes it.
    pub fen: Option<String>,
    /// Starting position for games that did not begin from the standard one.
    pub initial_fen: Option<String>,
    /// Moves in server order (UCI or SAN). `Some(vec![])` is a game with no
    /// moves yet; `None` means the field was missing.
    pub moves: Option<Vec<String>>,
    pub pgn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOrigin {
    /// Taken from the server's FEN field.
    Fen,
    /// Rebuilt by replaying the move list.
    Replay,
}

/// A position the resolver may run against.
#[derive(Debug, Clone)]
pub struct CurrentPosition {
    board: Chess,
    fen: String,
    last_move: Option<String>,
    origin: PositionOrigin,
}

impl CurrentPosition {
    fn new(board: Chess, last_move: Option<String>, origin: PositionOrigin) -> Self {
        let fen = Fen::from_position(&board, EnPassantMode::Legal).to_string();
        Self {
            board,
            fen,
            last_move,
            origin,
        }
    }

    pub fn board(&self) -> &Chess {
        &self.board
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    pub fn last_move(&self) -> Option<&str> {
        self.last_move.as_deref()
    }

    pub fn origin(&self) -> PositionOrigin {
        self.origin
    }
}

#[derive(Debug, Clone)]
pub enum PositionState {
    Available(CurrentPosition),
    Unavailable(Unavailable),
}

impl PositionState {
    /// A position given directly as FEN.
    pub fn from_fen(fen: &str) -> Self {
        match parse_fen(fen) {
            Ok(board) => PositionState::Available(CurrentPosition::new(
                board,
                None,
                PositionOrigin::Fen,
            )),
            Err(reason) => PositionState::Unavailable(Unavailable::MalformedFen {
                fen: fen.to_string(),
                reason,
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PositionState::Available(_))
    }

    pub fn current(&self) -> Result<&CurrentPosition, Unavailable> {
        match self {
            PositionState::Available(position) => Ok(position),
            PositionState::Unavailable(reason) => Err(reason.clone()),
        }
    }
}

/// Reconciliation steps. `Done` is the only terminal state.
enum Reconcile {
    Received(GameSnapshot),
    FromFen {
        fen: String,
        last_move: Option<String>,
    },
    Replay {
        board: Chess,
        pending: VecDeque<String>,
        ply: usize,
        last_move: Option<String>,
    },
    Done(PositionState),
}

impl Reconcile {
    fn step(self) -> Reconcile {
        match self {
            Reconcile::Received(snapshot) => received(snapshot),

            Reconcile::FromFen { fen, last_move } => match parse_fen(&fen) {
                Ok(board) => Reconcile::Done(PositionState::Available(CurrentPosition::new(
                    board,
                    last_move,
                    PositionOrigin::Fen,
                ))),
                Err(reason) => {
                    Reconcile::Done(PositionState::Unavailable(Unavailable::MalformedFen {
                        fen,
                        reason,
                    }))
                }
            },

            Reconcile::Replay {
                mut board,
                mut pending,
                ply,
                last_move,
            } => {
                let Some(token) = pending.pop_front() else {
                    return Reconcile::Done(PositionState::Available(CurrentPosition::new(
                        board,
                        last_move,
                        PositionOrigin::Replay,
                    )));
                };
                let ply = ply + 1;

                match replay_token(&token, &board) {
                    Some(mv) => {
                        let last_move = ResolvedMove::from_move(&mv).map(|m| m.uci());
                        board.play_unchecked(mv);
                        Reconcile::Replay {
                            board,
                            pending,
                            ply,
                            last_move,
                        }
                    }
                    None => {
                        warn!(ply, token = %token, "Move list does not replay, source out of sync");
                        Reconcile::Done(PositionState::Unavailable(Unavailable::CorruptMoveList {
                            ply,
                            token,
                        }))
                    }
                }
            }

            done @ Reconcile::Done(_) => done,
        }
    }
}

fn received(snapshot: GameSnapshot) -> Reconcile {
    let GameSnapshot {
        fen,
        initial_fen,
        moves,
        pgn,
    } = snapshot;

    if let Some(fen) = fen.filter(|f| !f.trim().is_empty()) {
        let last_move = moves
            .as_deref()
            .and_then(|moves| last_uci(initial_fen.as_deref(), moves));
        return Reconcile::FromFen { fen, last_move };
    }

    let (initial_fen, moves) = match (moves, pgn) {
        (Some(moves), _) => (initial_fen, moves),
        (None, Some(pgn)) => match pgn::parse_movetext(&pgn) {
            Ok(movetext) => (initial_fen.or(movetext.initial_fen), movetext.moves),
            Err(reason) => {
                return Reconcile::Done(PositionState::Unavailable(Unavailable::UnreadablePgn(
                    reason,
                )))
            }
        },
        (None, None) => {
            return Reconcile::Done(PositionState::Unavailable(Unavailable::NoPositionData))
        }
    };

    let board = match start_board(initial_fen.as_deref()) {
        Ok(board) => board,
        Err(reason) => return Reconcile::Done(PositionState::Unavailable(reason)),
    };

    debug!(moves = moves.len(), "No FEN in snapshot, replaying move list");
    Reconcile::Replay {
        board,
        pending: moves.into_iter().collect(),
        ply: 0,
        last_move: None,
    }
}

/// Drive a snapshot to a terminal outcome.
pub fn reconcile(snapshot: GameSnapshot) -> PositionState {
    let mut state = Reconcile::Received(snapshot);
    loop {
        state = match state {
            Reconcile::Done(outcome) => return outcome,
            other => other.step(),
        };
    }
}

fn start_board(initial_fen: Option<&str>) -> Result<Chess, Unavailable> {
    match initial_fen.map(str::trim) {
        None | Some("") | Some("startpos") => Ok(Chess::default()),
        Some(fen) => parse_fen(fen).map_err(|reason| Unavailable::MalformedInitialFen {
            fen: fen.to_string(),
            reason,
        }),
    }
}

/// One move-list token as UCI, else SAN. Exports list either.
fn replay_token(token: &str, board: &Chess) -> Option<Move> {
    Interpretation::Uci
        .attempt(token, board)
        .or_else(|| Interpretation::Standard.attempt(token, board))
}

/// UCI of the final move, found by replaying the whole list. `None` when the
/// list is empty or does not replay from the starting position.
fn last_uci(initial_fen: Option<&str>, moves: &[String]) -> Option<String> {
    let mut board = start_board(initial_fen).ok()?;
    let mut last = None;
    for token in moves {
        let Some(mv) = replay_token(token, &board) else {
            debug!(token = %token, "Move list does not replay behind the FEN, no last move");
            return None;
        };
        last = ResolvedMove::from_move(&mv).map(|m| m.uci());
        board.play_unchecked(mv);
    }
    last
}

fn parse_fen(fen: &str) -> Result<Chess, String> {
    let parsed = fen.trim().parse::<Fen>().map_err(|e| format!("{e}"))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| format!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_fen_field_wins() {
        let snapshot = GameSnapshot {
            fen: Some("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".into()),
            moves: moves(&["e2e4"]),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.origin(), PositionOrigin::Fen);
        assert_eq!(position.turn(), Color::Black);
        assert_eq!(position.last_move(), Some("e2e4"));
    }

    #[test]
    fn test_fen_branch_reports_last_move_as_uci() {
        let snapshot = GameSnapshot {
            fen: Some("rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2".into()),
            moves: moves(&["e4", "e5", "Nf3"]),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.origin(), PositionOrigin::Fen);
        assert_eq!(position.last_move(), Some("g1f3"));

        let castled = GameSnapshot {
            fen: Some("r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b kq - 5 4".into()),
            moves: moves(&["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "O-O"]),
            ..Default::default()
        };
        assert_eq!(reconcile(castled).current().unwrap().last_move(), Some("e1g1"));
    }

    #[test]
    fn test_fen_kept_when_move_list_does_not_replay() {
        let snapshot = GameSnapshot {
            fen: Some("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2".into()),
            moves: moves(&["e4", "e4"]),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.origin(), PositionOrigin::Fen);
        assert_eq!(position.last_move(), None);
        assert_eq!(position.turn(), Color::White);
    }

    #[test]
    fn test_replay_uci_moves_from_start() {
        let snapshot = GameSnapshot {
            moves: moves(&["e2e4", "e7e5", "g1f3"]),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.origin(), PositionOrigin::Replay);
        assert_eq!(position.turn(), Color::Black);
        assert_eq!(position.last_move(), Some("g1f3"));
        assert_eq!(
            position.fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }

    #[test]
    fn test_replay_accepts_san_tokens() {
        let snapshot = GameSnapshot {
            moves: moves(&["e4", "e5", "Nf3", "Nc6", "Bb5"]),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.last_move(), Some("f1b5"));
        assert_eq!(position.turn(), Color::Black);
    }

    #[test]
    fn test_empty_move_list_is_start_position() {
        let snapshot = GameSnapshot {
            moves: Some(vec![]),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.fen(), STANDARD_START_FEN);
        assert_eq!(position.last_move(), None);
    }

    #[test]
    fn test_replay_starts_from_initial_fen() {
        let snapshot = GameSnapshot {
            initial_fen: Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1".into()),
            moves: moves(&["e2e4", "e8d7"]),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.fen(), "8/3k4/8/8/4P3/8/8/4K3 w - - 1 2");
    }

    #[test]
    fn test_corrupt_move_fails_closed() {
        let snapshot = GameSnapshot {
            moves: moves(&["e2e4", "e7e5", "e4e5"]),
            ..Default::default()
        };
        match reconcile(snapshot) {
            PositionState::Unavailable(Unavailable::CorruptMoveList { ply, token }) => {
                assert_eq!(ply, 3);
                assert_eq!(token, "e4e5");
            }
            other => panic!("expected corrupt move list, got {other:?}"),
        }
    }

    #[test]
    fn test_moves_from_wrong_start_fail_closed() {
        // e2e4 cannot be played if the game started elsewhere
        let snapshot = GameSnapshot {
            initial_fen: Some("4k3/8/8/8/8/8/8/4K3 w - - 0 1".into()),
            moves: moves(&["e2e4"]),
            ..Default::default()
        };
        assert!(!reconcile(snapshot).is_available());
    }

    #[test]
    fn test_pgn_fallback() {
        let snapshot = GameSnapshot {
            pgn: Some("[White \"crowd\"]\n\n1. d4 d5 2. c4 *".into()),
            ..Default::default()
        };
        let position = reconcile(snapshot).current().unwrap().clone();
        assert_eq!(position.origin(), PositionOrigin::Replay);
        assert_eq!(position.last_move(), Some("c2c4"));
        assert_eq!(position.turn(), Color::Black);
    }

    #[test]
    fn test_malformed_fen_fails_closed() {
        let snapshot = GameSnapshot {
            fen: Some("not a fen".into()),
            moves: moves(&["e2e4"]),
            ..Default::default()
        };
        assert!(matches!(
            reconcile(snapshot),
            PositionState::Unavailable(Unavailable::MalformedFen { .. })
        ));
    }

    #[test]
    fn test_malformed_initial_fen() {
        let snapshot = GameSnapshot {
            initial_fen: Some("8/8/8 w".into()),
            moves: moves(&[]),
            ..Default::default()
        };
        assert!(matches!(
            reconcile(snapshot),
            PositionState::Unavailable(Unavailable::MalformedInitialFen { .. })
        ));
    }

    #[test]
    fn test_empty_snapshot_is_unavailable() {
        assert!(matches!(
            reconcile(GameSnapshot::default()),
            PositionState::Unavailable(Unavailable::NoPositionData)
        ));
    }

    #[test]
    fn test_from_fen() {
        assert!(PositionState::from_fen(STANDARD_START_FEN).is_available());
        assert!(!PositionState::from_fen("garbage").is_available());
    }
}
