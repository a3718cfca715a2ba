//! PGN movetext extraction, a lightweight regex-based parser.
//!
//! Used when the chess server sends a PGN instead of a move list. Only the
//! mainline SAN moves and the starting position are needed for replay.

use regex::Regex;
use std::sync::LazyLock;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).unwrap());
static HEADER_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static VARIATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O").unwrap()
});

/// Mainline of a PGN game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgnMovetext {
    /// Starting FEN when the game did not begin from the standard position.
    pub initial_fen: Option<String>,
    /// SAN moves in played order.
    pub moves: Vec<String>,
}

/// Parse the headers and mainline moves of a PGN.
pub fn parse_movetext(pgn: &str) -> Result<PgnMovetext, String> {
    let mut setup = None;
    let mut fen = None;

    for cap in HEADER_RE.captures_iter(pgn) {
        match &cap[1] {
            "SetUp" => setup = Some(cap[2].to_string()),
            "FEN" => fen = Some(cap[2].to_string()),
            _ => {}
        }
    }

    // A FEN header counts unless SetUp explicitly says it does not apply.
    let initial_fen = match setup.as_deref() {
        Some("0") => None,
        _ => fen.filter(|f| !f.trim().is_empty()),
    };

    let moves = extract_moves(pgn);
    if moves.is_empty() && !HEADER_RE.is_match(pgn) && !pgn.trim().is_empty() {
        return Err("no headers and no moves".to_string());
    }

    Ok(PgnMovetext { initial_fen, moves })
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_BLOCK_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");

    // Innermost variations first, until nested ones are gone too
    let mut text = no_comments.into_owned();
    while VARIATION_RE.is_match(&text) {
        text = VARIATION_RE.replace_all(&text, "").into_owned();
    }

    MOVE_RE
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}
