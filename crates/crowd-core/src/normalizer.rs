//! Comment text → candidate move token.
//!
//! Position-independent and total: any input yields a token, possibly empty.
//! The steps run in a fixed order and castling phrases short-circuit the rest.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::lexicon::{CastleSide, Lexicon, ALGEBRAIC_PIECES};

static LONG_CASTLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0o]-[0o]-[0o]").unwrap());
static SHORT_CASTLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0o]-[0o]").unwrap());
static BARE_SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-h][1-8]$").unwrap());
static FROM_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-h][1-8])[-x]?([a-h][1-8])(?:=?([a-z]))?$").unwrap()
});
static GLUED_PROMOTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-h][1-8])([QRBN])$").unwrap());

/// The normalizer's output for one comment.
///
/// `as_str()` is the canonical token. When the leading letter was translated
/// from a source-language letter that is also a standard piece letter (the
/// French `R` for Roi versus the English `R` for Rook), the untranslated
/// reading is kept as well and tried first by the resolver. A comment that
/// starts with a piece letter but also spells a from/to move (`B2h4`) keeps
/// the from/to reading too, tried last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedToken {
    token: String,
    literal: Option<String>,
    from_to: Option<String>,
}

impl NormalizedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            literal: None,
            from_to: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    pub fn from_to(&self) -> Option<&str> {
        self.from_to.as_deref()
    }

    /// Readings in the order the resolver should try them.
    pub fn readings(&self) -> impl Iterator<Item = &str> {
        self.literal
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.token.as_str()))
            .chain(self.from_to.as_deref())
            .filter(|s| !s.is_empty())
    }
}

impl From<&str> for NormalizedToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl fmt::Display for NormalizedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// A castling phrase folded the same way comment text is.
struct FoldedPhrase {
    phrase: String,
    side: CastleSide,
}

pub struct Normalizer {
    lexicon: Lexicon,
    phrases: Vec<FoldedPhrase>,
}

impl Normalizer {
    pub fn new(lexicon: Lexicon) -> Self {
        let mut phrases: Vec<FoldedPhrase> = lexicon
            .castling_phrases
            .iter()
            .map(|p| FoldedPhrase {
                phrase: fold(p.phrase.trim()).to_lowercase(),
                side: p.side,
            })
            .collect();
        // Queenside first: "roque long" must not be caught by the bare "roque".
        phrases.sort_by_key(|p| p.side != CastleSide::Queenside);

        Self { lexicon, phrases }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Turn a comment into a candidate token.
    pub fn normalize(&self, text: &str) -> NormalizedToken {
        // 1. Notation variants
        let text = text
            .trim()
            .replace('×', "x")
            .replace(|c: char| matches!(c, '\u{2013}' | '\u{2014}' | '\u{2212}'), "-");
        let text = LONG_CASTLE_RE.replace_all(&text, "O-O-O");
        let text = SHORT_CASTLE_RE.replace_all(&text, "O-O");

        // 2. Diacritics
        let text = fold(&text);

        // 3. Castling phrases
        let lower = text.to_lowercase();
        if let Some(side) = self.castling_phrase(&lower) {
            return NormalizedToken::new(side.notation());
        }

        // 4. Bare square, or a from/to move (`e2e4`, `e2-e4`, `e7-e8=D`).
        // A leading piece letter makes the from/to reading a fallback only:
        // `B2h4` is a bishop move before it is b2 to h4.
        if BARE_SQUARE_RE.is_match(&text) {
            return NormalizedToken::new(text.to_lowercase());
        }
        let from_to = self.from_to_move(&text);
        if let Some(uci) = &from_to {
            if !text.starts_with(|c: char| self.is_piece_letter(c)) {
                return NormalizedToken::new(uci.clone());
            }
        }

        // 5. Move alphabet
        let cleaned: String = text
            .chars()
            .filter(|&c| self.is_move_char(c))
            .map(|c| if c == 'X' { 'x' } else { c })
            .collect();

        // 6. Leading source-language piece letter
        let mut chars = cleaned.chars();
        let (token, literal) = match chars.next() {
            Some(first) if first.is_ascii_uppercase() => match self.lexicon.translate(first) {
                Some(algebraic) => {
                    let translated = format!("{algebraic}{}", chars.as_str());
                    let literal = ALGEBRAIC_PIECES.contains(&first).then(|| cleaned.clone());
                    (translated, literal)
                }
                None => (cleaned, None),
            },
            _ => (cleaned, None),
        };

        // 7. Promotion written without '='
        let token = GLUED_PROMOTION_RE.replace(&token, "$1=$2").into_owned();

        NormalizedToken {
            token,
            literal,
            from_to,
        }
    }

    /// Lower-case UCI for a from/to spelling, with a source-language
    /// promotion letter translated.
    fn from_to_move(&self, text: &str) -> Option<String> {
        let caps = FROM_TO_RE.captures(text)?;
        let promotion = match caps.get(3).and_then(|m| m.as_str().chars().next()) {
            None => None,
            Some(c @ ('q' | 'r' | 'b' | 'n')) => Some(c),
            Some(c @ ('Q' | 'R' | 'B' | 'N')) => Some(c.to_ascii_lowercase()),
            Some(c) => match self.lexicon.translate(c) {
                Some(p @ ('Q' | 'R' | 'B' | 'N')) => Some(p.to_ascii_lowercase()),
                _ => return None,
            },
        };
        let mut uci = format!("{}{}", &caps[1], &caps[2]).to_lowercase();
        uci.extend(promotion);
        Some(uci)
    }

    fn is_piece_letter(&self, c: char) -> bool {
        ALGEBRAIC_PIECES.contains(&c) || self.lexicon.is_source_letter(c)
    }

    fn castling_phrase(&self, lower: &str) -> Option<CastleSide> {
        self.phrases
            .iter()
            .find(|p| contains_word(lower, &p.phrase))
            .map(|p| p.side)
    }

    fn is_move_char(&self, c: char) -> bool {
        matches!(c, 'a'..='h' | '1'..='8' | 'x' | 'X' | 'O' | '-' | '+' | '=' | '#')
            || self.is_piece_letter(c)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Lexicon::default())
    }
}

/// Canonical decomposition with combining marks dropped ("roqué" → "roque").
fn fold(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Whole-word containment: the match may not touch a letter or digit.
fn contains_word(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    haystack.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
