//! Source-language vocabulary consulted by the normalizer.
//!
//! The piece-letter table and the castling phrases are plain data so that a
//! new language is a new JSON file, not a code change.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::LexiconError;

/// Standard algebraic piece letters.
pub const ALGEBRAIC_PIECES: &[char] = &['N', 'B', 'R', 'Q', 'K'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastleSide {
    Kingside,
    Queenside,
}

impl CastleSide {
    pub fn notation(self) -> &'static str {
        match self {
            CastleSide::Kingside => "O-O",
            CastleSide::Queenside => "O-O-O",
        }
    }
}

/// One source-language piece letter and the algebraic letter it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceLetter {
    pub source: char,
    pub algebraic: char,
}

/// A phrase that means "castle on this side", matched as whole words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastlingPhrase {
    pub phrase: String,
    pub side: CastleSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pub piece_letters: Vec<PieceLetter>,
    pub castling_phrases: Vec<CastlingPhrase>,
}

impl Lexicon {
    /// French piece letters (Cavalier, Fou, Tour, Dame, Roi) and castling
    /// phrases, with the German "rochade" forms commonly seen alongside.
    pub fn french() -> Self {
        let letters = [('C', 'N'), ('F', 'B'), ('T', 'R'), ('D', 'Q'), ('R', 'K')];
        let phrases = [
            ("grand roque", CastleSide::Queenside),
            ("roque long", CastleSide::Queenside),
            ("côté dame", CastleSide::Queenside),
            ("rochade longue", CastleSide::Queenside),
            ("petit roque", CastleSide::Kingside),
            ("roque court", CastleSide::Kingside),
            ("côté roi", CastleSide::Kingside),
            ("rochade courte", CastleSide::Kingside),
            ("roque", CastleSide::Kingside),
        ];

        Self {
            piece_letters: letters
                .iter()
                .map(|&(source, algebraic)| PieceLetter { source, algebraic })
                .collect(),
            castling_phrases: phrases
                .iter()
                .map(|&(phrase, side)| CastlingPhrase {
                    phrase: phrase.to_string(),
                    side,
                })
                .collect(),
        }
    }

    /// Parse and validate a lexicon from JSON.
    pub fn from_json(json: &str) -> Result<Self, LexiconError> {
        let lexicon: Lexicon = serde_json::from_str(json)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Load a lexicon JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LexiconError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The algebraic letter for a source-language piece letter.
    pub fn translate(&self, letter: char) -> Option<char> {
        self.piece_letters
            .iter()
            .find(|p| p.source == letter)
            .map(|p| p.algebraic)
    }

    pub fn is_source_letter(&self, letter: char) -> bool {
        self.piece_letters.iter().any(|p| p.source == letter)
    }

    fn validate(&self) -> Result<(), LexiconError> {
        for letter in &self.piece_letters {
            if !letter.source.is_ascii_uppercase() {
                return Err(LexiconError::Invalid(format!(
                    "source letter {:?} must be an uppercase ASCII letter",
                    letter.source
                )));
            }
            if !ALGEBRAIC_PIECES.contains(&letter.algebraic) {
                return Err(LexiconError::Invalid(format!(
                    "{:?} is not an algebraic piece letter",
                    letter.algebraic
                )));
            }
        }
        if self.castling_phrases.iter().any(|p| p.phrase.trim().is_empty()) {
            return Err(LexiconError::Invalid("empty castling phrase".into()));
        }
        Ok(())
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::french()
    }
}
