//! Comment-to-move resolution for crowd-played chess games.
//!
//! Free-text comments flow through the `normalizer` (text → candidate token),
//! the `resolver` (token + position → legal move) and the `aggregator`
//! (resolved moves → plurality winner). The `position` module reconciles the
//! chess server's snapshot into the position everything resolves against.
//! `pipeline` ties the stages together for one pass over a comment batch.

pub mod aggregator;
pub mod error;
pub mod lexicon;
pub mod model;
pub mod normalizer;
pub mod pgn;
pub mod pipeline;
pub mod position;
pub mod resolver;

pub use aggregator::aggregate;
pub use error::{LexiconError, PipelineError, Unavailable};
pub use lexicon::{CastleSide, Lexicon};
pub use model::{Comment, MajorityResult, ResolvedMove};
pub use normalizer::{NormalizedToken, Normalizer};
pub use pipeline::{PassReport, Pipeline, PipelineConfig, WatermarkPolicy};
pub use position::{reconcile, CurrentPosition, GameSnapshot, PositionOrigin, PositionState};
pub use resolver::{Interpretation, Resolution, Resolver};
