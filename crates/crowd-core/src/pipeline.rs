//! One resolution pass: comment batch + position → majority move.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color};
use std::str::FromStr;
use tracing::{debug, info};

use crate::aggregator::Tally;
use crate::error::PipelineError;
use crate::lexicon::Lexicon;
use crate::model::{Comment, MajorityResult};
use crate::normalizer::Normalizer;
use crate::position::PositionState;
use crate::resolver::{Interpretation, Resolution, Resolver};

/// What happens to the comment watermark when a pass picks no move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkPolicy {
    /// Move past the batch; its comments are not looked at again.
    #[default]
    Advance,
    /// Keep the watermark; the batch is reconsidered with the next one.
    Hold,
}

impl FromStr for WatermarkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advance" => Ok(WatermarkPolicy::Advance),
            "hold" => Ok(WatermarkPolicy::Hold),
            other => Err(format!("unknown watermark policy {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub lexicon: Lexicon,
    /// The side the comments play for.
    pub crowd_color: Color,
    pub watermark_policy: WatermarkPolicy,
    /// Interpretations in priority order.
    pub strategies: Vec<Interpretation>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lexicon: Lexicon::default(),
            crowd_color: Color::White,
            watermark_policy: WatermarkPolicy::default(),
            strategies: Interpretation::ALL.to_vec(),
        }
    }
}

/// How one comment fared.
#[derive(Debug, Clone)]
pub struct CommentVerdict {
    pub text: String,
    pub token: String,
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub result: MajorityResult,
    /// Comments newer than the previous watermark.
    pub considered: usize,
    /// Of those, comments that resolved to a legal move.
    pub resolved: usize,
    /// Watermark to persist after this pass.
    pub watermark: Option<DateTime<Utc>>,
    pub verdicts: Vec<CommentVerdict>,
}

pub struct Pipeline {
    normalizer: Normalizer,
    resolver: Resolver,
    crowd_color: Color,
    watermark_policy: WatermarkPolicy,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            normalizer: Normalizer::new(config.lexicon),
            resolver: Resolver::new(config.strategies),
            crowd_color: config.crowd_color,
            watermark_policy: config.watermark_policy,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn crowd_color(&self) -> Color {
        self.crowd_color
    }

    /// Normalize and resolve a single comment.
    pub fn resolve_comment(&self, text: &str, board: &Chess) -> Option<Resolution> {
        let token = self.normalizer.normalize(text);
        if token.is_empty() {
            return None;
        }
        self.resolver.resolve_token(&token, board)
    }

    /// Run the comments published after `watermark` against `position`.
    ///
    /// Refuses to resolve against an unavailable position or when the side
    /// to move is not the crowd's. Both leave the watermark for the caller to
    /// keep as is.
    pub fn run_pass(
        &self,
        comments: &[Comment],
        watermark: Option<DateTime<Utc>>,
        position: &PositionState,
    ) -> Result<PassReport, PipelineError> {
        let current = position.current()?;
        if current.turn() != self.crowd_color {
            return Err(PipelineError::NotCrowdTurn {
                turn: current.turn(),
            });
        }

        let fresh: Vec<&Comment> = comments
            .iter()
            .filter(|c| watermark.map_or(true, |w| c.published_at > w))
            .collect();
        let newest = fresh.iter().map(|c| c.published_at).max();

        let mut tally = Tally::new();
        let mut verdicts = Vec::with_capacity(fresh.len());

        for comment in &fresh {
            let token = self.normalizer.normalize(&comment.text);
            let resolution = if token.is_empty() {
                debug!(text = %comment.text, "Comment has no move-like content");
                None
            } else {
                self.resolver.resolve_token(&token, current.board())
            };

            if let Some(r) = resolution {
                tally.record(r.mv);
            }
            verdicts.push(CommentVerdict {
                text: comment.text.clone(),
                token: token.to_string(),
                resolution,
            });
        }

        let result = tally.winner();
        let resolved = tally.total_votes();

        let watermark = match (result.mv, self.watermark_policy) {
            (None, WatermarkPolicy::Hold) => watermark,
            _ => newest.max(watermark),
        };

        match result.mv {
            Some(mv) => info!(
                mv = %mv,
                votes = result.vote_count,
                considered = fresh.len(),
                resolved,
                fen = current.fen(),
                "Majority move chosen"
            ),
            None => info!(
                considered = fresh.len(),
                fen = current.fen(),
                "No comment resolved to a legal move"
            ),
        }
        for (mv, votes) in tally.standings().iter().take(5) {
            debug!(mv = %mv, votes, "Standing");
        }

        Ok(PassReport {
            result,
            considered: fresh.len(),
            resolved,
            watermark,
            verdicts,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
