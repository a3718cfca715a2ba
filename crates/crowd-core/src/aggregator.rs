//! Plurality vote over the moves resolved in one pass.

use std::collections::HashMap;

use crate::model::{MajorityResult, ResolvedMove};

/// Vote counts in first-seen order.
#[derive(Debug, Default)]
pub struct Tally {
    counts: Vec<(ResolvedMove, usize)>,
    index: HashMap<ResolvedMove, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mv: ResolvedMove) {
        match self.index.get(&mv) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(mv, self.counts.len());
                self.counts.push((mv, 1));
            }
        }
    }

    pub fn total_votes(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Candidates by descending votes; equal counts keep first-seen order.
    pub fn standings(&self) -> Vec<(ResolvedMove, usize)> {
        let mut standings = self.counts.clone();
        standings.sort_by(|a, b| b.1.cmp(&a.1));
        standings
    }

    /// Most votes wins; the earliest-seen move wins a tie.
    pub fn winner(&self) -> MajorityResult {
        let mut best: Option<(ResolvedMove, usize)> = None;
        for &(mv, votes) in &self.counts {
            if best.map_or(true, |(_, top)| votes > top) {
                best = Some((mv, votes));
            }
        }
        match best {
            Some((mv, vote_count)) => MajorityResult {
                mv: Some(mv),
                vote_count,
            },
            None => MajorityResult::none(),
        }
    }
}

/// Pick the move to play from resolved moves in comment arrival order.
pub fn aggregate(moves: &[ResolvedMove]) -> MajorityResult {
    let mut tally = Tally::new();
    for &mv in moves {
        tally.record(mv);
    }
    tally.winner()
}
