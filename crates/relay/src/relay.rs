//! Drives one pass of the crowd game: read the game, vote, submit, persist.

use std::time::Duration;

use crowd_core::{
    reconcile, Comment, CurrentPosition, MajorityResult, PassReport, Pipeline, PipelineError,
    PositionState,
};
use tracing::{error, info, warn};

use crate::clients::{GameFeed, Mover};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::state::{RelayState, StateStore};

#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Overrides the game id stored in the state file.
    pub game_id: Option<String>,
    pub settle_delay: Duration,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl From<&RelayConfig> for RelayOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            game_id: config.game_id.clone(),
            settle_delay: config.settle_delay,
            poll_attempts: config.opponent_poll_attempts,
            poll_interval: config.opponent_poll_interval,
        }
    }
}

#[derive(Debug)]
pub enum PassOutcome {
    /// Nothing was resolved: position unavailable or not the crowd's turn.
    /// The state file is left as it was.
    Skipped(PipelineError),
    /// The pass ran but no comment produced a legal move.
    NoMove(PassReport),
    /// The winning move was accepted by the server.
    Played(PassReport),
}

impl PassOutcome {
    /// The hand-off record for this pass.
    pub fn result(&self) -> MajorityResult {
        match self {
            PassOutcome::Skipped(_) => MajorityResult::none(),
            PassOutcome::NoMove(report) | PassOutcome::Played(report) => report.result,
        }
    }
}

pub struct Relay<F, M> {
    feed: F,
    mover: M,
    pipeline: Pipeline,
    store: StateStore,
    options: RelayOptions,
}

impl<F: GameFeed, M: Mover> Relay<F, M> {
    pub fn new(feed: F, mover: M, pipeline: Pipeline, store: StateStore, options: RelayOptions) -> Self {
        Self {
            feed,
            mover,
            pipeline,
            store,
            options,
        }
    }

    /// Load the state, switching to a fresh one when the configured game
    /// differs from the stored game.
    fn load_state(&self) -> Result<(RelayState, String), RelayError> {
        let mut state = self.store.load()?;
        let game_id = match (&self.options.game_id, &state.game_id) {
            (Some(configured), Some(stored)) if configured != stored => {
                info!(old = %stored, new = %configured, "New game, resetting relay state");
                state = RelayState {
                    game_id: Some(configured.clone()),
                    ..Default::default()
                };
                configured.clone()
            }
            (Some(configured), _) => {
                state.game_id = Some(configured.clone());
                configured.clone()
            }
            (None, Some(stored)) => stored.clone(),
            (None, None) => return Err(RelayError::NoGame),
        };
        Ok((state, game_id))
    }

    async fn fetch_position(&self, game_id: &str) -> Result<PositionState, RelayError> {
        let snapshot = self.feed.snapshot(game_id).await?;
        Ok(reconcile(snapshot))
    }

    /// Count the comments against the live position and play the winner.
    pub async fn run_pass(&self, comments: &[Comment]) -> Result<PassOutcome, RelayError> {
        let (mut state, game_id) = self.load_state()?;
        let position = self.fetch_position(&game_id).await?;

        let report = match self.pipeline.run_pass(comments, state.watermark, &position) {
            Ok(report) => report,
            Err(skip) => {
                warn!(game_id = %game_id, reason = %skip, "Pass skipped");
                return Ok(PassOutcome::Skipped(skip));
            }
        };

        // The position is available, run_pass checked it
        if let PositionState::Available(current) = &position {
            state.record_position(current);
        }

        let Some(mv) = report.result.mv else {
            state.watermark = report.watermark;
            self.store.save(&state)?;
            return Ok(PassOutcome::NoMove(report));
        };

        // On rejection the watermark stays put so the comments count again
        if let Err(e) = self.mover.submit(&game_id, mv).await {
            error!(game_id = %game_id, mv = %mv, error = %e, "Move submission failed");
            self.store.save(&state)?;
            return Err(e);
        }
        state.watermark = report.watermark;

        tokio::time::sleep(self.options.settle_delay).await;
        match self.fetch_position(&game_id).await {
            Ok(PositionState::Available(after)) => {
                info!(game_id = %game_id, mv = %mv, fen = after.fen(), "Move played");
                state.record_position(&after);
            }
            Ok(PositionState::Unavailable(reason)) => {
                warn!(game_id = %game_id, reason = %reason, "Position after move unavailable");
            }
            Err(e) => {
                warn!(game_id = %game_id, error = %e, "Refetch after move failed");
            }
        }

        self.store.save(&state)?;
        Ok(PassOutcome::Played(report))
    }

    /// Poll the game until it is the crowd's turn again.
    pub async fn await_opponent(&self) -> Result<CurrentPosition, RelayError> {
        let (mut state, game_id) = self.load_state()?;
        let crowd = self.pipeline.crowd_color();

        for attempt in 1..=self.options.poll_attempts {
            match self.fetch_position(&game_id).await {
                Ok(PositionState::Available(current)) if current.turn() == crowd => {
                    info!(game_id = %game_id, attempt, fen = current.fen(), "Opponent has moved");
                    state.record_position(&current);
                    self.store.save(&state)?;
                    return Ok(current);
                }
                Ok(PositionState::Available(_)) => {
                    info!(game_id = %game_id, attempt, "Waiting for opponent");
                }
                Ok(PositionState::Unavailable(reason)) => {
                    warn!(game_id = %game_id, attempt, reason = %reason, "Position unavailable");
                }
                Err(e) => {
                    warn!(game_id = %game_id, attempt, error = %e, "Feed request failed");
                }
            }
            if attempt < self.options.poll_attempts {
                tokio::time::sleep(self.options.poll_interval).await;
            }
        }

        Err(RelayError::OpponentTimeout(self.options.poll_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use crowd_core::{GameSnapshot, PipelineConfig, ResolvedMove, Unavailable};
    use shakmaty::Color;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves queued snapshots, repeating the last one.
    struct FakeFeed {
        snapshots: Mutex<VecDeque<GameSnapshot>>,
    }

    impl FakeFeed {
        fn new(moves: &[&[&str]]) -> Self {
            let snapshots = moves
                .iter()
                .map(|m| GameSnapshot {
                    moves: Some(m.iter().map(|s| s.to_string()).collect()),
                    ..Default::default()
                })
                .collect();
            Self {
                snapshots: Mutex::new(snapshots),
            }
        }

        fn with(snapshots: Vec<GameSnapshot>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots.into()),
            }
        }
    }

    impl GameFeed for FakeFeed {
        async fn snapshot(&self, _game_id: &str) -> Result<GameSnapshot, RelayError> {
            let mut queue = self.snapshots.lock().unwrap();
            if queue.len() > 1 {
                Ok(queue.pop_front().unwrap())
            } else {
                Ok(queue.front().cloned().unwrap_or_default())
            }
        }
    }

    #[derive(Default)]
    struct FakeMover {
        submitted: Mutex<Vec<String>>,
        reject: bool,
    }

    impl Mover for FakeMover {
        async fn submit(&self, _game_id: &str, mv: ResolvedMove) -> Result<(), RelayError> {
            if self.reject {
                return Err(RelayError::Rejected {
                    status: 400,
                    body: "Not your turn, or game already over".into(),
                });
            }
            self.submitted.lock().unwrap().push(mv.uci());
            Ok(())
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn batch(texts: &[&str]) -> Vec<Comment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Comment::new(*t, at(i as i64 + 1)))
            .collect()
    }

    fn options() -> RelayOptions {
        RelayOptions {
            game_id: Some("game1".into()),
            settle_delay: Duration::ZERO,
            poll_attempts: 3,
            poll_interval: Duration::ZERO,
        }
    }

    fn relay(
        dir: &tempfile::TempDir,
        feed: FakeFeed,
        mover: FakeMover,
        crowd_color: Color,
    ) -> Relay<FakeFeed, FakeMover> {
        let pipeline = Pipeline::new(PipelineConfig {
            crowd_color,
            ..Default::default()
        });
        let store = StateStore::new(dir.path().join("relay_state.json"));
        Relay::new(feed, mover, pipeline, store, options())
    }

    #[tokio::test]
    async fn test_pass_plays_majority_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::new(&[&[], &["e4"]]);
        let relay = relay(&dir, feed, FakeMover::default(), Color::White);

        let outcome = relay.run_pass(&batch(&["e4", "e4", "d4", "garbage!!"])).await.unwrap();
        assert!(matches!(outcome, PassOutcome::Played(_)));
        assert_eq!(outcome.result().vote_count, 2);
        assert_eq!(*relay.mover.submitted.lock().unwrap(), vec!["e2e4"]);

        let state = relay.store.load().unwrap();
        assert_eq!(state.game_id.as_deref(), Some("game1"));
        assert_eq!(state.watermark, Some(at(4)));
        assert_eq!(state.last_move.as_deref(), Some("e2e4"));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].color, "white");
    }

    #[tokio::test]
    async fn test_not_crowd_turn_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::new(&[&["e4"]]);
        let relay = relay(&dir, feed, FakeMover::default(), Color::White);

        let outcome = relay.run_pass(&batch(&["d4"])).await.unwrap();
        assert!(matches!(
            outcome,
            PassOutcome::Skipped(PipelineError::NotCrowdTurn { turn: Color::Black })
        ));
        assert!(relay.mover.submitted.lock().unwrap().is_empty());
        assert!(!relay.store.path().exists());
    }

    #[tokio::test]
    async fn test_unavailable_position_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::new(&[&["e4", "e4"]]);
        let relay = relay(&dir, feed, FakeMover::default(), Color::White);

        let outcome = relay.run_pass(&batch(&["d4"])).await.unwrap();
        match &outcome {
            PassOutcome::Skipped(PipelineError::PositionUnavailable(
                Unavailable::CorruptMoveList { ply, .. },
            )) => assert_eq!(*ply, 2),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(outcome.result(), MajorityResult::none());
        assert!(relay.mover.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_move_advances_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::new(&[&[]]);
        let relay = relay(&dir, feed, FakeMover::default(), Color::White);

        let outcome = relay.run_pass(&batch(&["gg", "lol"])).await.unwrap();
        assert!(matches!(outcome, PassOutcome::NoMove(_)));
        assert_eq!(relay.store.load().unwrap().watermark, Some(at(2)));
    }

    #[tokio::test]
    async fn test_rejected_move_keeps_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::new(&[&[]]);
        let mover = FakeMover {
            reject: true,
            ..Default::default()
        };
        let relay = relay(&dir, feed, mover, Color::White);

        let err = relay.run_pass(&batch(&["e4"])).await.unwrap_err();
        assert!(matches!(err, RelayError::Rejected { status: 400, .. }));
        assert_eq!(relay.store.load().unwrap().watermark, None);
    }

    #[tokio::test]
    async fn test_watermark_carries_between_passes() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::new(&[&[], &["e4"], &["e4", "e5"], &["e4", "e5", "d4"]]);
        let relay = relay(&dir, feed, FakeMover::default(), Color::White);

        let comments = batch(&["e4"]);
        relay.run_pass(&comments).await.unwrap();

        // Same comments plus a new one: only the new one counts
        let mut comments = comments;
        comments.push(Comment::new("d4", at(10)));
        let outcome = relay.run_pass(&comments).await.unwrap();
        match outcome {
            PassOutcome::Played(report) => assert_eq!(report.considered, 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(*relay.mover.submitted.lock().unwrap(), vec!["e2e4", "d2d4"]);
        let state = relay.store.load().unwrap();
        assert_eq!(state.watermark, Some(at(10)));
        // e4, e5 (seen at the start of pass two), d4
        assert_eq!(state.history.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_game_id() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::default();
        let store = StateStore::new(dir.path().join("relay_state.json"));
        let relay = Relay::new(
            FakeFeed::new(&[&[]]),
            FakeMover::default(),
            pipeline,
            store,
            RelayOptions {
                game_id: None,
                ..options()
            },
        );
        assert!(matches!(
            relay.run_pass(&batch(&["e4"])).await,
            Err(RelayError::NoGame)
        ));
    }

    #[tokio::test]
    async fn test_new_game_resets_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("relay_state.json"));
        store
            .save(&RelayState {
                game_id: Some("old".into()),
                watermark: Some(at(100)),
                ..Default::default()
            })
            .unwrap();

        let relay = relay(&dir, FakeFeed::new(&[&[]]), FakeMover::default(), Color::White);
        relay.run_pass(&batch(&["e4"])).await.unwrap();
        let state = relay.store.load().unwrap();
        assert_eq!(state.game_id.as_deref(), Some("game1"));
        assert_eq!(state.watermark, Some(at(1)));
    }

    #[tokio::test]
    async fn test_await_opponent_polls_until_crowd_turn() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::with(vec![
            GameSnapshot {
                moves: Some(vec!["e4".into()]),
                ..Default::default()
            },
            GameSnapshot::default(),
            GameSnapshot {
                moves: Some(vec!["e4".into(), "c5".into()]),
                ..Default::default()
            },
        ]);
        let relay = relay(&dir, feed, FakeMover::default(), Color::White);

        let position = relay.await_opponent().await.unwrap();
        assert_eq!(position.turn(), Color::White);
        assert_eq!(position.last_move(), Some("c7c5"));
        let state = relay.store.load().unwrap();
        assert_eq!(state.last_move.as_deref(), Some("c7c5"));
    }

    #[tokio::test]
    async fn test_await_opponent_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed::new(&[&["e4"]]);
        let relay = relay(&dir, feed, FakeMover::default(), Color::White);

        assert!(matches!(
            relay.await_opponent().await,
            Err(RelayError::OpponentTimeout(3))
        ));
    }
}
