//! Relay configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crowd_core::{Lexicon, PipelineConfig, WatermarkPolicy};
use shakmaty::Color;
use tracing::info;

use crate::error::RelayError;

#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Lichess API token of the crowd's account
    pub lichess_token: String,

    /// Lichess base URL (overridable for tests)
    pub lichess_base_url: String,

    /// Game to relay; falls back to the one in the state file
    pub game_id: Option<String>,

    /// Directory holding the relay state file
    pub data_dir: PathBuf,

    /// Side the crowd plays
    pub crowd_color: Color,

    pub watermark_policy: WatermarkPolicy,

    /// Optional JSON lexicon replacing the built-in French one
    pub lexicon_path: Option<PathBuf>,

    /// Wait between submitting a move and refetching the game
    pub settle_delay: Duration,

    /// Polls of the feed before giving up on the opponent
    pub opponent_poll_attempts: u32,

    pub opponent_poll_interval: Duration,
}

impl RelayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lichess_token = lookup("LICHESS_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RelayError::Config("LICHESS_TOKEN not set".into()))?;

        let lichess_base_url = lookup("LICHESS_BASE_URL")
            .unwrap_or_else(|| "https://lichess.org".to_string())
            .trim_end_matches('/')
            .to_string();

        let game_id = lookup("RELAY_GAME_ID").filter(|g| !g.trim().is_empty());

        let data_dir = lookup("RELAY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let crowd_color = match lookup("CROWD_COLOR") {
            Some(value) => parse_color(&value)?,
            None => Color::White,
        };

        let watermark_policy = match lookup("WATERMARK_POLICY") {
            Some(value) => value.parse().map_err(RelayError::Config)?,
            None => WatermarkPolicy::default(),
        };

        let lexicon_path = lookup("LEXICON_PATH").map(PathBuf::from);

        let settle_delay = Duration::from_millis(
            lookup("SETTLE_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
        );

        let opponent_poll_attempts = lookup("OPPONENT_POLL_ATTEMPTS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let opponent_poll_interval = Duration::from_millis(
            lookup("OPPONENT_POLL_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
        );

        Ok(Self {
            lichess_token,
            lichess_base_url,
            game_id,
            data_dir,
            crowd_color,
            watermark_policy,
            lexicon_path,
            settle_delay,
            opponent_poll_attempts,
            opponent_poll_interval,
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("relay_state.json")
    }

    /// Pipeline settings, loading the lexicon file when one is configured.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, RelayError> {
        let lexicon = match &self.lexicon_path {
            Some(path) => {
                info!(path = %path.display(), "Loading lexicon");
                Lexicon::load(path)?
            }
            None => Lexicon::default(),
        };

        Ok(PipelineConfig {
            lexicon,
            crowd_color: self.crowd_color,
            watermark_policy: self.watermark_policy,
            ..Default::default()
        })
    }
}

fn parse_color(value: &str) -> Result<Color, RelayError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "white" | "w" => Ok(Color::White),
        "black" | "b" => Ok(Color::Black),
        other => Err(RelayError::Config(format!("unknown CROWD_COLOR {other:?}"))),
    }
}
