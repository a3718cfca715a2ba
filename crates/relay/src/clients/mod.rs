pub mod lichess;

use crowd_core::{GameSnapshot, ResolvedMove};

use crate::error::RelayError;

/// Where the relay reads the game from.
#[allow(async_fn_in_trait)]
pub trait GameFeed {
    async fn snapshot(&self, game_id: &str) -> Result<GameSnapshot, RelayError>;
}

/// Where the relay sends the crowd's move.
#[allow(async_fn_in_trait)]
pub trait Mover {
    async fn submit(&self, game_id: &str, mv: ResolvedMove) -> Result<(), RelayError>;
}
