//! Lichess relay for the crowd game: pulls the game, runs a comment pass
//! through `crowd_core`, submits the winning move and keeps a state file.

pub mod clients;
pub mod comments;
pub mod config;
pub mod error;
pub mod relay;
pub mod state;

pub use clients::lichess::LichessClient;
pub use clients::{GameFeed, Mover};
pub use config::RelayConfig;
pub use error::RelayError;
pub use relay::{PassOutcome, Relay, RelayOptions};
pub use state::{HistoryEntry, RelayState, StateStore};
