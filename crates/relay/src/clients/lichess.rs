use std::time::Duration;

use crowd_core::{GameSnapshot, ResolvedMove};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{GameFeed, Mover};
use crate::error::RelayError;

/// Game export as returned by `/game/export/{id}` with JSON accept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportedGame {
    #[serde(default)]
    fen: Option<String>,
    #[serde(default)]
    last_fen: Option<String>,
    #[serde(default)]
    initial_fen: Option<String>,
    /// Space-separated SAN moves; absent when the export omitted them.
    #[serde(default)]
    moves: Option<String>,
    #[serde(default)]
    pgn: Option<String>,
}

impl From<ExportedGame> for GameSnapshot {
    fn from(game: ExportedGame) -> Self {
        GameSnapshot {
            fen: game
                .fen
                .or(game.last_fen)
                .filter(|f| !f.trim().is_empty()),
            initial_fen: game.initial_fen,
            moves: game
                .moves
                .map(|m| m.split_whitespace().map(String::from).collect()),
            pgn: game.pgn.filter(|p| !p.trim().is_empty()),
        }
    }
}

/// Parse an export body into a snapshot.
pub fn parse_export(body: &str) -> Result<GameSnapshot, RelayError> {
    let game: ExportedGame = serde_json::from_str(body)?;
    Ok(game.into())
}

#[derive(Clone)]
pub struct LichessClient {
    client: Client,
    base_url: String,
    token: String,
}

impl LichessClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, RelayError> {
        let client = Client::builder()
            .user_agent("CrowdChessRelay/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    fn export_url(&self, game_id: &str) -> String {
        format!("{}/game/export/{}", self.base_url, game_id)
    }

    fn move_url(&self, game_id: &str, mv: ResolvedMove) -> String {
        format!("{}/api/board/game/{}/move/{}", self.base_url, game_id, mv.uci())
    }
}

impl GameFeed for LichessClient {
    async fn snapshot(&self, game_id: &str) -> Result<GameSnapshot, RelayError> {
        let resp = self
            .client
            .get(self.export_url(game_id))
            .query(&[("moves", "1"), ("fen", "1"), ("pgnInJson", "1"), ("clocks", "0")])
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(game_id, status = status.as_u16(), "Game export failed");
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let snapshot = parse_export(&body)?;
        debug!(
            game_id,
            has_fen = snapshot.fen.is_some(),
            moves = snapshot.moves.as_ref().map_or(0, Vec::len),
            "Fetched game snapshot"
        );
        Ok(snapshot)
    }
}

impl Mover for LichessClient {
    async fn submit(&self, game_id: &str, mv: ResolvedMove) -> Result<(), RelayError> {
        info!(game_id, mv = %mv, "Submitting move");
        let resp = self
            .client
            .post(self.move_url(game_id, mv))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        warn!(game_id, mv = %mv, status = status.as_u16(), body = %body, "Move rejected");
        Err(RelayError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
