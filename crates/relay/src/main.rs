//! Crowd chess relay
//!
//! Usage:
//!   crowd-relay pass <comments.json>
//!   crowd-relay await-opponent

use std::path::PathBuf;

use anyhow::{bail, Context};
use crowd_core::Pipeline;
use relay::{comments, LichessClient, PassOutcome, Relay, RelayConfig, RelayOptions, StateStore};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: crowd-relay pass <comments.json> | crowd-relay await-opponent";

enum Command {
    Pass(PathBuf),
    AwaitOpponent,
}

fn parse_args() -> anyhow::Result<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["pass", path] => Ok(Command::Pass(PathBuf::from(path))),
        ["await-opponent"] => Ok(Command::AwaitOpponent),
        _ => bail!(USAGE),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let command = parse_args()?;
    let config = RelayConfig::from_env()?;
    info!(
        crowd_color = ?config.crowd_color,
        policy = ?config.watermark_policy,
        data_dir = %config.data_dir.display(),
        "Relay configured"
    );

    let client = LichessClient::new(config.lichess_base_url.clone(), config.lichess_token.clone())?;
    let pipeline = Pipeline::new(config.pipeline_config()?);
    let relay = Relay::new(
        client.clone(),
        client,
        pipeline,
        StateStore::new(config.state_path()),
        RelayOptions::from(&config),
    );

    match command {
        Command::Pass(path) => {
            let batch = comments::load_batch(&path)
                .with_context(|| format!("reading comments from {}", path.display()))?;
            let outcome = relay.run_pass(&batch).await?;
            if let PassOutcome::Skipped(reason) = &outcome {
                info!(reason = %reason, "Nothing played this pass");
            }
            // Hand-off record on stdout, logs go to stderr
            println!("{}", serde_json::to_string(&outcome.result())?);
        }
        Command::AwaitOpponent => {
            let position = relay.await_opponent().await?;
            println!(
                "{}",
                json!({ "fen": position.fen(), "last_move": position.last_move() })
            );
        }
    }

    Ok(())
}
