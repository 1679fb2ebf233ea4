//! Analyze a PGN file with a local UCI engine and print the result as JSON.

use anyhow::Context;
use tracing::info;

use engine_bridge::{ChessEngine, EngineConfig, EngineFacade};
use game_analysis::analyze_game;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let path = std::env::args()
        .nth(1)
        .context("usage: analyze-pgn <game.pgn>")?;
    let pgn = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {path}"))?;

    let config = EngineConfig::from_env();
    info!(engine_path = %config.engine_path, "starting engine");

    let engine = EngineFacade::new(config);
    engine
        .ensure_ready()
        .await
        .context("engine failed to start")?;

    let mut report = |pct: u8| info!(pct, "analysis progress");
    let progress: &mut (dyn FnMut(u8) + Send) = &mut report;
    let result = analyze_game(&engine, &pgn, Some(progress)).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
