//! Whole-game analysis pipeline: replay, evaluate, classify, aggregate.

use serde::Serialize;
use shakmaty::Color;
use tracing::{debug, info};

use chess_core::{pgn, rules};
use engine_bridge::ChessEngine;

use crate::classify::{classify_drop, Classification};

/// Search depth used for per-ply analysis queries.
pub const ANALYSIS_DEPTH: u32 = 15;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("could not parse game moves: {0}")]
    InvalidGame(String),
}

/// Analysis of a single ply, immutable once recorded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAnalysis {
    /// Full-move number, so plies pair up as 1,1,2,2,3,3...
    pub move_number: u32,
    #[serde(rename = "move")]
    pub san: String,
    /// Position after the move was played.
    pub fen: String,
    /// Post-move evaluation in pawn units.
    pub evaluation: f64,
    /// Engine suggestion for the pre-move position, UCI notation.
    pub best_move: Option<String>,
    pub classification: Classification,
    pub evaluation_drop: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AccuracySummary {
    pub white: u32,
    pub black: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSummary {
    pub brilliant_moves: u32,
    pub great_moves: u32,
    pub good_moves: u32,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAnalysisResult {
    pub moves: Vec<MoveAnalysis>,
    pub accuracy: AccuracySummary,
    pub summary: MoveSummary,
    pub average_evaluation: f64,
}

struct Ply {
    san: String,
    fen_before: String,
    fen_after: String,
    mover: Color,
}

/// Analyze a finished game given as PGN. Two engine queries per ply
/// (pre-move best move, post-move evaluation), strictly in game order.
/// Engine degradation never aborts a run; the only hard failure is an
/// unparsable or illegal source move list, raised before any engine
/// call is issued.
///
/// `on_progress` is called exactly once per analyzed ply with a
/// monotonically non-decreasing percentage.
pub async fn analyze_game<E: ChessEngine>(
    engine: &E,
    pgn_text: &str,
    mut on_progress: Option<&mut (dyn FnMut(u8) + Send)>,
) -> Result<GameAnalysisResult, AnalysisError> {
    let game = pgn::parse_pgn(pgn_text)
        .ok_or_else(|| AnalysisError::InvalidGame("unrecognized PGN".to_string()))?;

    // Replay the whole game first so a bad move list fails fast.
    let mut pos = rules::starting_position();
    let mut plies = Vec::with_capacity(game.moves.len());
    for san in &game.moves {
        let fen_before = rules::fen_of(&pos);
        let mover = rules::side_to_move(&pos);
        rules::play_san(&mut pos, san)
            .map_err(|e| AnalysisError::InvalidGame(e.to_string()))?;
        plies.push(Ply {
            san: san.clone(),
            fen_before,
            fen_after: rules::fen_of(&pos),
            mover,
        });
    }

    let total = plies.len();
    info!(move_count = total, "starting game analysis");

    let mut moves: Vec<MoveAnalysis> = Vec::with_capacity(total);
    let mut previous_eval = 0.0f64;

    for (i, ply) in plies.iter().enumerate() {
        let best_move = engine.best_move(&ply.fen_before, ANALYSIS_DEPTH).await;
        let eval_after = engine.evaluate(&ply.fen_after, ANALYSIS_DEPTH).await;

        // Re-orient the score into "how much did the mover's own
        // advantage shrink"; positive means the move made things worse.
        let eval_drop = match ply.mover {
            Color::White => previous_eval - eval_after,
            Color::Black => eval_after - previous_eval,
        };
        let classification = classify_drop(eval_drop);
        debug!(ply = i, san = %ply.san, eval_after, eval_drop, %classification, "ply analyzed");

        moves.push(MoveAnalysis {
            move_number: (i / 2 + 1) as u32,
            san: ply.san.clone(),
            fen: ply.fen_after.clone(),
            evaluation: eval_after,
            best_move,
            classification,
            evaluation_drop: eval_drop,
        });

        previous_eval = eval_after;

        if let Some(report) = on_progress.as_mut() {
            report((100.0 * (i + 1) as f64 / total as f64).round() as u8);
        }
    }

    let accuracy = AccuracySummary {
        white: side_accuracy(moves.iter().step_by(2)),
        black: side_accuracy(moves.iter().skip(1).step_by(2)),
    };

    let mut summary = MoveSummary::default();
    for analysis in &moves {
        match analysis.classification {
            Classification::Brilliant => summary.brilliant_moves += 1,
            Classification::Great => summary.great_moves += 1,
            Classification::Good => summary.good_moves += 1,
            Classification::Inaccuracy => summary.inaccuracies += 1,
            Classification::Mistake => summary.mistakes += 1,
            Classification::Blunder => summary.blunders += 1,
            Classification::Book => {}
        }
    }

    // parse_pgn guarantees a non-empty move list, so the mean is defined.
    let average_evaluation =
        moves.iter().map(|m| m.evaluation).sum::<f64>() / moves.len() as f64;

    Ok(GameAnalysisResult {
        moves,
        accuracy,
        summary,
        average_evaluation,
    })
}

/// Percentage of a side's moves classified as brilliant/great/good,
/// rounded to the nearest integer. A side with no moves scores 100.
fn side_accuracy<'a>(moves: impl Iterator<Item = &'a MoveAnalysis>) -> u32 {
    let mut total = 0u32;
    let mut accurate = 0u32;
    for analysis in moves {
        total += 1;
        if analysis.classification.is_accurate() {
            accurate += 1;
        }
    }
    if total == 0 {
        return 100;
    }
    (100.0 * f64::from(accurate) / f64::from(total)).round() as u32
}
