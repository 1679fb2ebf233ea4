//! Full-game, move-by-move evaluation and quality classification.

pub mod classify;
pub mod pipeline;

pub use classify::{classify_drop, Classification};
pub use pipeline::{
    analyze_game, AccuracySummary, AnalysisError, GameAnalysisResult, MoveAnalysis,
    MoveSummary, ANALYSIS_DEPTH,
};
