//! Position analyzer (spec §4.5): walks match plies, calls the engine
//! through its pre-move position id, and emits quiz records for mistakes.

pub mod analyzer;
pub mod quiz;
pub mod sampling;

pub use analyzer::{analyze_match, AnalyzeOptions};
pub use quiz::{compute_id, MoveEquity, QuizContext, QuizCounters, QuizRecord, UserAnswer};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("malformed gnu id produced during analysis: {0}")]
    MalformedGnuId(String),
}
