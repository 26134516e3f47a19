//! Transcript grammar recognizer (spec §4.1).

pub mod grammar;
pub mod types;

pub use grammar::parse_transcript;
pub use types::{Game, GameResult, HalfPly, ParsedMatch, Ply};

/// The whole-transcript failure mode (spec §4.1 "Failure").
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unparseable transcript: {0}")]
    Unparseable(String),
}
