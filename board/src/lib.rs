//! Board model, move representation, and position/match ID codec.
//!
//! This crate has no async and no I/O: it is pure data plus pure functions,
//! used by the parser, engine driver, and analyzer crates.

pub mod board;
pub mod codec;
pub mod moves;
pub mod types;

pub use board::Board;
pub use codec::{decode_match_id, decode_position_id, encode_match_id, encode_position_id};
pub use codec::{from_gnu_id, to_gnu_id, DecodedMatchId};
pub use moves::{
    canonical_form, canonical_form_of_text, format_move, moves_equivalent, parse_move_text,
    parse_move_token, Move, MovePart,
};
pub use types::{CubeOwner, PlayerSide};

/// Errors at the board/codec boundary.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("invalid position id: {0}")]
    InvalidPositionId(String),
    #[error("invalid match id: {0}")]
    InvalidMatchId(String),
    #[error("invalid gnu id: {0}")]
    InvalidGnuId(String),
    #[error("board has a negative slot count")]
    NegativeSlot,
    #[error("player's checkers sum to {0}, expected 15")]
    CheckerCountMismatch(i32),
    #[error("cube value {0} is not a power of two")]
    InvalidCubeValue(u32),
    #[error("invalid dice pair ({0}, {1})")]
    InvalidDice(u8, u8),
}
