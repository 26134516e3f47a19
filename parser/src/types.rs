//! Parsed transcript structure (spec §3 "Match transcript (parsed)").

use board::MovePart;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PlayerSlot {
    P1,
    P2,
}

/// One half-ply: a single player's action within a numbered ply (spec §3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HalfPly {
    Move {
        dice: (u8, u8),
        parts: Vec<MovePart>,
    },
    Double {
        value: u32,
    },
    Take,
    Drop,
    Win {
        points: u32,
    },
    NoMove,
    Unknown {
        text: String,
    },
}

/// A numbered ply: up to one half-ply per player.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ply {
    pub ply_number: u32,
    pub p1: HalfPly,
    pub p2: Option<HalfPly>,
}

/// The outcome recorded for a finished game (spec §4.1 "Terminal events").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GameResult {
    pub winner_name: String,
    pub points: u32,
    pub wins_match: bool,
}

/// One game within a match (spec §3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub game_number: u32,
    pub player1: Option<String>,
    pub player2: Option<String>,
    pub starting_score: (u16, u16),
    pub plies: Vec<Ply>,
    pub result: Option<GameResult>,
}

impl Game {
    fn new(game_number: u32) -> Self {
        Self {
            game_number,
            player1: None,
            player2: None,
            starting_score: (0, 0),
            plies: Vec::new(),
            result: None,
        }
    }
}

/// A full parsed match transcript (spec §3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParsedMatch {
    pub match_length: Option<u16>,
    pub games: Vec<Game>,
}

pub(crate) fn new_game(game_number: u32) -> Game {
    Game::new(game_number)
}
