//! Engine process contract (spec §4.3, §6): a single-shot, file-based
//! invocation of the bundled analysis script.

pub mod driver;

pub use driver::{EngineConfig, EngineDriver};

/// `{matchId, positionId?, positionIndex?, dice?}` (spec §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineRequest {
    #[serde(rename = "matchId")]
    pub match_id: String,
    #[serde(rename = "positionId", skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(rename = "positionIndex", skip_serializing_if = "Option::is_none")]
    pub position_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice: Option<(u8, u8)>,
}

/// One ranked candidate move (spec §3 "Candidate set").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candidate {
    pub move_text: String,
    pub parts: Vec<board::MovePart>,
    pub equity: Option<f64>,
    pub mwc: Option<f64>,
}

/// `{engineAvailable, moves[], raw}` (spec §4.3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineResult {
    pub engine_available: bool,
    pub moves: Vec<Candidate>,
    pub raw: Option<String>,
}

impl EngineResult {
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            engine_available: false,
            moves: Vec::new(),
            raw: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
