//! Per-user quiz store (spec §3 "Per-user persistent store", §4.6).
//!
//! **Production backend**: SQLite via `sqlx` (see [`sqlite`]). A single
//! database file holds one row per normalized user, following the teacher's
//! `Database` connection-pool idiom (WAL mode, foreign keys, embedded
//! migrations run on [`sqlite::Database::open`]).
//!
//! Unlike the teacher's generic `Persistence` trait over five swappable
//! repositories, this store has exactly one backend and one aggregate, so
//! [`sqlite::QuizStore`] is a concrete struct directly wrapping a
//! `SqlitePool` rather than an implementation of a generic trait.

pub mod sqlite;

use analysis::QuizRecord;

/// `quizzes` document (spec §3 "Per-user persistent store", §4.6).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizDocument {
    #[serde(rename = "engineAvailable")]
    pub engine_available: bool,
    pub threshold: f64,
    pub positions: Vec<QuizRecord>,
}

impl Default for QuizDocument {
    fn default() -> Self {
        Self {
            engine_available: false,
            threshold: crate::config::get_default_threshold(),
            positions: Vec::new(),
        }
    }
}

/// `analyzedMatches` document (spec §3, §4.6 "Add-analyzed-match").
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalyzedMatchesDocument {
    pub matches: Vec<String>,
}

/// Aggregate returned by [`sqlite::QuizStore::get_statistics`] (spec §4.6 "Stats").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Statistics {
    #[serde(rename = "totalQuizzes")]
    pub total_quizzes: u64,
    #[serde(rename = "totalAttempts")]
    pub total_attempts: u64,
    #[serde(rename = "totalCorrect")]
    pub total_correct: u64,
    #[serde(rename = "worstQuizzes")]
    pub worst_quizzes: Vec<QuizRecord>,
}

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(String),
}

/// Normalize a username to its storage key (spec §3 "keyed by normalized
/// (lowercased, trimmed) username", spec §6 "username is normalized (trim +
/// lowercase) to the storage key").
#[must_use]
pub fn normalize_username(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Current unix timestamp in seconds, used for `updated_at` columns.
pub fn now_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed_and_lowercased() {
        assert_eq!(normalize_username("  Gary Wonnacott "), "gary wonnacott");
    }
}
