//! Concrete sqlite-backed quiz store (spec §4.6).
//!
//! One row per normalized username, holding both spec documents as JSON
//! text columns. Every mutation is a read-modify-write inside a single
//! `sqlx` transaction, which on SQLite's single-writer model gives the
//! serialized-per-user semantics spec §5 requires ("readers may observe
//! either the pre- or post-image but never a torn one").

use std::collections::HashMap;

use sqlx::{SqlitePool, Transaction};

use analysis::QuizRecord;

use crate::persistence::{
    now_timestamp, normalize_username, AnalyzedMatchesDocument, PersistenceError, QuizDocument,
    Statistics,
};

#[derive(Clone)]
pub struct QuizStore {
    pool: SqlitePool,
}

impl QuizStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_row(
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        username: &str,
    ) -> Result<(QuizDocument, AnalyzedMatchesDocument), PersistenceError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT quizzes, analyzed_matches FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&mut **tx)
                .await?;

        match row {
            Some((quizzes_json, matches_json)) => Ok((
                serde_json::from_str(&quizzes_json)?,
                serde_json::from_str(&matches_json)?,
            )),
            None => Ok((QuizDocument::default(), AnalyzedMatchesDocument::default())),
        }
    }

    async fn save_row(
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        username: &str,
        quizzes: &QuizDocument,
        matches: &AnalyzedMatchesDocument,
    ) -> Result<(), PersistenceError> {
        let quizzes_json = serde_json::to_string(quizzes)?;
        let matches_json = serde_json::to_string(matches)?;
        sqlx::query(
            "INSERT INTO users (username, quizzes, analyzed_matches, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(username) DO UPDATE SET \
             quizzes = excluded.quizzes, \
             analyzed_matches = excluded.analyzed_matches, \
             updated_at = excluded.updated_at",
        )
        .bind(username)
        .bind(quizzes_json)
        .bind(matches_json)
        .bind(now_timestamp())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Read both documents for `username` (creating neither; a fresh account
    /// reads as the defaults, spec §3 "created on first touch with
    /// defaults").
    pub async fn load(
        &self,
        username: &str,
    ) -> Result<(QuizDocument, AnalyzedMatchesDocument), PersistenceError> {
        let username = normalize_username(username);
        let mut tx = self.pool.begin().await?;
        let result = Self::fetch_row(&mut tx, &username).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Merge-on-write (spec §4.6 "Merge on write"): union incoming positions
    /// into existing ones keyed by `id`, resolving collisions by taking the
    /// max play count and a correct-answers count clamped to it.
    pub async fn merge_quizzes(
        &self,
        username: &str,
        incoming_positions: &[QuizRecord],
        engine_available: Option<bool>,
        threshold: Option<f64>,
    ) -> Result<(), PersistenceError> {
        let username = normalize_username(username);
        let mut tx = self.pool.begin().await?;
        let (mut quizzes, matches) = Self::fetch_row(&mut tx, &username).await?;

        let mut by_id: HashMap<String, usize> = quizzes
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();

        for incoming in incoming_positions {
            match by_id.get(&incoming.id) {
                Some(&existing_idx) => {
                    let existing = &mut quizzes.positions[existing_idx];
                    let play_count = existing.quiz.play_count.max(incoming.quiz.play_count);
                    let correct_answers = existing
                        .quiz
                        .correct_answers
                        .max(incoming.quiz.correct_answers)
                        .min(play_count);
                    existing.quiz.play_count = play_count;
                    existing.quiz.correct_answers = correct_answers;
                }
                None => {
                    by_id.insert(incoming.id.clone(), quizzes.positions.len());
                    quizzes.positions.push(incoming.clone());
                }
            }
        }

        if let Some(available) = engine_available {
            quizzes.engine_available = available;
        }
        if let Some(t) = threshold {
            quizzes.threshold = t;
        }

        Self::save_row(&mut tx, &username, &quizzes, &matches).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Record a quiz attempt (spec §4.6 "Record result"). Returns `None`
    /// without mutating anything if `id` is not found.
    pub async fn record_result(
        &self,
        username: &str,
        id: &str,
        was_correct: bool,
    ) -> Result<Option<QuizRecord>, PersistenceError> {
        let username = normalize_username(username);
        let mut tx = self.pool.begin().await?;
        let (mut quizzes, matches) = Self::fetch_row(&mut tx, &username).await?;

        let Some(record) = quizzes.positions.iter_mut().find(|p| p.id == id) else {
            tx.commit().await?;
            return Ok(None);
        };
        record.quiz.play_count += 1;
        if was_correct {
            record.quiz.correct_answers = (record.quiz.correct_answers + 1).min(record.quiz.play_count);
        }
        let updated = record.clone();

        Self::save_row(&mut tx, &username, &quizzes, &matches).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Union `match_id` into the analyzed-matches set (spec §4.6
    /// "Add-analyzed-match", §4.8 step 4c).
    pub async fn add_analyzed_match(
        &self,
        username: &str,
        match_id: &str,
    ) -> Result<(), PersistenceError> {
        let username = normalize_username(username);
        let mut tx = self.pool.begin().await?;
        let (quizzes, mut matches) = Self::fetch_row(&mut tx, &username).await?;

        if !matches.matches.iter().any(|m| m == match_id) {
            matches.matches.push(match_id.to_string());
            matches.matches.sort();
        }

        Self::save_row(&mut tx, &username, &quizzes, &matches).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Whether `match_id` has already been analyzed for `username` (spec
    /// §4.8 step 3 "Filter out URLs whose match id is already in
    /// analyzed-matches").
    pub async fn is_match_analyzed(
        &self,
        username: &str,
        match_id: &str,
    ) -> Result<bool, PersistenceError> {
        let (_, matches) = self.load(username).await?;
        Ok(matches.matches.iter().any(|m| m == match_id))
    }

    /// Priority-ordered next quiz (spec §4.6 "Next-quiz selection").
    /// `player` filters by the exact transcript player name when set.
    pub async fn get_next_quiz(
        &self,
        username: &str,
        player: Option<&str>,
    ) -> Result<Option<QuizRecord>, PersistenceError> {
        let (quizzes, _) = self.load(username).await?;
        let candidates = quizzes
            .positions
            .iter()
            .filter(|p| player.map_or(true, |name| p.user.name == name));

        let mut best: Option<(f64, &QuizRecord)> = None;
        for record in candidates {
            let score = priority_score(record);
            match best {
                Some((best_score, _)) if score <= best_score => {}
                _ => best = Some((score, record)),
            }
        }
        Ok(best.map(|(_, record)| record.clone()))
    }

    /// Lookup by content-addressed id (spec §6 `GET /getQuiz/:id`).
    pub async fn get_quiz_by_id(
        &self,
        username: &str,
        id: &str,
    ) -> Result<Option<QuizRecord>, PersistenceError> {
        let (quizzes, _) = self.load(username).await?;
        Ok(quizzes.positions.into_iter().find(|p| p.id == id))
    }

    /// Sorted unique player names across this account's quiz positions
    /// (spec §6 `GET /getPlayers`).
    pub async fn get_players(&self, username: &str) -> Result<Vec<String>, PersistenceError> {
        let (quizzes, _) = self.load(username).await?;
        let mut names: Vec<String> = quizzes
            .positions
            .iter()
            .map(|p| p.user.name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Aggregate stats (spec §4.6 "Stats").
    pub async fn get_statistics(&self, username: &str) -> Result<Statistics, PersistenceError> {
        let (quizzes, _) = self.load(username).await?;

        let total_quizzes = quizzes.positions.len() as u64;
        let total_attempts: u64 = quizzes.positions.iter().map(|p| p.quiz.play_count as u64).sum();
        let total_correct: u64 = quizzes
            .positions
            .iter()
            .map(|p| p.quiz.correct_answers as u64)
            .sum();

        let mut attempted: Vec<&QuizRecord> = quizzes
            .positions
            .iter()
            .filter(|p| p.quiz.play_count > 0)
            .collect();
        attempted.sort_by(|a, b| {
            let accuracy_a = a.quiz.correct_answers as f64 / a.quiz.play_count as f64;
            let accuracy_b = b.quiz.correct_answers as f64 / b.quiz.play_count as f64;
            accuracy_a
                .partial_cmp(&accuracy_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.quiz.play_count.cmp(&a.quiz.play_count))
        });

        let worst_quizzes = attempted.into_iter().take(3).cloned().collect();

        Ok(Statistics {
            total_quizzes,
            total_attempts,
            total_correct,
            worst_quizzes,
        })
    }
}

/// `equityDiff / (1 + 10*correctAnswers^2 + 2*playCount)` (spec §4.6).
fn priority_score(record: &QuizRecord) -> f64 {
    let correct = f64::from(record.quiz.correct_answers);
    let played = f64::from(record.quiz.play_count);
    record.context.equity_diff / (1.0 + 10.0 * correct * correct + 2.0 * played)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::{MoveEquity, QuizContext, QuizCounters, UserAnswer};
    use board::PlayerSide;
    use crate::persistence::sqlite::Database;

    fn sample_record(id: &str, equity_diff: f64, player: &str) -> QuizRecord {
        QuizRecord {
            id: id.to_string(),
            kind: "move".to_string(),
            gnu_id: "abc:def".to_string(),
            best: MoveEquity {
                move_text: "8/3 6/3".to_string(),
                equity: 0.087,
            },
            user: UserAnswer {
                name: player.to_string(),
                move_text: "8/3 8/5".to_string(),
                equity: 0.087 - equity_diff,
                rank: 9,
            },
            higher_sample: None,
            lower_sample: None,
            context: QuizContext {
                game_number: 1,
                ply_index: 8,
                player: PlayerSide::P1,
                dice: (6, 1),
                equity_diff,
            },
            quiz: QuizCounters::default(),
        }
    }

    async fn store() -> QuizStore {
        let db = Database::new_in_memory().await.unwrap();
        QuizStore::new(db.pool().clone())
    }

    #[tokio::test]
    async fn fresh_account_reads_as_defaults() {
        let store = store().await;
        let (quizzes, matches) = store.load("Gary").await.unwrap();
        assert!(quizzes.positions.is_empty());
        assert!(matches.matches.is_empty());
    }

    #[tokio::test]
    async fn merge_is_idempotent_on_second_write() {
        let store = store().await;
        let record = sample_record("id1", 0.3, "gary");
        store
            .merge_quizzes("gary", &[record.clone()], Some(true), Some(0.08))
            .await
            .unwrap();
        store
            .merge_quizzes("gary", &[record], Some(true), Some(0.08))
            .await
            .unwrap();

        let (quizzes, _) = store.load("gary").await.unwrap();
        assert_eq!(quizzes.positions.len(), 1);
    }

    #[tokio::test]
    async fn merge_resolves_collisions_by_max_play_count() {
        let store = store().await;
        let mut a = sample_record("id1", 0.3, "gary");
        a.quiz.play_count = 2;
        a.quiz.correct_answers = 1;
        let mut b = a.clone();
        b.quiz.play_count = 5;
        b.quiz.correct_answers = 4;

        store.merge_quizzes("gary", &[a], None, None).await.unwrap();
        store.merge_quizzes("gary", &[b], None, None).await.unwrap();

        let (quizzes, _) = store.load("gary").await.unwrap();
        assert_eq!(quizzes.positions[0].quiz.play_count, 5);
        assert_eq!(quizzes.positions[0].quiz.correct_answers, 4);
    }

    #[tokio::test]
    async fn record_result_increments_counters_and_clamps() {
        let store = store().await;
        store
            .merge_quizzes("gary", &[sample_record("id1", 0.3, "gary")], None, None)
            .await
            .unwrap();

        let updated = store
            .record_result("gary", "id1", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.quiz.play_count, 1);
        assert_eq!(updated.quiz.correct_answers, 1);
    }

    #[tokio::test]
    async fn record_result_on_unknown_id_is_a_no_op() {
        let store = store().await;
        let result = store.record_result("gary", "missing", true).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn next_quiz_prefers_higher_priority_score() {
        let store = store().await;
        let mut a = sample_record("a", 0.3, "gary");
        a.quiz.play_count = 0;
        a.quiz.correct_answers = 0;
        let mut b = sample_record("b", 0.5, "gary");
        b.quiz.play_count = 2;
        b.quiz.correct_answers = 2;

        store.merge_quizzes("gary", &[a, b], None, None).await.unwrap();

        let next = store.get_next_quiz("gary", None).await.unwrap().unwrap();
        assert_eq!(next.id, "a");
    }

    #[tokio::test]
    async fn next_quiz_filters_by_exact_player_name() {
        let store = store().await;
        let a = sample_record("a", 0.3, "gary");
        let b = sample_record("b", 0.9, "hailey");
        store.merge_quizzes("gary", &[a, b], None, None).await.unwrap();

        let next = store
            .get_next_quiz("gary", Some("hailey"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.id, "b");
    }

    #[tokio::test]
    async fn analyzed_matches_union_is_idempotent() {
        let store = store().await;
        store.add_analyzed_match("gary", "m1").await.unwrap();
        store.add_analyzed_match("gary", "m1").await.unwrap();
        let (_, matches) = store.load("gary").await.unwrap();
        assert_eq!(matches.matches, vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn statistics_reports_worst_three_by_accuracy() {
        let store = store().await;
        let mut good = sample_record("good", 0.2, "gary");
        good.quiz.play_count = 4;
        good.quiz.correct_answers = 4;
        let mut bad = sample_record("bad", 0.2, "gary");
        bad.quiz.play_count = 4;
        bad.quiz.correct_answers = 0;
        let mut untouched = sample_record("untouched", 0.2, "gary");
        untouched.quiz.play_count = 0;

        store
            .merge_quizzes("gary", &[good, bad, untouched], None, None)
            .await
            .unwrap();

        let stats = store.get_statistics("gary").await.unwrap();
        assert_eq!(stats.total_quizzes, 3);
        assert_eq!(stats.worst_quizzes[0].id, "bad");
    }
}
