//! Crawl-and-analyze pipeline (spec §4.8), tying C8 → C1 → C4 → C5 together
//! with per-record and per-match checkpointing.

use analysis::{analyze_match, AnalyzeOptions};
use engine::EngineDriver;

use super::client::{match_id_from_url, SourceFetcher};
use super::{CrawlEvent, CrawlPhase, SourceCredentials};
use crate::persistence::sqlite::QuizStore;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("login to source site failed: {0}")]
    Login(#[source] super::client::CrawlClientError),
    #[error("listing finished matches failed: {0}")]
    Listing(#[source] super::client::CrawlClientError),
    #[error(transparent)]
    Store(#[from] crate::persistence::PersistenceError),
}

/// Totals reported in the terminal `done` event (spec §6 `done:{added,total,matchesTotal}`).
pub struct CrawlSummary {
    pub added: usize,
    pub total: usize,
    pub matches_total: usize,
}

/// Run one crawl-and-analyze job to completion (spec §4.8). `on_progress`
/// is called with every `queue`/`progress` event as the job advances;
/// terminal `done`/`error` events are the caller's responsibility once this
/// returns.
#[allow(clippy::too_many_arguments)]
pub async fn run_crawl<C: SourceFetcher>(
    store: &QuizStore,
    driver: &EngineDriver,
    client: &C,
    username: &str,
    credentials: &SourceCredentials,
    user_id: &str,
    days: u32,
    threshold: f64,
    mut on_progress: impl FnMut(CrawlEvent),
) -> Result<CrawlSummary, PipelineError> {
    on_progress(CrawlEvent::Progress {
        phase: CrawlPhase::LoginAndList,
        matches_total: 0,
        processed_matches: 0,
        quizzes_added: 0,
        last_position_id: None,
    });

    client
        .login(&credentials.username, &credentials.password)
        .await
        .map_err(PipelineError::Login)?;
    let urls = client
        .list_finished(user_id, days)
        .await
        .map_err(PipelineError::Listing)?;

    store
        .merge_quizzes(username, &[], Some(driver.is_configured()), Some(threshold))
        .await?;

    // spec §4.8 step 3: filter out matches already analyzed for this user.
    let mut pending = Vec::with_capacity(urls.len());
    for url in urls {
        let Some(match_id) = match_id_from_url(&url) else {
            continue;
        };
        if !store.is_match_analyzed(username, &match_id).await? {
            pending.push((url, match_id));
        }
    }

    on_progress(CrawlEvent::Progress {
        phase: CrawlPhase::FoundLinks,
        matches_total: pending.len(),
        processed_matches: 0,
        quizzes_added: 0,
        last_position_id: None,
    });

    let opts = AnalyzeOptions {
        user_name: None,
        threshold,
    };

    let matches_total = pending.len();
    let mut processed_matches = 0;
    let mut quizzes_added = 0;

    for (url, match_id) in pending {
        let transcript = match client.download(&url).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(match_id = %match_id, error = %err, "failed to download transcript, skipping match");
                processed_matches += 1;
                continue;
            }
        };

        let parsed = match parser::parse_transcript(&transcript) {
            Ok(parsed) => parsed,
            Err(err) => {
                // spec §4.8 step 4a / §7 "Parse failure": record an error
                // entry for this match and continue with the rest.
                tracing::warn!(match_id = %match_id, error = %err, "unparseable transcript, skipping match");
                processed_matches += 1;
                continue;
            }
        };

        let records = analyze_match(&parsed, driver, &opts).await;
        let engine_available = driver.is_configured();

        for record in &records {
            let already_seen = store
                .get_quiz_by_id(username, &record.id)
                .await?
                .is_some();

            // spec §4.8 step 4b: ensure-fields → skip-if-id-seen → append →
            // save-quizzes, checkpointed per emitted record.
            store
                .merge_quizzes(
                    username,
                    std::slice::from_ref(record),
                    Some(engine_available),
                    Some(threshold),
                )
                .await?;

            if !already_seen {
                quizzes_added += 1;
            }

            on_progress(CrawlEvent::Progress {
                phase: CrawlPhase::Processing,
                matches_total,
                processed_matches,
                quizzes_added,
                last_position_id: Some(record.gnu_id.clone()),
            });
        }

        // spec §4.8 step 4c: commit analyzed-matches only after the whole
        // match succeeded, so a crash mid-match re-parses it next time.
        store.add_analyzed_match(username, &match_id).await?;
        processed_matches += 1;

        on_progress(CrawlEvent::Progress {
            phase: CrawlPhase::Processing,
            matches_total,
            processed_matches,
            quizzes_added,
            last_position_id: None,
        });
    }

    on_progress(CrawlEvent::Progress {
        phase: CrawlPhase::Done,
        matches_total,
        processed_matches,
        quizzes_added,
        last_position_id: None,
    });

    // total is the user's whole position count after this crawl, not the
    // number added by it: on an idempotent re-crawl with nothing new, `added`
    // is 0 but `total` must still reflect everything already stored.
    let (quizzes, _) = store.load(username).await?;

    Ok(CrawlSummary {
        added: quizzes_added,
        total: quizzes.positions.len(),
        matches_total,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use analysis::{MoveEquity, QuizContext, QuizCounters, QuizRecord, UserAnswer};
    use board::PlayerSide;
    use engine::EngineConfig;

    use super::super::client::CrawlClientError;
    use crate::persistence::sqlite::Database;

    use super::*;

    struct FakeSourceClient {
        urls: Vec<String>,
        transcripts: HashMap<String, String>,
    }

    impl SourceFetcher for FakeSourceClient {
        async fn login(&self, _username: &str, _password: &str) -> Result<(), CrawlClientError> {
            Ok(())
        }

        async fn list_finished(&self, _user_id: &str, _days: u32) -> Result<Vec<String>, CrawlClientError> {
            Ok(self.urls.clone())
        }

        async fn download(&self, url: &str) -> Result<String, CrawlClientError> {
            Ok(self
                .transcripts
                .get(url)
                .cloned()
                .expect("test url not stubbed with a transcript"))
        }
    }

    fn credentials() -> SourceCredentials {
        SourceCredentials {
            username: "gary".to_string(),
            password: "secret".to_string(),
        }
    }

    fn existing_record(id: &str) -> QuizRecord {
        QuizRecord {
            id: id.to_string(),
            kind: "move".to_string(),
            gnu_id: "abc:def".to_string(),
            best: MoveEquity {
                move_text: "8/3 6/3".to_string(),
                equity: 0.3,
            },
            user: UserAnswer {
                name: "gary".to_string(),
                move_text: "8/3 8/5".to_string(),
                equity: 0.0,
                rank: 5,
            },
            higher_sample: None,
            lower_sample: None,
            context: QuizContext {
                game_number: 1,
                ply_index: 8,
                player: PlayerSide::P1,
                dice: (6, 1),
                equity_diff: 0.3,
            },
            quiz: QuizCounters::default(),
        }
    }

    async fn store() -> QuizStore {
        let db = Database::new_in_memory().await.unwrap();
        QuizStore::new(db.pool().clone())
    }

    #[tokio::test]
    async fn second_crawl_with_no_new_matches_reports_prior_total_not_zero() {
        let store = store().await;
        store
            .merge_quizzes("gary", &[existing_record("id1")], Some(false), Some(0.08))
            .await
            .unwrap();

        let driver = EngineDriver::new(EngineConfig::unconfigured());
        let client = FakeSourceClient {
            urls: Vec::new(),
            transcripts: HashMap::new(),
        };

        let summary = run_crawl(
            &store,
            &driver,
            &client,
            "gary",
            &credentials(),
            "gary",
            7,
            0.08,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(summary.added, 0);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.matches_total, 0);
    }

    #[tokio::test]
    async fn already_analyzed_matches_are_filtered_out_before_downloading() {
        let store = store().await;
        store.add_analyzed_match("gary", "m1").await.unwrap();

        let driver = EngineDriver::new(EngineConfig::unconfigured());
        let client = FakeSourceClient {
            urls: vec!["https://example.invalid/bg/export/m1".to_string()],
            transcripts: HashMap::new(),
        };

        let summary = run_crawl(
            &store,
            &driver,
            &client,
            "gary",
            &credentials(),
            "gary",
            7,
            0.08,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(summary.matches_total, 0);
    }

    #[tokio::test]
    async fn new_match_is_downloaded_parsed_and_committed_without_an_engine() {
        let store = store().await;
        let transcript = "Game 1\nGary : 0  Hailey : 0\n  1) 31: 8/5 6/5\n";
        let url = "https://example.invalid/bg/export/m2".to_string();
        let mut transcripts = HashMap::new();
        transcripts.insert(url.clone(), transcript.to_string());

        let driver = EngineDriver::new(EngineConfig::unconfigured());
        let client = FakeSourceClient {
            urls: vec![url],
            transcripts,
        };

        let summary = run_crawl(
            &store,
            &driver,
            &client,
            "gary",
            &credentials(),
            "gary",
            7,
            0.08,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(summary.matches_total, 1);
        assert_eq!(summary.added, 0);
        assert!(store.is_match_analyzed("gary", "m2").await.unwrap());
    }
}
