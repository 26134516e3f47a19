//! Backgammon mistake quiz server: wires the quiz store (C5), crawl queue
//! (C6), HTTP surface (C7), and crawl client (C8) together.

pub mod config;
pub mod crawl;
pub mod http;
pub mod persistence;

use std::sync::Arc;

use engine::{EngineConfig, EngineDriver};

use crate::crawl::CrawlQueue;
use crate::http::AppState;
use crate::persistence::sqlite::{Database, QuizStore};

/// Build the fully-wired application state and axum router (spec §9
/// "Global mutable state"). Split out of `main` so integration tests can
/// spin up the same app against an in-memory database.
pub async fn build_app(db_path: &std::path::Path) -> Result<axum::Router, Box<dyn std::error::Error>> {
    let database = Database::open(db_path).await?;
    let store = Arc::new(QuizStore::new(database.pool().clone()));
    let driver = Arc::new(EngineDriver::new(EngineConfig {
        executable: config::get_engine_path(),
        script_flag: config::get_engine_script_flag(),
    }));
    let queue = Arc::new(CrawlQueue::new(
        store.clone(),
        driver.clone(),
        config::get_source_base_url(),
    ));

    let state = AppState { store, driver, queue };

    Ok(http::build_router(state))
}
