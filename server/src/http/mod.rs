//! HTTP surface (C7, spec §6), built on axum following the pack's
//! `Router::new().route(...).with_state(state)` idiom.

pub mod auth;
pub mod error;
mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use engine::EngineDriver;

use crate::crawl::CrawlQueue;
use crate::persistence::sqlite::QuizStore;

/// Shared state handed to every handler (spec §9 "Global mutable state":
/// one crawl queue and one per-user storage gateway, created at process
/// start).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<QuizStore>,
    pub driver: Arc<EngineDriver>,
    pub queue: Arc<CrawlQueue>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/analyzePositionFromMatch", post(routes::analyze_position))
        .route("/getQuiz", get(routes::get_quiz))
        .route("/getQuiz/:id", get(routes::get_quiz_by_id))
        .route("/updateQuiz", post(routes::update_quiz))
        .route("/getPlayers", get(routes::get_players))
        .route("/getStatistics", get(routes::get_statistics))
        .route("/addLastMatchesAndSave", post(routes::start_crawl))
        .route("/addLastMatchesAndSave/stream", get(routes::stream_crawl))
        .route("/addLastMatchesAndSave/status", get(routes::crawl_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
