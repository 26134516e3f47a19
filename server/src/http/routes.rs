//! Route handlers (spec §6 "External interfaces").

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use analysis::QuizRecord;
use engine::EngineRequest;

use crate::crawl::{CrawlPayload, SourceCredentials};
use crate::persistence::Statistics;

use super::auth::AuthenticatedUser;
use super::error::HttpError;
use super::AppState;

const DEFAULT_CRAWL_DAYS: u32 = 7;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct MoveResponse {
    #[serde(rename = "move")]
    move_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    equity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mwc: Option<f64>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    #[serde(rename = "engineAvailable")]
    engine_available: bool,
    moves: Vec<MoveResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

/// `POST /analyzePositionFromMatch` (spec §6). Not guarded by Basic auth —
/// it carries no account-scoped state, only an engine invocation.
pub async fn analyze_position(
    State(state): State<AppState>,
    Json(request): Json<EngineRequest>,
) -> Json<AnalyzeResponse> {
    let result = state.driver.analyze(&request).await;
    Json(AnalyzeResponse {
        engine_available: result.engine_available,
        moves: result
            .moves
            .into_iter()
            .map(|c| MoveResponse {
                move_text: c.move_text,
                equity: c.equity,
                mwc: c.mwc,
            })
            .collect(),
        raw: result.raw,
    })
}

#[derive(Deserialize)]
pub struct GetQuizQuery {
    player: Option<String>,
}

/// `GET /getQuiz?player=` (spec §6). 204 when no quiz is available.
pub async fn get_quiz(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<GetQuizQuery>,
) -> Result<axum::response::Response, HttpError> {
    let quiz = state
        .store
        .get_next_quiz(&user.storage_key, query.player.as_deref())
        .await?;
    Ok(match quiz {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// `GET /getQuiz/:id` (spec §6).
pub async fn get_quiz_by_id(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<QuizRecord>, HttpError> {
    state
        .store
        .get_quiz_by_id(&user.storage_key, &id)
        .await?
        .map(Json)
        .ok_or(HttpError::NotFound)
}

#[derive(Deserialize)]
pub struct UpdateQuizRequest {
    id: String,
    #[serde(rename = "wasCorrect")]
    was_correct: Option<bool>,
}

/// `POST /updateQuiz` (spec §6, §4.6 "Record result").
pub async fn update_quiz(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateQuizRequest>,
) -> Result<Json<QuizRecord>, HttpError> {
    state
        .store
        .record_result(&user.storage_key, &request.id, request.was_correct.unwrap_or(false))
        .await?
        .map(Json)
        .ok_or(HttpError::NotFound)
}

/// `GET /getPlayers` (spec §6).
pub async fn get_players(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<String>>, HttpError> {
    Ok(Json(state.store.get_players(&user.storage_key).await?))
}

/// `GET /getStatistics` (spec §6, §4.6 "Stats").
pub async fn get_statistics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Statistics>, HttpError> {
    Ok(Json(state.store.get_statistics(&user.storage_key).await?))
}

#[derive(Deserialize)]
pub struct StartCrawlRequest {
    days: Option<u32>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Serialize)]
pub struct StartCrawlResponse {
    #[serde(rename = "jobId")]
    job_id: String,
    #[serde(rename = "aheadCount")]
    ahead_count: usize,
}

/// `POST /addLastMatchesAndSave` (spec §6, §4.7 "Job").
pub async fn start_crawl(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<StartCrawlRequest>,
) -> Json<StartCrawlResponse> {
    let payload = CrawlPayload {
        storage_key: user.storage_key.clone(),
        credentials: SourceCredentials {
            username: request.user_id.unwrap_or(user.username),
            password: user.password,
        },
        days: request.days.unwrap_or(DEFAULT_CRAWL_DAYS),
    };
    let (job_id, ahead_count) = state.queue.enqueue(payload).await;
    Json(StartCrawlResponse { job_id, ahead_count })
}

#[derive(Deserialize)]
pub struct JobIdQuery {
    #[serde(rename = "jobId")]
    job_id: String,
}

/// `GET /addLastMatchesAndSave/stream?jobId=` (spec §6, §4.7 "Listener
/// attach"): replays the current state synchronously, then streams
/// `queue`/`progress`/`done`/`error` until a terminal event closes it.
pub async fn stream_crawl(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<JobIdQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpError> {
    let (initial, mut rx) = state
        .queue
        .attach(&query.job_id)
        .await
        .ok_or(HttpError::NotFound)?;

    let stream = async_stream::stream! {
        yield Ok(to_sse_event(&initial));
        if initial.is_terminal() {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    yield Ok(to_sse_event(&event));
                    if terminal {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &crate::crawl::CrawlEvent) -> Event {
    Event::default().event(event.name()).json_data(event).unwrap_or_else(|_| Event::default())
}

/// `GET /addLastMatchesAndSave/status?jobId=` (SPEC_FULL §11 "Job status
/// polling endpoint").
pub async fn crawl_status(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<JobIdQuery>,
) -> Result<Json<crate::crawl::CrawlEvent>, HttpError> {
    state
        .queue
        .status(&query.job_id)
        .await
        .map(Json)
        .ok_or(HttpError::NotFound)
}
