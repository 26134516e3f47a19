//! Domain-error-to-status mapping (spec §7 "Error handling design"),
//! grounded in the teacher's `service/endpoints/*.rs` convention of mapping
//! every repository error at the RPC boundary (there to `tonic::Status`,
//! here to an HTTP status).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] PersistenceError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "request failed with a storage error");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
