//! # Error Handling Middleware
//!
//! Maps [`CourtError`] to HTTP status codes and a JSON `{"error": ...}` body
//! so every endpoint fails the same way.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courtcall_core::errors::CourtError;
use serde_json::json;
use tracing::error;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use courtcall_api::middleware::error_handling::AppError;
/// use courtcall_core::errors::CourtError;
///
/// async fn handler(number: i32) -> Result<Json<i32>, AppError> {
///     if number < 1 {
///         return Err(CourtError::Validation("match numbers start at 1".into()).into());
///     }
///     Ok(Json(number))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub CourtError);

pub fn status_for(err: &CourtError) -> StatusCode {
    match err {
        CourtError::NotFound(_) => StatusCode::NOT_FOUND,
        CourtError::Validation(_) => StatusCode::BAD_REQUEST,
        CourtError::Authentication(_) => StatusCode::UNAUTHORIZED,
        CourtError::DuplicateActiveInvite { .. } | CourtError::MatchClosed { .. } => {
            StatusCode::CONFLICT
        }
        CourtError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CourtError::Delivery(_) | CourtError::Database(_) | CourtError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<CourtError> for AppError {
    fn from(err: CourtError) -> Self {
        AppError(err)
    }
}

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(CourtError::Database(err))
    }
}

/// Maps a CourtError straight to an HTTP response.
pub fn map_error(err: CourtError) -> Response {
    AppError(err).into_response()
}
