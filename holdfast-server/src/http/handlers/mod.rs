pub mod downloads;
pub mod health;
pub mod movies;
pub mod seasons;
pub mod series;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use holdfast_core::error::{CoreError, ErrorClass, ErrorKind};
use serde_json::json;

/// Wraps [`CoreError`] so handlers can use `?` directly and still produce a
/// status code matching the error's class rather than a blanket 500.
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.class() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Transient | ErrorKind::External => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
