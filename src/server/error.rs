//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for the crate [`Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` throughout. Only applies to
//! failures before headers are sent; mid-stream failures terminate the
//! connection without passing through here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::Error;

/// Wrapper so the crate error can cross the axum response boundary.
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "request failed");
        }

        let body = json!({ "error": self.0.to_string() });

        (status, axum::Json(body)).into_response()
    }
}
