use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Infrastructure details stay in the log.
        if self.is_infrastructure() {
            tracing::error!("Request failed: {}", self);
            return internal_error();
        }

        tracing::warn!("Rejected request: {}", self);
        match self {
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            AppError::Parse(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
            AppError::OutOfRange { .. } => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Invalid page."))).into_response()
            }
            AppError::Conflict(_) => (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new(
                    "The request conflicted with a concurrent write. Please retry.",
                )),
            )
                .into_response(),
            _ => internal_error(),
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error.")),
    )
        .into_response()
}
