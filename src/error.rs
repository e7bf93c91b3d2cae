//! Error types for the API

use axum::extract::rejection::JsonRejection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::RunMode;
use crate::query::QueryError;

const HIDDEN_INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidQuery(#[from] QueryError),

    #[error("{0}")]
    InvalidBody(#[from] JsonRejection),

    /// `message` is `None` when internal text must not reach the caller
    #[error("Internal error: {}", .message.as_deref().unwrap_or(HIDDEN_INTERNAL_MESSAGE))]
    Internal { message: Option<String> },

    #[error("Too many requests, please try again later")]
    TooManyRequests,
}

impl AppError {
    pub fn internal(err: impl std::fmt::Display, mode: RunMode) -> Self {
        AppError::Internal {
            message: mode.exposes_details().then(|| err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::InvalidQuery(e) => (StatusCode::BAD_REQUEST, "Invalid query", e.to_string()),
            AppError::InvalidBody(e) => (StatusCode::BAD_REQUEST, "Invalid query", e.body_text()),
            AppError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                message
                    .clone()
                    .unwrap_or_else(|| HIDDEN_INTERNAL_MESSAGE.to_string()),
            ),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too Many Requests",
                self.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Server Error: {}", self);
        }

        let body = Json(json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}
