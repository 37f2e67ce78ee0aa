//! HTTP surface over a single workflow session.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::AppError;

pub mod handlers;
pub mod routes;

pub use routes::{router, AppState};

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FileRead(_) | AppError::Workflow(_) | AppError::InvalidDataUri(_) | AppError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Busy => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GenerationFailed(_) | AppError::NoImageReturned | AppError::HttpClient(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
