//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::assembly::AssemblyError;
use crate::pipeline::generation::GenerationError;
use crate::pipeline::{PipelineError, PipelineFailure};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::NotConfigured(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_CONFIGURED",
                format!("{what} is not configured on this server"),
            ),
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "Upstream generation failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    "Content generation failed, try again".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err.source {
            PipelineFailure::Generation(GenerationError::NotConfigured) => {
                ApiError::NotConfigured("Content generation")
            }
            PipelineFailure::Generation(e) => ApiError::Upstream(e.to_string()),
            PipelineFailure::Assembly(e) => e.into(),
        }
    }
}

impl From<AssemblyError> for ApiError {
    fn from(err: AssemblyError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
