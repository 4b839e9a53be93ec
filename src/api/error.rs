//! API error types with `{ok: false, error}` JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::artifacts::AnalysisId;
use crate::pipeline::PipelineError;

/// Error body shared by every failing route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A run that was started but did not complete. The id is returned so the
    /// caller can inspect whatever artifacts were written.
    #[error("Analysis {analysis_id} failed: {message}")]
    AnalysisFailed {
        analysis_id: AnalysisId,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn pipeline(analysis_id: AnalysisId, err: &PipelineError) -> Self {
        ApiError::AnalysisFailed {
            analysis_id,
            message: format!("pipeline failed: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, analysis_id) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail, None),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail, None),
            ApiError::AnalysisFailed {
                analysis_id,
                message,
            } => {
                tracing::error!(analysis_id = %analysis_id, error = %message, "Analysis failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message,
                    Some(analysis_id.to_string()),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            ok: false,
            error,
            analysis_id,
        };
        (status, Json(body)).into_response()
    }
}
