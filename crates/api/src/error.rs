use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use dexhub_db::optimizer::OptimizerError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error
/// responses of the shape `{"error": ..., "code": ...}`.
///
/// Database access always goes through [`QueryOptimizer::run`], so
/// store failures surface here as [`OptimizerError`], never as raw
/// sqlx errors.
///
/// [`QueryOptimizer::run`]: dexhub_db::optimizer::QueryOptimizer::run
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A query that went through the optimizer and ran out of retries
    /// or time.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Optimizer(err) => match err {
                OptimizerError::Timeout { .. } => {
                    tracing::error!(error = %err, "Query timed out");
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        "QUERY_TIMEOUT",
                        "The query did not complete in time".to_string(),
                    )
                }
                OptimizerError::Exhausted { .. } => {
                    tracing::error!(error = %err, "Query retries exhausted");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "QUERY_FAILED",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err = AppError::from(OptimizerError::Timeout {
            table: "moves_competitive".into(),
            timeout_ms: Duration::from_secs(10).as_millis() as u64,
            attempts: 3,
        });
        assert_eq!(status_of(err), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn exhausted_retries_map_to_internal_error() {
        let err = AppError::from(OptimizerError::Exhausted {
            table: "learnsets".into(),
            attempts: 3,
            source: sqlx::Error::RowNotFound,
        });
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn handler_level_errors_keep_their_status() {
        assert_eq!(
            status_of(AppError::NotFound("no such species".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::BadRequest("empty key".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
