use crate::engines::SearchMethod;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    #[error("{0} ranker has not been initialized")]
    NotInitialized(SearchMethod),

    #[error("Search method '{0}' is not registered")]
    MethodNotRegistered(String),

    #[error("{0} ranker is not ready")]
    NotReady(SearchMethod),

    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("{method} search exceeded deadline of {}ms", .after.as_millis())]
    Timeout { method: SearchMethod, after: Duration },

    #[error("{}", describe_failures(.0))]
    InitializationFailed(Vec<RankerFailure>),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Tool catalog error: {0}")]
    AtomizerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Ranking task failed: {0}")]
    TaskFailed(String),
}

/// A single ranker's failure during an initialize/reload fan-out.
#[derive(Debug)]
pub struct RankerFailure {
    pub method: SearchMethod,
    pub error: AppError,
}

fn describe_failures(failures: &[RankerFailure]) -> String {
    let detail: Vec<String> = failures
        .iter()
        .map(|f| format!("{}: {}", f.method, f.error))
        .collect();
    format!(
        "{} ranker(s) failed to initialize: {}",
        failures.len(),
        detail.join("; ")
    )
}

impl AppError {
    /// First failure of an aggregate, or the error itself.
    pub fn first_cause(&self) -> &AppError {
        match self {
            AppError::InitializationFailed(failures) => failures
                .first()
                .map(|f| f.error.first_cause())
                .unwrap_or(self),
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::AtomizerError(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotRegistered(_) => StatusCode::NOT_FOUND,
            AppError::NotInitialized(_) | AppError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::DimensionMismatch { .. }
            | AppError::InitializationFailed(_)
            | AppError::ConfigError(_)
            | AppError::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, code = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %message, code = status.as_u16(), "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ProviderUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_lists_every_failure() {
        let err = AppError::InitializationFailed(vec![
            RankerFailure {
                method: SearchMethod::Semantic,
                error: AppError::ProviderUnavailable("connection refused".into()),
            },
            RankerFailure {
                method: SearchMethod::Bm25,
                error: AppError::ValidationError("bad k1".into()),
            },
        ]);

        let message = err.to_string();
        assert!(message.starts_with("2 ranker(s) failed"));
        assert!(message.contains("semantic: Embedding provider unavailable"));
        assert!(message.contains("bm25: Invalid input: bad k1"));
        assert!(matches!(
            err.first_cause(),
            AppError::ProviderUnavailable(_)
        ));
    }

    #[test]
    fn test_status_codes_are_distinct_per_kind() {
        assert_eq!(
            AppError::MethodNotRegistered("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::NotReady(SearchMethod::Bm25).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::ProviderUnavailable("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Timeout {
                method: SearchMethod::Semantic,
                after: Duration::from_millis(5)
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_timeout_message_reports_millis() {
        let err = AppError::Timeout {
            method: SearchMethod::Semantic,
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "semantic search exceeded deadline of 250ms");
    }
}
