//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each error is
//! presented to HTTP clients.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use study_buddy_core::{PortError, QuizError};
use uuid::Uuid;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A quiz transition the current quiz state does not allow.
    #[error("Quiz Error: {0}")]
    Quiz(#[from] QuizError),

    /// No learner session exists with this id.
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// The request was well-formed but its content is not acceptable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Port(PortError::Generation { .. } | PortError::Analysis { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Port(PortError::Extraction(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Port(PortError::Unexpected(_)) => StatusCode::BAD_GATEWAY,
            // A quiz that came back without questions is a generation failure to the caller.
            ApiError::Quiz(QuizError::EmptyQuiz) => StatusCode::BAD_GATEWAY,
            ApiError::Quiz(_) => StatusCode::CONFLICT,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Config(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether trying the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        self.status() == StatusCode::BAD_GATEWAY
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Port(PortError::Generation { .. }) | ApiError::Quiz(QuizError::EmptyQuiz) => {
                "The quiz could not be generated. Please try again.".to_string()
            }
            ApiError::Port(PortError::Analysis { .. }) => {
                "The test results could not be analysed. Please try again.".to_string()
            }
            ApiError::Port(PortError::Extraction(_)) => {
                "Could not extract text. Please upload a clear PDF.".to_string()
            }
            ApiError::Port(PortError::Unexpected(_)) => {
                "The study assistant is unavailable right now. Please try again.".to_string()
            }
            ApiError::Config(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                "An internal error occurred.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        if let ApiError::Port(port_error) = &self {
            if let Some(raw) = port_error.raw_output() {
                tracing::warn!(raw, "Unparseable model output");
            }
        }
        let body = json!({
            "error": self.client_message(),
            "retryable": self.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failures_are_retryable_bad_gateway() {
        let err = ApiError::from(PortError::Generation {
            message: "no JSON array".into(),
            raw: "sorry".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.is_retryable());
        assert!(!err.client_message().contains("sorry"));
    }

    #[test]
    fn quiz_contract_violations_are_conflicts() {
        let err = ApiError::from(QuizError::AlreadyAnswered(2));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(!err.is_retryable());
        assert_eq!(
            ApiError::from(QuizError::EmptyQuiz).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn extraction_failures_are_unprocessable() {
        let err = ApiError::from(PortError::Extraction("blank".into()));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
