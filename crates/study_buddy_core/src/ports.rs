//! crates/study_buddy_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the hosted LLM, the PDF parser and the web search used
//! for solution links.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::domain::{AnalysisReport, ChatTurn, Question, QuizRequest};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type for all port operations.
///
/// `Generation` and `Analysis` keep the raw model output so that callers can log it
/// for diagnostics; it is never shown to the learner.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Quiz generation failed: {message}")]
    Generation { message: String, raw: String },
    #[error("Test analysis failed: {message}")]
    Analysis { message: String, raw: String },
    #[error("No text could be extracted from the document: {0}")]
    Extraction(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The raw model output attached to a parse failure, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            PortError::Generation { raw, .. } | PortError::Analysis { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Replies to the learner, given the conversation so far.
    async fn generate_chat_reply(&self, history: &[ChatTurn], user_message: &str)
        -> PortResult<String>;

    /// Infers weak topics from a learner message.
    ///
    /// Returns an empty set when the model answers "none" or when anything goes wrong;
    /// this call never fails.
    async fn extract_topics(&self, user_message: &str) -> BTreeSet<String>;

    /// Generates the questions of a new quiz. Malformed output is a `Generation` error.
    async fn generate_quiz(&self, request: &QuizRequest) -> PortResult<Vec<Question>>;

    /// Turns the text of a previous test into a structured report.
    async fn analyze_test_report(&self, document_text: &str) -> PortResult<AnalysisReport>;
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait DocumentTextExtractor: Send + Sync {
    /// Extracts plain text from an uploaded document.
    /// Fails with `Extraction` when the document yields no text (e.g. an image-only scan).
    async fn extract(&self, file_bytes: &[u8]) -> PortResult<String>;
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SolutionLinkFinder: Send + Sync {
    /// Looks up a worked solution for a question. Best effort: failures are `None`.
    async fn find_link(&self, question_text: &str) -> Option<String>;
}
