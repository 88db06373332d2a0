//! services/api/src/web/chat_task.rs
//!
//! The worker that handles one chat message: reply generation, weak-topic
//! inference and history bookkeeping.

use crate::error::ApiError;
use crate::web::protocol::ChatResponse;
use crate::web::state::{AppState, LearnerSession};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;

pub const MAX_CHAT_MESSAGE_CHARS: usize = 4_000;

/// Answers `message` and records any topics the learner seems to struggle with.
///
/// Topic inference is best-effort: the gateway returns an empty set when it
/// cannot tell, and the reply is still delivered.
pub async fn chat_process(
    app_state: &AppState,
    session_lock: &Mutex<LearnerSession>,
    message: &str,
) -> Result<ChatResponse, ApiError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ApiError::InvalidInput("message must not be empty".to_string()));
    }
    if message.chars().count() > MAX_CHAT_MESSAGE_CHARS {
        return Err(ApiError::InvalidInput(format!(
            "message must be at most {} characters",
            MAX_CHAT_MESSAGE_CHARS
        )));
    }

    let start_time = Instant::now();
    let mut session = session_lock.lock().await;

    let reply = app_state
        .llm
        .generate_chat_reply(&session.chat_history, message)
        .await?;
    info!("Chat reply took: {:?}", start_time.elapsed());

    let topics_start = Instant::now();
    let topics = app_state.llm.extract_topics(message).await;
    let new_topics = session.study.weak_topics.add_from_message(&topics);
    info!(
        "Topic extraction took: {:?} ({} new)",
        topics_start.elapsed(),
        new_topics.len()
    );

    session.push_exchange(message, &reply);

    Ok(ChatResponse {
        reply,
        new_topics,
        weak_topics: session.study.weak_topics.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_support::{app_state, learner};
    use std::collections::BTreeSet;
    use study_buddy_core::ports::{
        MockDocumentTextExtractor, MockLlmGateway, MockSolutionLinkFinder,
    };
    use study_buddy_core::{ChatRole, PortError};

    fn state_with(llm: MockLlmGateway) -> AppState {
        app_state(llm, MockDocumentTextExtractor::new(), MockSolutionLinkFinder::new())
    }

    #[tokio::test]
    async fn reply_is_returned_and_topics_are_recorded() {
        let mut llm = MockLlmGateway::new();
        llm.expect_generate_chat_reply()
            .times(1)
            .returning(|_, _| Ok("Think of the lens formula first.".to_string()));
        llm.expect_extract_topics().times(1).returning(|_| {
            BTreeSet::from(["Ray Optics".to_string(), "lens formula".to_string()])
        });
        let state = state_with(llm);
        let session = Mutex::new(learner());

        let response = chat_process(&state, &session, "  I keep failing lens problems ")
            .await
            .unwrap();

        assert_eq!(response.reply, "Think of the lens formula first.");
        assert_eq!(response.new_topics, vec!["ray optics", "lens formula"]);
        let session = session.lock().await;
        assert!(session.study.weak_topics.contains("ray optics"));
        assert_eq!(session.chat_history.len(), 2);
        assert_eq!(session.chat_history[0].role, ChatRole::User);
        assert_eq!(session.chat_history[0].content, "I keep failing lens problems");
    }

    #[tokio::test]
    async fn history_is_passed_to_the_model() {
        let mut llm = MockLlmGateway::new();
        llm.expect_generate_chat_reply()
            .withf(|history, message| history.len() == 2 && message.trim() == "and now?")
            .times(1)
            .returning(|_, _| Ok("Next step.".to_string()));
        llm.expect_extract_topics().returning(|_| BTreeSet::new());
        let state = state_with(llm);
        let mut learner = learner();
        learner.push_exchange("hello", "hi");
        let session = Mutex::new(learner);

        let response = chat_process(&state, &session, "and now?").await.unwrap();
        assert!(response.new_topics.is_empty());
        assert_eq!(session.lock().await.chat_history.len(), 4);
    }

    #[tokio::test]
    async fn empty_messages_are_rejected_without_calling_the_model() {
        let state = state_with(MockLlmGateway::new());
        let session = Mutex::new(learner());

        let err = chat_process(&state, &session, "   ").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn failed_reply_leaves_history_untouched() {
        let mut llm = MockLlmGateway::new();
        llm.expect_generate_chat_reply()
            .returning(|_, _| Err(PortError::Unexpected("timeout".to_string())));
        let state = state_with(llm);
        let session = Mutex::new(learner());

        let err = chat_process(&state, &session, "help").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(session.lock().await.chat_history.is_empty());
    }
}
