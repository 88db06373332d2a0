//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the study assistant's LLM.
//! It implements the `LlmGateway` port from the `core` crate against any
//! OpenAI-compatible chat completion endpoint.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Instant;
use study_buddy_core::{
    extract::{self, JsonShape},
    AnalysisReport, ChatRole, ChatTurn, LlmGateway, PortError, PortResult, Question, QuizRequest,
};
use tracing::{debug, info, warn};

use crate::adapters::prompts;

/// Sampling temperature for calls whose output must be machine-readable.
const STRUCTURED_TEMPERATURE: f32 = 0.2;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LlmGateway` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    chat_model: String,
    quiz_model: String,
    exam_name: String,
}

impl OpenAiGateway {
    /// Creates a new `OpenAiGateway`.
    pub fn new(
        client: Client<OpenAIConfig>,
        chat_model: String,
        quiz_model: String,
        exam_name: String,
    ) -> Self {
        Self {
            client,
            chat_model,
            quiz_model,
            exam_name,
        }
    }

    /// Sends one chat completion request and returns the text of the first choice.
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        temperature: Option<f32>,
    ) -> PortResult<String> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(model).messages(messages).n(1);
        if let Some(temperature) = temperature {
            builder.temperature(temperature);
        }
        let request = builder
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let started = Instant::now();
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;
        debug!(model, elapsed = ?started.elapsed(), "LLM call finished");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PortError::Unexpected("The LLM returned no text content.".to_string()))
    }

    /// A single-turn structured request at low temperature.
    async fn complete_prompt(&self, model: &str, prompt: String) -> PortResult<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into();
        self.complete(model, vec![message], Some(STRUCTURED_TEMPERATURE))
            .await
    }

    fn history_message(turn: &ChatTurn) -> PortResult<ChatCompletionRequestMessage> {
        let message = match turn.role {
            ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        };
        Ok(message)
    }
}

//=========================================================================================
// `LlmGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn generate_chat_reply(
        &self,
        history: &[ChatTurn],
        user_message: &str,
    ) -> PortResult<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(history.len() + 2);
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompts::chat_system_prompt(&self.exam_name))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );
        for turn in history {
            messages.push(Self::history_message(turn)?);
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );

        let reply = self.complete(&self.chat_model, messages, None).await?;
        Ok(reply.trim().to_string())
    }

    async fn extract_topics(&self, user_message: &str) -> BTreeSet<String> {
        let prompt = prompts::topic_extraction_prompt(&self.exam_name, user_message);
        match self.complete_prompt(&self.chat_model, prompt).await {
            Ok(raw) => extract::parse_topic_list(&raw),
            Err(e) => {
                warn!("Topic extraction failed, treating the message as topic-free: {}", e);
                BTreeSet::new()
            }
        }
    }

    async fn generate_quiz(&self, request: &QuizRequest) -> PortResult<Vec<Question>> {
        let prompt = prompts::quiz_prompt(&self.exam_name, request);
        let raw = self.complete_prompt(&self.quiz_model, prompt).await?;

        let questions = questions_from_reply(raw, request.count)?;
        info!(
            topic = %request.topic,
            count = questions.len(),
            "Quiz questions generated"
        );
        Ok(questions)
    }

    async fn analyze_test_report(&self, document_text: &str) -> PortResult<AnalysisReport> {
        let prompt = prompts::report_prompt(&self.exam_name, document_text);
        let raw = self.complete_prompt(&self.quiz_model, prompt).await?;

        report_from_reply(raw)
    }
}

//=========================================================================================
// Reply Parsing
//=========================================================================================

/// Parses a quiz reply. The raw text travels with the error for logging.
fn questions_from_reply(raw: String, count: usize) -> PortResult<Vec<Question>> {
    extract::parse_questions(&raw, Some(count)).map_err(|e| PortError::Generation {
        message: e.to_string(),
        raw,
    })
}

fn report_from_reply(raw: String) -> PortResult<AnalysisReport> {
    extract::parse_json::<AnalysisReport>(&raw, JsonShape::Object).map_err(|e| {
        PortError::Analysis {
            message: e.to_string(),
            raw,
        }
    })
}
