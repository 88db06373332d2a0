//! services/api/src/web/protocol.rs
//!
//! Defines the JSON bodies exchanged with the client. Views are read-only
//! projections of the core state; a question's correct answer is only revealed
//! once the learner has answered it.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use study_buddy_core::{
    AdvanceOutcome, AnalysisReport, AnswerRecord, Difficulty, Explanation, Progress, QuizSession,
    QuizState, QuizSummary, ReportFold, ScoringScheme,
};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Requests FROM the Client
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

/// Asks for a new quiz. Omitted fields fall back to the configured defaults.
/// Difficulty and scoring scheme names are case-insensitive.
#[serde_as]
#[derive(Deserialize, Debug, ToSchema)]
pub struct GenerateQuizRequest {
    pub topic: String,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[schema(value_type = Option<String>, example = "mains")]
    pub difficulty: Option<Difficulty>,
    pub count: Option<usize>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[schema(value_type = Option<String>, example = "weighted")]
    pub scoring_scheme: Option<ScoringScheme>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SubmitAnswerRequest {
    pub selected_index: usize,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SkipRequest {
    pub question_index: usize,
}

//=========================================================================================
// Responses TO the Client
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
    pub new_topics: Vec<String>,
    pub weak_topics: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct WeakTopicsResponse {
    pub weak_topics: Vec<String>,
}

/// A question as shown before it is answered.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct QuestionView {
    pub index: usize,
    pub text: String,
    pub options: Vec<String>,
}

/// The result of an answered or skipped question, with the explanation.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct AnswerView {
    pub question_index: usize,
    pub selected_index: Option<usize>,
    pub is_correct: bool,
    pub skipped: bool,
    pub correct_index: usize,
    pub correct_option: String,
    #[schema(value_type = Object)]
    pub explanation: Explanation,
    pub score: i64,
}

impl AnswerView {
    pub fn new(session: &QuizSession, question_index: usize, record: &AnswerRecord) -> Self {
        let question = &session.questions()[question_index];
        Self {
            question_index,
            selected_index: record.selected_index,
            is_correct: record.is_correct,
            skipped: record.selected_index.is_none(),
            correct_index: question.correct_index,
            correct_option: question.correct_option().to_string(),
            explanation: question.explanation.clone(),
            score: session.score(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Idle,
    Active,
    Completed,
}

/// Everything a client needs to render the quiz screen.
#[derive(Serialize, Debug, ToSchema)]
pub struct QuizView {
    pub status: QuizStatus,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub scoring_scheme: Option<String>,
    pub total_questions: usize,
    pub current_index: usize,
    pub current_question: Option<QuestionView>,
    /// Present once the current question has been answered or skipped.
    pub current_answer: Option<AnswerView>,
    pub score: i64,
    pub answered: usize,
    pub correct: usize,
    pub running_accuracy: Option<f64>,
    #[schema(value_type = Option<Object>)]
    pub summary: Option<QuizSummary>,
}

impl QuizView {
    pub fn from_state(state: &QuizState) -> Self {
        let Some(session) = state.session() else {
            return Self::idle();
        };
        let status = if state.is_active() {
            QuizStatus::Active
        } else {
            QuizStatus::Completed
        };
        let summary = match state {
            QuizState::Completed { summary, .. } => Some(summary.clone()),
            _ => None,
        };
        let index = session.current_index();

        Self {
            status,
            topic: Some(session.topic().to_string()),
            difficulty: Some(session.difficulty().to_string()),
            scoring_scheme: Some(format!("{:?}", session.scoring_scheme()).to_lowercase()),
            total_questions: session.len(),
            current_index: index,
            current_question: session.current_question().map(|q| QuestionView {
                index,
                text: q.text.clone(),
                options: q.options.clone(),
            }),
            current_answer: session
                .answer(index)
                .map(|record| AnswerView::new(session, index, record)),
            score: session.score(),
            answered: session.answered_count(),
            correct: session.correct_count(),
            running_accuracy: session.running_accuracy(),
            summary,
        }
    }

    fn idle() -> Self {
        Self {
            status: QuizStatus::Idle,
            topic: None,
            difficulty: None,
            scoring_scheme: None,
            total_questions: 0,
            current_index: 0,
            current_question: None,
            current_answer: None,
            score: 0,
            answered: 0,
            correct: 0,
            running_accuracy: None,
            summary: None,
        }
    }
}

/// Where the quiz went after `advance`, plus the refreshed quiz screen.
#[derive(Serialize, Debug, ToSchema)]
pub struct AdvanceResponse {
    #[schema(value_type = Object)]
    pub outcome: AdvanceOutcome,
    pub quiz: QuizView,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SolutionLinkResponse {
    pub question_index: usize,
    pub link: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ReportResponse {
    #[schema(value_type = Object)]
    pub report: AnalysisReport,
    #[schema(value_type = Object)]
    pub applied: ReportFold,
    pub weak_topics: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct LatestReportResponse {
    #[schema(value_type = Option<Object>)]
    pub report: Option<AnalysisReport>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProgressResponse {
    #[schema(value_type = Object)]
    pub progress: Progress,
    pub weak_topics: Vec<String>,
}
