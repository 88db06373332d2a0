//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints, the router that wires
//! them together and the master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::{
    chat_task::chat_process,
    protocol::{
        AdvanceResponse, AnswerView, ChatRequest, ChatResponse, CreateSessionResponse,
        GenerateQuizRequest, LatestReportResponse, ProgressResponse, QuizView, ReportResponse,
        SkipRequest, SolutionLinkResponse, SubmitAnswerRequest, WeakTopicsResponse,
    },
    quiz_task::{
        advance_process, quiz_view, reset_quiz_process, skip_process, solution_link_process,
        start_quiz_process, submit_answer_process,
    },
    report_task::{analyze_report_process, latest_report},
    state::AppState,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

/// The multipart field that carries an uploaded test result.
pub const REPORT_FIELD: &str = "file";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
        delete_session_handler,
        clear_session_handler,
        chat_handler,
        weak_topics_handler,
        start_quiz_handler,
        get_quiz_handler,
        reset_quiz_handler,
        submit_answer_handler,
        skip_question_handler,
        advance_quiz_handler,
        solution_link_handler,
        upload_report_handler,
        latest_report_handler,
        progress_handler,
    ),
    components(
        schemas(
            CreateSessionResponse, ChatRequest, ChatResponse, WeakTopicsResponse,
            GenerateQuizRequest, QuizView, SubmitAnswerRequest, SkipRequest, AnswerView,
            AdvanceResponse, SolutionLinkResponse, ReportResponse, LatestReportResponse,
            ProgressResponse,
        )
    ),
    tags(
        (name = "Study Buddy API", description = "Chat tutoring, quizzes, test-result analysis and progress tracking.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

pub fn router(app_state: Arc<AppState>) -> Router {
    let max_upload_bytes = app_state.config.max_upload_bytes;
    Router::new()
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}", axum::routing::delete(delete_session_handler))
        .route("/sessions/{id}/clear", post(clear_session_handler))
        .route("/sessions/{id}/chat", post(chat_handler))
        .route("/sessions/{id}/weak-topics", get(weak_topics_handler))
        .route(
            "/sessions/{id}/quiz",
            post(start_quiz_handler)
                .get(get_quiz_handler)
                .delete(reset_quiz_handler),
        )
        .route("/sessions/{id}/quiz/answer", post(submit_answer_handler))
        .route("/sessions/{id}/quiz/skip", post(skip_question_handler))
        .route("/sessions/{id}/quiz/advance", post(advance_quiz_handler))
        .route("/sessions/{id}/quiz/solution-link", get(solution_link_handler))
        .route("/sessions/{id}/reports", post(upload_report_handler))
        .route("/sessions/{id}/reports/latest", get(latest_report_handler))
        .route("/sessions/{id}/progress", get(progress_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(app_state)
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Create a new learner session.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created successfully", body = CreateSessionResponse)
    )
)]
pub async fn create_session_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = app_state.sessions.create(&app_state.config).await;
    let active = app_state.sessions.len().await;
    info!(%session_id, active, "Session created");
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

/// Delete a learner session and everything recorded in it.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !app_state.sessions.remove(id).await {
        return Err(ApiError::SessionNotFound(id));
    }
    let active = app_state.sessions.len().await;
    info!(session_id = %id, active, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Clear chat, quiz, weak topics and the last report. Progress counters are kept.
#[utoipa::path(
    post,
    path = "/sessions/{id}/clear",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 204, description = "Session data cleared"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn clear_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    session_lock.lock().await.clear();
    info!(session_id = %id, "Session data cleared");
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Chat Handlers
//=========================================================================================

/// Send a chat message to the tutor.
#[utoipa::path(
    post,
    path = "/sessions/{id}/chat",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Tutor reply", body = ChatResponse),
        (status = 400, description = "Empty or oversized message"),
        (status = 404, description = "Session not found"),
        (status = 502, description = "The language model is unavailable")
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let response = chat_process(&app_state, &session_lock, &request.message).await?;
    Ok(Json(response))
}

/// List the topics the learner currently struggles with.
#[utoipa::path(
    get,
    path = "/sessions/{id}/weak-topics",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "Weak topics in alphabetical order", body = WeakTopicsResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn weak_topics_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WeakTopicsResponse>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let weak_topics = session_lock.lock().await.study.weak_topics.to_vec();
    Ok(Json(WeakTopicsResponse { weak_topics }))
}

//=========================================================================================
// Quiz Handlers
//=========================================================================================

/// Generate a new quiz and make it the active one.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body = GenerateQuizRequest,
    responses(
        (status = 201, description = "Quiz started", body = QuizView),
        (status = 400, description = "Invalid topic or question count"),
        (status = 404, description = "Session not found"),
        (status = 502, description = "The quiz could not be generated; retrying may help")
    )
)]
pub async fn start_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let view = start_quiz_process(&app_state, &session_lock, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Show the current quiz screen.
#[utoipa::path(
    get,
    path = "/sessions/{id}/quiz",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "Current quiz state", body = QuizView),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizView>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    Ok(Json(quiz_view(&session_lock).await))
}

/// Abandon the current quiz.
#[utoipa::path(
    delete,
    path = "/sessions/{id}/quiz",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "Quiz discarded", body = QuizView),
        (status = 404, description = "Session not found")
    )
)]
pub async fn reset_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizView>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    Ok(Json(reset_quiz_process(&session_lock).await))
}

/// Answer the current question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz/answer",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerView),
        (status = 404, description = "Session not found"),
        (status = 409, description = "No active quiz, or the question was already answered")
    )
)]
pub async fn submit_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerView>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let view = submit_answer_process(&session_lock, request.selected_index).await?;
    Ok(Json(view))
}

/// Skip the current question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz/skip",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body = SkipRequest,
    responses(
        (status = 200, description = "Question skipped", body = AnswerView),
        (status = 404, description = "Session not found"),
        (status = 409, description = "No active quiz, or not the current question")
    )
)]
pub async fn skip_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SkipRequest>,
) -> Result<Json<AnswerView>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let view = skip_process(&session_lock, request.question_index).await?;
    Ok(Json(view))
}

/// Move on to the next question, completing the quiz after the last one.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz/advance",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "Quiz advanced", body = AdvanceResponse),
        (status = 404, description = "Session not found"),
        (status = 409, description = "No active quiz, or the current question is unanswered")
    )
)]
pub async fn advance_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let outcome = advance_process(&session_lock).await?;
    let quiz = quiz_view(&session_lock).await;
    Ok(Json(AdvanceResponse { outcome, quiz }))
}

/// Find a worked solution for the current question.
#[utoipa::path(
    get,
    path = "/sessions/{id}/quiz/solution-link",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "Lookup finished; `link` is null when nothing was found", body = SolutionLinkResponse),
        (status = 404, description = "Session not found"),
        (status = 409, description = "No quiz in progress")
    )
)]
pub async fn solution_link_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SolutionLinkResponse>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let response = solution_link_process(&app_state, &session_lock).await?;
    Ok(Json(response))
}

//=========================================================================================
// Report and Progress Handlers
//=========================================================================================

/// Upload a previous test result (PDF) for analysis.
///
/// Accepts a multipart/form-data request; the document goes in the `file` part.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reports",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body(content_type = "multipart/form-data", description = "The test result PDF."),
    responses(
        (status = 200, description = "Report analysed and applied", body = ReportResponse),
        (status = 400, description = "Missing file part"),
        (status = 404, description = "Session not found"),
        (status = 422, description = "No text could be extracted from the document"),
        (status = 502, description = "The report could not be analysed; retrying may help")
    )
)]
pub async fn upload_report_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;

    let mut file_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() == Some(REPORT_FIELD) {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidInput(format!("Failed to read file bytes: {}", e)))?;
            file_bytes = Some(data);
            break;
        }
    }
    let file_bytes = file_bytes.ok_or_else(|| {
        ApiError::InvalidInput(format!("Multipart form must include a '{}' part", REPORT_FIELD))
    })?;

    info!(session_id = %id, "Analysing uploaded report ({} bytes)", file_bytes.len());
    let response = analyze_report_process(&app_state, &session_lock, &file_bytes).await?;
    Ok(Json(response))
}

/// Show the most recent test-result analysis.
#[utoipa::path(
    get,
    path = "/sessions/{id}/reports/latest",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "The last report, or null if none was uploaded", body = LatestReportResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn latest_report_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LatestReportResponse>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let report = latest_report(&session_lock).await;
    Ok(Json(LatestReportResponse { report }))
}

/// Show the gamification ledger: totals, level, streak and per-topic mastery.
#[utoipa::path(
    get,
    path = "/sessions/{id}/progress",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "Progress snapshot", body = ProgressResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn progress_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let session_lock = app_state.sessions.get(id).await?;
    let session = session_lock.lock().await;
    Ok(Json(ProgressResponse {
        progress: session.study.ledger.progress(),
        weak_topics: session.study.weak_topics.to_vec(),
    }))
}
