//! services/api/src/web/quiz_task.rs
//!
//! Workers for the quiz lifecycle: generation, answering, skipping, advancing
//! and the solution-link lookup for the current question.

use crate::config::{MAX_QUIZ_QUESTIONS, MIN_QUIZ_QUESTIONS};
use crate::error::ApiError;
use crate::web::protocol::{AnswerView, GenerateQuizRequest, QuizView, SolutionLinkResponse};
use crate::web::state::{AppState, LearnerSession};
use std::time::Instant;
use study_buddy_core::{AdvanceOutcome, PortError, PortResult, Question, QuizError, QuizRequest};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Generates a fresh quiz and makes it the active one.
///
/// A quiz that is still in progress is replaced only once the new questions are in
/// hand, so a failed generation leaves the learner's current quiz untouched.
pub async fn start_quiz_process(
    app_state: &AppState,
    session_lock: &Mutex<LearnerSession>,
    request: GenerateQuizRequest,
) -> Result<QuizView, ApiError> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::InvalidInput("topic must not be empty".to_string()));
    }
    let count = request.count.unwrap_or(app_state.config.quiz_question_count);
    if !(MIN_QUIZ_QUESTIONS..=MAX_QUIZ_QUESTIONS).contains(&count) {
        return Err(ApiError::InvalidInput(format!(
            "count must be between {} and {}",
            MIN_QUIZ_QUESTIONS, MAX_QUIZ_QUESTIONS
        )));
    }

    let start_time = Instant::now();
    let mut session = session_lock.lock().await;

    let quiz_request = QuizRequest {
        topic: topic.to_string(),
        difficulty: request.difficulty.unwrap_or(app_state.config.quiz_difficulty),
        count,
        weak_topics: session.study.weak_topics.to_vec(),
    };
    let questions = generate_with_retry(app_state, &quiz_request).await?;
    info!(
        "Quiz generation took: {:?} ({} questions)",
        start_time.elapsed(),
        questions.len()
    );
    if questions.is_empty() {
        return Err(QuizError::EmptyQuiz.into());
    }

    let scheme = request
        .scoring_scheme
        .unwrap_or(app_state.config.scoring_scheme);
    session.study.reset_quiz();
    session
        .study
        .start_quiz(questions, &quiz_request.topic, quiz_request.difficulty, scheme)?;

    Ok(QuizView::from_state(&session.study.quiz))
}

/// Asks the gateway for questions, trying once more if the reply was unusable.
async fn generate_with_retry(
    app_state: &AppState,
    request: &QuizRequest,
) -> PortResult<Vec<Question>> {
    match app_state.llm.generate_quiz(request).await {
        Err(e @ PortError::Generation { .. }) => {
            warn!("Quiz generation failed, retrying once: {}", e);
            app_state.llm.generate_quiz(request).await
        }
        other => other,
    }
}

pub async fn submit_answer_process(
    session_lock: &Mutex<LearnerSession>,
    selected_index: usize,
) -> Result<AnswerView, ApiError> {
    let mut session = session_lock.lock().await;
    let record = session.study.submit_answer(selected_index)?;
    let quiz = session
        .study
        .quiz
        .session()
        .ok_or(ApiError::Quiz(QuizError::NotActive))?;
    let index = quiz.current_index();
    info!(index, correct = record.is_correct, "Answer submitted");
    Ok(AnswerView::new(quiz, index, &record))
}

pub async fn skip_process(
    session_lock: &Mutex<LearnerSession>,
    question_index: usize,
) -> Result<AnswerView, ApiError> {
    let mut session = session_lock.lock().await;
    let record = session.study.skip(question_index)?;
    let quiz = session
        .study
        .quiz
        .session()
        .ok_or(ApiError::Quiz(QuizError::NotActive))?;
    info!(index = question_index, "Question skipped");
    Ok(AnswerView::new(quiz, question_index, &record))
}

/// Moves past the current question. Completing the quiz counts as today's activity.
pub async fn advance_process(
    session_lock: &Mutex<LearnerSession>,
) -> Result<AdvanceOutcome, ApiError> {
    let today = chrono::Local::now().date_naive();
    let mut session = session_lock.lock().await;
    let outcome = session.study.advance(today)?;
    if let AdvanceOutcome::Completed(summary) = &outcome {
        info!(
            score = summary.score,
            accuracy = summary.accuracy,
            level = summary.level,
            leveled_up = summary.leveled_up,
            "Quiz completed"
        );
    }
    Ok(outcome)
}

pub async fn quiz_view(session_lock: &Mutex<LearnerSession>) -> QuizView {
    QuizView::from_state(&session_lock.lock().await.study.quiz)
}

pub async fn reset_quiz_process(session_lock: &Mutex<LearnerSession>) -> QuizView {
    let mut session = session_lock.lock().await;
    session.study.reset_quiz();
    QuizView::from_state(&session.study.quiz)
}

/// Looks up a worked solution for the question currently on screen.
pub async fn solution_link_process(
    app_state: &AppState,
    session_lock: &Mutex<LearnerSession>,
) -> Result<SolutionLinkResponse, ApiError> {
    let (question_index, question_text) = {
        let session = session_lock.lock().await;
        let quiz = session
            .study
            .quiz
            .session()
            .ok_or(ApiError::Quiz(QuizError::NotActive))?;
        let question = quiz
            .current_question()
            .ok_or(ApiError::Quiz(QuizError::NotActive))?;
        (quiz.current_index(), question.text.clone())
    };

    // The lookup is read-only and may be slow, so the session lock is not held.
    let start_time = Instant::now();
    let link = app_state.link_finder.find_link(&question_text).await;
    info!("Solution lookup took: {:?}", start_time.elapsed());

    Ok(SolutionLinkResponse {
        question_index,
        link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::protocol::QuizStatus;
    use crate::web::state::test_support::{app_state, learner};
    use study_buddy_core::ports::{
        MockDocumentTextExtractor, MockLlmGateway, MockSolutionLinkFinder,
    };
    use study_buddy_core::{Difficulty, Explanation, ScoringScheme};

    fn question(text: &str, correct_index: usize) -> Question {
        Question {
            text: text.to_string(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_index,
            explanation: Explanation::Text("Because.".into()),
        }
    }

    fn request(topic: &str, count: Option<usize>) -> GenerateQuizRequest {
        GenerateQuizRequest {
            topic: topic.to_string(),
            difficulty: Some(Difficulty::Mains),
            count,
            scoring_scheme: None,
        }
    }

    fn state_with(llm: MockLlmGateway, finder: MockSolutionLinkFinder) -> AppState {
        app_state(llm, MockDocumentTextExtractor::new(), finder)
    }

    fn generating(questions: Vec<Question>) -> MockLlmGateway {
        let mut llm = MockLlmGateway::new();
        llm.expect_generate_quiz()
            .returning(move |_| Ok(questions.clone()));
        llm
    }

    fn generation_error() -> PortError {
        PortError::Generation {
            message: "no JSON array".to_string(),
            raw: "Sorry!".to_string(),
        }
    }

    #[tokio::test]
    async fn a_generated_quiz_becomes_active() {
        let mut llm = MockLlmGateway::new();
        llm.expect_generate_quiz()
            .withf(|req| {
                req.topic == "kinematics"
                    && req.count == 2
                    && req.difficulty == Difficulty::Mains
                    && req.weak_topics == vec!["vectors".to_string()]
            })
            .times(1)
            .returning(|_| Ok(vec![question("q1", 0), question("q2", 1)]));
        let state = state_with(llm, MockSolutionLinkFinder::new());
        let mut learner = learner();
        learner.study.weak_topics.add_from_message(["Vectors"]);
        let session = Mutex::new(learner);

        let view = start_quiz_process(&state, &session, request(" kinematics ", Some(2)))
            .await
            .unwrap();

        assert_eq!(view.status, QuizStatus::Active);
        assert_eq!(view.total_questions, 2);
        assert_eq!(view.topic.as_deref(), Some("kinematics"));
        assert_eq!(view.current_question.unwrap().text, "q1");
    }

    #[tokio::test]
    async fn generation_is_retried_once() {
        let mut llm = MockLlmGateway::new();
        let mut seq = mockall::Sequence::new();
        llm.expect_generate_quiz()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(generation_error()));
        llm.expect_generate_quiz()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![question("q1", 0)]));
        let state = state_with(llm, MockSolutionLinkFinder::new());
        let session = Mutex::new(learner());

        let view = start_quiz_process(&state, &session, request("optics", Some(1)))
            .await
            .unwrap();
        assert_eq!(view.total_questions, 1);
    }

    #[tokio::test]
    async fn a_second_failure_is_reported_as_retryable() {
        let mut llm = MockLlmGateway::new();
        llm.expect_generate_quiz()
            .times(2)
            .returning(|_| Err(generation_error()));
        let state = state_with(llm, MockSolutionLinkFinder::new());
        let session = Mutex::new(learner());

        let err = start_quiz_process(&state, &session, request("optics", Some(1)))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(!session.lock().await.study.quiz.is_active());
    }

    #[tokio::test]
    async fn an_empty_quiz_keeps_the_current_one() {
        let state = state_with(generating(Vec::new()), MockSolutionLinkFinder::new());
        let mut learner = learner();
        learner
            .study
            .start_quiz(vec![question("old", 0)], "optics", Difficulty::Easy, ScoringScheme::Binary)
            .unwrap();
        let session = Mutex::new(learner);

        let err = start_quiz_process(&state, &session, request("optics", Some(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Quiz(QuizError::EmptyQuiz)));
        let view = quiz_view(&session).await;
        assert_eq!(view.current_question.unwrap().text, "old");
    }

    #[tokio::test]
    async fn out_of_range_counts_are_rejected() {
        let state = state_with(MockLlmGateway::new(), MockSolutionLinkFinder::new());
        let session = Mutex::new(learner());

        for count in [0, MAX_QUIZ_QUESTIONS + 1] {
            let err = start_quiz_process(&state, &session, request("optics", Some(count)))
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput(_)));
        }
        let err = start_quiz_process(&state, &session, request("  ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn answering_then_advancing_completes_the_quiz() {
        let state = state_with(
            generating(vec![question("q1", 2), question("q2", 0)]),
            MockSolutionLinkFinder::new(),
        );
        let session = Mutex::new(learner());
        start_quiz_process(&state, &session, request("optics", Some(2)))
            .await
            .unwrap();

        let answer = submit_answer_process(&session, 2).await.unwrap();
        assert!(answer.is_correct);
        assert_eq!(answer.correct_option, "C");

        let next = advance_process(&session).await.unwrap();
        assert_eq!(next, AdvanceOutcome::Next { index: 1 });

        let skipped = skip_process(&session, 1).await.unwrap();
        assert!(skipped.skipped);
        assert!(!skipped.is_correct);

        let AdvanceOutcome::Completed(summary) = advance_process(&session).await.unwrap() else {
            panic!("quiz should be complete");
        };
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.accuracy, 50.0);
        assert_eq!(summary.streak, 1);
        assert_eq!(quiz_view(&session).await.status, QuizStatus::Completed);
    }

    #[tokio::test]
    async fn answering_twice_is_a_conflict() {
        let state = state_with(generating(vec![question("q1", 0)]), MockSolutionLinkFinder::new());
        let session = Mutex::new(learner());
        start_quiz_process(&state, &session, request("optics", Some(1)))
            .await
            .unwrap();

        submit_answer_process(&session, 1).await.unwrap();
        let err = submit_answer_process(&session, 0).await.unwrap_err();
        assert!(matches!(err, ApiError::Quiz(QuizError::AlreadyAnswered(0))));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let state = state_with(generating(vec![question("q1", 0)]), MockSolutionLinkFinder::new());
        let session = Mutex::new(learner());
        start_quiz_process(&state, &session, request("optics", Some(1)))
            .await
            .unwrap();

        let view = reset_quiz_process(&session).await;
        assert_eq!(view.status, QuizStatus::Idle);
        assert!(matches!(
            advance_process(&session).await,
            Err(ApiError::Quiz(QuizError::NotActive))
        ));
    }

    #[tokio::test]
    async fn solution_link_is_looked_up_for_the_current_question() {
        let mut finder = MockSolutionLinkFinder::new();
        finder
            .expect_find_link()
            .withf(|text| text.trim() == "q1")
            .times(1)
            .returning(|_| Some("https://example.com/q1".to_string()));
        let state = state_with(generating(vec![question("q1", 0)]), finder);
        let session = Mutex::new(learner());
        start_quiz_process(&state, &session, request("optics", Some(1)))
            .await
            .unwrap();

        let response = solution_link_process(&state, &session).await.unwrap();
        assert_eq!(response.question_index, 0);
        assert_eq!(response.link.as_deref(), Some("https://example.com/q1"));
    }

    #[tokio::test]
    async fn solution_link_needs_a_quiz() {
        let state = state_with(MockLlmGateway::new(), MockSolutionLinkFinder::new());
        let session = Mutex::new(learner());

        let err = solution_link_process(&state, &session).await.unwrap_err();
        assert!(matches!(err, ApiError::Quiz(QuizError::NotActive)));
    }
}
