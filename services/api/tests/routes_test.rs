use api_lib::{
    config::Config,
    web::{router, AppState, SessionRegistry},
};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use study_buddy_core::ports::{MockDocumentTextExtractor, MockLlmGateway, MockSolutionLinkFinder};
use study_buddy_core::{Difficulty, Explanation, PortError, Question};
use tower::ServiceExt;

const BOUNDARY: &str = "study-buddy-boundary";

fn config() -> Config {
    Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        "SCORING_SCHEME" => Some("binary".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

fn app(
    llm: MockLlmGateway,
    extractor: MockDocumentTextExtractor,
    link_finder: MockSolutionLinkFinder,
) -> Router {
    let config = config();
    let sessions = SessionRegistry::new(config.session_idle_ttl);
    router(Arc::new(AppState {
        config: Arc::new(config),
        llm: Arc::new(llm),
        extractor: Arc::new(extractor),
        link_finder: Arc::new(link_finder),
        sessions,
    }))
}

fn idle_app() -> Router {
    app(
        MockLlmGateway::new(),
        MockDocumentTextExtractor::new(),
        MockSolutionLinkFinder::new(),
    )
}

fn question(text: &str, correct_index: usize) -> Question {
    Question {
        text: text.to_string(),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_index,
        explanation: Explanation::Text("Worked solution.".into()),
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("request build should succeed"))
        .await
        .expect("router should respond");
    read(resp).await
}

async fn read(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, value)
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().expect("session id").to_string()
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let app = idle_app();
    let uri = "/sessions/8c0f5a52-3b0a-4d7e-9a43-3f1d7c2a9e10/progress";

    let (status, body) = send(&app, Method::GET, uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["retryable"], json!(false));
}

#[tokio::test]
async fn a_new_session_starts_idle_at_level_one() {
    let app = idle_app();
    let id = create_session(&app).await;

    let (status, quiz) = send(&app, Method::GET, &format!("/sessions/{id}/quiz"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quiz["status"], json!("idle"));

    let (_, progress) = send(&app, Method::GET, &format!("/sessions/{id}/progress"), None).await;
    assert_eq!(progress["progress"]["level"], json!(1));
    assert_eq!(progress["progress"]["questions_solved"], json!(0));
}

#[tokio::test]
async fn answering_without_a_quiz_is_a_conflict() {
    let app = idle_app();
    let id = create_session(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/sessions/{id}/quiz/answer"),
        Some(json!({ "selected_index": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn a_full_quiz_updates_progress() {
    let mut llm = MockLlmGateway::new();
    llm.expect_generate_quiz()
        .times(1)
        .returning(|_| Ok(vec![question("q1", 1), question("q2", 3)]));
    let app = app(llm, MockDocumentTextExtractor::new(), MockSolutionLinkFinder::new());
    let id = create_session(&app).await;

    let (status, quiz) = send(
        &app,
        Method::POST,
        &format!("/sessions/{id}/quiz"),
        Some(json!({ "topic": "Electrostatics", "count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quiz["total_questions"], json!(2));
    assert!(quiz["current_question"].get("correct_index").is_none());

    let (_, answer) = send(
        &app,
        Method::POST,
        &format!("/sessions/{id}/quiz/answer"),
        Some(json!({ "selected_index": 1 })),
    )
    .await;
    assert_eq!(answer["is_correct"], json!(true));

    let advance_uri = format!("/sessions/{id}/quiz/advance");
    let (_, advanced) = send(&app, Method::POST, &advance_uri, None).await;
    assert_eq!(advanced["outcome"]["status"], json!("next"));

    send(
        &app,
        Method::POST,
        &format!("/sessions/{id}/quiz/answer"),
        Some(json!({ "selected_index": 2 })),
    )
    .await;
    let (_, finished) = send(&app, Method::POST, &advance_uri, None).await;
    assert_eq!(finished["outcome"]["status"], json!("completed"));
    assert_eq!(finished["quiz"]["status"], json!("completed"));

    let (_, progress) = send(&app, Method::GET, &format!("/sessions/{id}/progress"), None).await;
    assert_eq!(progress["progress"]["questions_solved"], json!(2));
    assert_eq!(progress["progress"]["correct_answers"], json!(1));
    assert_eq!(progress["progress"]["quizzes_completed"], json!(1));
    assert_eq!(progress["progress"]["current_streak"], json!(1));
}

#[tokio::test]
async fn quiz_options_are_case_insensitive() {
    let mut llm = MockLlmGateway::new();
    llm.expect_generate_quiz()
        .withf(|req| req.difficulty == Difficulty::Advanced)
        .times(1)
        .returning(|_| Ok(vec![question("q1", 0)]));
    let app = app(llm, MockDocumentTextExtractor::new(), MockSolutionLinkFinder::new());
    let id = create_session(&app).await;

    let (status, quiz) = send(
        &app,
        Method::POST,
        &format!("/sessions/{id}/quiz"),
        Some(json!({
            "topic": "Optics",
            "count": 1,
            "difficulty": "advanced",
            "scoring_scheme": "WEIGHTED"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quiz["total_questions"], json!(1));
}

#[tokio::test]
async fn generation_failures_are_retryable_bad_gateway() {
    let mut llm = MockLlmGateway::new();
    llm.expect_generate_quiz().times(2).returning(|_| {
        Err(PortError::Generation {
            message: "no JSON array".to_string(),
            raw: "I cannot do that.".to_string(),
        })
    });
    let app = app(llm, MockDocumentTextExtractor::new(), MockSolutionLinkFinder::new());
    let id = create_session(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/sessions/{id}/quiz"),
        Some(json!({ "topic": "Optics" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["retryable"], json!(true));
}

#[tokio::test]
async fn an_uploaded_report_becomes_the_latest_report() {
    let mut extractor = MockDocumentTextExtractor::new();
    extractor
        .expect_extract()
        .withf(|bytes| bytes.starts_with(b"%PDF"))
        .times(1)
        .returning(|_| Ok("Mock test 4: Physics".to_string()));
    let mut llm = MockLlmGateway::new();
    llm.expect_analyze_test_report().times(1).returning(|_| {
        Ok(serde_json::from_value(json!({
            "weak_topics": ["Current Electricity"],
            "analysis": {
                "total_questions": 25,
                "correct_answers": "Not determinable",
                "incorrect_answers": "Not determinable",
                "accuracy_percentage": "Not determinable"
            },
            "question_analysis": []
        }))
        .expect("report fixture is valid"))
    });
    let app = app(llm, extractor, MockSolutionLinkFinder::new());
    let id = create_session(&app).await;

    let multipart = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"result.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4 fake\r\n--{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
        .method(Method::POST)
        .uri(format!("/sessions/{id}/reports"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart))
        .expect("request build should succeed");
    let (status, body) = read(app.clone().oneshot(req).await.expect("router should respond")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"]["questions_added"], json!(25));
    assert_eq!(body["applied"]["correct_added"], json!(0));
    assert_eq!(body["weak_topics"], json!(["current electricity"]));

    let latest_uri = format!("/sessions/{id}/reports/latest");
    let (_, latest) = send(&app, Method::GET, &latest_uri, None).await;
    assert_eq!(latest["report"]["analysis"]["correct_answers"], json!("not determinable"));

    let (_, topics) = send(&app, Method::GET, &format!("/sessions/{id}/weak-topics"), None).await;
    assert_eq!(topics["weak_topics"], json!(["current electricity"]));
}

#[tokio::test]
async fn clearing_keeps_progress_but_forgets_topics() {
    let mut llm = MockLlmGateway::new();
    llm.expect_generate_chat_reply()
        .returning(|_, _| Ok("Let's revise vectors.".to_string()));
    llm.expect_extract_topics()
        .returning(|_| ["Vectors".to_string()].into_iter().collect());
    let app = app(llm, MockDocumentTextExtractor::new(), MockSolutionLinkFinder::new());
    let id = create_session(&app).await;

    let (status, chat) = send(
        &app,
        Method::POST,
        &format!("/sessions/{id}/chat"),
        Some(json!({ "message": "I am bad at vectors" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["new_topics"], json!(["vectors"]));

    let (status, _) = send(&app, Method::POST, &format!("/sessions/{id}/clear"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, topics) = send(&app, Method::GET, &format!("/sessions/{id}/weak-topics"), None).await;
    assert_eq!(topics["weak_topics"], json!([]));

    let (status, _) = send(&app, Method::DELETE, &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/sessions/{id}/quiz"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
