//! services/api/src/web/report_task.rs
//!
//! The worker for uploaded test results: text extraction, LLM analysis and
//! folding the report into the learner's state.

use crate::error::ApiError;
use crate::web::protocol::ReportResponse;
use crate::web::state::{AppState, LearnerSession};
use std::time::Instant;
use study_buddy_core::{AnalysisReport, PortError, PortResult};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub async fn analyze_report_process(
    app_state: &AppState,
    session_lock: &Mutex<LearnerSession>,
    file_bytes: &[u8],
) -> Result<ReportResponse, ApiError> {
    let start_time = Instant::now();
    let text = app_state.extractor.extract(file_bytes).await?;
    info!(
        "Text extraction took: {:?} ({} chars)",
        start_time.elapsed(),
        text.len()
    );

    let mut session = session_lock.lock().await;

    let analysis_start = Instant::now();
    let report = analyze_with_retry(app_state, &text).await?;
    info!("Report analysis took: {:?}", analysis_start.elapsed());

    let applied = session.study.apply_report(&report);
    info!(
        new_topics = applied.new_topics.len(),
        questions_added = applied.questions_added,
        "Report applied"
    );
    session.last_report = Some(report.clone());

    Ok(ReportResponse {
        report,
        applied,
        weak_topics: session.study.weak_topics.to_vec(),
    })
}

async fn analyze_with_retry(app_state: &AppState, text: &str) -> PortResult<AnalysisReport> {
    match app_state.llm.analyze_test_report(text).await {
        Err(e @ PortError::Analysis { .. }) => {
            warn!("Report analysis failed, retrying once: {}", e);
            app_state.llm.analyze_test_report(text).await
        }
        other => other,
    }
}

pub async fn latest_report(session_lock: &Mutex<LearnerSession>) -> Option<AnalysisReport> {
    session_lock.lock().await.last_report.clone()
}
