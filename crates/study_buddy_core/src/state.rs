//! crates/study_buddy_core/src/state.rs
//!
//! The per-learner state and every transition that touches it.
//!
//! `StudyState` owns the quiz state machine, the weak-topic tracker and the
//! gamification ledger. Transitions that affect more than one of them (answering a
//! quiz question, completing a quiz, folding a test report) live here so that the
//! counters can never drift apart.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{AnalysisReport, AnswerRecord, Difficulty, Question, ScoringScheme};
use crate::ledger::{GamificationRules, Ledger};
use crate::quiz::{QuizError, QuizSession, QuizState, QuizSummary};
use crate::weak_topics::WeakTopicSet;

/// Outcome of `StudyState::advance`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The quiz moved on to the question at `index`.
    Next { index: usize },
    /// The last question was passed and the quiz is complete.
    Completed(QuizSummary),
}

/// What folding a test report changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportFold {
    pub new_topics: Vec<String>,
    pub questions_added: u64,
    pub correct_added: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StudyState {
    pub quiz: QuizState,
    pub weak_topics: WeakTopicSet,
    pub ledger: Ledger,
    pub rules: GamificationRules,
}

impl StudyState {
    pub fn new(rules: GamificationRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    //-------------------------------------------------------------------------------------
    // Quiz transitions
    //-------------------------------------------------------------------------------------

    /// Starts a quiz. A completed quiz is discarded; an active one must be reset first.
    pub fn start_quiz(
        &mut self,
        questions: Vec<Question>,
        topic: &str,
        difficulty: Difficulty,
        scheme: ScoringScheme,
    ) -> Result<&QuizSession, QuizError> {
        if self.quiz.is_active() {
            return Err(QuizError::AlreadyActive);
        }
        let session = QuizSession::new(questions, topic, difficulty, scheme)?;
        self.quiz = QuizState::Active(session);
        match &self.quiz {
            QuizState::Active(session) => Ok(session),
            _ => unreachable!("quiz state was just set to Active"),
        }
    }

    /// Submits an answer for the current question and updates the ledger.
    pub fn submit_answer(&mut self, selected_index: usize) -> Result<AnswerRecord, QuizError> {
        let session = self.quiz.active_mut()?;
        let record = session.submit_answer(selected_index)?;
        self.ledger
            .record_quiz_answer(session.topic(), record.is_correct, true);
        Ok(record)
    }

    /// Skips `question_index`; whether it counts as solved depends on the scoring scheme.
    pub fn skip(&mut self, question_index: usize) -> Result<AnswerRecord, QuizError> {
        let session = self.quiz.active_mut()?;
        let record = session.skip(question_index)?;
        let counts = session.scoring_scheme().skip_counts_as_solved();
        self.ledger.record_quiz_answer(session.topic(), false, counts);
        Ok(record)
    }

    /// Moves to the next question, completing the quiz after the last one.
    pub fn advance(&mut self, today: NaiveDate) -> Result<AdvanceOutcome, QuizError> {
        let session = self.quiz.active_mut()?;
        if !session.advance()? {
            return Ok(AdvanceOutcome::Next {
                index: session.current_index(),
            });
        }

        let QuizState::Active(session) = std::mem::take(&mut self.quiz) else {
            unreachable!("quiz state was checked to be Active");
        };
        let summary = self.complete(&session, today);
        self.quiz = QuizState::Completed {
            session,
            summary: summary.clone(),
        };
        Ok(AdvanceOutcome::Completed(summary))
    }

    fn complete(&mut self, session: &QuizSession, today: NaiveDate) -> QuizSummary {
        let accuracy = session.accuracy();
        let leveled_up = self.ledger.record_completion(accuracy, today, &self.rules);
        QuizSummary {
            score: session.score(),
            correct: session.correct_count(),
            total: session.len(),
            accuracy,
            level: self.ledger.level,
            leveled_up,
            streak: self.ledger.streak.current_streak,
        }
    }

    /// Discards any quiz, whatever its state.
    pub fn reset_quiz(&mut self) {
        self.quiz = QuizState::Idle;
    }

    //-------------------------------------------------------------------------------------
    // Weak topics and reports
    //-------------------------------------------------------------------------------------

    /// Folds a test report into the weak topics, the topic ledger and the known totals.
    pub fn apply_report(&mut self, report: &AnalysisReport) -> ReportFold {
        let new_topics = self.weak_topics.add_from_report(&report.weak_topics);
        for review in &report.per_question {
            self.ledger.fold_question(&review.topic, review.is_correct);
        }
        let (questions_added, correct_added) = self.ledger.fold_totals(&report.totals);

        ReportFold {
            new_topics,
            questions_added,
            correct_added,
        }
    }

    /// Forgets the quiz and the weak topics. The ledger is kept.
    pub fn clear(&mut self) {
        self.reset_quiz();
        self.weak_topics.clear();
    }
}
