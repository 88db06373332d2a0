//! crates/study_buddy_core/src/quiz.rs
//!
//! The quiz session state machine and answer-scoring protocol.
//!
//! `Idle -> Active -> Completed`. Answering and advancing are separate transitions so
//! that a learner can read the explanation before moving on. Contract violations
//! (answering twice, advancing before answering) are explicit errors and never
//! mutate the session.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{AnswerRecord, Difficulty, Question, ScoringScheme, OPTIONS_PER_QUESTION};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("cannot start a quiz without questions")]
    EmptyQuiz,
    #[error("a quiz is already in progress")]
    AlreadyActive,
    #[error("no quiz is in progress")]
    NotActive,
    #[error("question {0} has already been answered")]
    AlreadyAnswered(usize),
    #[error("question {0} has not been answered yet")]
    NotAnswered(usize),
    #[error("option {0} does not exist")]
    OptionOutOfRange(usize),
    #[error("question {got} is not the current question ({expected})")]
    IndexMismatch { expected: usize, got: usize },
}

//=========================================================================================
// Session
//=========================================================================================

/// One quiz attempt: its questions, the learner's answers and the running score.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    questions: Vec<Question>,
    current_index: usize,
    answers: BTreeMap<usize, AnswerRecord>,
    topic: String,
    difficulty: Difficulty,
    score: i64,
    scoring_scheme: ScoringScheme,
}

impl QuizSession {
    pub fn new(
        questions: Vec<Question>,
        topic: impl Into<String>,
        difficulty: Difficulty,
        scoring_scheme: ScoringScheme,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuiz);
        }
        Ok(Self {
            questions,
            current_index: 0,
            answers: BTreeMap::new(),
            topic: topic.into(),
            difficulty,
            score: 0,
            scoring_scheme,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn answer(&self, index: usize) -> Option<&AnswerRecord> {
        self.answers.get(&index)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn scoring_scheme(&self) -> ScoringScheme {
        self.scoring_scheme
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    pub fn correct_count(&self) -> usize {
        self.answers.values().filter(|a| a.is_correct).count()
    }

    /// Questions with a record, submitted or skipped.
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Records the learner's choice for the current question. Does not advance.
    pub fn submit_answer(&mut self, selected_index: usize) -> Result<AnswerRecord, QuizError> {
        if selected_index >= OPTIONS_PER_QUESTION {
            return Err(QuizError::OptionOutOfRange(selected_index));
        }
        let question = self.pending_question()?;
        let is_correct = selected_index == question.correct_index;
        Ok(self.record(Some(selected_index), is_correct))
    }

    /// Records a skip for `question_index`, which must be the current question.
    pub fn skip(&mut self, question_index: usize) -> Result<AnswerRecord, QuizError> {
        if question_index != self.current_index {
            return Err(QuizError::IndexMismatch {
                expected: self.current_index,
                got: question_index,
            });
        }
        self.pending_question()?;
        Ok(self.record(None, false))
    }

    /// Moves past an answered question. Returns true once the quiz is finished.
    pub fn advance(&mut self) -> Result<bool, QuizError> {
        if self.is_finished() {
            return Err(QuizError::NotActive);
        }
        if !self.answers.contains_key(&self.current_index) {
            return Err(QuizError::NotAnswered(self.current_index));
        }
        self.current_index += 1;
        Ok(self.is_finished())
    }

    /// Final accuracy over all questions of the quiz, as a percentage.
    pub fn accuracy(&self) -> f64 {
        self.correct_count() as f64 / self.questions.len() as f64 * 100.0
    }

    /// Accuracy over the questions answered so far; `None` before the first answer.
    pub fn running_accuracy(&self) -> Option<f64> {
        let answered = self.answered_count();
        (answered > 0).then(|| self.correct_count() as f64 / answered as f64 * 100.0)
    }

    fn pending_question(&self) -> Result<&Question, QuizError> {
        let question = self.current_question().ok_or(QuizError::NotActive)?;
        if self.answers.contains_key(&self.current_index) {
            return Err(QuizError::AlreadyAnswered(self.current_index));
        }
        Ok(question)
    }

    fn record(&mut self, selected_index: Option<usize>, is_correct: bool) -> AnswerRecord {
        let record = AnswerRecord {
            selected_index,
            is_correct,
        };
        self.score += self.scoring_scheme.points(selected_index, is_correct);
        self.answers.insert(self.current_index, record);
        record
    }
}

//=========================================================================================
// State
//=========================================================================================

/// What the learner sees once the last question has been passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSummary {
    pub score: i64,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    pub level: u32,
    pub leveled_up: bool,
    pub streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum QuizState {
    #[default]
    Idle,
    Active(QuizSession),
    Completed {
        session: QuizSession,
        summary: QuizSummary,
    },
}

impl QuizState {
    pub fn session(&self) -> Option<&QuizSession> {
        match self {
            QuizState::Idle => None,
            QuizState::Active(session) | QuizState::Completed { session, .. } => Some(session),
        }
    }

    pub fn active_mut(&mut self) -> Result<&mut QuizSession, QuizError> {
        match self {
            QuizState::Active(session) => Ok(session),
            _ => Err(QuizError::NotActive),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, QuizState::Active(_))
    }
}
