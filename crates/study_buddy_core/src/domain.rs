//! crates/study_buddy_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! The serde attributes describe the JSON shapes the LLM is asked to produce,
//! so the same types double as the wire format for quiz and report parsing.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Number of answer options every generated question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

//=========================================================================================
// Quiz Content
//=========================================================================================

/// The explanation attached to a question, either free text or worked steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Explanation {
    Steps {
        detailed_steps: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        youtube_link: Option<String>,
    },
    Text(String),
}

/// A single multiple-choice question, immutable once produced by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question", alias = "text")]
    pub text: String,
    #[serde(rename = "answers", alias = "options")]
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer", alias = "correct_index")]
    pub correct_index: usize,
    pub explanation: Explanation,
}

impl Question {
    /// The text of the correct option.
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }
}

/// Exam difficulty. The first three belong to generic quizzes, the last two to JEE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Mains,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Mains => "Mains",
            Difficulty::Advanced => "Advanced",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "mains" => Ok(Difficulty::Mains),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("'{}' is not a known difficulty", other)),
        }
    }
}

/// Point-assignment policy for correct, incorrect and skipped answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringScheme {
    /// +1 for a correct answer, nothing otherwise.
    Binary,
    /// +4 correct, -1 incorrect, 0 skipped.
    Weighted,
}

impl ScoringScheme {
    /// Points awarded for one answer record.
    pub fn points(self, selected: Option<usize>, is_correct: bool) -> i64 {
        match (self, selected, is_correct) {
            (_, None, _) => 0,
            (ScoringScheme::Binary, Some(_), true) => 1,
            (ScoringScheme::Binary, Some(_), false) => 0,
            (ScoringScheme::Weighted, Some(_), true) => 4,
            (ScoringScheme::Weighted, Some(_), false) => -1,
        }
    }

    /// Whether a skipped question still counts as a solved (and failed) question.
    ///
    /// Binary scoring has no notion of an unattempted question, so a skip is a wrong
    /// answer. Weighted scoring mirrors negative-marking exams where leaving a
    /// question blank is a distinct, unpenalised outcome.
    pub fn skip_counts_as_solved(self) -> bool {
        matches!(self, ScoringScheme::Binary)
    }
}

impl FromStr for ScoringScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(ScoringScheme::Binary),
            "weighted" => Ok(ScoringScheme::Weighted),
            other => Err(format!("'{}' is not a known scoring scheme", other)),
        }
    }
}

/// The outcome of one submitted or skipped question. Created once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub selected_index: Option<usize>,
    pub is_correct: bool,
}

/// Everything the gateway needs to build a quiz prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub count: usize,
    pub weak_topics: Vec<String>,
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of the running conversation with the study assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

//=========================================================================================
// Test-Result Analysis
//=========================================================================================

/// A number reported by the analysis model, or `Unknown` when the model declared
/// it "not determinable". `Unknown` is never treated as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Known(f64),
    Unknown,
}

/// Sentinel string the analysis model uses for values it cannot infer.
pub const NOT_DETERMINABLE: &str = "not determinable";

impl Serialize for Metric {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Known(value) => serializer.serialize_f64(*value),
            Metric::Unknown => serializer.serialize_str(NOT_DETERMINABLE),
        }
    }
}

impl Metric {
    /// The value as a non-negative whole count, if it is known.
    pub fn as_count(&self) -> Option<u64> {
        match *self {
            Metric::Known(value) if value.is_finite() && value >= 0.0 => {
                Some(value.round() as u64)
            }
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
            Null(()),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Metric::Known(value)),
            Raw::Null(()) => Ok(Metric::Unknown),
            Raw::Text(text) => {
                let trimmed = text.trim();
                if trimmed.eq_ignore_ascii_case(NOT_DETERMINABLE) {
                    return Ok(Metric::Unknown);
                }
                trimmed
                    .trim_end_matches('%')
                    .trim()
                    .parse::<f64>()
                    .map(Metric::Known)
                    .map_err(|_| {
                        serde::de::Error::custom(format!(
                            "expected a number or \"{}\", found \"{}\"",
                            NOT_DETERMINABLE, text
                        ))
                    })
            }
        }
    }
}

/// Aggregate figures of an analysed test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    #[serde(rename = "total_questions")]
    pub total: Metric,
    #[serde(rename = "correct_answers")]
    pub correct: Metric,
    #[serde(rename = "incorrect_answers")]
    pub incorrect: Metric,
    #[serde(rename = "accuracy_percentage")]
    pub accuracy: Metric,
}

/// Review of one question found in the uploaded test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question: String,
    #[serde(default)]
    pub student_answer: String,
    #[serde(default)]
    pub correct_answer: String,
    pub is_correct: bool,
    pub topic: String,
    #[serde(default)]
    pub explanation: String,
}

/// The structured result of analysing a previous exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub weak_topics: BTreeSet<String>,
    #[serde(rename = "analysis")]
    pub totals: ReportTotals,
    #[serde(rename = "question_analysis", default)]
    pub per_question: Vec<QuestionReview>,
    #[serde(default)]
    pub summary: Option<String>,
}
