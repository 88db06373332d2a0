//! crates/study_buddy_core/src/extract.rs
//!
//! Pulls structured data out of free-form model output.
//!
//! Models wrap JSON in prose and Markdown fences more often than not. The protocol
//! here is deliberately narrow: unwrap the first fenced block if there is one, then
//! take everything from the first opening bracket of the expected shape to the last
//! matching closing bracket, and parse that. Anything else is an error carrying the
//! raw text; partial data is never returned.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::domain::{Question, OPTIONS_PER_QUESTION};
use crate::weak_topics::normalize_topic;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)(?:```|\z)").expect("valid fence regex")
});

/// The word models use to say no weak topics were found.
pub const NO_TOPICS_SENTINEL: &str = "none";

/// The top-level JSON value a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn brackets(self) -> (char, char) {
        match self {
            JsonShape::Array => ('[', ']'),
            JsonShape::Object => ('{', '}'),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no JSON {0} found in the model output")]
    NoJson(&'static str),
    #[error("the model output is not valid JSON: {0}")]
    Parse(String),
    #[error("invalid question {index}: {reason}")]
    InvalidQuestion { index: usize, reason: String },
    #[error("expected {expected} questions, got {actual}")]
    WrongCount { expected: usize, actual: usize },
}

/// Removes a Markdown code fence around the payload, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    match FENCED_BLOCK.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

/// Returns the slice between the first opening and the last closing bracket of `shape`.
pub fn locate_json(raw: &str, shape: JsonShape) -> Option<&str> {
    let (open, close) = shape.brackets();
    let text = strip_code_fence(raw);
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Locates and deserializes the JSON payload of a model response.
pub fn parse_json<T: DeserializeOwned>(raw: &str, shape: JsonShape) -> Result<T, ExtractError> {
    let name = match shape {
        JsonShape::Array => "array",
        JsonShape::Object => "object",
    };
    let json = locate_json(raw, shape).ok_or(ExtractError::NoJson(name))?;
    serde_json::from_str(json).map_err(|e| ExtractError::Parse(e.to_string()))
}

/// Parses a quiz response and checks every question against the quiz contract.
///
/// `expected_count` is enforced when given; a model that returns more or fewer
/// questions than asked has not followed the prompt.
pub fn parse_questions(
    raw: &str,
    expected_count: Option<usize>,
) -> Result<Vec<Question>, ExtractError> {
    let questions: Vec<Question> = parse_json(raw, JsonShape::Array)?;

    for (index, question) in questions.iter().enumerate() {
        validate_question(question).map_err(|reason| ExtractError::InvalidQuestion {
            index,
            reason,
        })?;
    }

    if let Some(expected) = expected_count {
        if questions.len() != expected {
            return Err(ExtractError::WrongCount {
                expected,
                actual: questions.len(),
            });
        }
    }

    Ok(questions)
}

fn validate_question(question: &Question) -> Result<(), String> {
    if question.text.trim().is_empty() {
        return Err("question text is empty".to_string());
    }
    if question.options.len() != OPTIONS_PER_QUESTION {
        return Err(format!(
            "expected {} options, found {}",
            OPTIONS_PER_QUESTION,
            question.options.len()
        ));
    }
    if question.correct_index >= OPTIONS_PER_QUESTION {
        return Err(format!(
            "correct answer index {} is out of range",
            question.correct_index
        ));
    }
    Ok(())
}

/// Parses the topic list a model returned for a learner message.
///
/// Topics are separated by commas, semicolons or new lines; list markers are dropped.
/// The "none" sentinel, alone or as a single entry, yields an empty set.
pub fn parse_topic_list(raw: &str) -> BTreeSet<String> {
    let text = strip_code_fence(raw);
    if normalize_topic(text).trim_end_matches('.') == NO_TOPICS_SENTINEL {
        return BTreeSet::new();
    }

    text.split([',', ';', '\n'])
        .map(|entry| entry.trim().trim_start_matches(['-', '*', '•']).trim_end_matches('.'))
        .map(normalize_topic)
        .filter(|topic| !topic.is_empty() && topic != NO_TOPICS_SENTINEL)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Explanation;

    const ONE_QUESTION: &str = r#"[{"question": "2 + 2?", "answers": ["3", "4", "5", "6"], "correctAnswer": 1, "explanation": "Basic sum"}]"#;

    #[test]
    fn parses_fenced_array_and_ignores_prose() {
        let raw = format!("Here you go:\n```json\n{}\n```\nGood luck!", ONE_QUESTION);
        let questions = parse_questions(&raw, Some(1)).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_index, 1);
        assert_eq!(questions[0].explanation, Explanation::Text("Basic sum".into()));
    }

    #[test]
    fn parses_unfenced_array() {
        let questions = parse_questions(ONE_QUESTION, None).unwrap();
        assert_eq!(questions[0].options[1], "4");
    }

    #[test]
    fn tolerates_unterminated_fence() {
        let raw = format!("```json\n{}", ONE_QUESTION);
        assert_eq!(parse_questions(&raw, None).unwrap().len(), 1);
    }

    #[test]
    fn missing_brackets_is_an_error() {
        assert_eq!(
            parse_json::<serde_json::Value>("Sorry, I cannot help with that.", JsonShape::Array),
            Err(ExtractError::NoJson("array"))
        );
    }

    #[test]
    fn unbalanced_brackets_is_an_error() {
        let raw = r#"[{"question": "2 + 2?", "answers": ["3", "4""#;
        assert!(matches!(
            parse_questions(raw, None),
            Err(ExtractError::NoJson(_)) | Err(ExtractError::Parse(_))
        ));
        let truncated = r#"[{"question": "x", "answers": ["a"]]"#;
        assert!(matches!(parse_questions(truncated, None), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn rejects_questions_with_wrong_option_count() {
        let raw = r#"[{"question": "q", "answers": ["a", "b"], "correctAnswer": 0, "explanation": "e"}]"#;
        assert!(matches!(
            parse_questions(raw, None),
            Err(ExtractError::InvalidQuestion { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let raw = r#"[{"question": "q", "answers": ["a", "b", "c", "d"], "correctAnswer": 4, "explanation": "e"}]"#;
        assert!(matches!(
            parse_questions(raw, None),
            Err(ExtractError::InvalidQuestion { index: 0, .. })
        ));
    }

    #[test]
    fn enforces_requested_count() {
        assert_eq!(
            parse_questions(ONE_QUESTION, Some(3)),
            Err(ExtractError::WrongCount { expected: 3, actual: 1 })
        );
    }

    #[test]
    fn locates_object_inside_prose() {
        let raw = "Analysis below\n{\"a\": {\"b\": 1}}\nThanks";
        assert_eq!(locate_json(raw, JsonShape::Object), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn topic_list_handles_sentinel_and_separators() {
        assert!(parse_topic_list("none").is_empty());
        assert!(parse_topic_list("  None. ").is_empty());

        let topics = parse_topic_list("Rotational Motion, optics\n- Thermodynamics;  OPTICS");
        let expected: BTreeSet<String> = ["optics", "rotational motion", "thermodynamics"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(topics, expected);
    }
}
