//! crates/study_buddy_core/src/weak_topics.rs
//!
//! The set of topics a learner appears to struggle with.

use serde::Serialize;
use std::collections::BTreeSet;

/// Lower-cases a topic, trims it and collapses inner runs of whitespace.
pub fn normalize_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A grow-only set of normalized weak topics.
///
/// Fed by two producers, chat message analysis and test-result analysis. Topics are
/// never removed one by one; `clear` is the only way to shrink the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeakTopicSet {
    topics: BTreeSet<String>,
}

impl WeakTopicSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds topics inferred from a chat message. Returns the ones that were new.
    pub fn add_from_message<I, S>(&mut self, topics: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extend_normalized(topics)
    }

    /// Adds topics reported by a test-result analysis. Returns the ones that were new.
    pub fn add_from_report<I, S>(&mut self, topics: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extend_normalized(topics)
    }

    fn extend_normalized<I, S>(&mut self, topics: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for topic in topics {
            let topic = normalize_topic(topic.as_ref());
            if !topic.is_empty() && self.topics.insert(topic.clone()) {
                added.push(topic);
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(&normalize_topic(topic))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topics in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}
