//! crates/study_buddy_core/src/ledger.rs
//!
//! Cumulative gamification counters: questions solved, correct answers, level,
//! the daily streak and per-topic mastery. Every counter only ever grows.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::ReportTotals;
use crate::weak_topics::normalize_topic;

/// Percentage helper shared by the overall and per-topic views.
fn accuracy(correct: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| correct as f64 / total as f64 * 100.0)
}

//=========================================================================================
// Streak
//=========================================================================================

/// Consecutive calendar days with at least one completed quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub activity_by_date: BTreeMap<NaiveDate, bool>,
}

impl StreakState {
    /// Records a completed quiz on `day` and returns the resulting streak.
    pub fn record_activity(&mut self, day: NaiveDate) -> u32 {
        self.activity_by_date.insert(day, true);

        match self.last_activity_date {
            None => {
                self.current_streak = 1;
                self.last_activity_date = Some(day);
            }
            Some(last) if day == last => {}
            // The clock went backwards; keep the later date as the anchor.
            Some(last) if day < last => {}
            Some(last) if last.succ_opt() == Some(day) => {
                self.current_streak += 1;
                self.last_activity_date = Some(day);
            }
            Some(_) => {
                self.current_streak = 1;
                self.last_activity_date = Some(day);
            }
        }

        self.current_streak
    }
}

//=========================================================================================
// Per-topic Performance
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    pub total_solved: u64,
    pub correct_solved: u64,
}

impl TopicStats {
    /// Percentage of correct answers, undefined when nothing was solved.
    pub fn accuracy(&self) -> Option<f64> {
        accuracy(self.correct_solved, self.total_solved)
    }
}

//=========================================================================================
// Ledger
//=========================================================================================

/// Tunables for levelling up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamificationRules {
    /// A completed quiz must score strictly above this accuracy to level up.
    pub level_up_accuracy: f64,
    pub max_level: u32,
}

impl Default for GamificationRules {
    fn default() -> Self {
        Self {
            level_up_accuracy: 75.0,
            max_level: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub questions_solved: u64,
    pub correct_answers: u64,
    pub quizzes_completed: u64,
    pub level: u32,
    pub streak: StreakState,
    topics: HashMap<String, TopicStats>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            questions_solved: 0,
            correct_answers: 0,
            quizzes_completed: 0,
            level: 1,
            streak: StreakState::default(),
            topics: HashMap::new(),
        }
    }
}

impl Ledger {
    /// Counts one answered quiz question, globally and for its topic.
    ///
    /// `counts_as_solved` is false for skips the scoring scheme treats as unattempted,
    /// in which case nothing is recorded.
    pub fn record_quiz_answer(&mut self, topic: &str, is_correct: bool, counts_as_solved: bool) {
        if !counts_as_solved {
            return;
        }
        self.questions_solved += 1;
        if is_correct {
            self.correct_answers += 1;
        }
        self.fold_question(topic, is_correct);
    }

    /// Counts one question toward a topic's mastery without touching global totals.
    pub fn fold_question(&mut self, topic: &str, is_correct: bool) {
        let topic = normalize_topic(topic);
        if topic.is_empty() {
            return;
        }
        let entry = self.topics.entry(topic).or_default();
        entry.total_solved += 1;
        if is_correct {
            entry.correct_solved += 1;
        }
    }

    /// Adds the known totals of an analysed test and returns the `(questions, correct)`
    /// amounts actually added.
    ///
    /// The question count comes from `total`, or from `correct + incorrect` when the
    /// total is unknown. Correct answers are only folded alongside a question count
    /// and never exceed it, so `correct_answers <= questions_solved` always holds.
    pub fn fold_totals(&mut self, totals: &ReportTotals) -> (u64, u64) {
        let correct = totals.correct.as_count();
        let questions = totals.total.as_count().or_else(|| {
            let incorrect = totals.incorrect.as_count()?;
            Some(correct? + incorrect)
        });
        let Some(questions) = questions else {
            return (0, 0);
        };
        let correct = correct.unwrap_or(0).min(questions);

        self.questions_solved += questions;
        self.correct_answers += correct;
        (questions, correct)
    }

    /// Closes a quiz: records the streak for `day` and levels up on a strong result.
    /// Returns whether the learner levelled up.
    pub fn record_completion(
        &mut self,
        accuracy: f64,
        day: NaiveDate,
        rules: &GamificationRules,
    ) -> bool {
        self.quizzes_completed += 1;
        self.streak.record_activity(day);

        if accuracy > rules.level_up_accuracy && self.level < rules.max_level {
            self.level += 1;
            true
        } else {
            false
        }
    }

    pub fn topic(&self, topic: &str) -> Option<&TopicStats> {
        self.topics.get(&normalize_topic(topic))
    }

    pub fn accuracy(&self) -> Option<f64> {
        accuracy(self.correct_answers, self.questions_solved)
    }

    /// A read-only snapshot for display, weakest topics first.
    pub fn progress(&self) -> Progress {
        let mut topics: Vec<TopicProgress> = self
            .topics
            .iter()
            .map(|(name, stats)| TopicProgress {
                topic: name.clone(),
                total_solved: stats.total_solved,
                correct_solved: stats.correct_solved,
                accuracy: stats.accuracy(),
            })
            .collect();
        topics.sort_by(|a, b| {
            a.accuracy
                .unwrap_or(0.0)
                .total_cmp(&b.accuracy.unwrap_or(0.0))
                .then_with(|| a.topic.cmp(&b.topic))
        });

        Progress {
            questions_solved: self.questions_solved,
            correct_answers: self.correct_answers,
            accuracy: self.accuracy(),
            quizzes_completed: self.quizzes_completed,
            level: self.level,
            current_streak: self.streak.current_streak,
            last_activity_date: self.streak.last_activity_date,
            topics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicProgress {
    pub topic: String,
    pub total_solved: u64,
    pub correct_solved: u64,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub questions_solved: u64,
    pub correct_answers: u64,
    pub accuracy: Option<f64>,
    pub quizzes_completed: u64,
    pub level: u32,
    pub current_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub topics: Vec<TopicProgress>,
}
