pub mod domain;
pub mod extract;
pub mod ledger;
pub mod ports;
pub mod quiz;
pub mod state;
pub mod weak_topics;

pub use domain::{
    AnalysisReport, AnswerRecord, ChatRole, ChatTurn, Difficulty, Explanation, Metric, Question,
    QuestionReview, QuizRequest, ReportTotals, ScoringScheme,
};
pub use ledger::{GamificationRules, Ledger, Progress, StreakState};
pub use ports::{DocumentTextExtractor, LlmGateway, PortError, PortResult, SolutionLinkFinder};
pub use quiz::{QuizError, QuizSession, QuizState, QuizSummary};
pub use state::{AdvanceOutcome, ReportFold, StudyState};
pub use weak_topics::WeakTopicSet;
