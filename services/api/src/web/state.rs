//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-learner session state.

use crate::config::Config;
use crate::error::ApiError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use study_buddy_core::{
    AnalysisReport, ChatRole, ChatTurn, DocumentTextExtractor, LlmGateway, SolutionLinkFinder,
    StudyState,
};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// How many chat turns are replayed to the model. Older turns are dropped.
pub const MAX_CHAT_TURNS: usize = 40;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<dyn LlmGateway>,
    pub extractor: Arc<dyn DocumentTextExtractor>,
    pub link_finder: Arc<dyn SolutionLinkFinder>,
    pub sessions: SessionRegistry,
}

//=========================================================================================
// LearnerSession (Specific to One Learner)
//=========================================================================================

/// Everything the service keeps about one learner for the lifetime of the process.
pub struct LearnerSession {
    pub id: Uuid,
    pub study: StudyState,
    pub chat_history: Vec<ChatTurn>,
    pub last_report: Option<AnalysisReport>,
}

impl LearnerSession {
    pub fn new(id: Uuid, config: &Config) -> Self {
        Self {
            id,
            study: StudyState::new(config.gamification),
            chat_history: Vec::new(),
            last_report: None,
        }
    }

    /// Appends one exchange to the conversation, keeping it bounded.
    pub fn push_exchange(&mut self, user_message: &str, reply: &str) {
        self.chat_history.push(ChatTurn {
            role: ChatRole::User,
            content: user_message.to_string(),
        });
        self.chat_history.push(ChatTurn {
            role: ChatRole::Assistant,
            content: reply.to_string(),
        });
        if self.chat_history.len() > MAX_CHAT_TURNS {
            let excess = self.chat_history.len() - MAX_CHAT_TURNS;
            self.chat_history.drain(..excess);
        }
    }

    /// Forgets chat, quiz, weak topics and the last report. Gamification counters stay.
    pub fn clear(&mut self) {
        self.study.clear();
        self.chat_history.clear();
        self.last_report = None;
    }
}

//=========================================================================================
// SessionRegistry
//=========================================================================================

/// In-memory map of learner sessions.
///
/// Each session sits behind its own mutex and handlers hold it for a whole
/// transition, LLM call included, so two actions on one session never interleave.
/// Sessions left untouched for longer than the idle TTL are dropped the next time
/// a session is created.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_ttl: Duration,
}

struct SessionEntry {
    session: Arc<Mutex<LearnerSession>>,
    last_accessed: Instant,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_ttl,
        }
    }

    pub async fn create(&self, config: &Config) -> Uuid {
        let id = Uuid::new_v4();
        let entry = SessionEntry {
            session: Arc::new(Mutex::new(LearnerSession::new(id, config))),
            last_accessed: Instant::now(),
        };
        let mut sessions = self.sessions.write().await;
        let evicted = self.evict_idle(&mut sessions);
        if evicted > 0 {
            info!(evicted, "Evicted idle sessions");
        }
        sessions.insert(id, entry);
        id
    }

    /// Returns the session and marks it as used now.
    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<LearnerSession>>, ApiError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        entry.last_accessed = Instant::now();
        Ok(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops idle sessions. A session some request still holds is kept.
    fn evict_idle(&self, sessions: &mut HashMap<Uuid, SessionEntry>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.last_accessed.elapsed() < self.idle_ttl || Arc::strong_count(&entry.session) > 1
        });
        before - sessions.len()
    }
}

//=========================================================================================
// Test Support
//=========================================================================================
