//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use study_buddy_core::{Difficulty, GamificationRules, ScoringScheme};
use tracing::Level;

/// Bounds for the number of questions in a generated quiz.
pub const MIN_QUIZ_QUESTIONS: usize = 1;
pub const MAX_QUIZ_QUESTIONS: usize = 50;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_origin: Option<String>,
    pub max_upload_bytes: usize,
    pub openai_api_key: String,
    pub llm_base_url: Option<String>,
    pub chat_model: String,
    pub quiz_model: String,
    pub exam_name: String,
    pub quiz_question_count: usize,
    pub quiz_difficulty: Difficulty,
    pub scoring_scheme: ScoringScheme,
    pub gamification: GamificationRules,
    pub solution_cache_ttl: Duration,
    pub link_lookup_timeout: Duration,
    pub session_idle_ttl: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server Settings ---
        let bind_address = parse_var(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = lookup("CORS_ORIGIN");
        let max_upload_bytes = parse_var(&lookup, "MAX_UPLOAD_BYTES", "10485760")?;

        // --- LLM Settings ---
        // The gateway cannot do anything without a key, so it is not optional.
        let openai_api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let llm_base_url = lookup("LLM_BASE_URL");
        let chat_model = var_or("CHAT_MODEL", "gpt-4o-mini");
        let quiz_model = var_or("QUIZ_MODEL", "gpt-4o-mini");
        let exam_name = var_or("EXAM_NAME", "JEE");

        // --- Quiz and Gamification Settings ---
        let quiz_question_count: usize = parse_var(&lookup, "QUIZ_QUESTION_COUNT", "10")?;
        if !(MIN_QUIZ_QUESTIONS..=MAX_QUIZ_QUESTIONS).contains(&quiz_question_count) {
            return Err(ConfigError::InvalidValue(
                "QUIZ_QUESTION_COUNT".to_string(),
                format!(
                    "must be between {} and {}",
                    MIN_QUIZ_QUESTIONS, MAX_QUIZ_QUESTIONS
                ),
            ));
        }
        let quiz_difficulty = parse_var(&lookup, "QUIZ_DIFFICULTY", "Mains")?;
        let scoring_scheme = parse_var(&lookup, "SCORING_SCHEME", "weighted")?;

        let gamification = GamificationRules {
            level_up_accuracy: parse_var(&lookup, "LEVEL_UP_ACCURACY", "75")?,
            max_level: parse_var(&lookup, "MAX_LEVEL", "5")?,
        };

        // --- Solution Lookup Settings ---
        let solution_cache_ttl =
            Duration::from_secs(parse_var(&lookup, "SOLUTION_CACHE_TTL_SECS", "3600")?);
        let link_lookup_timeout =
            Duration::from_secs(parse_var(&lookup, "LINK_LOOKUP_TIMEOUT_SECS", "10")?);

        // --- Session Settings ---
        let session_idle_ttl =
            Duration::from_secs(parse_var(&lookup, "SESSION_IDLE_TTL_SECS", "86400")?);

        Ok(Self {
            bind_address,
            log_level,
            cors_origin,
            max_upload_bytes,
            openai_api_key,
            llm_base_url,
            chat_model,
            quiz_model,
            exam_name,
            quiz_question_count,
            quiz_difficulty,
            scoring_scheme,
            gamification,
            solution_cache_ttl,
            link_lookup_timeout,
            session_idle_ttl,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
