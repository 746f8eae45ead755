//! Engine configuration loaded from the environment (and `.env`).

use std::env;
use std::time::Duration;

const DUMMY_API_KEY: &str = "dummy-api-key";

/// Connection settings for the OpenAI-compatible model endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `None` runs every question through the rule-based fallback.
    pub llm: Option<LlmConfig>,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub llm_timeout: Duration,
    pub statement_timeout: Option<Duration>,
    pub history_capacity: usize,
    pub prompt_history_turns: usize,
    pub fallback_topic_window: usize,
    pub max_display_rows: usize,
    pub activity_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm: None,
            database_url: None,
            db_max_connections: 10,
            llm_timeout: Duration::from_secs(60),
            statement_timeout: None,
            history_capacity: 20,
            prompt_history_turns: 10,
            fallback_topic_window: 6,
            max_display_rows: 50,
            activity_log_capacity: 1000,
        }
    }
}

impl EngineConfig {
    /// Read settings from the process environment, loading `.env` first.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let llm = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != DUMMY_API_KEY)
            .map(|api_key| LlmConfig {
                api_key,
                model: lookup("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                base_url: lookup("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            });

        let llm_timeout = lookup("LLM_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.llm_timeout);

        let statement_timeout = lookup("STATEMENT_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.db_max_connections);

        Self {
            llm,
            database_url: lookup("DATABASE_URL").filter(|u| !u.is_empty()),
            db_max_connections,
            llm_timeout,
            statement_timeout,
            ..defaults
        }
    }
}
