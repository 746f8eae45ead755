//! Natural language → Intent translation.
//!
//! The model is asked for a single JSON object. Its reply is parsed strictly:
//! anything that is not that object (after removing a Markdown code fence)
//! sends the question to the rule-based fallback instead of being repaired.

use crate::error::{EngineError, Result};
use crate::intent::fallback::FallbackEngine;
use crate::intent::prompt::build_prompt;
use crate::intent::{ChartKind, Intent, IntentSource, Translation, DEFAULT_HELP_MESSAGE};
use crate::llm::LanguageModel;
use crate::memory::ConversationTurn;
use crate::security::policy::Role;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_PROMPT_HISTORY_TURNS: usize = 10;

/// Shape the model must reply with. Missing fields are defaulted.
#[derive(Debug, Deserialize)]
struct ModelReply {
    needs_sql: Option<bool>,
    sql_query: Option<String>,
    response_message: Option<String>,
    suggested_chart: Option<ChartKind>,
}

impl From<ModelReply> for Intent {
    fn from(reply: ModelReply) -> Self {
        let needs_sql = reply.needs_sql.unwrap_or(false);
        Intent {
            needs_sql,
            sql_query: if needs_sql {
                reply.sql_query.unwrap_or_default().trim().to_string()
            } else {
                String::new()
            },
            response_message: reply
                .response_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HELP_MESSAGE.to_string()),
            suggested_chart: reply.suggested_chart.unwrap_or_default(),
        }
    }
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches("json"),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model reply into an intent, or explain why it is unusable.
pub fn parse_model_reply(reply: &str) -> Result<Intent> {
    let body = strip_code_fence(reply);
    let parsed: ModelReply = serde_json::from_str(body).map_err(|e| {
        EngineError::Translation(format!("Model reply is not the expected JSON object: {}", e))
    })?;
    Ok(parsed.into())
}

pub struct IntentTranslator {
    model: Option<Arc<dyn LanguageModel>>,
    fallback: FallbackEngine,
    timeout: Duration,
    prompt_history_turns: usize,
}

impl IntentTranslator {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, timeout: Duration) -> Self {
        Self {
            model,
            fallback: FallbackEngine::default(),
            timeout,
            prompt_history_turns: DEFAULT_PROMPT_HISTORY_TURNS,
        }
    }

    /// Translator that never calls a model.
    pub fn fallback_only() -> Self {
        Self::new(None, Duration::from_secs(60))
    }

    pub fn with_fallback(mut self, fallback: FallbackEngine) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_prompt_history_turns(mut self, turns: usize) -> Self {
        self.prompt_history_turns = turns;
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Derive an intent. Never fails: model problems route to the fallback.
    pub async fn translate(
        &self,
        question: &str,
        role: Role,
        schema_text: &str,
        history: &[ConversationTurn],
    ) -> Translation {
        match self.translate_with_model(question, role, schema_text, history).await {
            Ok(intent) => {
                info!(needs_sql = intent.needs_sql, chart = %intent.suggested_chart, "Intent derived by model");
                Translation {
                    intent,
                    source: IntentSource::Model,
                }
            }
            Err(e) => {
                if self.model.is_some() {
                    warn!(error = %e, "Model translation failed, using rule-based fallback");
                } else {
                    debug!("No model configured, using rule-based fallback");
                }
                let intent = self.fallback.derive(question, role, history);
                info!(needs_sql = intent.needs_sql, chart = %intent.suggested_chart, "Intent derived by fallback");
                Translation {
                    intent,
                    source: IntentSource::Fallback,
                }
            }
        }
    }

    async fn translate_with_model(
        &self,
        question: &str,
        role: Role,
        schema_text: &str,
        history: &[ConversationTurn],
    ) -> Result<Intent> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EngineError::Translation("No language model configured".to_string()))?;

        let prompt = build_prompt(question, role, schema_text, history, self.prompt_history_turns);
        let reply = tokio::time::timeout(self.timeout, model.complete(&prompt))
            .await
            .map_err(|_| {
                EngineError::Translation(format!(
                    "Language model did not answer within {}s",
                    self.timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| EngineError::Translation(e.detail()))?;

        parse_model_reply(&reply)
    }
}
