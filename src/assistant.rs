//! The question pipeline: translate, filter, execute, compose.
//!
//! `answer` is the pure function boundary. `ask` wraps it with the
//! conversation memory and activity bookkeeping a session needs.

use crate::config::EngineConfig;
use crate::db::init_pool;
use crate::error::Result;
use crate::execution::{PgQueryStore, QueryExecutor, QueryStore};
use crate::intent::{FallbackEngine, IntentSource, IntentTranslator};
use crate::llm::{LanguageModel, LlmClient};
use crate::memory::{ConversationMemory, ConversationTurn, Sender};
use crate::observability::{ActivityLog, ActivityRecord};
use crate::response::{ChartRenderer, ResponseComposer, UserResponse};
use crate::schema::SchemaProvider;
use crate::security::policy::{Role, User};
use crate::security::sql_policy::SqlPolicyFilter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// A question as it arrives from the outer layer, role still as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub user_id: String,
    pub role: String,
    pub question: String,
}

/// Pipeline outcome plus what the activity log needs to know about it.
struct Answered {
    response: UserResponse,
    source: IntentSource,
    attempted_sql: String,
    execution_time_ms: u64,
}

pub struct QueryAssistant {
    translator: IntentTranslator,
    policy: SqlPolicyFilter,
    executor: QueryExecutor,
    composer: ResponseComposer,
    memory: Arc<ConversationMemory>,
    activity: Arc<ActivityLog>,
}

impl QueryAssistant {
    /// Connect to the database named by the config and wire every stage.
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        let pool = init_pool(config).await?;
        let store = PgQueryStore::new(pool).with_statement_timeout(config.statement_timeout);
        Self::with_store(config, Arc::new(store))
    }

    /// Wire every stage around an already constructed store.
    pub fn with_store(config: &EngineConfig, store: Arc<dyn QueryStore>) -> Result<Self> {
        let model: Option<Arc<dyn LanguageModel>> = match &config.llm {
            Some(llm) => {
                info!(model = %llm.model, "Using language model for translation");
                Some(Arc::new(LlmClient::from_config(llm, config.llm_timeout)?))
            }
            None => {
                info!("No language model configured, all questions use rule-based fallback");
                None
            }
        };

        let translator = IntentTranslator::new(model, config.llm_timeout)
            .with_fallback(FallbackEngine::new(config.fallback_topic_window))
            .with_prompt_history_turns(config.prompt_history_turns);

        Ok(Self {
            translator,
            policy: SqlPolicyFilter::new(),
            executor: QueryExecutor::new(store),
            composer: ResponseComposer::new(config.max_display_rows),
            memory: Arc::new(ConversationMemory::new(config.history_capacity)),
            activity: Arc::new(ActivityLog::new(config.activity_log_capacity)),
        })
    }

    pub fn with_translator(mut self, translator: IntentTranslator) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_chart_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.composer = std::mem::take(&mut self.composer).with_renderer(renderer);
        self
    }

    /// Share a memory with other assistants (e.g. one per worker).
    pub fn with_memory(mut self, memory: Arc<ConversationMemory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_activity_log(mut self, activity: Arc<ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity
    }

    /// Answer one question with the given history. Touches no session state.
    pub async fn answer(&self, question: &str, role: Role, history: &[ConversationTurn]) -> UserResponse {
        self.run(question, role, history).await.response
    }

    /// Answer for a session user, reading and extending their conversation.
    pub async fn ask(&self, user: &User, question: &str) -> UserResponse {
        let history = self.memory.history_for(&user.user_id);
        self.memory.append(&user.user_id, Sender::User, question);

        let answered = self.run(question, user.role, &history).await;
        let response = answered.response;

        if response.success {
            self.memory
                .append(&user.user_id, Sender::Assistant, response.message.clone());
        }

        self.activity.record(
            ActivityRecord::new(user.user_id.clone(), user.role, question)
                .with_source(answered.source)
                .with_sql(answered.attempted_sql)
                .with_rows(response.row_count, answered.execution_time_ms)
                .with_outcome(response.success, response.message.clone()),
        );

        response
    }

    /// Entry point for callers that carry the role as text.
    /// An unrecognised role is an upstream bug and is returned as an error.
    pub async fn handle(&self, request: QueryRequest) -> Result<UserResponse> {
        let role = Role::parse(&request.role).map_err(|e| {
            error!(user_id = %request.user_id, role = %request.role, "Request carries an unknown role");
            e
        })?;
        let user = User::new(request.user_id.clone(), request.user_id, role);
        Ok(self.ask(&user, &request.question).await)
    }

    /// Forget a user's conversation (logout).
    pub fn end_session(&self, user_id: &str) {
        self.memory.clear(user_id);
        info!(user_id = %user_id, "Conversation cleared");
    }

    async fn run(&self, question: &str, role: Role, history: &[ConversationTurn]) -> Answered {
        let schema_text = SchemaProvider::schema_for(role);
        let translation = self
            .translator
            .translate(question, role, schema_text, history)
            .await;
        let intent = translation.intent;
        let source = translation.source;

        if !intent.needs_sql {
            return Answered {
                response: UserResponse::answer(intent.response_message, role),
                source,
                attempted_sql: String::new(),
                execution_time_ms: 0,
            };
        }

        let sql = match self.policy.apply(&intent.sql_query, role) {
            Ok(sql) => sql,
            Err(e) => {
                info!(role = %role, error = %e, "Statement rejected by policy");
                return Answered {
                    response: UserResponse::failure(e.detail(), String::new(), role),
                    source,
                    attempted_sql: intent.sql_query,
                    execution_time_ms: 0,
                };
            }
        };

        let outcome = self.executor.execute(&sql).await;
        let execution_time_ms = outcome.result.execution_time_ms;
        if !outcome.success {
            return Answered {
                response: UserResponse::failure(outcome.message, sql.clone(), role),
                source,
                attempted_sql: sql,
                execution_time_ms,
            };
        }

        let composition = self.composer.compose(&intent, &outcome.result);
        Answered {
            response: UserResponse::from_composition(composition, sql.clone(), role),
            source,
            attempted_sql: sql,
            execution_time_ms,
        }
    }
}
