//! Role-scoped natural-language query engine for a small business database.
//!
//! A question flows through [`intent::IntentTranslator`] (model first, rules
//! as fallback), [`security::SqlPolicyFilter`], [`execution::QueryExecutor`]
//! and [`response::ResponseComposer`]; [`assistant::QueryAssistant`] wires
//! the stages together and keeps per-user [`memory::ConversationMemory`].

pub mod assistant;
pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod response;
pub mod schema;
pub mod security;

pub use assistant::{QueryAssistant, QueryRequest};
pub use error::{EngineError, Result};
pub use response::UserResponse;
pub use security::{Role, User};
