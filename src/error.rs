use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Role forbids the statement, or the statement is not a read after filtering.
    #[error("Policy violation: {0}")]
    Policy(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    /// Broken authorization layer upstream (e.g. an unknown role name).
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// The bare message without the variant prefix, as shown to end users.
    pub fn detail(&self) -> String {
        match self {
            EngineError::Policy(msg)
            | EngineError::Translation(msg)
            | EngineError::Execution(msg)
            | EngineError::Configuration(msg)
            | EngineError::Llm(msg)
            | EngineError::Database(msg) => msg.clone(),
            EngineError::Io(err) => err.to_string(),
            EngineError::Json(err) => err.to_string(),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => EngineError::Database(db_err.message().to_string()),
            other => EngineError::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
