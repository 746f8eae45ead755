//! Query Executor
//!
//! Runs already-filtered SQL and turns every store failure into a failed
//! outcome carrying the store's own message. Nothing raises past this point.

use crate::error::{EngineError, Result};
use crate::execution::result::QueryResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A relational store that can run one SQL statement.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn fetch(&self, sql: &str) -> Result<QueryResult>;
}

/// Outcome of one execution attempt.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub result: QueryResult,
    pub success: bool,
    pub message: String,
}

pub const NO_ROWS_MESSAGE: &str = "The query ran successfully but returned no matching records.";

pub struct QueryExecutor {
    store: Arc<dyn QueryStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn QueryStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, sql: &str) -> ExecutionOutcome {
        let start_time = Instant::now();
        let fetched = self.store.fetch(sql).await;
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        match fetched {
            Ok(result) => {
                let result = result.with_execution_time(execution_time_ms);
                info!(rows = result.row_count, execution_time_ms, "Query executed");
                let message = if result.is_empty() {
                    NO_ROWS_MESSAGE.to_string()
                } else {
                    format!(
                        "Query returned {} row{}.",
                        result.row_count,
                        if result.row_count == 1 { "" } else { "s" }
                    )
                };
                ExecutionOutcome {
                    result,
                    success: true,
                    message,
                }
            }
            Err(e) => {
                warn!(error = %e, execution_time_ms, "Query execution failed");
                let message = match e {
                    EngineError::Database(msg) | EngineError::Execution(msg) => msg,
                    other => other.to_string(),
                };
                ExecutionOutcome {
                    result: QueryResult::default().with_execution_time(execution_time_ms),
                    success: false,
                    message,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedStore(std::result::Result<QueryResult, String>);

    #[async_trait]
    impl QueryStore for FixedStore {
        async fn fetch(&self, _sql: &str) -> Result<QueryResult> {
            self.0.clone().map_err(EngineError::Database)
        }
    }

    fn executor(outcome: std::result::Result<QueryResult, String>) -> QueryExecutor {
        QueryExecutor::new(Arc::new(FixedStore(outcome)))
    }

    #[tokio::test]
    async fn non_empty_result_succeeds() {
        let result = QueryResult::new(vec!["count".to_string()], vec![vec![json!(42)]]);
        let outcome = executor(Ok(result)).execute("SELECT COUNT(*) FROM invoices").await;
        assert!(outcome.success);
        assert_eq!(outcome.result.row_count, 1);
        assert_eq!(outcome.message, "Query returned 1 row.");
    }

    #[tokio::test]
    async fn empty_result_succeeds_with_distinct_message() {
        let outcome = executor(Ok(QueryResult::default())).execute("SELECT 1 WHERE false").await;
        assert!(outcome.success);
        assert!(outcome.result.is_empty());
        assert_eq!(outcome.message, NO_ROWS_MESSAGE);
    }

    #[tokio::test]
    async fn store_error_is_surfaced_verbatim() {
        let store_msg = "column \"totl_amount\" does not exist";
        let outcome = executor(Err(store_msg.to_string()))
            .execute("SELECT totl_amount FROM invoices")
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, store_msg);
        assert!(outcome.result.is_empty());
    }
}
