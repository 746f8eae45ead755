//! PostgreSQL-backed query store.

use crate::error::{EngineError, Result};
use crate::execution::executor::QueryStore;
use crate::execution::result::QueryResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::time::Duration;
use tracing::debug;

/// Runs statements on a pooled connection and returns rows as JSON values.
///
/// Each statement is wrapped in `row_to_json` so any column type maps to a
/// JSON value without a per-type decoder.
pub struct PgQueryStore {
    pool: PgPool,
    statement_timeout: Option<Duration>,
}

impl PgQueryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }
}

pub(crate) fn wrap_as_json_rows(sql: &str) -> String {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    format!(
        "SELECT row_to_json(q)::text AS record_json FROM ({}) AS q",
        statement
    )
}

#[async_trait]
impl QueryStore for PgQueryStore {
    async fn fetch(&self, sql: &str) -> Result<QueryResult> {
        let wrapped = wrap_as_json_rows(sql);
        debug!(sql = %wrapped, "Running statement");

        // The connection goes back to the pool when `conn` drops, on every path.
        let mut conn = self.pool.acquire().await?;
        let query = sqlx::query(&wrapped).fetch_all(&mut *conn);
        let rows = match self.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, query).await.map_err(|_| {
                EngineError::Database(format!(
                    "canceling statement due to statement timeout ({}s)",
                    limit.as_secs()
                ))
            })??,
            None => query.await?,
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let text: String = row.try_get("record_json")?;
            let record: Map<String, Value> = serde_json::from_str(&text)?;
            records.push(record);
        }
        Ok(QueryResult::from_records(records))
    }
}
