//! Database connection management using sqlx

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Open the pool named by `DATABASE_URL` and check it answers.
pub async fn init_pool(config: &EngineConfig) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| EngineError::Configuration("DATABASE_URL is not set".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    info!(max_connections = config.db_max_connections, "Database pool ready");
    Ok(pool)
}
