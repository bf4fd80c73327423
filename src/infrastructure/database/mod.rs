mod postgres_repository;

#[cfg(test)]
mod tests;

use crate::config::DatabaseConfig;
use crate::domain::RepositoryPtr;
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub use postgres_repository::PostgresRepository;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Connects to Postgres with bounded retries and bootstraps the schema.
///
/// Retrying covers the common deployment race where the service starts
/// before the database accepts connections. Each attempt is separated by a
/// short sleep; the final failure is returned to the caller.
pub async fn init_database(config: &DatabaseConfig) -> Result<PgPool> {
    // ---
    let options = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout);

    let mut last_err = None;
    for attempt in 1..=config.retry_count.max(1) {
        // ---
        match options.clone().connect(&config.database_url).await {
            Ok(pool) => {
                // ---
                run_schema(&pool).await?;
                tracing::info!("Database ready after {attempt} attempt(s)");
                return Ok(pool);
            }
            Err(err) => {
                // ---
                tracing::warn!("Database connection attempt {attempt} failed: {err}");
                last_err = Some(err);
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        }
    }

    Err(anyhow::anyhow!(
        "database unavailable after {} attempts: {}",
        config.retry_count,
        last_err.map(|e| e.to_string()).unwrap_or_default()
    ))
}

async fn run_schema(pool: &PgPool) -> Result<()> {
    // ---
    // The bootstrap is a sequence of IF NOT EXISTS statements, safe to run
    // on every startup and from concurrent test processes.
    for chunk in SCHEMA_SQL.split(';') {
        // ---
        let statement: String = chunk
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Creates the Postgres-backed repository over an initialized pool.
pub fn create_postgres_repository(pool: PgPool) -> Result<RepositoryPtr> {
    // ---
    Ok(Arc::new(PostgresRepository::new(pool)))
}
