pub mod listing;
pub mod retry;
pub mod retrying;
pub mod sync_state;

use mlsync_common::error::{MlsError, MlsResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// DDL for every table the sync writes to.
pub const SCHEMA: &str = include_str!("../schema.sql");

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> MlsResult<PgPool> {
    tracing::info!("connecting to database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))
}

/// Create any missing tables. Existing tables are left untouched.
pub async fn apply_schema(pool: &PgPool) -> MlsResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pool_fails_with_invalid_url() {
        let result = create_pool("postgres://invalid:5432/nonexistent").await;
        assert!(result.is_err());
    }

    #[test]
    fn schema_declares_every_table() {
        for table in ["sync_state", "property", "media", "property_rooms", "open_house"] {
            assert!(
                SCHEMA.contains(&format!("create table if not exists {table} (")),
                "missing table {table}"
            );
        }
    }
}
