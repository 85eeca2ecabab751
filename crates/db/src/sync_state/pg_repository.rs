use async_trait::async_trait;
use chrono::Utc;
use mlsync_common::error::{MlsError, MlsResult};
use mlsync_common::types::SyncType;
use sqlx::{PgPool, Row};

use crate::sync_state::models::{Cursor, SyncState, SyncStatus, WINDOW_START_KEY};
use crate::sync_state::repositories::SyncStateRepository;

#[derive(Clone)]
pub struct PgSyncStateRepository {
    pool: PgPool,
    start_timestamp: String,
}

impl PgSyncStateRepository {
    /// `start_timestamp` is the cursor used for catalogs without a row and on reset.
    pub fn new(pool: PgPool, start_timestamp: impl Into<String>) -> Self {
        Self {
            pool,
            start_timestamp: start_timestamp.into(),
        }
    }

    fn map_row(row: sqlx::postgres::PgRow) -> MlsResult<SyncState> {
        let sync_type: String = row.get("sync_type");
        let status: String = row.get("status");
        let total_processed: i64 = row.get("total_processed");
        Ok(SyncState {
            sync_type: sync_type.parse()?,
            last_timestamp: row.get("last_timestamp"),
            last_key: row.get("last_key"),
            total_processed: Self::from_db_count(total_processed)?,
            status: status.parse()?,
            last_error: row.get("last_error"),
            last_run_started: row.get("last_run_started"),
            last_run_completed: row.get("last_run_completed"),
        })
    }

    fn from_db_count(total_processed: i64) -> MlsResult<u64> {
        u64::try_from(total_processed).map_err(|_| {
            MlsError::Internal(format!("stored processed count {total_processed} is negative"))
        })
    }

    fn to_db_count(total_processed: u64) -> MlsResult<i64> {
        i64::try_from(total_processed).map_err(|_| {
            MlsError::Validation(format!("processed count {total_processed} exceeds bigint"))
        })
    }
}

#[async_trait]
impl SyncStateRepository for PgSyncStateRepository {
    async fn get(&self, sync_type: SyncType) -> MlsResult<SyncState> {
        let row = sqlx::query(
            "select sync_type, last_timestamp, last_key, total_processed, status, last_error,
                    last_run_started, last_run_completed
             from sync_state
             where sync_type = $1",
        )
        .bind(sync_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))?;

        match row {
            Some(r) => Self::map_row(r),
            None => Ok(SyncState::initial(sync_type, &self.start_timestamp)),
        }
    }

    async fn reset(&self, sync_type: SyncType) -> MlsResult<SyncState> {
        let row = sqlx::query(
            "insert into sync_state
             (sync_type, last_timestamp, last_key, total_processed, status)
             values ($1, $2, $3, 0, 'idle')
             on conflict (sync_type) do update set
               last_timestamp = excluded.last_timestamp,
               last_key = excluded.last_key,
               total_processed = 0,
               status = 'idle',
               last_error = null,
               last_run_started = null,
               last_run_completed = null,
               updated_at = now()
             returning sync_type, last_timestamp, last_key, total_processed, status, last_error,
                       last_run_started, last_run_completed",
        )
        .bind(sync_type.as_str())
        .bind(&self.start_timestamp)
        .bind(WINDOW_START_KEY)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_running(&self, sync_type: SyncType) -> MlsResult<SyncState> {
        let row = sqlx::query(
            "insert into sync_state
             (sync_type, last_timestamp, last_key, status, last_run_started)
             values ($1, $2, $3, 'running', $4)
             on conflict (sync_type) do update set
               status = 'running',
               last_error = null,
               last_run_started = excluded.last_run_started,
               updated_at = now()
             returning sync_type, last_timestamp, last_key, total_processed, status, last_error,
                       last_run_started, last_run_completed",
        )
        .bind(sync_type.as_str())
        .bind(&self.start_timestamp)
        .bind(WINDOW_START_KEY)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn checkpoint(
        &self,
        sync_type: SyncType,
        cursor: &Cursor,
        total_processed: u64,
    ) -> MlsResult<SyncState> {
        let row = sqlx::query(
            "insert into sync_state
             (sync_type, last_timestamp, last_key, total_processed, status)
             values ($1, $2, $3, $4, 'running')
             on conflict (sync_type) do update set
               last_timestamp = excluded.last_timestamp,
               last_key = excluded.last_key,
               total_processed = excluded.total_processed,
               status = 'running',
               updated_at = now()
             returning sync_type, last_timestamp, last_key, total_processed, status, last_error,
                       last_run_started, last_run_completed",
        )
        .bind(sync_type.as_str())
        .bind(&cursor.last_timestamp)
        .bind(&cursor.last_key)
        .bind(Self::to_db_count(total_processed)?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_completed(
        &self,
        sync_type: SyncType,
        cursor: &Cursor,
        total_processed: u64,
    ) -> MlsResult<SyncState> {
        let row = sqlx::query(
            "insert into sync_state
             (sync_type, last_timestamp, last_key, total_processed, status, last_run_completed)
             values ($1, $2, $3, $4, 'completed', $5)
             on conflict (sync_type) do update set
               last_timestamp = excluded.last_timestamp,
               last_key = excluded.last_key,
               total_processed = excluded.total_processed,
               status = 'completed',
               last_error = null,
               last_run_completed = excluded.last_run_completed,
               updated_at = now()
             returning sync_type, last_timestamp, last_key, total_processed, status, last_error,
                       last_run_started, last_run_completed",
        )
        .bind(sync_type.as_str())
        .bind(&cursor.last_timestamp)
        .bind(&cursor.last_key)
        .bind(Self::to_db_count(total_processed)?)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_failed(&self, sync_type: SyncType, error_message: &str) -> MlsResult<SyncState> {
        let row = sqlx::query(
            "insert into sync_state
             (sync_type, last_timestamp, last_key, status, last_error, last_run_completed)
             values ($1, $2, $3, 'failed', $4, $5)
             on conflict (sync_type) do update set
               status = 'failed',
               last_error = excluded.last_error,
               last_run_completed = excluded.last_run_completed,
               updated_at = now()
             returning sync_type, last_timestamp, last_key, total_processed, status, last_error,
                       last_run_started, last_run_completed",
        )
        .bind(sync_type.as_str())
        .bind(&self.start_timestamp)
        .bind(WINDOW_START_KEY)
        .bind(error_message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MlsError::Database(e.to_string()))?;

        Self::map_row(row)
    }
}
