use async_trait::async_trait;
use mlsync_common::error::{MlsError, MlsResult};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::listing::models::{dedupe_by_key, ListingRecord, Media, OpenHouse, Property, Room};
use crate::listing::repositories::ListingRepository;

/// Bulk upsert for `T`: rows are bound as one jsonb array and expanded server-side.
///
/// Conflicting rows are only rewritten when a column actually changed, so replaying the same
/// payload leaves `synced_at` untouched.
pub fn upsert_statement<T: ListingRecord>() -> String {
    let table = T::TABLE;
    let columns = T::COLUMNS.join(", ");
    let updated: Vec<&str> = T::COLUMNS
        .iter()
        .copied()
        .filter(|c| *c != T::KEY_COLUMN)
        .collect();
    let assignments = updated
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let current = updated
        .iter()
        .map(|c| format!("{table}.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let incoming = updated
        .iter()
        .map(|c| format!("excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "insert into {table} ({columns})
         select {columns} from jsonb_populate_recordset(null::{table}, $1)
         on conflict ({key}) do update set
           {assignments},
           synced_at = now()
         where ({current}) is distinct from ({incoming})",
        key = T::KEY_COLUMN,
    )
}

#[derive(Clone)]
pub struct PgListingRepository {
    pool: PgPool,
}

impl PgListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_batch<T: ListingRecord + Clone>(&self, records: &[T]) -> MlsResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let rows = dedupe_by_key(records);
        sqlx::query(&upsert_statement::<T>())
            .bind(Json(&rows))
            .execute(&self.pool)
            .await
            .map_err(|e| MlsError::Database(e.to_string()))?;

        tracing::debug!(table = T::TABLE, rows = rows.len(), "upserted batch");
        Ok(rows.len())
    }
}

#[async_trait]
impl ListingRepository for PgListingRepository {
    async fn upsert_property(&self, property: &Property) -> MlsResult<()> {
        self.upsert_batch(std::slice::from_ref(property)).await?;
        Ok(())
    }

    async fn upsert_media(&self, media: &[Media]) -> MlsResult<usize> {
        self.upsert_batch(media).await
    }

    async fn upsert_rooms(&self, rooms: &[Room]) -> MlsResult<usize> {
        self.upsert_batch(rooms).await
    }

    async fn upsert_open_houses(&self, open_houses: &[OpenHouse]) -> MlsResult<usize> {
        self.upsert_batch(open_houses).await
    }

    async fn count_properties(&self) -> MlsResult<i64> {
        let count: i64 = sqlx::query_scalar("select count(*) from property")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MlsError::Database(e.to_string()))?;
        Ok(count)
    }
}
