use async_trait::async_trait;
use mlsync_common::error::MlsResult;
use mlsync_common::types::SyncType;

use crate::sync_state::models::{Cursor, SyncState};

#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    /// Stored state for a catalog, or a synthesized initial state if it has no row yet.
    async fn get(&self, sync_type: SyncType) -> MlsResult<SyncState>;

    /// Rewind to the start cursor with zero processed and status 'idle'.
    async fn reset(&self, sync_type: SyncType) -> MlsResult<SyncState>;

    /// Set status to 'running', stamp the start time and clear the last error.
    async fn mark_running(&self, sync_type: SyncType) -> MlsResult<SyncState>;

    /// Persist cursor and cumulative processed count mid-run.
    async fn checkpoint(
        &self,
        sync_type: SyncType,
        cursor: &Cursor,
        total_processed: u64,
    ) -> MlsResult<SyncState>;

    /// Persist the final cursor and count, set status to 'completed'.
    async fn mark_completed(
        &self,
        sync_type: SyncType,
        cursor: &Cursor,
        total_processed: u64,
    ) -> MlsResult<SyncState>;

    /// Set status to 'failed'. The cursor stays at the last checkpoint.
    async fn mark_failed(&self, sync_type: SyncType, error_message: &str) -> MlsResult<SyncState>;
}
