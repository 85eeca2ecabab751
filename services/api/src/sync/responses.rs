use chrono::{DateTime, Utc};
use mlsync_db::sync_state::models::SyncState;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TriggerSyncResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TriggerSyncResponse {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncStateResponse {
    pub data: SyncState,
}
