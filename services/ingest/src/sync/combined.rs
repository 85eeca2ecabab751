use std::time::Instant;

use mlsync_common::types::SyncType;
use mlsync_db::listing::repositories::ListingRepository;
use mlsync_db::sync_state::models::Cursor;
use mlsync_db::sync_state::repositories::SyncStateRepository;
use serde::Serialize;

use super::engine::{RunOptions, SequentialSyncer};
use super::error::SyncError;
use super::stats::RunStats;

#[derive(Debug, Clone, Serialize)]
pub struct CombinedReport {
    pub idx_available: u64,
    pub vow_available: u64,
    pub stored_before: i64,
    pub stored_after: i64,
    pub runs: Vec<(SyncType, RunStats)>,
    pub elapsed_minutes: f64,
}

impl CombinedReport {
    pub fn records_added(&self) -> i64 {
        self.stored_after - self.stored_before
    }
}

/// Run every catalog in turn, IDX first. Stops at the first failed run.
pub async fn run_all<S, L>(
    syncer: &SequentialSyncer<S, L>,
    limit: Option<u64>,
    reset: bool,
) -> Result<CombinedReport, SyncError>
where
    S: SyncStateRepository,
    L: ListingRepository,
{
    let started = Instant::now();
    let origin = Cursor::window_start(syncer.settings().start_timestamp.as_str());

    let idx_available = syncer.client().count(&origin, SyncType::Idx).await?;
    let vow_available = syncer.client().count(&origin, SyncType::Vow).await?;
    let stored_before = syncer.listings().count_properties().await?;
    tracing::info!(
        idx_available,
        vow_available,
        total_available = idx_available + vow_available,
        stored_before,
        "combined sync starting"
    );

    let mut runs = Vec::with_capacity(SyncType::ALL.len());
    for sync_type in SyncType::ALL {
        tracing::info!(%sync_type, "starting catalog sync");
        let stats = syncer
            .run(RunOptions {
                sync_type,
                limit,
                reset,
            })
            .await?;
        tracing::info!(%sync_type, processed = stats.properties, "catalog sync complete");
        runs.push((sync_type, stats));
    }

    let stored_after = syncer.listings().count_properties().await?;
    let report = CombinedReport {
        idx_available,
        vow_available,
        stored_before,
        stored_after,
        runs,
        elapsed_minutes: started.elapsed().as_secs_f64() / 60.0,
    };
    tracing::info!(
        stored_after,
        records_added = report.records_added(),
        elapsed_minutes = report.elapsed_minutes,
        "combined sync complete"
    );
    Ok(report)
}
