use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use mlsync_common::types::SyncType;
use mlsync_config::SyncSettings;
use mlsync_ingest::reso::client::{ResoClient, ResoClientConfig, ResoClientError};
use mlsync_ingest::sync::RunOptions;
use mlsync_ingest::PgSyncer;
use sqlx::PgPool;

/// One engine per sync type. Each has its own client and request gate, so concurrent runs
/// of different catalogs share only the database pool.
#[derive(Clone)]
pub struct Syncers {
    idx: Arc<PgSyncer>,
    vow: Arc<PgSyncer>,
}

impl Syncers {
    pub fn new(
        pool: PgPool,
        reso_config: &ResoClientConfig,
        settings: &SyncSettings,
    ) -> Result<Self, ResoClientError> {
        let build = |pool: PgPool| -> Result<Arc<PgSyncer>, ResoClientError> {
            let client = ResoClient::new(reso_config.clone())?;
            Ok(Arc::new(mlsync_ingest::pg_syncer(
                pool,
                client,
                settings.clone(),
            )))
        };
        Ok(Self {
            idx: build(pool.clone())?,
            vow: build(pool)?,
        })
    }

    pub fn get(&self, sync_type: SyncType) -> &Arc<PgSyncer> {
        match sync_type {
            SyncType::Idx => &self.idx,
            SyncType::Vow => &self.vow,
        }
    }
}

/// Sync types with a run in flight in this process.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    running: Arc<Mutex<HashSet<SyncType>>>,
}

impl RunRegistry {
    /// Mark `sync_type` as running. Returns `None` if it already is.
    pub fn claim(&self, sync_type: SyncType) -> Option<RunGuard> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running.insert(sync_type).then(|| RunGuard {
            registry: self.clone(),
            sync_type,
        })
    }

    pub fn is_running(&self, sync_type: SyncType) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&sync_type)
    }

    fn release(&self, sync_type: SyncType) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&sync_type);
    }
}

/// Releases its sync type when dropped, including when the run task panics.
#[derive(Debug)]
pub struct RunGuard {
    registry: RunRegistry,
    sync_type: SyncType,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.release(self.sync_type);
    }
}

/// Start a run in the background. Returns `false` without spawning when that sync type is
/// already running.
pub fn spawn_run(syncers: &Syncers, registry: &RunRegistry, options: RunOptions) -> bool {
    let Some(guard) = registry.claim(options.sync_type) else {
        return false;
    };
    let syncer = Arc::clone(syncers.get(options.sync_type));

    tokio::spawn(async move {
        let _guard = guard;
        match syncer.run(options).await {
            Ok(stats) => tracing::info!(
                sync_type = %options.sync_type,
                processed = stats.properties,
                "background sync finished"
            ),
            Err(e) => tracing::error!(
                sync_type = %options.sync_type,
                error = %e,
                "background sync failed"
            ),
        }
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_until_release() {
        let registry = RunRegistry::default();
        let guard = registry.claim(SyncType::Idx).expect("first claim");
        assert!(registry.claim(SyncType::Idx).is_none());
        assert!(registry.is_running(SyncType::Idx));

        drop(guard);
        assert!(!registry.is_running(SyncType::Idx));
        assert!(registry.claim(SyncType::Idx).is_some());
    }

    #[test]
    fn sync_types_are_tracked_independently() {
        let registry = RunRegistry::default();
        let _idx = registry.claim(SyncType::Idx).expect("idx claim");
        assert!(registry.claim(SyncType::Vow).is_some());
    }
}
