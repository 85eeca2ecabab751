pub mod cli;
pub mod reso;
pub mod sync;

use std::time::Duration;

use mlsync_config::SyncSettings;
use mlsync_db::listing::pg_repository::PgListingRepository;
use mlsync_db::retry::RetryPolicy;
use mlsync_db::retrying::RetryingStore;
use mlsync_db::sync_state::pg_repository::PgSyncStateRepository;
use sqlx::PgPool;

use crate::reso::client::ResoClient;
use crate::sync::SequentialSyncer;

/// Engine wired to Postgres, with every store call retried.
pub type PgSyncer =
    SequentialSyncer<RetryingStore<PgSyncStateRepository>, RetryingStore<PgListingRepository>>;

pub fn pg_syncer(pool: PgPool, client: ResoClient, settings: SyncSettings) -> PgSyncer {
    let policy = RetryPolicy::new(
        settings.store_max_attempts,
        Duration::from_millis(settings.store_retry_delay_ms),
    );
    let state_repo = RetryingStore::new(
        PgSyncStateRepository::new(pool.clone(), settings.start_timestamp.clone()),
        policy,
    );
    let listings = RetryingStore::new(PgListingRepository::new(pool), policy);
    SequentialSyncer::new(client, state_repo, listings, settings)
}
