use mlsync_common::types::SyncType;
use mlsync_config::SyncSettings;
use mlsync_db::listing::models::{Media, OpenHouse, Property, Room};
use mlsync_db::listing::repositories::ListingRepository;
use mlsync_db::sync_state::models::Cursor;
use mlsync_db::sync_state::repositories::SyncStateRepository;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use uuid::Uuid;

use super::error::SyncError;
use super::outcome::{DependentKind, DependentOutcome, FailureClass};
use super::stats::RunStats;
use super::window::QueryWindow;
use crate::reso::client::{ResoClient, ResoClientError};

/// Processed records between two coverage log lines.
const COVERAGE_LOG_EVERY: u64 = 1000;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub sync_type: SyncType,
    /// Stop after this many properties in this run.
    pub limit: Option<u64>,
    /// Rewind the catalog to its start cursor before running.
    pub reset: bool,
}

/// Dependent record counts for one property, as shown on its progress line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyCounts {
    pub media: usize,
    pub rooms: usize,
    pub open_house: usize,
}

/// Replicates one catalog property by property, in source order.
///
/// Two cursors are tracked. The resume position is the last processed record; it only moves
/// forward and is the only cursor ever persisted. The query cursor drives the next fetch and
/// matches the resume position except right after a window reset, when it is rebased to the
/// start of the last fetched timestamp.
pub struct SequentialSyncer<S, L> {
    client: ResoClient,
    state_repo: S,
    listings: L,
    settings: SyncSettings,
}

impl<S, L> SequentialSyncer<S, L>
where
    S: SyncStateRepository,
    L: ListingRepository,
{
    pub fn new(client: ResoClient, state_repo: S, listings: L, settings: SyncSettings) -> Self {
        Self {
            client,
            state_repo,
            listings,
            settings,
        }
    }

    pub fn client(&self) -> &ResoClient {
        &self.client
    }

    pub fn state_repo(&self) -> &S {
        &self.state_repo
    }

    pub fn listings(&self) -> &L {
        &self.listings
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunStats, SyncError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_run", %run_id, sync_type = %options.sync_type);
        self.run_guarded(options).instrument(span).await
    }

    async fn run_guarded(&self, options: RunOptions) -> Result<RunStats, SyncError> {
        // Misconfiguration fails before any state is written.
        self.client.preflight(options.sync_type)?;

        match self.execute(&options).await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                tracing::error!(error = %e, "sync run failed");
                if let Err(mark_err) = self
                    .state_repo
                    .mark_failed(options.sync_type, &e.to_string())
                    .await
                {
                    tracing::error!(error = %mark_err, "could not record sync failure");
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, options: &RunOptions) -> Result<RunStats, SyncError> {
        let sync_type = options.sync_type;
        let batch_size = self.settings.batch_size;
        tracing::info!(limit = ?options.limit, reset = options.reset, batch_size, "sync starting");

        if options.reset {
            self.state_repo.reset(sync_type).await?;
            tracing::info!("sync state reset");
        }

        let saved = self.state_repo.get(sync_type).await?;
        tracing::info!(
            cursor = %saved.cursor(),
            previously_processed = saved.total_processed,
            "resuming from checkpoint"
        );
        self.state_repo.mark_running(sync_type).await?;

        let mut position = saved.cursor();
        let mut query = position.clone();
        let mut stats = RunStats {
            total_available: self.client.count(&query, sync_type).await?,
            total_processed: saved.total_processed,
            ..RunStats::default()
        };
        tracing::info!(available = stats.total_available, "properties available");

        let limit_reached = |stats: &RunStats| options.limit.is_some_and(|l| stats.properties >= l);
        let mut window = QueryWindow::new(self.settings.window_limit);
        let mut since_checkpoint: u64 = 0;

        'batches: loop {
            if limit_reached(&stats) {
                tracing::info!(limit = ?options.limit, "limit reached");
                break;
            }

            let raw = self.client.fetch_batch(&query, batch_size, sync_type).await?;
            if raw.is_empty() {
                tracing::info!("no more properties");
                break;
            }
            let fetched = raw.len();
            let properties = raw
                .into_iter()
                .map(serde_json::from_value::<Property>)
                .collect::<Result<Vec<_>, _>>()?;

            let rebase = if window.observe(fetched as u64) {
                properties
                    .last()
                    .map(|p| Cursor::window_start(p.modification_timestamp.as_str()))
            } else {
                None
            };
            if let Some(start) = &rebase {
                tracing::warn!(window_start = %start.last_timestamp, "query window limit reached, rebasing");
            }

            for property in &properties {
                if limit_reached(&stats) {
                    tracing::info!(limit = ?options.limit, "limit reached");
                    break 'batches;
                }

                let counts = self.process_property(property, &mut stats).await?;
                position.advance(&property.modification_timestamp, &property.listing_key);
                stats.total_processed += 1;
                since_checkpoint += 1;

                tracing::info!(
                    index = stats.total_processed,
                    total = stats.total_available,
                    listing_key = %property.listing_key,
                    media = counts.media,
                    rooms = counts.rooms,
                    open_house = counts.open_house,
                    "property synced"
                );

                if since_checkpoint >= self.settings.checkpoint_interval {
                    self.state_repo
                        .checkpoint(sync_type, &position, stats.total_processed)
                        .await?;
                    tracing::info!(
                        processed = stats.total_processed,
                        cursor = %position,
                        window_records = window.observed(),
                        "checkpoint saved"
                    );
                    since_checkpoint = 0;
                }

                if stats.properties % COVERAGE_LOG_EVERY == 0 {
                    stats.log_coverage(sync_type);
                }
            }

            if fetched < batch_size as usize {
                break;
            }
            query = rebase.unwrap_or_else(|| position.clone());
        }

        self.state_repo
            .mark_completed(sync_type, &position, stats.total_processed)
            .await?;
        tracing::info!(cursor = %position, "sync completed, state saved");

        stats.final_cursor = Some(position);
        stats.log_summary(sync_type);
        Ok(stats)
    }

    /// Upsert the property, then each dependent type independently. Only a property upsert
    /// failure or a misconfigured dependent endpoint aborts the run.
    async fn process_property(
        &self,
        property: &Property,
        stats: &mut RunStats,
    ) -> Result<PropertyCounts, SyncError> {
        self.listings.upsert_property(property).await?;
        stats.record_property();

        let key = property.listing_key.as_str();
        let media = self.sync_media(key).await;
        let rooms = self.sync_rooms(key).await;
        let open_house = self.sync_open_house(key).await;

        Ok(PropertyCounts {
            media: settle(DependentKind::Media, key, media, stats)?,
            rooms: settle(DependentKind::Rooms, key, rooms, stats)?,
            open_house: settle(DependentKind::OpenHouse, key, open_house, stats)?,
        })
    }

    async fn sync_media(&self, key: &str) -> DependentOutcome {
        let kind = DependentKind::Media;
        let records: Vec<Media> = match decode(kind, self.client.fetch_media(key).await) {
            Ok(r) => r,
            Err(outcome) => return outcome,
        };
        if records.is_empty() {
            return DependentOutcome::Stored(0);
        }
        match self.listings.upsert_media(&records).await {
            Ok(_) => DependentOutcome::Stored(records.len()),
            Err(e) => DependentOutcome::store_failed(kind, e),
        }
    }

    async fn sync_rooms(&self, key: &str) -> DependentOutcome {
        let kind = DependentKind::Rooms;
        let records: Vec<Room> = match decode(kind, self.client.fetch_rooms(key).await) {
            Ok(r) => r,
            Err(outcome) => return outcome,
        };
        if records.is_empty() {
            return DependentOutcome::Stored(0);
        }
        match self.listings.upsert_rooms(&records).await {
            Ok(_) => DependentOutcome::Stored(records.len()),
            Err(e) => DependentOutcome::store_failed(kind, e),
        }
    }

    async fn sync_open_house(&self, key: &str) -> DependentOutcome {
        let kind = DependentKind::OpenHouse;
        let records: Vec<OpenHouse> = match decode(kind, self.client.fetch_open_house(key).await)
        {
            Ok(r) => r,
            Err(outcome) => return outcome,
        };
        if records.is_empty() {
            return DependentOutcome::Stored(0);
        }
        match self.listings.upsert_open_houses(&records).await {
            Ok(_) => DependentOutcome::Stored(records.len()),
            Err(e) => DependentOutcome::store_failed(kind, e),
        }
    }
}

fn decode<T: DeserializeOwned>(
    kind: DependentKind,
    fetched: Result<Vec<serde_json::Value>, ResoClientError>,
) -> Result<Vec<T>, DependentOutcome> {
    let raw = fetched.map_err(|e| DependentOutcome::fetch_failed(kind, e))?;
    raw.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| DependentOutcome::payload_failed(kind, e))
}

/// Fold a dependent outcome into the run stats. Configuration failures are returned as
/// errors; every other failure counts as zero records.
fn settle(
    kind: DependentKind,
    listing_key: &str,
    outcome: DependentOutcome,
    stats: &mut RunStats,
) -> Result<usize, SyncError> {
    match outcome {
        DependentOutcome::Stored(count) => {
            stats.record_dependents(kind, count);
            Ok(count)
        }
        DependentOutcome::Failed {
            class: FailureClass::Configuration,
            detail,
            ..
        } => Err(SyncError::Config(format!("{kind} endpoint: {detail}"))),
        DependentOutcome::Failed {
            kind,
            class,
            detail,
        } => {
            tracing::warn!(
                listing_key,
                kind = kind.as_str(),
                class = class.as_str(),
                error = %detail,
                "dependent sync failed"
            );
            stats.record_failure(kind);
            Ok(0)
        }
    }
}
