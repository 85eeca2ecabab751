use async_trait::async_trait;
use mlsync_common::error::MlsResult;
use mlsync_common::types::SyncType;

use crate::listing::models::{Media, OpenHouse, Property, Room};
use crate::listing::repositories::ListingRepository;
use crate::retry::{retry_linear, RetryPolicy};
use crate::sync_state::models::{Cursor, SyncState};
use crate::sync_state::repositories::SyncStateRepository;

/// Wraps a repository so every call is retried under a [`RetryPolicy`].
///
/// Implements both repository traits, so it can sit in front of either the sync-state or
/// the listing store.
#[derive(Debug, Clone)]
pub struct RetryingStore<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R> RetryingStore<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: SyncStateRepository> SyncStateRepository for RetryingStore<R> {
    async fn get(&self, sync_type: SyncType) -> MlsResult<SyncState> {
        retry_linear(&self.policy, "sync_state.get", || self.inner.get(sync_type)).await
    }

    async fn reset(&self, sync_type: SyncType) -> MlsResult<SyncState> {
        retry_linear(&self.policy, "sync_state.reset", || self.inner.reset(sync_type)).await
    }

    async fn mark_running(&self, sync_type: SyncType) -> MlsResult<SyncState> {
        retry_linear(&self.policy, "sync_state.mark_running", || {
            self.inner.mark_running(sync_type)
        })
        .await
    }

    async fn checkpoint(
        &self,
        sync_type: SyncType,
        cursor: &Cursor,
        total_processed: u64,
    ) -> MlsResult<SyncState> {
        retry_linear(&self.policy, "sync_state.checkpoint", || {
            self.inner.checkpoint(sync_type, cursor, total_processed)
        })
        .await
    }

    async fn mark_completed(
        &self,
        sync_type: SyncType,
        cursor: &Cursor,
        total_processed: u64,
    ) -> MlsResult<SyncState> {
        retry_linear(&self.policy, "sync_state.mark_completed", || {
            self.inner.mark_completed(sync_type, cursor, total_processed)
        })
        .await
    }

    async fn mark_failed(&self, sync_type: SyncType, error_message: &str) -> MlsResult<SyncState> {
        retry_linear(&self.policy, "sync_state.mark_failed", || {
            self.inner.mark_failed(sync_type, error_message)
        })
        .await
    }
}

#[async_trait]
impl<R: ListingRepository> ListingRepository for RetryingStore<R> {
    async fn upsert_property(&self, property: &Property) -> MlsResult<()> {
        retry_linear(&self.policy, "listing.upsert_property", || {
            self.inner.upsert_property(property)
        })
        .await
    }

    async fn upsert_media(&self, media: &[Media]) -> MlsResult<usize> {
        retry_linear(&self.policy, "listing.upsert_media", || {
            self.inner.upsert_media(media)
        })
        .await
    }

    async fn upsert_rooms(&self, rooms: &[Room]) -> MlsResult<usize> {
        retry_linear(&self.policy, "listing.upsert_rooms", || {
            self.inner.upsert_rooms(rooms)
        })
        .await
    }

    async fn upsert_open_houses(&self, open_houses: &[OpenHouse]) -> MlsResult<usize> {
        retry_linear(&self.policy, "listing.upsert_open_houses", || {
            self.inner.upsert_open_houses(open_houses)
        })
        .await
    }

    async fn count_properties(&self) -> MlsResult<i64> {
        retry_linear(&self.policy, "listing.count_properties", || {
            self.inner.count_properties()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlsync_common::error::MlsError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Listing store that fails the first `failures` upserts with a database error.
    #[derive(Default)]
    struct FlakyListings {
        failures: Mutex<u32>,
        calls: Mutex<u32>,
        rows: Mutex<HashMap<String, Property>>,
    }

    #[async_trait]
    impl ListingRepository for FlakyListings {
        async fn upsert_property(&self, property: &Property) -> MlsResult<()> {
            *self.calls.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(MlsError::Database("connection reset by peer".into()));
            }
            self.rows
                .lock()
                .unwrap()
                .insert(property.listing_key.clone(), property.clone());
            Ok(())
        }

        async fn upsert_media(&self, media: &[Media]) -> MlsResult<usize> {
            Ok(media.len())
        }

        async fn upsert_rooms(&self, rooms: &[Room]) -> MlsResult<usize> {
            Ok(rooms.len())
        }

        async fn upsert_open_houses(&self, open_houses: &[OpenHouse]) -> MlsResult<usize> {
            Ok(open_houses.len())
        }

        async fn count_properties(&self) -> MlsResult<i64> {
            Ok(self.rows.lock().unwrap().len() as i64)
        }
    }

    /// Sync-state store whose reads always fail with a non-transient error.
    struct MissingState {
        calls: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl SyncStateRepository for MissingState {
        async fn get(&self, _sync_type: SyncType) -> MlsResult<SyncState> {
            *self.calls.lock().unwrap() += 1;
            Err(MlsError::NotFound("sync_state".into()))
        }
        async fn reset(&self, sync_type: SyncType) -> MlsResult<SyncState> {
            self.get(sync_type).await
        }
        async fn mark_running(&self, sync_type: SyncType) -> MlsResult<SyncState> {
            self.get(sync_type).await
        }
        async fn checkpoint(&self, sync_type: SyncType, _: &Cursor, _: u64) -> MlsResult<SyncState> {
            self.get(sync_type).await
        }
        async fn mark_completed(
            &self,
            sync_type: SyncType,
            _: &Cursor,
            _: u64,
        ) -> MlsResult<SyncState> {
            self.get(sync_type).await
        }
        async fn mark_failed(&self, sync_type: SyncType, _: &str) -> MlsResult<SyncState> {
            self.get(sync_type).await
        }
    }

    fn property() -> Property {
        serde_json::from_value(serde_json::json!({
            "ListingKey": "X1",
            "ModificationTimestamp": "2024-01-05T00:00:00Z"
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn upsert_survives_two_transient_failures() {
        let flaky = FlakyListings {
            failures: Mutex::new(2),
            ..Default::default()
        };
        let store = RetryingStore::new(flaky, RetryPolicy::new(3, Duration::from_secs(1)));

        store.upsert_property(&property()).await.unwrap();

        assert_eq!(*store.inner().calls.lock().unwrap(), 3);
        assert_eq!(store.count_properties().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn upsert_gives_up_after_max_attempts() {
        let flaky = FlakyListings {
            failures: Mutex::new(5),
            ..Default::default()
        };
        let store = RetryingStore::new(flaky, RetryPolicy::new(3, Duration::from_secs(1)));

        let err = store.upsert_property(&property()).await.unwrap_err();

        assert!(matches!(err, MlsError::Database(_)));
        assert_eq!(*store.inner().calls.lock().unwrap(), 3);
        assert_eq!(store.count_properties().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_transient_state_errors_fail_fast() {
        let calls = Arc::new(Mutex::new(0));
        let store = RetryingStore::new(
            MissingState {
                calls: calls.clone(),
            },
            RetryPolicy::default(),
        );

        let err = store.get(SyncType::Idx).await.unwrap_err();

        assert!(matches!(err, MlsError::NotFound(_)));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
