use async_trait::async_trait;
use mlsync_common::error::MlsResult;

use crate::listing::models::{Media, OpenHouse, Property, Room};

#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Upsert one property (idempotent on listing_key).
    async fn upsert_property(&self, property: &Property) -> MlsResult<()>;

    /// Upsert a media batch (idempotent on media_key). Returns the number of distinct rows
    /// written.
    async fn upsert_media(&self, media: &[Media]) -> MlsResult<usize>;

    /// Upsert a room batch (idempotent on room_key).
    async fn upsert_rooms(&self, rooms: &[Room]) -> MlsResult<usize>;

    /// Upsert an open-house batch (idempotent on open_house_key).
    async fn upsert_open_houses(&self, open_houses: &[OpenHouse]) -> MlsResult<usize>;

    /// Number of stored properties.
    async fn count_properties(&self) -> MlsResult<i64>;
}
