use mlsync_common::types::SyncType;
use mlsync_db::sync_state::models::Cursor;
use serde::Serialize;

use super::outcome::DependentKind;

/// Media coverage below this percentage is worth a warning at the end of a run.
pub const MEDIA_COVERAGE_WARN_PCT: u8 = 95;

/// Share of processed properties with at least one record of each dependent type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub media: u8,
    pub rooms: u8,
    pub open_house: u8,
}

/// Counters for one engine run. Start from zero every run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub properties: u64,
    pub media: u64,
    pub rooms: u64,
    pub open_houses: u64,
    pub properties_with_media: u64,
    pub properties_with_rooms: u64,
    pub properties_with_open_house: u64,
    pub media_failures: u64,
    pub room_failures: u64,
    pub open_house_failures: u64,
    /// Records the source reported after the resume cursor when the run started.
    pub total_available: u64,
    /// Cumulative processed count persisted with the final cursor.
    pub total_processed: u64,
    pub final_cursor: Option<Cursor>,
}

fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}

impl RunStats {
    pub fn record_property(&mut self) {
        self.properties += 1;
    }

    pub fn record_dependents(&mut self, kind: DependentKind, stored: usize) {
        let stored = stored as u64;
        let (total, with_any) = match kind {
            DependentKind::Media => (&mut self.media, &mut self.properties_with_media),
            DependentKind::Rooms => (&mut self.rooms, &mut self.properties_with_rooms),
            DependentKind::OpenHouse => {
                (&mut self.open_houses, &mut self.properties_with_open_house)
            }
        };
        *total += stored;
        if stored > 0 {
            *with_any += 1;
        }
    }

    pub fn record_failure(&mut self, kind: DependentKind) {
        match kind {
            DependentKind::Media => self.media_failures += 1,
            DependentKind::Rooms => self.room_failures += 1,
            DependentKind::OpenHouse => self.open_house_failures += 1,
        }
    }

    pub fn coverage(&self) -> Coverage {
        Coverage {
            media: percent(self.properties_with_media, self.properties),
            rooms: percent(self.properties_with_rooms, self.properties),
            open_house: percent(self.properties_with_open_house, self.properties),
        }
    }

    pub fn log_coverage(&self, sync_type: SyncType) {
        let coverage = self.coverage();
        tracing::info!(
            %sync_type,
            processed = self.properties,
            with_media = self.properties_with_media,
            media_pct = coverage.media,
            with_rooms = self.properties_with_rooms,
            rooms_pct = coverage.rooms,
            with_open_house = self.properties_with_open_house,
            open_house_pct = coverage.open_house,
            "coverage"
        );
    }

    pub fn log_summary(&self, sync_type: SyncType) {
        let coverage = self.coverage();
        tracing::info!(
            %sync_type,
            properties = self.properties,
            media = self.media,
            rooms = self.rooms,
            open_houses = self.open_houses,
            media_pct = coverage.media,
            rooms_pct = coverage.rooms,
            open_house_pct = coverage.open_house,
            media_failures = self.media_failures,
            room_failures = self.room_failures,
            open_house_failures = self.open_house_failures,
            total_processed = self.total_processed,
            "sync run finished"
        );
        if self.properties > 0 && coverage.media < MEDIA_COVERAGE_WARN_PCT {
            tracing::warn!(
                %sync_type,
                media_pct = coverage.media,
                threshold = MEDIA_COVERAGE_WARN_PCT,
                "media coverage below threshold"
            );
        }
    }
}
