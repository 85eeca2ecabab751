use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mlsync_common::error::MlsError;
use mlsync_common::types::SyncType;
use serde::{Deserialize, Serialize};

/// Key component of a cursor that sorts before every real listing key at a timestamp.
pub const WINDOW_START_KEY: &str = "0";

/// Resume position in the source stream, ordered by timestamp then key.
///
/// Timestamps are kept exactly as the source returned them. Ordering parses them as RFC 3339,
/// so `10:00:00Z` and `10:00:00.500Z` compare chronologically even though the source drops
/// zero fractional seconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub last_timestamp: String,
    pub last_key: String,
}

fn parse_instant(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl Cursor {
    pub fn new(last_timestamp: impl Into<String>, last_key: impl Into<String>) -> Self {
        Self {
            last_timestamp: last_timestamp.into(),
            last_key: last_key.into(),
        }
    }

    /// Cursor addressing every record at `timestamp` and later.
    pub fn window_start(timestamp: impl Into<String>) -> Self {
        Self::new(timestamp, WINDOW_START_KEY)
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.last_timestamp)
    }

    /// Move to `(timestamp, key)` unless that is at or before the current position.
    /// Returns whether the cursor moved.
    ///
    /// When either timestamp is not valid RFC 3339 there is nothing to compare against, and
    /// the cursor follows the source order unconditionally.
    pub fn advance(&mut self, timestamp: &str, key: &str) -> bool {
        let candidate = Cursor::new(timestamp, key);
        let moves = match (candidate.instant(), self.instant()) {
            (Some(_), Some(_)) => candidate > *self,
            _ => true,
        };
        if moves {
            *self = candidate;
        }
        moves
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.instant(), &self.last_key, &self.last_timestamp).cmp(&(
            other.instant(),
            &other.last_key,
            &other.last_timestamp,
        ))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.last_timestamp, self.last_key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = MlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(MlsError::Internal(format!("unknown sync status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub sync_type: SyncType,
    pub last_timestamp: String,
    pub last_key: String,
    pub total_processed: u64,
    pub status: SyncStatus,
    pub last_error: Option<String>,
    pub last_run_started: Option<DateTime<Utc>>,
    pub last_run_completed: Option<DateTime<Utc>>,
}

impl SyncState {
    /// State of a catalog that has never been synced.
    pub fn initial(sync_type: SyncType, start_timestamp: &str) -> Self {
        Self {
            sync_type,
            last_timestamp: start_timestamp.to_owned(),
            last_key: WINDOW_START_KEY.to_owned(),
            total_processed: 0,
            status: SyncStatus::Idle,
            last_error: None,
            last_run_started: None,
            last_run_completed: None,
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.last_timestamp.clone(), self.last_key.clone())
    }
}
