use std::env;
use std::str::FromStr;

use chrono::DateTime;
use mlsync_common::error::{MlsError, MlsResult};
use serde::Deserialize;

pub const DEFAULT_SYNC_START: &str = "2024-01-01T00:00:00Z";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub sync: SyncSettings,
}

/// Knobs for the sequential engine and the store retry wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    /// `$top` for each property batch.
    pub batch_size: u32,
    /// Processed records between two durable checkpoints.
    pub checkpoint_interval: u64,
    /// Records observed in one query window before the window is rebased.
    /// Kept below the source's 100k addressable result limit.
    pub window_limit: u64,
    /// Cursor timestamp used when a catalog has never been synced.
    pub start_timestamp: String,
    pub store_max_attempts: u32,
    pub store_retry_delay_ms: u64,
    pub run_on_start: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            checkpoint_interval: 1000,
            window_limit: 95_000,
            start_timestamp: DEFAULT_SYNC_START.to_owned(),
            store_max_attempts: 3,
            store_retry_delay_ms: 1000,
            run_on_start: false,
        }
    }
}

impl SyncSettings {
    pub fn from_env() -> MlsResult<Self> {
        let defaults = Self::default();
        let settings = Self {
            batch_size: get_parsed_or("BATCH_SIZE_PROPERTY", defaults.batch_size)?,
            checkpoint_interval: get_parsed_or(
                "SYNC_CHECKPOINT_INTERVAL",
                defaults.checkpoint_interval,
            )?,
            window_limit: get_parsed_or("SYNC_WINDOW_LIMIT", defaults.window_limit)?,
            start_timestamp: get_var_or("SYNC_START_DATE", &defaults.start_timestamp),
            store_max_attempts: get_parsed_or("STORE_MAX_ATTEMPTS", defaults.store_max_attempts)?,
            store_retry_delay_ms: get_parsed_or(
                "STORE_RETRY_DELAY_MS",
                defaults.store_retry_delay_ms,
            )?,
            run_on_start: get_parsed_or("RUN_SYNC_ON_START", defaults.run_on_start)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> MlsResult<()> {
        if self.batch_size == 0 {
            return Err(MlsError::Config("BATCH_SIZE_PROPERTY must be > 0".into()));
        }
        if self.checkpoint_interval == 0 {
            return Err(MlsError::Config(
                "SYNC_CHECKPOINT_INTERVAL must be > 0".into(),
            ));
        }
        if self.window_limit == 0 {
            return Err(MlsError::Config("SYNC_WINDOW_LIMIT must be > 0".into()));
        }
        if self.store_max_attempts == 0 {
            return Err(MlsError::Config("STORE_MAX_ATTEMPTS must be > 0".into()));
        }
        DateTime::parse_from_rfc3339(&self.start_timestamp).map_err(|e| {
            MlsError::Config(format!(
                "SYNC_START_DATE '{}' is not RFC 3339: {e}",
                self.start_timestamp
            ))
        })?;
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> MlsResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: get_parsed_or("PORT", 8080)?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            sync: SyncSettings::from_env()?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn get_var(key: &str) -> MlsResult<String> {
    env::var(key).map_err(|_| MlsError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn get_parsed_or<T>(key: &str, default: T) -> MlsResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MlsError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
