use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MlsError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub instance_id: Uuid,
}

impl ServiceInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            instance_id: Uuid::new_v4(),
        }
    }
}

/// A source catalog. Each one has its own endpoint, token and sync-state row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncType {
    #[default]
    #[serde(rename = "IDX")]
    Idx,
    #[serde(rename = "VOW")]
    Vow,
}

impl SyncType {
    /// Catalogs in the order a combined run processes them.
    pub const ALL: [SyncType; 2] = [SyncType::Idx, SyncType::Vow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idx => "IDX",
            Self::Vow => "VOW",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = MlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IDX" => Ok(Self::Idx),
            "VOW" => Ok(Self::Vow),
            other => Err(MlsError::Validation(format!(
                "unknown sync type '{other}', expected IDX or VOW"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("idx".parse::<SyncType>().unwrap(), SyncType::Idx);
        assert_eq!(" Vow ".parse::<SyncType>().unwrap(), SyncType::Vow);
    }

    #[test]
    fn rejects_unknown_catalog() {
        let err = "MLS".parse::<SyncType>().unwrap_err();
        assert!(matches!(err, MlsError::Validation(_)));
    }

    #[test]
    fn defaults_to_idx() {
        assert_eq!(SyncType::default(), SyncType::Idx);
        assert_eq!(SyncType::ALL[0], SyncType::Idx);
    }

    #[test]
    fn serializes_as_upper_case_code() {
        let json = serde_json::to_string(&SyncType::Vow).unwrap();
        assert_eq!(json, "\"VOW\"");
        let back: SyncType = serde_json::from_str("\"IDX\"").unwrap();
        assert_eq!(back, SyncType::Idx);
    }

    #[test]
    fn service_info_carries_name() {
        let info = ServiceInfo::new("mlsync-api");
        assert_eq!(info.name, "mlsync-api");
        assert!(!info.version.is_empty());
    }
}
