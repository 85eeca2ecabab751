use std::fmt;

use mlsync_common::error::MlsError;

use crate::reso::client::ResoClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentKind {
    Media,
    Rooms,
    OpenHouse,
}

impl DependentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Rooms => "rooms",
            Self::OpenHouse => "open_house",
        }
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dependent step broke. Only `Configuration` is fatal to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Upstream,
    Payload,
    Store,
    Configuration,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Payload => "payload",
            Self::Store => "store",
            Self::Configuration => "configuration",
        }
    }
}

/// Result of fetching and storing one dependent type for one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependentOutcome {
    Stored(usize),
    Failed {
        kind: DependentKind,
        class: FailureClass,
        detail: String,
    },
}

impl DependentOutcome {
    pub fn fetch_failed(kind: DependentKind, e: ResoClientError) -> Self {
        let class = if e.is_configuration() {
            FailureClass::Configuration
        } else {
            FailureClass::Upstream
        };
        Self::Failed {
            kind,
            class,
            detail: e.to_string(),
        }
    }

    pub fn payload_failed(kind: DependentKind, e: serde_json::Error) -> Self {
        Self::Failed {
            kind,
            class: FailureClass::Payload,
            detail: e.to_string(),
        }
    }

    pub fn store_failed(kind: DependentKind, e: MlsError) -> Self {
        Self::Failed {
            kind,
            class: FailureClass::Store,
            detail: e.to_string(),
        }
    }
}
