use mlsync_common::error::MlsError;

use crate::reso::client::ResoClientError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("source API error: {0}")]
    Upstream(ResoClientError),

    #[error("store error: {0}")]
    Store(#[from] MlsError),

    #[error("malformed property payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<ResoClientError> for SyncError {
    fn from(e: ResoClientError) -> Self {
        if e.is_configuration() {
            Self::Config(e.to_string())
        } else {
            Self::Upstream(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlsync_common::types::SyncType;
    use reqwest::StatusCode;

    #[test]
    fn configuration_client_errors_become_config() {
        let err: SyncError = ResoClientError::CatalogNotConfigured(SyncType::Vow).into();
        assert!(matches!(err, SyncError::Config(_)));

        let err: SyncError = ResoClientError::InvalidUrl("nope".into()).into();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn http_errors_stay_upstream() {
        let err: SyncError = ResoClientError::HttpError {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".into(),
        }
        .into();
        assert!(matches!(err, SyncError::Upstream(_)));
        assert_eq!(err.to_string(), "source API error: HTTP 502 Bad Gateway: upstream down");
    }
}
