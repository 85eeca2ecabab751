use std::time::Duration;

use chrono::Utc;
use mlsync_common::error::{MlsError, MlsResult};
use mlsync_common::types::SyncType;
use mlsync_db::sync_state::models::Cursor;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};

use super::models::ODataResponse;
use super::query;
use super::rate_limit::RequestGate;

pub const DEFAULT_MEDIA_URL: &str = "https://query.ampre.ca/odata/Media";
pub const DEFAULT_ROOMS_URL: &str =
    "https://query.ampre.ca/odata/PropertyRooms?$filter=ListingKey eq '@propertyKey'";
pub const DEFAULT_OPEN_HOUSE_URL: &str = "https://query.ampre.ca/odata/OpenHouse";

/// URL template and bearer token for one catalog.
#[derive(Debug, Clone)]
pub struct CatalogEndpoint {
    pub url_template: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct ResoClientConfig {
    pub idx: CatalogEndpoint,
    pub vow: Option<CatalogEndpoint>,
    pub media_url: String,
    pub rooms_url: String,
    pub open_house_url: String,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl ResoClientConfig {
    /// Load source API config from environment.
    ///
    /// IDX is mandatory. VOW is optional, but `VOW_URL` and `VOW_TOKEN` must be set together.
    pub fn from_env() -> MlsResult<Self> {
        let idx = CatalogEndpoint {
            url_template: required("IDX_URL")?,
            token: required("IDX_TOKEN")?,
        };

        let vow = match (optional("VOW_URL"), optional("VOW_TOKEN")) {
            (Some(url_template), Some(token)) => Some(CatalogEndpoint {
                url_template,
                token,
            }),
            (None, None) => None,
            _ => {
                return Err(MlsError::Config(
                    "VOW_URL and VOW_TOKEN must be set together".into(),
                ))
            }
        };

        Ok(Self {
            idx,
            vow,
            media_url: optional("MEDIA_URL").unwrap_or_else(|| DEFAULT_MEDIA_URL.to_owned()),
            rooms_url: optional("ROOMS_URL").unwrap_or_else(|| DEFAULT_ROOMS_URL.to_owned()),
            open_house_url: optional("OPEN_HOUSE_URL")
                .unwrap_or_else(|| DEFAULT_OPEN_HOUSE_URL.to_owned()),
            requests_per_minute: parsed_or("RESO_RATE_LIMIT_PER_MINUTE", 120)?,
            timeout_secs: parsed_or("RESO_TIMEOUT_SECS", 30)?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required(key: &str) -> MlsResult<String> {
    optional(key).ok_or_else(|| MlsError::Config(format!("{key} is required but not set")))
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> MlsResult<T> {
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| MlsError::Config(format!("{key} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResoClientError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("{0} catalog is not configured (set {0}_URL and {0}_TOKEN)")]
    CatalogNotConfigured(SyncType),
}

impl ResoClientError {
    /// Errors caused by configuration rather than the remote side; they fail every request.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::CatalogNotConfigured(_))
    }
}

/// RESO Web API client. Every request, whichever endpoint it targets, passes through one
/// [`RequestGate`]. Requests are never retried here.
#[derive(Clone)]
pub struct ResoClient {
    client: Client,
    config: ResoClientConfig,
    gate: RequestGate,
}

impl ResoClient {
    pub fn new(config: ResoClientConfig) -> Result<Self, ResoClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let gate = RequestGate::per_minute(config.requests_per_minute);
        Ok(Self {
            client,
            config,
            gate,
        })
    }

    pub fn config(&self) -> &ResoClientConfig {
        &self.config
    }

    pub fn endpoint(&self, sync_type: SyncType) -> Result<&CatalogEndpoint, ResoClientError> {
        let endpoint = match sync_type {
            SyncType::Idx => Some(&self.config.idx),
            SyncType::Vow => self.config.vow.as_ref(),
        };
        endpoint
            .filter(|e| !e.url_template.is_empty() && !e.token.is_empty())
            .ok_or(ResoClientError::CatalogNotConfigured(sync_type))
    }

    /// Check that every URL a run for `sync_type` will build is well-formed, without sending
    /// anything.
    pub fn preflight(&self, sync_type: SyncType) -> Result<(), ResoClientError> {
        let endpoint = self.endpoint(sync_type)?;
        let sample = Cursor::window_start("1970-01-01T00:00:00Z");
        parse_url(&query::batch_url(&endpoint.url_template, &sample, 1))?;
        parse_url(&query::media_url(&self.config.media_url, "sample"))?;
        parse_url(&query::rooms_url(&self.config.rooms_url, "sample"))?;
        parse_url(&query::open_house_url(
            &self.config.open_house_url,
            "sample",
            Utc::now().date_naive(),
        ))?;
        Ok(())
    }

    /// Number of records after `cursor` in the catalog. Informational only.
    pub async fn count(&self, cursor: &Cursor, sync_type: SyncType) -> Result<u64, ResoClientError> {
        let endpoint = self.endpoint(sync_type)?;
        let url = query::count_url(&endpoint.url_template, cursor);
        let page = self.get_page(&url, &endpoint.token).await?;
        Ok(page.count.unwrap_or(0))
    }

    /// Next `batch_size` properties strictly after `cursor`.
    pub async fn fetch_batch(
        &self,
        cursor: &Cursor,
        batch_size: u32,
        sync_type: SyncType,
    ) -> Result<Vec<serde_json::Value>, ResoClientError> {
        let endpoint = self.endpoint(sync_type)?;
        let url = query::batch_url(&endpoint.url_template, cursor, batch_size);
        Ok(self.get_page(&url, &endpoint.token).await?.value)
    }

    pub async fn fetch_media(
        &self,
        listing_key: &str,
    ) -> Result<Vec<serde_json::Value>, ResoClientError> {
        let url = query::media_url(&self.config.media_url, listing_key);
        Ok(self.get_page(&url, &self.config.idx.token).await?.value)
    }

    pub async fn fetch_rooms(
        &self,
        listing_key: &str,
    ) -> Result<Vec<serde_json::Value>, ResoClientError> {
        let url = query::rooms_url(&self.config.rooms_url, listing_key);
        Ok(self.get_page(&url, &self.config.idx.token).await?.value)
    }

    /// Upcoming open houses (today or later) for a property.
    pub async fn fetch_open_house(
        &self,
        listing_key: &str,
    ) -> Result<Vec<serde_json::Value>, ResoClientError> {
        let url = query::open_house_url(
            &self.config.open_house_url,
            listing_key,
            Utc::now().date_naive(),
        );
        Ok(self.get_page(&url, &self.config.idx.token).await?.value)
    }

    async fn get_page(&self, raw_url: &str, token: &str) -> Result<ODataResponse, ResoClientError> {
        let url = parse_url(raw_url)?;
        self.gate.wait().await;

        tracing::debug!(path = url.path(), "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResoClientError::HttpError { status, body });
        }

        Ok(response.json::<ODataResponse>().await?)
    }
}

fn parse_url(raw: &str) -> Result<Url, ResoClientError> {
    Url::parse(raw).map_err(|e| ResoClientError::InvalidUrl(format!("{raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> ResoClientConfig {
        ResoClientConfig {
            idx: CatalogEndpoint {
                url_template: format!("{base_url}/odata/Property?ts=@lastTimestamp&key=@lastKey"),
                token: "idx-token".into(),
            },
            vow: None,
            media_url: format!("{base_url}/odata/Media"),
            rooms_url: format!("{base_url}/odata/PropertyRooms?$filter=ListingKey eq '@propertyKey'"),
            open_house_url: format!("{base_url}/odata/OpenHouse"),
            requests_per_minute: 60_000,
            timeout_secs: 5,
        }
    }

    fn cursor() -> Cursor {
        Cursor::new("2024-01-01T00:00:00Z", "X0")
    }

    #[tokio::test]
    async fn count_reads_odata_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odata/Property"))
            .and(query_param("$top", "0"))
            .and(query_param("$count", "true"))
            .and(query_param("ts", "2024-01-01T00:00:00Z"))
            .and(query_param("key", "X0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"@odata.count": 1234, "value": []})),
            )
            .mount(&server)
            .await;

        let client = ResoClient::new(test_config(&server.uri())).unwrap();
        assert_eq!(client.count(&cursor(), SyncType::Idx).await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn count_defaults_to_zero_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odata/Property"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})))
            .mount(&server)
            .await;

        let client = ResoClient::new(test_config(&server.uri())).unwrap();
        assert_eq!(client.count(&cursor(), SyncType::Idx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fetch_batch_sends_token_and_top() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odata/Property"))
            .and(query_param("$top", "2"))
            .and(header("authorization", "Bearer idx-token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"ListingKey": "X1"}, {"ListingKey": "X2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ResoClient::new(test_config(&server.uri())).unwrap();
        let batch = client.fetch_batch(&cursor(), 2, SyncType::Idx).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1]["ListingKey"], "X2");
    }

    #[tokio::test]
    async fn non_success_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odata/Property"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ResoClient::new(test_config(&server.uri())).unwrap();
        let err = client
            .fetch_batch(&cursor(), 100, SyncType::Idx)
            .await
            .unwrap_err();
        match err {
            ResoClientError::HttpError { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "try later");
            }
            other => panic!("expected HttpError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dependent_fetches_use_idx_token_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odata/Media"))
            .and(query_param(
                "$filter",
                "ResourceRecordKey eq 'X1' and MediaStatus eq 'Active' and ImageSizeDescription eq 'Largest'",
            ))
            .and(query_param("$top", "500"))
            .and(header("authorization", "Bearer idx-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"MediaKey": "M1"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/odata/PropertyRooms"))
            .and(query_param("$filter", "ListingKey eq 'X1'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"RoomKey": "R1"}, {"RoomKey": "R2"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/odata/OpenHouse"))
            .and(query_param("$orderby", "OpenHouseKey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": []
            })))
            .mount(&server)
            .await;

        let client = ResoClient::new(test_config(&server.uri())).unwrap();
        assert_eq!(client.fetch_media("X1").await.unwrap().len(), 1);
        assert_eq!(client.fetch_rooms("X1").await.unwrap().len(), 2);
        assert!(client.fetch_open_house("X1").await.unwrap().is_empty());
    }

    #[test]
    fn unconfigured_catalog_is_a_configuration_error() {
        let client = ResoClient::new(test_config("http://localhost")).unwrap();
        let err = client.endpoint(SyncType::Vow).unwrap_err();
        assert!(matches!(err, ResoClientError::CatalogNotConfigured(SyncType::Vow)));
        assert!(err.is_configuration());
        assert!(client.endpoint(SyncType::Idx).is_ok());
    }

    #[test]
    fn preflight_rejects_malformed_templates() {
        let mut config = test_config("http://localhost");
        config.rooms_url = "PropertyRooms?$filter=ListingKey eq '@propertyKey'".into();
        let client = ResoClient::new(config).unwrap();

        let err = client.preflight(SyncType::Idx).unwrap_err();
        assert!(matches!(err, ResoClientError::InvalidUrl(_)), "got: {err:?}");
    }

    #[test]
    fn preflight_accepts_defaults() {
        let mut config = test_config("https://query.ampre.ca");
        config.media_url = DEFAULT_MEDIA_URL.into();
        config.rooms_url = DEFAULT_ROOMS_URL.into();
        config.open_house_url = DEFAULT_OPEN_HOUSE_URL.into();
        let client = ResoClient::new(config).unwrap();
        assert!(client.preflight(SyncType::Idx).is_ok());
    }

    // ── Environment loading ─────────────────────────────────────

    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const RESO_VARS: &[&str] = &[
        "IDX_URL",
        "IDX_TOKEN",
        "VOW_URL",
        "VOW_TOKEN",
        "MEDIA_URL",
        "ROOMS_URL",
        "OPEN_HOUSE_URL",
        "RESO_RATE_LIMIT_PER_MINUTE",
        "RESO_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for key in RESO_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn from_env_requires_idx() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = ResoClientConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("IDX_URL"), "got: {err}");
    }

    #[test]
    fn from_env_applies_defaults() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("IDX_URL", "https://query.ampre.ca/odata/Property");
        std::env::set_var("IDX_TOKEN", "tok");

        let cfg = ResoClientConfig::from_env().unwrap();
        assert!(cfg.vow.is_none());
        assert_eq!(cfg.media_url, DEFAULT_MEDIA_URL);
        assert_eq!(cfg.rooms_url, DEFAULT_ROOMS_URL);
        assert_eq!(cfg.open_house_url, DEFAULT_OPEN_HOUSE_URL);
        assert_eq!(cfg.requests_per_minute, 120);
        assert_eq!(cfg.timeout_secs, 30);
        clear_env();
    }

    #[test]
    fn from_env_rejects_half_configured_vow() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("IDX_URL", "https://query.ampre.ca/odata/Property");
        std::env::set_var("IDX_TOKEN", "tok");
        std::env::set_var("VOW_URL", "https://query.ampre.ca/odata/Property");

        let err = ResoClientConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("VOW_TOKEN"), "got: {err}");
        clear_env();
    }

    #[test]
    fn from_env_rejects_bad_rate_limit() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("IDX_URL", "https://query.ampre.ca/odata/Property");
        std::env::set_var("IDX_TOKEN", "tok");
        std::env::set_var("RESO_RATE_LIMIT_PER_MINUTE", "fast");

        let err = ResoClientConfig::from_env().unwrap_err();
        assert!(matches!(err, MlsError::Config(_)));
        clear_env();
    }
}
