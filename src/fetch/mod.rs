//! Outbound HTTP and match-record sources.
//!
//! Every client built here carries the configured request and connect
//! timeouts. Match records are reached through the [`MatchSource`] trait so
//! the API can serve from a remote JSON feed or a local JSONL file.

pub mod azure;
pub mod discord;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{AppConfig, MatchSourceKind, UpstreamConfig};
use crate::models::MatchRecord;
use crate::storage::{EntityType, JsonlReader, JsonlWriter, StorageConfig, StorageError};

/// Errors that can occur talking to upstream services.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Upstream timed out: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),
}

/// Request URLs can carry credentials in their query (SAS tokens), so the
/// URL is dropped before an error is kept or displayed.
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else {
            FetchError::Http(err)
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}

/// `url` without its query string, for logging.
pub(crate) fn loggable(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

/// Build an HTTP client with the configured timeouts and user agent.
pub fn build_client(config: &UpstreamConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("inhouse-stats")),
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .default_headers(headers)
        .build()?;

    Ok(client)
}

/// Fail with [`FetchError::HttpStatus`] on a non-2xx response.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        status.canonical_reason().unwrap_or("Unknown").to_string()
    } else {
        body.chars().take(200).collect()
    };
    Err(FetchError::HttpStatus {
        status: status.as_u16(),
        message,
    })
}

/// GET a URL and decode its JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
) -> Result<T, FetchError> {
    debug!("GET {}", loggable(url));
    let response = ensure_success(client.get(url.as_str()).send().await?).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode a JSON array of match records, skipping elements that are not
/// objects.
pub fn parse_match_array(value: serde_json::Value) -> Result<Vec<MatchRecord>, FetchError> {
    let serde_json::Value::Array(items) = value else {
        return Err(FetchError::UnexpectedPayload(
            "expected a JSON array of match records".to_string(),
        ));
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<MatchRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping match record {}: {}", i, e),
        }
    }
    Ok(records)
}

/// A source of raw match records.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Every available record.
    async fn fetch_all(&self) -> Result<Vec<MatchRecord>, FetchError>;

    /// Records for one player (case-insensitive nickname).
    async fn fetch_player(&self, nickname: &str) -> Result<Vec<MatchRecord>, FetchError> {
        let all = self.fetch_all().await?;
        Ok(all.into_iter().filter(|m| m.is_player(nickname)).collect())
    }
}

/// Remote JSON array of match records.
pub struct HttpMatchSource {
    client: Client,
    url: Url,
}

impl HttpMatchSource {
    pub fn new(client: Client, url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
        })
    }
}

#[async_trait]
impl MatchSource for HttpMatchSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_all(&self) -> Result<Vec<MatchRecord>, FetchError> {
        let value: serde_json::Value = get_json(&self.client, &self.url).await?;
        let records = parse_match_array(value)?;
        debug!(
            "Fetched {} match records from {}",
            records.len(),
            loggable(&self.url)
        );
        Ok(records)
    }
}

/// Local `matches/matches.jsonl` under the data directory.
pub struct JsonlMatchSource {
    storage: Arc<StorageConfig>,
}

impl JsonlMatchSource {
    pub fn new(storage: Arc<StorageConfig>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl MatchSource for JsonlMatchSource {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn fetch_all(&self) -> Result<Vec<MatchRecord>, FetchError> {
        Ok(JsonlReader::for_entity(&self.storage, EntityType::MatchRecord).read_all()?)
    }

    async fn fetch_player(&self, nickname: &str) -> Result<Vec<MatchRecord>, FetchError> {
        Ok(JsonlReader::<MatchRecord>::for_entity(&self.storage, EntityType::MatchRecord)
            .read_where(|m| m.is_player(nickname))?)
    }
}

/// The match source selected by `matches.source`.
pub fn match_source_from_config(
    config: &AppConfig,
    storage: Arc<StorageConfig>,
    client: Client,
) -> Result<Arc<dyn MatchSource>, FetchError> {
    match config.matches.source {
        MatchSourceKind::Jsonl => Ok(Arc::new(JsonlMatchSource::new(storage))),
        MatchSourceKind::Http => {
            let url = config
                .matches
                .url
                .as_deref()
                .ok_or_else(|| FetchError::NotConfigured("matches.url".to_string()))?;
            Ok(Arc::new(HttpMatchSource::new(client, url)?))
        }
    }
}

/// Pull every record from `source` into the local matches file, replacing
/// its contents. Returns the number of records written.
pub async fn sync_matches(
    source: &dyn MatchSource,
    storage: &StorageConfig,
) -> Result<usize, FetchError> {
    info!("Syncing match records from {} source", source.name());
    let records = source.fetch_all().await?;
    let written = JsonlWriter::for_entity(storage, EntityType::MatchRecord).write_all(&records)?;
    info!("Stored {} match records", written);
    Ok(written)
}


#[cfg(test)]
mod tests {
    use super::test_support::spawn_upstream;
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    fn upstream_config() -> UpstreamConfig {
        UpstreamConfig {
            timeout_seconds: 2,
            connect_timeout_seconds: 1,
            user_agent: "inhouse-stats-test".to_string(),
        }
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(&upstream_config()).is_ok());
    }

    #[test]
    fn test_parse_match_array_skips_non_objects() {
        let value = json!([
            {"nickname": "dasher", "map": "de_mirage", "kills": "21", "win": 1},
            "garbage",
            {"nickname": "dasher", "map": "de_nuke", "kills": null}
        ]);

        let records = parse_match_array(value).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kills, 21);
        assert!(records[0].win);
        assert_eq!(records[1].kills, 0);
    }

    #[test]
    fn test_parse_match_array_rejects_object() {
        assert!(matches!(
            parse_match_array(json!({"matches": []})),
            Err(FetchError::UnexpectedPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_http_source_fetch_player() {
        let app = Router::new().route(
            "/matches.json",
            get(|| async {
                Json(json!([
                    {"nickname": "Dasher", "map": "de_dust2", "kills": 20, "deaths": 10, "win": true},
                    {"nickname": "other", "map": "de_dust2", "kills": 5, "deaths": 10, "win": false}
                ]))
            }),
        );
        let base = spawn_upstream(app).await;

        let client = build_client(&upstream_config()).unwrap();
        let source = HttpMatchSource::new(client, &format!("{}/matches.json", base)).unwrap();

        assert_eq!(source.fetch_all().await.unwrap().len(), 2);
        let mine = source.fetch_player("dasher").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].kills, 20);
    }

    #[tokio::test]
    async fn test_http_source_maps_status_errors() {
        let app = Router::new();
        let base = spawn_upstream(app).await;

        let client = build_client(&upstream_config()).unwrap();
        let source = HttpMatchSource::new(client, &format!("{}/missing", base)).unwrap();

        match source.fetch_all().await {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected HttpStatus, got {:?}", other.map(|v| v.len())),
        }
    }

    #[tokio::test]
    async fn test_http_source_timeout() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!([]))
            }),
        );
        let base = spawn_upstream(app).await;

        let client = build_client(&UpstreamConfig {
            timeout_seconds: 1,
            ..upstream_config()
        })
        .unwrap();
        let source = HttpMatchSource::new(client, &format!("{}/slow", base)).unwrap();

        assert!(matches!(
            source.fetch_all().await,
            Err(FetchError::Timeout(_))
        ));
    }

    #[test]
    fn test_loggable_drops_query() {
        let url = Url::parse("https://blob.example.com/c/d1/data.json?sv=2024&sig=abc").unwrap();
        assert_eq!(loggable(&url), "https://blob.example.com/c/d1/data.json");
    }

    #[tokio::test]
    async fn test_connection_error_omits_url() {
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let client = build_client(&upstream_config()).unwrap();
        let url = Url::parse(&format!("http://{}/data.json?sig=TOPSECRETSIG", addr)).unwrap();
        let err = get_json::<serde_json::Value>(&client, &url).await.unwrap_err();

        assert!(matches!(err, FetchError::Http(_)));
        assert!(!err.to_string().contains("TOPSECRETSIG"));
    }

    #[test]
    fn test_http_source_invalid_url() {
        let client = build_client(&upstream_config()).unwrap();
        assert!(matches!(
            HttpMatchSource::new(client, "not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_jsonl_source_and_sync() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(StorageConfig::new(dir.path().to_path_buf()));
        let local = JsonlMatchSource::new(storage.clone());

        assert!(local.fetch_all().await.unwrap().is_empty());

        let app = Router::new().route(
            "/matches.json",
            get(|| async {
                Json(json!([
                    {"nickname": "dasher", "map": "de_inferno", "kills": 18, "win": "win"},
                    {"nickname": "vex", "map": "de_inferno", "kills": 9, "win": "loss"}
                ]))
            }),
        );
        let base = spawn_upstream(app).await;
        let client = build_client(&upstream_config()).unwrap();
        let remote = HttpMatchSource::new(client, &format!("{}/matches.json", base)).unwrap();

        assert_eq!(sync_matches(&remote, &storage).await.unwrap(), 2);

        let dasher = local.fetch_player("DASHER").await.unwrap();
        assert_eq!(dasher.len(), 1);
        assert!(dasher[0].win);
    }

    #[test]
    fn test_match_source_from_config() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(StorageConfig::new(dir.path().to_path_buf()));
        let client = build_client(&upstream_config()).unwrap();

        let mut config = AppConfig::default();
        let source = match_source_from_config(&config, storage.clone(), client.clone()).unwrap();
        assert_eq!(source.name(), "jsonl");

        config.matches.source = MatchSourceKind::Http;
        assert!(matches!(
            match_source_from_config(&config, storage.clone(), client.clone()),
            Err(FetchError::NotConfigured(_))
        ));

        config.matches.url = Some("https://stats.example.com/matches.json".to_string());
        let source = match_source_from_config(&config, storage, client).unwrap();
        assert_eq!(source.name(), "http");
    }
}
