//! Read-only Azure blob access for the test environment.
//!
//! Blobs are addressed as `<container>/<division>/<season>/<name>`, with
//! the SAS token appended as the query string. Division and season travel
//! with each request in a [`DivisionContext`].

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::{get_json, FetchError};
use crate::config::TestingConfig;

/// A path segment that is not a plain name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {value:?}")]
pub struct InvalidSegment {
    pub field: &'static str,
    pub value: String,
}

/// Letters, digits, `-`, `_` and `.`, but not `.` or `..`.
pub fn is_plain_segment(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s.len() <= 64
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn checked(field: &'static str, value: Option<String>) -> Result<Option<String>, InvalidSegment> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) if !is_plain_segment(&v) => Err(InvalidSegment { field, value: v }),
        other => Ok(other),
    }
}

/// Which division and season a blob request is for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DivisionContext {
    pub division: Option<String>,
    pub season: Option<String>,
}

impl DivisionContext {
    /// Take division and season from the request, falling back to the
    /// configured defaults per field.
    pub fn resolve(
        division: Option<String>,
        season: Option<String>,
        defaults: &TestingConfig,
    ) -> Result<Self, InvalidSegment> {
        Ok(Self {
            division: checked("division", division.or_else(|| defaults.default_division.clone()))?,
            season: checked("season", season.or_else(|| defaults.default_season.clone()))?,
        })
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.division.iter().chain(self.season.iter()).map(String::as_str)
    }
}

/// Blob container reached through a SAS token.
pub struct BlobClient {
    client: Client,
    container: Url,
    sas_token: String,
}

impl BlobClient {
    pub fn new(client: Client, config: &TestingConfig) -> Result<Self, FetchError> {
        let container = Url::parse(config.blob_base_url.trim_end_matches('/'))?;
        if container.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(config.blob_base_url.clone()));
        }
        Ok(Self {
            client,
            container,
            sas_token: config.sas_token.trim_start_matches('?').to_string(),
        })
    }

    /// Full URL for `name` (`/`-separated, each part a plain segment) in the
    /// given context.
    pub fn blob_url(&self, context: &DivisionContext, name: &str) -> Result<Url, FetchError> {
        let mut url = self.container.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| FetchError::InvalidUrl(self.container.to_string()))?;
            path.pop_if_empty();
            path.extend(context.segments());
            for part in name.split('/') {
                if !is_plain_segment(part) {
                    return Err(FetchError::InvalidUrl(name.to_string()));
                }
                path.push(part);
            }
        }
        if !self.sas_token.is_empty() {
            url.set_query(Some(&self.sas_token));
        }
        Ok(url)
    }

    /// Fetch and decode a JSON blob.
    pub async fn fetch_json(&self, context: &DivisionContext, name: &str) -> Result<Value, FetchError> {
        let url = self.blob_url(context, name)?;
        debug!(
            "Fetching blob {} (division {:?}, season {:?})",
            name, context.division, context.season
        );
        get_json(&self.client, &url).await
    }
}
