//! Configuration loading and validation.
//!
//! Settings come from an optional TOML file overlaid with environment
//! variables prefixed `INHOUSE__` (`INHOUSE__DISCORD__CLIENT_SECRET`,
//! `INHOUSE__AUTH__INVITE_CODES=a,b`). Secrets are expected from the
//! environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Failed to render config: {0}")]
    RenderError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Registration gating.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Codes that allow self-registration
    #[serde(default)]
    pub invite_codes: Vec<String>,

    /// Value of the `x-admin-secret` header that bypasses invite codes
    #[serde(default)]
    pub admin_secret: Option<String>,
}

/// Inhouse queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of queued players
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

fn default_queue_capacity() -> usize {
    10
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

/// Where match records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchSourceKind {
    /// Local `matches/matches.jsonl` under the data dir
    #[default]
    Jsonl,
    /// Remote JSON array at `matches.url`
    Http,
}

/// Match record source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchesConfig {
    #[serde(default)]
    pub source: MatchSourceKind,

    /// URL returning a JSON array of match records
    #[serde(default)]
    pub url: Option<String>,
}

/// Outbound HTTP settings shared by every upstream client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("inhouse-stats/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Discord OAuth application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub redirect_uri: String,

    #[serde(default = "default_discord_api")]
    pub api_base_url: String,
}

fn default_discord_api() -> String {
    "https://discord.com/api/v10".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            api_base_url: default_discord_api(),
        }
    }
}

impl DiscordConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Test-environment blob proxy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestingConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Container URL, e.g. `https://<account>.blob.core.windows.net/<container>`
    #[serde(default)]
    pub blob_base_url: String,

    /// SAS token query string (with or without leading `?`)
    #[serde(default)]
    pub sas_token: String,

    #[serde(default)]
    pub default_division: Option<String>,

    #[serde(default)]
    pub default_season: Option<String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub matches: MatchesConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub testing: TestingConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            queue: QueueConfig::default(),
            matches: MatchesConfig::default(),
            upstream: UpstreamConfig::default(),
            discord: DiscordConfig::default(),
            testing: TestingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from an optional TOML file plus `INHOUSE__*` environment
    /// variables. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix("INHOUSE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("auth.invite_codes"),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.upstream.timeout_seconds == 0 || self.upstream.connect_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Upstream timeouts must be greater than 0".to_string(),
            ));
        }

        if self.queue.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.matches.source == MatchSourceKind::Http
            && self.matches.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::ValidationError(
                "matches.url is required when matches.source = \"http\"".to_string(),
            ));
        }

        if self.testing.enabled && self.testing.blob_base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "testing.blob_base_url is required when testing is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        let mask = |s: &mut String| {
            if !s.is_empty() {
                *s = "********".to_string();
            }
        };
        if let Some(secret) = redacted.auth.admin_secret.as_mut() {
            mask(secret);
        }
        redacted.auth.invite_codes.iter_mut().for_each(mask);
        mask(&mut redacted.discord.client_secret);
        mask(&mut redacted.testing.sas_token);
        Ok(toml::to_string(&redacted)?)
    }
}
