//! Discord OAuth: authorization-code exchange and identity lookup.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{ensure_success, FetchError};
use crate::config::DiscordConfig;

/// Token returned by the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
}

/// The authenticated Discord account (`/users/@me`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

/// Client for the configured Discord application.
pub struct DiscordClient {
    client: Client,
    config: DiscordConfig,
}

impl DiscordClient {
    pub fn new(client: Client, config: DiscordConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        let base = self.config.api_base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path))?)
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<DiscordToken, FetchError> {
        if !self.config.is_configured() {
            return Err(FetchError::NotConfigured("discord.client_id".to_string()));
        }

        let url = self.endpoint("oauth2/token")?;
        debug!("Exchanging Discord authorization code");

        let response = self
            .client
            .post(url)
            .form(&TokenRequest {
                grant_type: "authorization_code",
                code,
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                redirect_uri: &self.config.redirect_uri,
            })
            .send()
            .await?;

        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Identity of the token's owner.
    pub async fn fetch_current_user(&self, access_token: &str) -> Result<DiscordUser, FetchError> {
        let url = self.endpoint("users/@me")?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Code exchange followed by identity lookup.
    pub async fn identify(&self, code: &str) -> Result<DiscordUser, FetchError> {
        let token = self.exchange_code(code).await?;
        let user = self.fetch_current_user(&token.access_token).await?;
        info!("Discord login for {} ({})", user.username, user.id);
        Ok(user)
    }
}
