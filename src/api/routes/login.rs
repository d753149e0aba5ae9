//! Discord OAuth callback.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::fetch::discord::{DiscordClient, DiscordUser};
use crate::fetch::FetchError;
use crate::models::PublicUser;
use crate::storage::DiscordLink;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    /// Username to link when the Discord account is not linked yet
    pub state: Option<String>,
    /// Set by Discord when the user denies access
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub discord: DiscordUser,
    /// Whether this login linked the Discord account
    pub linked: bool,
}

pub async fn discord_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<LoginResponse>, ApiError> {
    if let Some(error) = query.error {
        return Err(ApiError::Unauthorized(format!(
            "Discord authorization failed: {}",
            error
        )));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("code is required".to_string()))?;

    let client = DiscordClient::new(state.http.clone(), state.config.discord.clone());
    let discord = client.identify(&code).await.map_err(|e| match e {
        FetchError::HttpStatus { status: 400 | 401, .. } => {
            ApiError::Unauthorized("Discord rejected the authorization code".to_string())
        }
        other => other.into(),
    })?;

    let now = Utc::now();

    let linked_user = state
        .accounts
        .update_user_where(
            |u| u.discord_id.as_deref() == Some(discord.id.as_str()),
            |u| u.last_login_at = Some(now),
        )
        .await?;
    if let Some((user, _)) = linked_user {
        info!("{} logged in with Discord", user.username);
        return Ok(Json(LoginResponse {
            user: user.to_public(),
            discord,
            linked: false,
        }));
    }

    let username = query
        .state
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ApiError::NotFound(format!("No user linked to Discord id {}", discord.id))
        })?;

    match state.accounts.link_discord(&username, &discord.id, now).await? {
        DiscordLink::Linked(user) => Ok(Json(LoginResponse {
            user: user.to_public(),
            discord,
            linked: true,
        })),
        DiscordLink::AlreadyLinked(user) => Ok(Json(LoginResponse {
            user: user.to_public(),
            discord,
            linked: false,
        })),
        DiscordLink::OtherDiscord(user) => Err(ApiError::Conflict(format!(
            "{} is linked to a different Discord account",
            user.username
        ))),
        DiscordLink::TakenBy(owner) => Err(ApiError::Conflict(format!(
            "Discord id {} is already linked to {}",
            discord.id, owner
        ))),
        DiscordLink::UnknownUser => Err(ApiError::NotFound(format!("User {}", username))),
    }
}
