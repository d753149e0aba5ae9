//! Inhouse queue endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::state::AppState;
use crate::api::{admin_secret, ApiError};
use crate::auth::is_admin;
use crate::models::QueueEntry;
use crate::storage::QueueJoin;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedPlayer {
    pub username: String,
    pub discord_id: String,
    pub joined_at: DateTime<Utc>,
}

impl From<QueueEntry> for QueuedPlayer {
    fn from(entry: QueueEntry) -> Self {
        Self {
            username: entry.username,
            discord_id: entry.discord_id,
            joined_at: entry.joined_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub username: String,
    /// Discord id the player joins with
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

pub async fn list_queue(State(state): State<AppState>) -> Result<Json<Vec<QueuedPlayer>>, ApiError> {
    let entries = state.accounts.queue()?;
    Ok(Json(entries.into_iter().map(QueuedPlayer::from).collect()))
}

pub async fn join_queue(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<QueuedPlayer>), ApiError> {
    let username = req.username.trim();
    let discord_id = req.id.trim();
    if username.is_empty() || discord_id.is_empty() {
        return Err(ApiError::BadRequest(
            "username and id are required".to_string(),
        ));
    }

    let user = state
        .accounts
        .find_user(username)?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", username)))?;

    if let Some(linked) = user.discord_id.as_deref() {
        if linked != discord_id {
            return Err(ApiError::BadRequest(format!(
                "Discord id does not match the account linked to {}",
                user.username
            )));
        }
    }

    let capacity = state.config.queue.capacity;
    match state
        .accounts
        .join_queue(&user, discord_id.to_string(), capacity)
        .await?
    {
        QueueJoin::Joined(entry) => Ok((StatusCode::CREATED, Json(entry.into()))),
        QueueJoin::AlreadyQueued => Err(ApiError::Conflict(format!(
            "{} is already in the queue",
            user.username
        ))),
        QueueJoin::Full { capacity } => Err(ApiError::Conflict(format!(
            "Queue is full ({} players)",
            capacity
        ))),
    }
}

/// Leave by Discord id. The id is matched against linked accounts first,
/// then against the id a player joined with.
pub async fn leave_queue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = match state.accounts.find_by_discord_id(&id)? {
        Some(user) => user.id,
        None => state
            .accounts
            .queue()?
            .into_iter()
            .find(|e| e.discord_id == id)
            .map(|e| e.user_id)
            .ok_or_else(|| ApiError::NotFound(format!("No user for Discord id {}", id)))?,
    };

    if state.accounts.leave_queue(&user_id).await? {
        info!("Discord id {} left the queue", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Discord id {} is not queued", id)))
    }
}

/// Empty the queue when a match starts. Admin only.
pub async fn clear_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClearResponse>, ApiError> {
    if !is_admin(&state.config.auth, admin_secret(&headers)) {
        return Err(ApiError::Forbidden("admin secret required".to_string()));
    }

    let removed = state.accounts.clear_queue().await?;
    Ok(Json(ClearResponse { removed }))
}
