//! User account endpoints: registration, login, profile, likes and stat
//! snapshots.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::routes::stats::presented;
use crate::api::state::AppState;
use crate::api::{admin_secret, ApiError};
use crate::auth::{
    authorize_registration, hash_password_off_thread, validate_password, validate_steam_id,
    validate_username, verify_password_off_thread,
};
use crate::calculate::{aggregate, evaluate_achievements, ACHIEVEMENTS};
use crate::models::{PlayerAggregate, PublicUser, User};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
    #[serde(default)]
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Fields a user may change. An empty string clears an optional link.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steam_id: Option<String>,
    #[serde(default)]
    pub faceit_nickname: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub match_id: String,
    pub liked: bool,
    pub liked_matches: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub user: PublicUser,
    pub aggregate: Option<PlayerAggregate>,
    /// Achievements unlocked by this snapshot
    pub unlocked: Vec<String>,
}

fn not_found(username: &str) -> ApiError {
    ApiError::NotFound(format!("User {}", username))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.accounts.users()?;
    Ok(Json(users.iter().map(User::to_public).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .accounts
        .find_user(&username)?
        .ok_or_else(|| not_found(&username))?;
    Ok(Json(user.to_public()))
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;
    validate_password(&req.password)?;
    authorize_registration(
        &state.config.auth,
        req.invite_code.as_deref(),
        admin_secret(&headers),
    )?;

    let name = non_empty(req.name).unwrap_or_else(|| username.clone());
    let password_hash = hash_password_off_thread(req.password).await?;
    let user = User::new(username, name, password_hash);

    if !state.accounts.insert_user(user.clone()).await? {
        return Err(ApiError::Conflict(format!(
            "Username {} is taken",
            user.username
        )));
    }

    Ok((StatusCode::CREATED, Json(user.to_public())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = state.accounts.find_user(&req.username)?.ok_or_else(invalid)?;
    if !verify_password_off_thread(req.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let now = Utc::now();
    let (user, _) = state
        .accounts
        .update_user(&user.username, |u| u.last_login_at = Some(now))
        .await?
        .ok_or_else(invalid)?;

    info!("{} logged in", user.username);
    Ok(Json(user.to_public()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<PublicUser>, ApiError> {
    let name = match update.name {
        Some(name) if name.trim().is_empty() => {
            return Err(ApiError::BadRequest("name cannot be empty".to_string()))
        }
        other => other.map(|n| n.trim().to_string()),
    };

    let steam_id = update.steam_id.map(|s| s.trim().to_string());
    if let Some(id) = steam_id.as_deref().filter(|s| !s.is_empty()) {
        validate_steam_id(id)?;
    }
    let faceit_nickname = update.faceit_nickname.map(|s| s.trim().to_string());

    let (user, _) = state
        .accounts
        .update_user(&username, |u| {
            if let Some(name) = name {
                u.name = name;
            }
            if let Some(steam_id) = steam_id {
                u.steam_id = Some(steam_id).filter(|s| !s.is_empty());
            }
            if let Some(nickname) = faceit_nickname {
                u.faceit_nickname = Some(nickname).filter(|s| !s.is_empty());
            }
        })
        .await?
        .ok_or_else(|| not_found(&username))?;

    Ok(Json(user.to_public()))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path((username, match_id)): Path<(String, String)>,
) -> Result<Json<LikeResponse>, ApiError> {
    let (user, liked) = state
        .accounts
        .update_user(&username, |u| u.toggle_like(&match_id))
        .await?
        .ok_or_else(|| not_found(&username))?;

    Ok(Json(LikeResponse {
        match_id,
        liked,
        liked_matches: user.liked_matches,
    }))
}

/// Recompute the user's stats from their Faceit nickname's matches, keep
/// the better personal bests and record new achievement unlocks.
pub async fn snapshot(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let user = state
        .accounts
        .find_user(&username)?
        .ok_or_else(|| not_found(&username))?;

    let nickname = user.faceit_nickname.clone().ok_or_else(|| {
        ApiError::BadRequest(format!("{} has no Faceit nickname linked", user.username))
    })?;

    let matches = state.match_source.fetch_player(&nickname).await?;
    let Some(agg) = aggregate(&matches) else {
        return Ok(Json(SnapshotResponse {
            user: user.to_public(),
            aggregate: None,
            unlocked: Vec::new(),
        }));
    };

    let earned = evaluate_achievements(&agg, ACHIEVEMENTS);
    let now = Utc::now();

    let (user, unlocked) = state
        .accounts
        .update_user(&username, |u| {
            let bests = u.personal_bests.clone().unwrap_or_default();
            u.personal_bests = Some(bests.merge(&agg, now));
            u.record_unlocks(earned.iter().map(String::as_str), now)
        })
        .await?
        .ok_or_else(|| not_found(&username))?;

    if !unlocked.is_empty() {
        info!("{} unlocked {:?}", user.username, unlocked);
    }

    Ok(Json(SnapshotResponse {
        user: user.to_public(),
        aggregate: Some(presented(agg)),
        unlocked,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::test_support::*;
    use crate::models::MatchRecord;
    use crate::storage::{entity_path, EntityType};
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn register_body(username: &str, invite: Option<&str>) -> serde_json::Value {
        json!({
            "username": username,
            "name": "Dash",
            "password": PASSWORD,
            "inviteCode": invite,
        })
    }

    #[tokio::test]
    async fn test_register_with_invite() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());

        let (status, json) = send(
            build_router(state.clone()),
            Method::POST,
            "/api/users",
            Some(register_body("dasher", Some(INVITE))),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["username"], "dasher");
        assert_eq!(json["name"], "Dash");
        assert!(json.get("passwordHash").is_none());

        let stored = state.accounts.find_user("dasher").unwrap().unwrap();
        assert_ne!(stored.password_hash, PASSWORD);
    }

    #[tokio::test]
    async fn test_register_with_admin_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());

        let (status, _) = send(
            build_router(state),
            Method::POST,
            "/api/users",
            Some(register_body("dasher", None)),
            &[("x-admin-secret", ADMIN)],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "taken", None).await;

        let cases = [
            (register_body("dasher", Some("wrong")), StatusCode::FORBIDDEN),
            (register_body("ab", Some(INVITE)), StatusCode::BAD_REQUEST),
            (register_body("TAKEN", Some(INVITE)), StatusCode::CONFLICT),
            (
                json!({"username": "dasher", "password": "weakpass1", "inviteCode": INVITE}),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (body, expected) in cases {
            let (status, _) = send(
                build_router(state.clone()),
                Method::POST,
                "/api/users",
                Some(body),
                &[],
            )
            .await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn test_list_and_get_users() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "dasher", None).await;
        seed_user(&state, "vex", None).await;

        let (status, json) = get_json(build_router(state.clone()), "/api/users").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);

        let (status, json) = get_json(build_router(state), "/api/users/VEX").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["username"], "vex");
    }

    #[tokio::test]
    async fn test_login() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "dasher", None).await;

        let (status, json) = send(
            build_router(state.clone()),
            Method::POST,
            "/api/users/login",
            Some(json!({"username": "dasher", "password": PASSWORD})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!json["lastLoginAt"].is_null());

        let (status, json) = send(
            build_router(state.clone()),
            Method::POST,
            "/api/users/login",
            Some(json!({"username": "dasher", "password": "Wrong123"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(
            build_router(state),
            Method::POST,
            "/api/users/login",
            Some(json!({"username": "ghost", "password": PASSWORD})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "dasher", None).await;

        let (status, json) = send(
            build_router(state.clone()),
            Method::PATCH,
            "/api/users/dasher",
            Some(json!({"steamId": "76561198000000001", "faceitNickname": "Dasher"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["steamId"], "76561198000000001");
        assert_eq!(json["faceitNickname"], "Dasher");
        assert_eq!(json["name"], "dasher");

        let (status, _) = send(
            build_router(state.clone()),
            Method::PATCH,
            "/api/users/dasher",
            Some(json!({"steamId": "12345"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(
            build_router(state),
            Method::PATCH,
            "/api/users/dasher",
            Some(json!({"steamId": ""})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["steamId"].is_null());
    }

    #[tokio::test]
    async fn test_toggle_like() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "dasher", None).await;

        let (status, json) = send(
            build_router(state.clone()),
            Method::POST,
            "/api/users/dasher/likes/1-abc",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["liked"], true);
        assert_eq!(json["likedMatches"], json!(["1-abc"]));

        let (_, json) = send(
            build_router(state.clone()),
            Method::POST,
            "/api/users/dasher/likes/1-abc",
            None,
            &[],
        )
        .await;
        assert_eq!(json["liked"], false);

        let (status, _) = send(
            build_router(state),
            Method::POST,
            "/api/users/ghost/likes/1-abc",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_snapshot_records_bests_and_unlocks() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "dasher", None).await;
        state
            .accounts
            .update_user("dasher", |u| u.faceit_nickname = Some("Dasher".to_string()))
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        let records: Vec<MatchRecord> = (0..3)
            .map(|i| {
                MatchRecord::new("dasher", "de_mirage")
                    .with_result(20 + i, 10, true)
                    .with_date(start + Duration::days(i as i64))
            })
            .collect();
        write_jsonl(&entity_path(&state.storage, EntityType::MatchRecord), &records);

        let (status, json) = send(
            build_router(state.clone()),
            Method::POST,
            "/api/users/dasher/snapshot",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["aggregate"]["matches"], 3);
        assert_eq!(json["user"]["personalBests"]["bestKills"], 22);
        assert_eq!(json["user"]["personalBests"]["maxStreak"], 3);

        let unlocked: Vec<&str> = json["unlocked"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(unlocked.contains(&"first_match"));
        assert!(unlocked.contains(&"on_fire"));

        // A second snapshot unlocks nothing new and keeps the history.
        let (_, json) = send(
            build_router(state.clone()),
            Method::POST,
            "/api/users/dasher/snapshot",
            None,
            &[],
        )
        .await;
        assert!(json["unlocked"].as_array().unwrap().is_empty());
        let stored = state.accounts.find_user("dasher").unwrap().unwrap();
        assert_eq!(stored.achievement_history.len(), unlocked.len());
    }

    #[tokio::test]
    async fn test_snapshot_without_nickname() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "dasher", None).await;

        let (status, _) = send(
            build_router(state),
            Method::POST,
            "/api/users/dasher/snapshot",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_snapshot_with_no_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        seed_user(&state, "dasher", None).await;
        state
            .accounts
            .update_user("dasher", |u| u.faceit_nickname = Some("dasher".to_string()))
            .await
            .unwrap();

        let (status, json) = send(
            build_router(state),
            Method::POST,
            "/api/users/dasher/snapshot",
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["aggregate"].is_null());
        assert!(json["user"]["personalBests"].is_null());
    }
}
