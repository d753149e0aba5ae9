//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PlayerAggregate, UserId};

/// Best figures a user has reached, captured at snapshot time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalBests {
    pub best_kills: u32,
    pub best_kd: f64,
    pub best_adr: f64,
    pub max_streak: u32,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl PersonalBests {
    /// Merge a fresh aggregate into these bests, keeping the better value
    /// per field. `recorded_at` moves only when something improved.
    pub fn merge(&self, aggregate: &PlayerAggregate, now: DateTime<Utc>) -> Self {
        let merged = Self {
            best_kills: self.best_kills.max(aggregate.best_kills),
            best_kd: self.best_kd.max(aggregate.best_kd),
            best_adr: self.best_adr.max(aggregate.best_adr),
            max_streak: self.max_streak.max(aggregate.max_streak),
            recorded_at: self.recorded_at,
        };

        let improved = merged.best_kills != self.best_kills
            || merged.best_kd != self.best_kd
            || merged.best_adr != self.best_adr
            || merged.max_streak != self.max_streak;

        Self {
            recorded_at: if improved { Some(now) } else { merged.recorded_at },
            ..merged
        }
    }
}

/// An achievement the user has unlocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlock {
    pub id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (derived from the lowercased username)
    pub id: UserId,

    pub username: String,

    /// Display name
    pub name: String,

    /// Salted password hash, see [`crate::auth::hash_password`]
    pub password_hash: String,

    /// Linked Discord snowflake
    #[serde(default)]
    pub discord_id: Option<String>,

    /// Linked SteamID64
    #[serde(default)]
    pub steam_id: Option<String>,

    #[serde(default)]
    pub faceit_nickname: Option<String>,

    #[serde(default)]
    pub liked_matches: Vec<String>,

    #[serde(default)]
    pub achievement_history: Vec<AchievementUnlock>,

    #[serde(default)]
    pub personal_bests: Option<PersonalBests>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new User with auto-generated ID.
    pub fn new(username: String, name: String, password_hash: String) -> Self {
        let id = Self::id_for(&username);

        Self {
            id,
            username,
            name,
            password_hash,
            discord_id: None,
            steam_id: None,
            faceit_nickname: None,
            liked_matches: Vec::new(),
            achievement_history: Vec::new(),
            personal_bests: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    /// The ID a username maps to. Usernames are unique case-insensitively.
    pub fn id_for(username: &str) -> UserId {
        UserId::for_username(username)
    }

    /// Builder method to link a Discord account.
    pub fn with_discord_id(mut self, discord_id: String) -> Self {
        self.discord_id = Some(discord_id);
        self
    }

    /// Toggle a liked match. Returns whether the match is now liked.
    pub fn toggle_like(&mut self, match_id: &str) -> bool {
        if let Some(pos) = self.liked_matches.iter().position(|m| m == match_id) {
            self.liked_matches.remove(pos);
            false
        } else {
            self.liked_matches.push(match_id.to_string());
            true
        }
    }

    /// Record achievements not already in the history. Returns the ids added.
    pub fn record_unlocks<'a, I>(&mut self, ids: I, now: DateTime<Utc>) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = Vec::new();
        for id in ids {
            if self.achievement_history.iter().any(|a| a.id == id) {
                continue;
            }
            self.achievement_history.push(AchievementUnlock {
                id: id.to_string(),
                unlocked_at: now,
            });
            added.push(id.to_string());
        }
        added
    }

    /// Public view without credentials.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            username: self.username.clone(),
            name: self.name.clone(),
            discord_id: self.discord_id.clone(),
            steam_id: self.steam_id.clone(),
            faceit_nickname: self.faceit_nickname.clone(),
            liked_matches: self.liked_matches.clone(),
            achievement_history: self.achievement_history.clone(),
            personal_bests: self.personal_bests.clone(),
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        }
    }
}

/// User as returned over the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub username: String,
    pub name: String,
    pub discord_id: Option<String>,
    pub steam_id: Option<String>,
    pub faceit_nickname: Option<String>,
    pub liked_matches: Vec<String>,
    pub achievement_history: Vec<AchievementUnlock>,
    pub personal_bests: Option<PersonalBests>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}
