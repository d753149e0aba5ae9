//! User and inhouse queue collections.
//!
//! Both collections are small and rewritten whole on every change. All
//! read-modify-write sequences go through one async mutex so that checks
//! such as "user is not already queued" hold under concurrent requests.
//! Plain reads skip the lock; writes replace files atomically.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{QueueEntry, User, UserId};

use super::{EntityType, JsonlReader, JsonlWriter, StorageConfig, StorageError};

/// Result of a queue join attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueJoin {
    Joined(QueueEntry),
    AlreadyQueued,
    Full { capacity: usize },
}

/// Result of linking a Discord account to a user.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscordLink {
    /// Newly linked
    Linked(User),
    /// The user was already linked to this Discord id
    AlreadyLinked(User),
    /// The user is linked to a different Discord id
    OtherDiscord(User),
    /// The Discord id belongs to another user
    TakenBy(String),
    UnknownUser,
}

/// Users and queue backed by JSONL files.
#[derive(Debug)]
pub struct AccountStore {
    config: Arc<StorageConfig>,
    write_lock: Mutex<()>,
}

impl AccountStore {
    pub fn new(config: Arc<StorageConfig>) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn user_reader(&self) -> JsonlReader<User> {
        JsonlReader::for_entity(&self.config, EntityType::User)
    }

    fn user_writer(&self) -> JsonlWriter<User> {
        JsonlWriter::for_entity(&self.config, EntityType::User)
    }

    fn queue_reader(&self) -> JsonlReader<QueueEntry> {
        JsonlReader::for_entity(&self.config, EntityType::QueueEntry)
    }

    fn queue_writer(&self) -> JsonlWriter<QueueEntry> {
        JsonlWriter::for_entity(&self.config, EntityType::QueueEntry)
    }

    // ── Users ───────────────────────────────────────────────────

    /// All users in registration order.
    pub fn users(&self) -> Result<Vec<User>, StorageError> {
        self.user_reader().read_all()
    }

    /// Find a user by username (case-insensitive).
    pub fn find_user(&self, username: &str) -> Result<Option<User>, StorageError> {
        let id = User::id_for(username);
        Ok(self.users()?.into_iter().find(|u| u.id == id))
    }

    /// Find the user linked to a Discord id.
    pub fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .users()?
            .into_iter()
            .find(|u| u.discord_id.as_deref() == Some(discord_id)))
    }

    /// Insert a new user. Returns `false` when the username is taken.
    pub async fn insert_user(&self, user: User) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut users = self.users()?;
        if users.iter().any(|u| u.id == user.id) {
            return Ok(false);
        }

        info!("Registering user {}", user.username);
        users.push(user);
        self.user_writer().write_all(&users)?;
        Ok(true)
    }

    /// Apply `f` to the first user matching `predicate` and persist it.
    /// Returns the updated user and `f`'s result, or `None` if no user
    /// matched.
    pub async fn update_user_where<P, F, R>(
        &self,
        predicate: P,
        f: F,
    ) -> Result<Option<(User, R)>, StorageError>
    where
        P: Fn(&User) -> bool,
        F: FnOnce(&mut User) -> R,
    {
        let _guard = self.write_lock.lock().await;

        let mut users = self.users()?;
        let Some(pos) = users.iter().position(|u| predicate(u)) else {
            return Ok(None);
        };

        let result = f(&mut users[pos]);
        let updated = users[pos].clone();
        self.user_writer().write_all(&users)?;
        Ok(Some((updated, result)))
    }

    /// Apply `f` to the user with the given username.
    pub async fn update_user<F, R>(
        &self,
        username: &str,
        f: F,
    ) -> Result<Option<(User, R)>, StorageError>
    where
        F: FnOnce(&mut User) -> R,
    {
        let id: UserId = User::id_for(username);
        self.update_user_where(|u| u.id == id, f).await
    }

    /// Link `discord_id` to `username`, recording a login at `now` on
    /// success. The "one user per Discord id" check and the write share a
    /// single lock.
    pub async fn link_discord(
        &self,
        username: &str,
        discord_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DiscordLink, StorageError> {
        let _guard = self.write_lock.lock().await;

        let id = User::id_for(username);
        let mut users = self.users()?;
        if let Some(owner) = users
            .iter()
            .find(|u| u.id != id && u.discord_id.as_deref() == Some(discord_id))
        {
            return Ok(DiscordLink::TakenBy(owner.username.clone()));
        }
        let Some(pos) = users.iter().position(|u| u.id == id) else {
            return Ok(DiscordLink::UnknownUser);
        };

        let user = &mut users[pos];
        let already = match user.discord_id.as_deref() {
            Some(existing) if existing == discord_id => true,
            Some(_) => return Ok(DiscordLink::OtherDiscord(user.clone())),
            None => false,
        };
        user.discord_id = Some(discord_id.to_string());
        user.last_login_at = Some(now);
        let updated = user.clone();
        self.user_writer().write_all(&users)?;

        info!("Linked Discord {} to {}", discord_id, updated.username);
        Ok(if already {
            DiscordLink::AlreadyLinked(updated)
        } else {
            DiscordLink::Linked(updated)
        })
    }

    // ── Queue ───────────────────────────────────────────────────

    /// Queue entries in join order.
    pub fn queue(&self) -> Result<Vec<QueueEntry>, StorageError> {
        let mut entries = self.queue_reader().read_all()?;
        entries.sort_by_key(|e| e.joined_at);
        Ok(entries)
    }

    /// Add a user to the queue unless already queued or at capacity.
    pub async fn join_queue(
        &self,
        user: &User,
        discord_id: String,
        capacity: usize,
    ) -> Result<QueueJoin, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.queue()?;
        if entries.iter().any(|e| e.user_id == user.id) {
            return Ok(QueueJoin::AlreadyQueued);
        }
        if entries.len() >= capacity {
            return Ok(QueueJoin::Full { capacity });
        }

        let entry = QueueEntry::new(user.id.clone(), user.username.clone(), discord_id);
        entries.push(entry.clone());
        self.queue_writer().write_all(&entries)?;

        info!(
            "{} joined the queue ({}/{})",
            user.username,
            entries.len(),
            capacity
        );
        Ok(QueueJoin::Joined(entry))
    }

    /// Remove a user's entries. Returns `false` when they were not queued.
    pub async fn leave_queue(&self, user_id: &UserId) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.queue()?;
        let before = entries.len();
        entries.retain(|e| &e.user_id != user_id);
        if entries.len() == before {
            return Ok(false);
        }

        self.queue_writer().write_all(&entries)?;
        Ok(true)
    }

    /// Empty the queue (a match has started). Returns how many were removed.
    pub async fn clear_queue(&self) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().await;

        let removed = self.queue()?.len();
        self.queue_writer().write_all(&[])?;
        info!("Cleared {} queue entries", removed);
        Ok(removed)
    }
}
