//! Inhouse queue entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QueueEntryId, UserId};

/// A user waiting for an inhouse match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Derived from user_id + joined_at
    pub id: QueueEntryId,

    /// User this entry belongs to
    pub user_id: UserId,

    pub username: String,

    /// Discord snowflake the user joined with
    pub discord_id: String,

    pub joined_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Create a new QueueEntry joined now.
    pub fn new(user_id: UserId, username: String, discord_id: String) -> Self {
        let joined_at = Utc::now();
        Self {
            id: QueueEntryId::for_join(&user_id, joined_at),
            user_id,
            username,
            discord_id,
            joined_at,
        }
    }
}
