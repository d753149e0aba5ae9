//! Typed record identifiers.
//!
//! Ids are the first 16 hex characters of a SHA-256 over `|`-joined
//! fields, so the same inputs always map to the same id.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

fn digest(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(field.as_bytes());
    }
    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(16);
    hash
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

typed_id!(
    /// Account id. Derived from the lowercased username, which makes
    /// usernames unique case-insensitively.
    UserId
);

typed_id!(
    /// Queue entry id, unique per user and join instant.
    QueueEntryId
);

impl UserId {
    pub fn for_username(username: &str) -> Self {
        Self(digest(&["user", &username.trim().to_lowercase()]))
    }
}

impl QueueEntryId {
    pub fn for_join(user_id: &UserId, joined_at: DateTime<Utc>) -> Self {
        let nanos = joined_at.timestamp_nanos_opt().unwrap_or_default();
        Self(digest(&["queue", user_id.as_str(), &nanos.to_string()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_user_id_ignores_case_and_padding() {
        assert_eq!(UserId::for_username("Dasher"), UserId::for_username(" dasher "));
        assert_ne!(UserId::for_username("dasher"), UserId::for_username("dancer"));
    }

    #[test]
    fn test_field_separator_matters() {
        assert_ne!(digest(&["ab", "c"]), digest(&["a", "bc"]));
    }

    #[test]
    fn test_id_shape() {
        let id = UserId::for_username("dasher");
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", id));
    }

    #[test]
    fn test_queue_entry_id_per_join() {
        let user = UserId::for_username("dasher");
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(QueueEntryId::for_join(&user, at), QueueEntryId::for_join(&user, at));
        assert_ne!(
            QueueEntryId::for_join(&user, at),
            QueueEntryId::for_join(&user, at + Duration::seconds(1))
        );
    }
}
