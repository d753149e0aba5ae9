//! Account credentials and registration rules.
//!
//! - Username and password policy
//! - Salted, iterated SHA-256 password hashes
//! - Invite code / admin secret gating for registration
//! - SteamID64 validation

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 8;

const HASH_SCHEME: &str = "sha256";
const DEFAULT_ROUNDS: u32 = 10_000;

/// Credential and registration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username must be at least 3 characters")]
    UsernameTooShort,

    #[error("Username must be at most 32 characters")]
    UsernameTooLong,

    #[error("Username may only contain letters, digits, '_', '-' and '.'")]
    UsernameInvalid,

    #[error("Password must be at least 8 characters")]
    PasswordTooShort,

    #[error("Password must contain an uppercase letter, a lowercase letter and a digit")]
    PasswordTooWeak,

    #[error("Invalid invite code")]
    InvalidInvite,

    #[error("Not a SteamID64: {0}")]
    InvalidSteamId(String),

    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Password hashing task failed")]
    HashTaskFailed,
}

/// Check username length and charset.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(AuthError::UsernameTooShort);
    }
    if len > MAX_USERNAME_LEN {
        return Err(AuthError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AuthError::UsernameInvalid);
    }
    Ok(())
}

/// Password policy: at least 8 characters with upper, lower and digit.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(AuthError::PasswordTooWeak);
    }
    Ok(())
}

fn steam_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^7656119\d{10}$").expect("valid SteamID64 regex"))
}

/// Check a SteamID64 (17 digits, individual-account universe prefix).
pub fn validate_steam_id(steam_id: &str) -> Result<(), AuthError> {
    if steam_id_pattern().is_match(steam_id.trim()) {
        Ok(())
    } else {
        Err(AuthError::InvalidSteamId(steam_id.to_string()))
    }
}

/// Registration is allowed with a configured invite code, or with the
/// admin secret header.
pub fn authorize_registration(
    config: &AuthConfig,
    invite_code: Option<&str>,
    admin_secret: Option<&str>,
) -> Result<(), AuthError> {
    if let (Some(expected), Some(given)) = (config.admin_secret.as_deref(), admin_secret) {
        if !expected.is_empty() && constant_time_eq(expected.as_bytes(), given.as_bytes()) {
            return Ok(());
        }
    }

    if let Some(code) = invite_code.map(str::trim).filter(|c| !c.is_empty()) {
        if config
            .invite_codes
            .iter()
            .any(|valid| constant_time_eq(valid.as_bytes(), code.as_bytes()))
        {
            return Ok(());
        }
    }

    Err(AuthError::InvalidInvite)
}

/// Whether a header value matches the configured admin secret.
pub fn is_admin(config: &AuthConfig, admin_secret: Option<&str>) -> bool {
    match (config.admin_secret.as_deref(), admin_secret) {
        (Some(expected), Some(given)) if !expected.is_empty() => {
            constant_time_eq(expected.as_bytes(), given.as_bytes())
        }
        _ => false,
    }
}

fn digest(salt: &str, password: &str, rounds: u32) -> String {
    let mut hash = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..rounds {
        hash = Sha256::new()
            .chain_update(hash)
            .chain_update(salt.as_bytes())
            .finalize();
    }
    hex::encode(hash)
}

/// Hash a password as `sha256$<rounds>$<salt>$<hex digest>` with a fresh
/// random salt.
pub fn hash_password(password: &str) -> String {
    hash_password_with_rounds(password, DEFAULT_ROUNDS)
}

pub fn hash_password_with_rounds(password: &str, rounds: u32) -> String {
    let rounds = rounds.max(1);
    let salt = Uuid::new_v4().simple().to_string();
    let hash = digest(&salt, password, rounds);
    format!("{}${}${}${}", HASH_SCHEME, rounds, salt, hash)
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, rounds, salt, expected] = parts.as_slice() else {
        return Err(AuthError::MalformedHash);
    };
    if *scheme != HASH_SCHEME {
        return Err(AuthError::MalformedHash);
    }
    let rounds: u32 = rounds.parse().map_err(|_| AuthError::MalformedHash)?;
    let actual = digest(salt, password, rounds.max(1));
    Ok(constant_time_eq(actual.as_bytes(), expected.as_bytes()))
}

/// [`hash_password`] on the blocking thread pool.
pub async fn hash_password_off_thread(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_| AuthError::HashTaskFailed)
}

/// [`verify_password`] on the blocking thread pool.
pub async fn verify_password_off_thread(
    password: String,
    stored: String,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|_| AuthError::HashTaskFailed)?
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            invite_codes: vec!["LAN-2025".to_string()],
            admin_secret: Some("s3cret".to_string()),
        }
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username("ab"), Err(AuthError::UsernameTooShort));
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("dash_er-1.0").is_ok());
        assert_eq!(validate_username("dash er"), Err(AuthError::UsernameInvalid));
        assert_eq!(
            validate_username(&"x".repeat(33)),
            Err(AuthError::UsernameTooLong)
        );
    }

    #[test]
    fn test_password_policy() {
        assert_eq!(validate_password("Ab1"), Err(AuthError::PasswordTooShort));
        assert_eq!(validate_password("abcdefgh1"), Err(AuthError::PasswordTooWeak));
        assert_eq!(validate_password("ABCDEFGH1"), Err(AuthError::PasswordTooWeak));
        assert_eq!(validate_password("Abcdefghi"), Err(AuthError::PasswordTooWeak));
        assert!(validate_password("Abcdefg1").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password_with_rounds("Hunter22", 50);
        assert!(hash.starts_with("sha256$50$"));
        assert!(verify_password("Hunter22", &hash).unwrap());
        assert!(!verify_password("hunter22", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_hash_and_verify_off_thread() {
        let stored = hash_password_off_thread("Hunter22".to_string()).await.unwrap();
        assert!(stored.starts_with("sha256$10000$"));
        assert!(verify_password_off_thread("Hunter22".to_string(), stored.clone())
            .await
            .unwrap());
        assert!(!verify_password_off_thread("hunter22".to_string(), stored)
            .await
            .unwrap());
        assert_eq!(
            verify_password_off_thread("x".to_string(), "plain".to_string()).await,
            Err(AuthError::MalformedHash)
        );
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password_with_rounds("Hunter22", 10);
        let b = hash_password_with_rounds("Hunter22", 10);
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_malformed_hash() {
        assert_eq!(
            verify_password("x", "not-a-hash"),
            Err(AuthError::MalformedHash)
        );
        assert_eq!(
            verify_password("x", "md5$1$salt$abc"),
            Err(AuthError::MalformedHash)
        );
        assert_eq!(
            verify_password("x", "sha256$many$salt$abc"),
            Err(AuthError::MalformedHash)
        );
    }

    #[test]
    fn test_registration_gate() {
        let config = auth_config();
        assert!(authorize_registration(&config, Some("LAN-2025"), None).is_ok());
        assert!(authorize_registration(&config, Some(" LAN-2025 "), None).is_ok());
        assert!(authorize_registration(&config, None, Some("s3cret")).is_ok());
        assert_eq!(
            authorize_registration(&config, Some("nope"), Some("wrong")),
            Err(AuthError::InvalidInvite)
        );
        assert_eq!(
            authorize_registration(&config, None, None),
            Err(AuthError::InvalidInvite)
        );
    }

    #[test]
    fn test_empty_admin_secret_never_matches() {
        let config = AuthConfig {
            admin_secret: Some(String::new()),
            ..Default::default()
        };
        assert!(!is_admin(&config, Some("")));
        assert!(authorize_registration(&config, None, Some("")).is_err());
    }

    #[test]
    fn test_steam_id() {
        assert!(validate_steam_id("76561198000000001").is_ok());
        assert!(validate_steam_id("12345").is_err());
        assert!(validate_steam_id("7656119800000000x").is_err());
    }
}
