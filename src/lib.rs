//! # Inhouse Stats
//!
//! CS2 inhouse league stats service.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (match records, aggregates, users, queue)
//! - **calculate**: Derived metrics (K/D, ADR, streaks, map win rates, achievements)
//! - **storage**: JSONL collections under the data directory
//! - **auth**: Password policy, hashing and registration gating
//! - **fetch**: Match-record sources, Discord OAuth and the blob proxy client
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod auth;
pub mod calculate;
pub mod config;
pub mod fetch;
pub mod models;
pub mod storage;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
/// Zero-length durations are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier): (&str, u64) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    num.checked_mul(multiplier)
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
}
