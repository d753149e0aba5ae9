//! Statistics calculation engine.
//!
//! Computes derived metrics from raw match records:
//! - Ratios and percentages with one documented fallback policy
//! - Player aggregates (K/D, ADR, HS%, entry and clutch rates)
//! - Win streaks and per-map win rates
//! - Achievement evaluation
//!
//! Every function here is pure: inputs are borrowed, never mutated, and
//! empty input yields `None` rather than NaN-filled output.

mod achievements;
mod maps;
mod streak;

pub use achievements::*;
pub use maps::*;
pub use streak::*;

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{ClutchStat, MatchRecord, PlayerAggregate};

/// What a ratio evaluates to when its denominator is zero.
///
/// K/D uses [`RatioFallback::Numerator`], so a deathless player's K/D is
/// their kill count (equivalent to `kills / max(deaths, 1)`). Every
/// percentage uses [`RatioFallback::Zero`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioFallback {
    Numerator,
    Zero,
}

/// `numerator / denominator`, or the fallback when the denominator is not
/// positive. Never returns NaN or infinity.
pub fn compute_ratio(numerator: f64, denominator: f64, fallback: RatioFallback) -> f64 {
    let numerator = if numerator.is_finite() { numerator } else { 0.0 };
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        match fallback {
            RatioFallback::Numerator => numerator,
            RatioFallback::Zero => 0.0,
        }
    }
}

/// Kills per death.
pub fn kd_ratio(kills: u32, deaths: u32) -> f64 {
    compute_ratio(kills as f64, deaths as f64, RatioFallback::Numerator)
}

/// `part / whole * 100`, clamped to `[0, 100]`, 0 when `whole` is 0.
pub fn percent(part: u32, whole: u32) -> f64 {
    (compute_ratio(part as f64, whole as f64, RatioFallback::Zero) * 100.0).clamp(0.0, 100.0)
}

/// Round for presentation.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Aggregate a player's matches. Returns `None` for an empty slice.
pub fn aggregate(matches: &[MatchRecord]) -> Option<PlayerAggregate> {
    if matches.is_empty() {
        return None;
    }

    let mut agg = PlayerAggregate::default();
    let mut adr_sum = 0.0;
    let mut clutches = [(0u32, 0u32); 5];

    for m in matches {
        agg.matches += 1;
        if m.win {
            agg.wins += 1;
        } else {
            agg.losses += 1;
        }

        agg.kills = agg.kills.saturating_add(m.kills);
        agg.deaths = agg.deaths.saturating_add(m.deaths);
        agg.assists = agg.assists.saturating_add(m.assists);
        agg.headshot_kills = agg.headshot_kills.saturating_add(m.headshot_kills);

        let match_adr = m.effective_adr();
        adr_sum += match_adr;

        agg.best_kills = agg.best_kills.max(m.kills);
        agg.best_kd = agg.best_kd.max(kd_ratio(m.kills, m.deaths));
        agg.best_adr = agg.best_adr.max(match_adr);

        agg.entry_count = agg.entry_count.saturating_add(m.entry_count);
        agg.entry_wins = agg.entry_wins.saturating_add(m.entry_wins);

        for (total, (attempts, wins)) in clutches.iter_mut().zip(m.clutches()) {
            total.0 = total.0.saturating_add(attempts);
            total.1 = total.1.saturating_add(wins);
        }

        agg.flash_assists = agg.flash_assists.saturating_add(m.flash_assists);
        agg.enemies_flashed = agg.enemies_flashed.saturating_add(m.enemies_flashed);
        agg.utility_damage = agg.utility_damage.saturating_add(m.utility_damage());
    }

    agg.win_rate = percent(agg.wins, agg.matches);
    agg.kd = kd_ratio(agg.kills, agg.deaths);
    agg.hs_percent = percent(agg.headshot_kills, agg.kills);
    agg.adr = compute_ratio(adr_sum, agg.matches as f64, RatioFallback::Zero);
    agg.entry_win_percent = percent(agg.entry_wins, agg.entry_count);

    agg.clutches = clutches
        .iter()
        .enumerate()
        .map(|(i, &(attempts, wins))| ClutchStat {
            opponents: (i + 1) as u8,
            attempts,
            wins,
            win_percent: percent(wins, attempts),
        })
        .collect();
    agg.clutch_attempts = clutches.iter().map(|c| c.0).fold(0, u32::saturating_add);
    agg.clutch_wins = clutches.iter().map(|c| c.1).fold(0, u32::saturating_add);
    agg.clutch_win_percent = percent(agg.clutch_wins, agg.clutch_attempts);

    let streak = compute_streak(matches);
    agg.current_streak = streak.current;
    agg.max_streak = streak.max;

    Some(agg)
}

/// The `n` most recent matches, newest first. Undated records count as
/// oldest.
pub fn last_n(matches: &[MatchRecord], n: usize) -> Vec<MatchRecord> {
    let mut ordered = chronological(matches);
    ordered.reverse();
    ordered.into_iter().take(n).cloned().collect()
}

/// Aggregate for one player within a roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// Steam id, or lowercased nickname when no steam id is known
    pub key: String,
    /// Nickname from the player's most recent match
    pub nickname: String,
    pub aggregate: PlayerAggregate,
}

/// Group a roster's records by player and aggregate each group. Players
/// appear in first-seen order.
pub fn aggregate_by_player(matches: &[MatchRecord]) -> Vec<PlayerSummary> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<MatchRecord>)> = Vec::new();

    for m in matches {
        let key = m.player_key();
        match index.get(&key) {
            Some(&i) => groups[i].1.push(m.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![m.clone()]));
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|(key, records)| {
            let nickname = chronological(&records)
                .last()
                .map(|m| m.nickname.clone())
                .unwrap_or_default();
            aggregate(&records).map(|aggregate| PlayerSummary {
                key,
                nickname,
                aggregate,
            })
        })
        .collect()
}
