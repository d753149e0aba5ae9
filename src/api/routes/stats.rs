//! Derived player statistics, leaderboard and achievement catalog.

use std::cmp::Ordering;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{ApiError, Pagination, PaginationMeta};
use crate::calculate::{
    aggregate, aggregate_by_player, compute_map_stats, evaluate_achievements, last_n, round_to,
    ACHIEVEMENTS,
};
use crate::models::{Achievement, MapStat, MatchRecord, PlayerAggregate};

/// Decimal places for every rate and ratio in responses.
const PRESENTATION_PLACES: u32 = 2;

/// Round an aggregate's rates for display.
pub fn presented(mut agg: PlayerAggregate) -> PlayerAggregate {
    let r = |v: f64| round_to(v, PRESENTATION_PLACES);
    agg.win_rate = r(agg.win_rate);
    agg.kd = r(agg.kd);
    agg.hs_percent = r(agg.hs_percent);
    agg.adr = r(agg.adr);
    agg.best_kd = r(agg.best_kd);
    agg.best_adr = r(agg.best_adr);
    agg.entry_win_percent = r(agg.entry_win_percent);
    agg.clutch_win_percent = r(agg.clutch_win_percent);
    for clutch in &mut agg.clutches {
        clutch.win_percent = r(clutch.win_percent);
    }
    agg
}

fn presented_maps(maps: Vec<MapStat>) -> Vec<MapStat> {
    maps.into_iter()
        .map(|m| MapStat {
            win_rate: round_to(m.win_rate, PRESENTATION_PLACES),
            ..m
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct PlayerStatsQuery {
    /// Only the N most recent matches
    pub last: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PlayerStatsResponse {
    pub nickname: String,
    pub aggregate: Option<PlayerAggregate>,
    pub maps: Vec<MapStat>,
    pub achievements: Vec<String>,
}

pub async fn player_stats(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    Query(query): Query<PlayerStatsQuery>,
) -> Result<Json<PlayerStatsResponse>, ApiError> {
    let mut matches = state.match_source.fetch_player(&nickname).await?;
    if let Some(n) = query.last {
        matches = last_n(&matches, n);
    }

    let agg = aggregate(&matches);
    let achievements = agg
        .as_ref()
        .map(|a| evaluate_achievements(a, ACHIEVEMENTS).into_iter().collect())
        .unwrap_or_default();

    Ok(Json(PlayerStatsResponse {
        nickname,
        aggregate: agg.map(presented),
        maps: presented_maps(compute_map_stats(&matches)),
        achievements,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchRecord>,
    pub pagination: PaginationMeta,
}

/// A player's raw records, most recent first.
pub async fn player_matches(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<MatchesResponse>, ApiError> {
    let matches = state.match_source.fetch_player(&nickname).await?;
    let ordered = last_n(&matches, matches.len());

    let pagination = Pagination::new(query.page, query.page_size);
    let meta = PaginationMeta::new(&pagination, ordered.len() as u32);

    Ok(Json(MatchesResponse {
        matches: pagination.slice(&ordered).to_vec(),
        pagination: meta,
    }))
}

/// Leaderboard ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardSort {
    Kd,
    Adr,
    Hs,
    WinRate,
    Kills,
    Matches,
}

impl LeaderboardSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kd" => Some(Self::Kd),
            "adr" => Some(Self::Adr),
            "hs" | "hs_percent" => Some(Self::Hs),
            "winrate" | "win_rate" => Some(Self::WinRate),
            "kills" => Some(Self::Kills),
            "matches" => Some(Self::Matches),
            _ => None,
        }
    }

    fn key(&self, agg: &PlayerAggregate) -> f64 {
        match self {
            Self::Kd => agg.kd,
            Self::Adr => agg.adr,
            Self::Hs => agg.hs_percent,
            Self::WinRate => agg.win_rate,
            Self::Kills => agg.kills as f64,
            Self::Matches => agg.matches as f64,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub sort: Option<String>,
    pub min_matches: Option<u32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub nickname: String,
    pub steam_id: Option<String>,
    pub aggregate: PlayerAggregate,
}

/// Every player's aggregate, best first. Ties keep first-seen order.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let sort = match query.sort.as_deref() {
        None => LeaderboardSort::Kd,
        Some(s) => LeaderboardSort::parse(s)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort: {}", s)))?,
    };
    let min_matches = query.min_matches.unwrap_or(1);

    let records = state.match_source.fetch_all().await?;
    let mut players: Vec<_> = aggregate_by_player(&records)
        .into_iter()
        .filter(|p| p.aggregate.matches >= min_matches)
        .collect();

    players.sort_by(|a, b| {
        sort.key(&b.aggregate)
            .partial_cmp(&sort.key(&a.aggregate))
            .unwrap_or(Ordering::Equal)
    });

    let entries = players
        .into_iter()
        .take(query.limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            rank: i + 1,
            nickname: p.nickname,
            steam_id: records
                .iter()
                .find(|m| m.player_key() == p.key)
                .and_then(|m| m.steam_id.clone()),
            aggregate: presented(p.aggregate),
        })
        .collect();

    Ok(Json(entries))
}

pub async fn list_achievements() -> Json<&'static [Achievement]> {
    Json(ACHIEVEMENTS)
}
