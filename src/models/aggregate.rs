//! Derived statistics models.
//!
//! Nothing here is persisted; every value is recomputed from a slice of
//! [`MatchRecord`](super::MatchRecord)s on request.

use serde::{Deserialize, Serialize};

/// Clutch results for one "1 vs N" situation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClutchStat {
    /// Number of opponents (1..=5)
    pub opponents: u8,
    pub attempts: u32,
    pub wins: u32,
    /// Win percentage (0.0 to 100.0)
    pub win_percent: f64,
}

/// Consecutive-win streaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    /// Run still open at the most recent match
    pub current: u32,
    /// Longest run observed
    pub max: u32,
}

/// Aggregated statistics for one player over a set of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAggregate {
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    /// Win percentage (0.0 to 100.0)
    pub win_rate: f64,

    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub headshot_kills: u32,
    pub kd: f64,
    /// Headshot percentage of kills (0.0 to 100.0)
    pub hs_percent: f64,
    /// Mean of per-match ADR
    pub adr: f64,

    pub current_streak: u32,
    pub max_streak: u32,

    pub best_kills: u32,
    #[serde(rename = "bestKD")]
    pub best_kd: f64,
    pub best_adr: f64,

    pub entry_count: u32,
    pub entry_wins: u32,
    pub entry_win_percent: f64,

    pub clutches: Vec<ClutchStat>,
    pub clutch_attempts: u32,
    pub clutch_wins: u32,
    pub clutch_win_percent: f64,

    pub flash_assists: u32,
    pub enemies_flashed: u32,
    /// HE plus incendiary damage across all matches
    pub utility_damage: u32,
}

impl PlayerAggregate {
    /// Clutch stats for "1 vs `opponents`", if tracked.
    pub fn clutch(&self, opponents: u8) -> Option<&ClutchStat> {
        self.clutches.iter().find(|c| c.opponents == opponents)
    }
}

/// Per-map results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStat {
    /// Map name exactly as recorded upstream
    pub map: String,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    /// Win percentage (0.0 to 100.0)
    pub win_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_serializes_camel_case() {
        let aggregate = PlayerAggregate {
            matches: 2,
            win_rate: 50.0,
            hs_percent: 40.0,
            max_streak: 1,
            best_kd: 2.0,
            ..Default::default()
        };
        let json = serde_json::to_value(&aggregate).unwrap();

        assert_eq!(json["matches"], 2);
        assert_eq!(json["winRate"], 50.0);
        assert_eq!(json["hsPercent"], 40.0);
        assert_eq!(json["maxStreak"], 1);
        assert_eq!(json["bestKD"], 2.0);
        assert!(json.get("bestKd").is_none());
        assert!(json.get("win_rate").is_none());
    }

    #[test]
    fn test_clutch_lookup() {
        let aggregate = PlayerAggregate {
            clutches: vec![
                ClutchStat {
                    opponents: 1,
                    attempts: 4,
                    wins: 3,
                    win_percent: 75.0,
                },
                ClutchStat {
                    opponents: 2,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(aggregate.clutch(1).map(|c| c.wins), Some(3));
        assert!(aggregate.clutch(5).is_none());
    }
}
