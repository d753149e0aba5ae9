//! Per-player, per-match statistic record.
//!
//! Records come from an external demo-parsing pipeline and are never
//! mutated here. The upstream JSON is loosely typed: numeric fields may be
//! missing, `null`, strings, or floats, so every field goes through a
//! lenient deserializer that coerces anything unusable to zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One player's performance in one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub nickname: String,

    #[serde(
        default,
        alias = "steamId",
        alias = "steamid",
        deserialize_with = "lenient::opt_string"
    )]
    pub steam_id: Option<String>,

    #[serde(default, alias = "matchId", deserialize_with = "lenient::opt_string")]
    pub match_id: Option<String>,

    /// Raw map name as reported upstream (`de_dust2`, `dust2`, ...)
    #[serde(default, alias = "map_name", deserialize_with = "lenient::string")]
    pub map: String,

    #[serde(default, deserialize_with = "lenient::date")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient::count")]
    pub kills: u32,

    #[serde(default, deserialize_with = "lenient::count")]
    pub deaths: u32,

    #[serde(default, deserialize_with = "lenient::count")]
    pub assists: u32,

    #[serde(
        default,
        alias = "headshotKills",
        alias = "hs_kills",
        deserialize_with = "lenient::count"
    )]
    pub headshot_kills: u32,

    /// Average damage per round, pre-computed upstream
    #[serde(default, deserialize_with = "lenient::number")]
    pub adr: f64,

    /// Total damage dealt
    #[serde(default, deserialize_with = "lenient::count")]
    pub damage: u32,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub win: bool,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub team: Option<String>,

    #[serde(
        default,
        alias = "rounds",
        alias = "roundsPlayed",
        deserialize_with = "lenient::count"
    )]
    pub rounds_played: u32,

    #[serde(default, alias = "entryCount", deserialize_with = "lenient::count")]
    pub entry_count: u32,

    #[serde(default, alias = "entryWins", deserialize_with = "lenient::count")]
    pub entry_wins: u32,

    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v1_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v1_wins: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v2_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v2_wins: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v3_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v3_wins: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v4_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v4_wins: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v5_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub clutch_v5_wins: u32,

    #[serde(default, deserialize_with = "lenient::count")]
    pub flash_assists: u32,

    #[serde(default, deserialize_with = "lenient::count")]
    pub enemies_flashed: u32,

    #[serde(default, deserialize_with = "lenient::count")]
    pub he_damage_dealt: u32,

    #[serde(default, deserialize_with = "lenient::count")]
    pub burn_damage_dealt: u32,

    /// Grenades and other utility thrown
    #[serde(default, deserialize_with = "lenient::count")]
    pub utility_count: u32,
}

impl MatchRecord {
    /// Create a record with the identifying fields set and every counter zeroed.
    pub fn new(nickname: impl Into<String>, map: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            map: map.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the date.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Builder method to set kills, deaths and the result.
    pub fn with_result(mut self, kills: u32, deaths: u32, win: bool) -> Self {
        self.kills = kills;
        self.deaths = deaths;
        self.win = win;
        self
    }

    /// ADR for this match: the upstream value, or damage / rounds when
    /// upstream left it empty.
    pub fn effective_adr(&self) -> f64 {
        if self.adr > 0.0 {
            self.adr
        } else if self.rounds_played > 0 && self.damage > 0 {
            self.damage as f64 / self.rounds_played as f64
        } else {
            0.0
        }
    }

    /// Clutch (attempts, wins) for v1 through v5, in order.
    pub fn clutches(&self) -> [(u32, u32); 5] {
        [
            (self.clutch_v1_count, self.clutch_v1_wins),
            (self.clutch_v2_count, self.clutch_v2_wins),
            (self.clutch_v3_count, self.clutch_v3_wins),
            (self.clutch_v4_count, self.clutch_v4_wins),
            (self.clutch_v5_count, self.clutch_v5_wins),
        ]
    }

    /// HE plus incendiary damage.
    pub fn utility_damage(&self) -> u32 {
        self.he_damage_dealt.saturating_add(self.burn_damage_dealt)
    }

    /// Key identifying the player across matches: steam id when known,
    /// otherwise the lowercased nickname.
    pub fn player_key(&self) -> String {
        match &self.steam_id {
            Some(id) => id.clone(),
            None => self.nickname.trim().to_lowercase(),
        }
    }

    /// Case-insensitive nickname comparison.
    pub fn is_player(&self, nickname: &str) -> bool {
        self.nickname.trim().eq_ignore_ascii_case(nickname.trim())
    }
}

mod lenient {
    use super::*;
    use serde::Deserializer;
    use serde_json::Value;

    fn to_f64(value: &Value) -> f64 {
        let n = match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        if n.is_finite() && n > 0.0 {
            n
        } else {
            0.0
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().map(to_f64).unwrap_or(0.0))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let n = number(d)?;
        Ok(n.min(u32::MAX as f64) as u32)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "1" | "win" | "won" | "w" | "yes"
            ),
            _ => false,
        })
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(opt_string(d)?.unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::String(s)) => parse_date(s.trim()),
            Some(Value::Number(n)) => n.as_i64().and_then(from_timestamp),
            _ => None,
        })
    }

    pub(super) fn parse_date(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Some(naive.and_utc());
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
        s.parse::<i64>().ok().and_then(from_timestamp)
    }

    /// Unix timestamps above 1e11 are taken as milliseconds.
    fn from_timestamp(ts: i64) -> Option<DateTime<Utc>> {
        if ts <= 0 {
            None
        } else if ts > 100_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        }
    }
}
