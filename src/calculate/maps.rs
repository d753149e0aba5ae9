//! Per-map win rates.

use std::collections::HashMap;

use crate::models::{MapStat, MatchRecord};

use super::percent;

/// Group matches by map and compute per-map results.
///
/// Map names are used verbatim: `de_dust2` and `dust2` are separate
/// entries. Output is ordered by matches played (descending); maps with
/// equal counts keep the order they were first seen in.
pub fn compute_map_stats(matches: &[MatchRecord]) -> Vec<MapStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stats: Vec<MapStat> = Vec::new();

    for m in matches {
        let i = *index.entry(m.map.as_str()).or_insert_with(|| {
            stats.push(MapStat {
                map: m.map.clone(),
                played: 0,
                wins: 0,
                losses: 0,
                win_rate: 0.0,
            });
            stats.len() - 1
        });

        let stat = &mut stats[i];
        stat.played += 1;
        if m.win {
            stat.wins += 1;
        } else {
            stat.losses += 1;
        }
    }

    for stat in &mut stats {
        stat.win_rate = percent(stat.wins, stat.played);
    }

    // sort_by is stable, so first-seen order breaks ties
    stats.sort_by(|a, b| b.played.cmp(&a.played));
    stats
}
