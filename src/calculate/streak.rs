//! Win streaks.

use crate::models::{MatchRecord, Streak};

/// Matches in chronological order (oldest first).
///
/// The sort is stable: records sharing a date, and undated records, keep
/// their input order. Undated records sort before every dated one.
pub fn chronological(matches: &[MatchRecord]) -> Vec<&MatchRecord> {
    let mut ordered: Vec<&MatchRecord> = matches.iter().collect();
    ordered.sort_by_key(|m| m.date);
    ordered
}

/// Current and longest consecutive-win runs.
///
/// A loss resets the running count to zero; `current` is whatever run is
/// still open at the most recent match.
pub fn compute_streak(matches: &[MatchRecord]) -> Streak {
    let mut streak = Streak::default();

    for m in chronological(matches) {
        if m.win {
            streak.current += 1;
            streak.max = streak.max.max(streak.current);
        } else {
            streak.current = 0;
        }
    }

    streak
}
