//! Achievement catalog and evaluation.

use std::collections::BTreeSet;

use crate::models::{Achievement, AchievementTier, Criterion, Metric, PlayerAggregate};

macro_rules! achievement {
    ($id:literal, $name:literal, $description:literal, $tier:ident, $metric:ident >= $threshold:literal) => {
        Achievement {
            id: $id,
            name: $name,
            description: $description,
            tier: AchievementTier::$tier,
            criterion: Criterion::at_least(Metric::$metric, $threshold),
        }
    };
}

/// Every achievement a player can unlock.
pub const ACHIEVEMENTS: &[Achievement] = &[
    achievement!("first_match", "Welcome to the Server", "Play your first inhouse match", Bronze, Matches >= 1.0),
    achievement!("regular", "Regular", "Play 10 inhouse matches", Bronze, Matches >= 10.0),
    achievement!("veteran", "Veteran", "Play 50 inhouse matches", Silver, Matches >= 50.0),
    achievement!("legend", "Legend", "Play 100 inhouse matches", Gold, Matches >= 100.0),
    achievement!("winner", "Winner", "Win 10 matches", Bronze, Wins >= 10.0),
    achievement!("champion", "Champion", "Win 50 matches", Gold, Wins >= 50.0),
    achievement!("on_fire", "On Fire", "Win 3 matches in a row", Bronze, MaxStreak >= 3.0),
    achievement!("unstoppable", "Unstoppable", "Win 5 matches in a row", Silver, MaxStreak >= 5.0),
    achievement!("dominator", "Dominator", "Win 10 matches in a row", Platinum, MaxStreak >= 10.0),
    achievement!("fragger", "Fragger", "Get 30 kills in a single match", Silver, BestKills >= 30.0),
    achievement!("rampage", "Rampage", "Get 40 kills in a single match", Gold, BestKills >= 40.0),
    achievement!("thousand_kills", "Body Count", "Reach 1000 total kills", Gold, Kills >= 1000.0),
    achievement!("positive", "In the Green", "Hold a K/D of at least 1.0", Bronze, Kd >= 1.0),
    achievement!("sharp", "Sharp", "Hold a K/D of at least 1.5", Gold, Kd >= 1.5),
    achievement!("headhunter", "Headhunter", "Hold a headshot percentage of 50% or more", Silver, HsPercent >= 50.0),
    achievement!("damage_dealer", "Damage Dealer", "Average 100 damage per round", Gold, Adr >= 100.0),
    achievement!("entry_fragger", "Entry Fragger", "Win 25 opening duels", Silver, EntryWins >= 25.0),
    achievement!("clutch_king", "Clutch King", "Win 10 clutches", Silver, ClutchWins >= 10.0),
    achievement!("flashbang_artist", "Flashbang Artist", "Get 50 flash assists", Silver, FlashAssists >= 50.0),
    achievement!("nade_master", "Nade Master", "Deal 5000 utility damage", Gold, UtilityDamage >= 5000.0),
    achievement!("winning_record", "Winning Record", "Hold a win rate of 60% or more", Platinum, WinRate >= 60.0),
];

/// Ids of the definitions whose criterion the aggregate meets.
pub fn evaluate_achievements(
    aggregate: &PlayerAggregate,
    definitions: &[Achievement],
) -> BTreeSet<String> {
    definitions
        .iter()
        .filter(|a| a.criterion.is_met(aggregate))
        .map(|a| a.id.to_string())
        .collect()
}
