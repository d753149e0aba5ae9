//! Achievement definitions.

use serde::Serialize;

use super::PlayerAggregate;

/// Achievement tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl std::fmt::Display for AchievementTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AchievementTier::Bronze => write!(f, "bronze"),
            AchievementTier::Silver => write!(f, "silver"),
            AchievementTier::Gold => write!(f, "gold"),
            AchievementTier::Platinum => write!(f, "platinum"),
        }
    }
}

/// Aggregate figure an achievement is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Matches,
    Wins,
    WinRate,
    Kills,
    Kd,
    HsPercent,
    Adr,
    MaxStreak,
    BestKills,
    EntryWins,
    ClutchWins,
    FlashAssists,
    UtilityDamage,
}

impl Metric {
    /// Read this metric off an aggregate.
    pub fn value(&self, aggregate: &PlayerAggregate) -> f64 {
        match self {
            Metric::Matches => aggregate.matches as f64,
            Metric::Wins => aggregate.wins as f64,
            Metric::WinRate => aggregate.win_rate,
            Metric::Kills => aggregate.kills as f64,
            Metric::Kd => aggregate.kd,
            Metric::HsPercent => aggregate.hs_percent,
            Metric::Adr => aggregate.adr,
            Metric::MaxStreak => aggregate.max_streak as f64,
            Metric::BestKills => aggregate.best_kills as f64,
            Metric::EntryWins => aggregate.entry_wins as f64,
            Metric::ClutchWins => aggregate.clutch_wins as f64,
            Metric::FlashAssists => aggregate.flash_assists as f64,
            Metric::UtilityDamage => aggregate.utility_damage as f64,
        }
    }
}

/// Single threshold test: unlocked when `metric >= threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Criterion {
    pub metric: Metric,
    pub threshold: f64,
}

impl Criterion {
    pub const fn at_least(metric: Metric, threshold: f64) -> Self {
        Self { metric, threshold }
    }

    pub fn is_met(&self, aggregate: &PlayerAggregate) -> bool {
        self.metric.value(aggregate) >= self.threshold
    }
}

/// A static achievement definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: AchievementTier,
    pub criterion: Criterion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_boundary_is_inclusive() {
        let criterion = Criterion::at_least(Metric::Matches, 50.0);
        let mut aggregate = PlayerAggregate {
            matches: 49,
            ..Default::default()
        };
        assert!(!criterion.is_met(&aggregate));

        aggregate.matches = 50;
        assert!(criterion.is_met(&aggregate));
    }

    #[test]
    fn test_metric_reads_ratios() {
        let aggregate = PlayerAggregate {
            kd: 1.25,
            hs_percent: 48.0,
            ..Default::default()
        };
        assert_eq!(Metric::Kd.value(&aggregate), 1.25);
        assert_eq!(Metric::HsPercent.value(&aggregate), 48.0);
    }

    #[test]
    fn test_tier_ordering_and_display() {
        assert!(AchievementTier::Bronze < AchievementTier::Platinum);
        assert_eq!(AchievementTier::Gold.to_string(), "gold");
    }
}
