// Per-player value formulas: offensive score (Runs Created) and pitching
// score. Both gate on the player's role flag and read missing stats as zero.

use crate::config::RoleConfig;
use crate::stats::{PlayerSeasonRecord, Stat, StatLine};

const PITCHING_INNINGS_WEIGHT: f64 = 1.5;
const PITCHING_STRIKEOUT_WEIGHT: f64 = 1.0;
const PITCHING_WALK_WEIGHT: f64 = -1.0;
const PITCHING_EARNED_RUN_WEIGHT: f64 = -2.0;

/// Runs Created: on-base events times total bases over opportunities.
/// Zero for non-batters.
pub fn offensive_score(stats: &StatLine, is_batter: bool) -> f64 {
    if !is_batter {
        return 0.0;
    }
    let on_base = stats.get(Stat::Hits) + stats.get(Stat::Walks);
    let opportunities = (stats.get(Stat::AtBats) + stats.get(Stat::Walks)).max(1.0);
    let score = on_base * stats.total_bases() / opportunities;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Weighted innings, strikeouts, walks and earned runs. May be negative.
/// Zero for non-pitchers.
pub fn pitching_score(stats: &StatLine, is_pitcher: bool) -> f64 {
    if !is_pitcher {
        return 0.0;
    }
    let score = PITCHING_INNINGS_WEIGHT * stats.innings().value()
        + PITCHING_STRIKEOUT_WEIGHT * stats.get(Stat::StrikeoutsPitched)
        + PITCHING_WALK_WEIGHT * stats.get(Stat::WalksAllowed)
        + PITCHING_EARNED_RUN_WEIGHT * stats.get(Stat::EarnedRuns);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerScores {
    pub offense: f64,
    pub pitching: f64,
}

/// Both scores for a record, gated on its own role flags.
pub fn score_record(record: &PlayerSeasonRecord, roles: &RoleConfig) -> PlayerScores {
    PlayerScores {
        offense: offensive_score(&record.stats, record.is_batter(roles)),
        pitching: pitching_score(&record.stats, record.is_pitcher(roles)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn runs_created_matches_hand_computation() {
        let stats = StatLine::new()
            .with(Stat::AtBats, 50.0)
            .with(Stat::Hits, 15.0)
            .with(Stat::Doubles, 4.0)
            .with(Stat::Triples, 1.0)
            .with(Stat::HomeRuns, 2.0)
            .with(Stat::Walks, 10.0);
        // singles 8, TB = 8 + 8 + 3 + 8 = 27, on-base 25, opp 60
        assert!(approx_eq(offensive_score(&stats, true), 25.0 * 27.0 / 60.0, 1e-12));
    }

    #[test]
    fn missing_extra_base_hits_do_not_zero_the_score() {
        let stats = StatLine::new()
            .with(Stat::AtBats, 20.0)
            .with(Stat::Hits, 5.0);
        let score = offensive_score(&stats, true);
        assert!(score > 0.0);
        assert!(approx_eq(score, 5.0 * 5.0 / 20.0, 1e-12));
    }

    #[test]
    fn partial_extra_base_hits_keep_the_score_positive() {
        // Only HR recorded: 4 singles + 1 homer = 8 TB.
        let homers_only = StatLine::new()
            .with(Stat::AtBats, 20.0)
            .with(Stat::Hits, 5.0)
            .with(Stat::HomeRuns, 1.0);
        assert!(approx_eq(homers_only.total_bases(), 8.0, 1e-12));
        assert!(approx_eq(offensive_score(&homers_only, true), 5.0 * 8.0 / 20.0, 1e-12));

        // 2B and 3B recorded, HR blank: 2 singles + 2 doubles + 1 triple = 9 TB.
        let no_homers = StatLine::new()
            .with(Stat::AtBats, 20.0)
            .with(Stat::Hits, 5.0)
            .with(Stat::Doubles, 2.0)
            .with(Stat::Triples, 1.0);
        assert!(approx_eq(no_homers.total_bases(), 9.0, 1e-12));
        assert!(offensive_score(&no_homers, true) > 0.0);

        // Only 2B recorded.
        let doubles_only = StatLine::new()
            .with(Stat::AtBats, 20.0)
            .with(Stat::Hits, 5.0)
            .with(Stat::Doubles, 3.0);
        assert!(approx_eq(doubles_only.total_bases(), 8.0, 1e-12));
        assert!(offensive_score(&doubles_only, true) > 0.0);
    }

    #[test]
    fn extra_base_hits_beyond_hits_never_go_negative() {
        // Inconsistent box score: more extra-base hits than hits.
        let stats = StatLine::new()
            .with(Stat::AtBats, 10.0)
            .with(Stat::Hits, 1.0)
            .with(Stat::Doubles, 3.0);
        assert!(stats.total_bases() >= 0.0);
        assert!(offensive_score(&stats, true) >= 0.0);
    }

    #[test]
    fn zero_opportunities_floor_to_one() {
        let stats = StatLine::new().with(Stat::Hits, 1.0);
        assert!(approx_eq(offensive_score(&stats, true), 1.0, 1e-12));
    }

    #[test]
    fn role_flags_force_zero() {
        let stats = StatLine::new()
            .with(Stat::AtBats, 40.0)
            .with(Stat::Hits, 12.0)
            .with(Stat::InningsPitched, 20.0)
            .with(Stat::StrikeoutsPitched, 25.0);
        assert_eq!(offensive_score(&stats, false), 0.0);
        assert_eq!(pitching_score(&stats, false), 0.0);
    }

    #[test]
    fn pitching_score_uses_true_innings_and_can_go_negative() {
        let stats = StatLine::new()
            .with(Stat::InningsPitched, 10.0 + 1.0 / 3.0)
            .with(Stat::StrikeoutsPitched, 12.0)
            .with(Stat::WalksAllowed, 4.0)
            .with(Stat::EarnedRuns, 5.0);
        assert!(approx_eq(pitching_score(&stats, true), 15.5 + 12.0 - 4.0 - 10.0, 1e-9));

        let rough = StatLine::new()
            .with(Stat::InningsPitched, 5.0)
            .with(Stat::WalksAllowed, 9.0)
            .with(Stat::EarnedRuns, 12.0);
        assert!(pitching_score(&rough, true) < 0.0);
    }

    #[test]
    fn score_record_gates_on_role_thresholds() {
        let roles = RoleConfig::default();
        let mut record = PlayerSeasonRecord::new("Pitcher Only", "Test HS", 2025);
        record.stats = StatLine::new()
            .with(Stat::AtBats, 4.0)
            .with(Stat::Hits, 2.0)
            .with(Stat::InningsPitched, 30.0)
            .with(Stat::StrikeoutsPitched, 30.0);
        let scores = score_record(&record, &roles);
        assert_eq!(scores.offense, 0.0);
        assert!(approx_eq(scores.pitching, 75.0, 1e-12));
    }
}
