// Team strength: roll projected players up into league-normalized offense
// and pitching indices. Every caller goes through `aggregate_team_strength`.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::info;

use crate::config::{EngineConfig, SeniorityWeights, StrengthConfig};
use crate::projector::{ProjectedPlayer, ProjectedRoster};
use crate::stats::ClassYear;

/// Raw sums at or below zero normalize against this instead.
const NORMALIZATION_FLOOR: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Contributor {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RosterComposition {
    pub total_roster: usize,
    pub returning_players: usize,
    pub returning_seniors: usize,
    pub returning_juniors: usize,
    pub returning_sophomores: usize,
    pub total_varsity_years: u32,
    pub avg_varsity_years: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamStrength {
    pub team: String,
    pub total_power_index: f64,
    pub offense_index: f64,
    pub pitching_index: f64,
    /// Weighted offensive sum before normalization.
    pub projected_runs: f64,
    /// Weighted pitching sum before normalization.
    pub pitching_dominance: f64,
    pub batters_count: usize,
    pub pitchers_count: usize,
    pub top_hitter: Option<Contributor>,
    pub ace: Option<Contributor>,
    pub composition: RosterComposition,
}

/// Availability weight by class. Generic slots are discounted below every
/// real class; unknown classes fall back to varsity tenure.
pub fn seniority_weight(player: &ProjectedPlayer, weights: &SeniorityWeights) -> f64 {
    if player.method.is_generic() {
        return weights.generic;
    }
    match player.record.class {
        Some(ClassYear::Senior) => weights.senior,
        Some(ClassYear::Junior) => weights.junior,
        Some(ClassYear::Sophomore) | Some(ClassYear::Freshman) => weights.underclass,
        None => match player.record.tenure {
            t if t >= 3 => weights.senior,
            2 => weights.junior,
            _ => weights.underclass,
        },
    }
}

struct RoleSum {
    weighted: f64,
    count: usize,
    leader: Option<Contributor>,
}

/// Top-K players by raw score, each weighted by seniority and by the boost
/// for its rank within the team.
fn role_sum<'p>(
    candidates: impl Iterator<Item = (&'p ProjectedPlayer, f64)>,
    top_k: usize,
    boosts: &[f64],
    config: &StrengthConfig,
) -> RoleSum {
    let mut ranked: Vec<(&ProjectedPlayer, f64)> = candidates
        .filter(|(_, score)| *score > config.min_contribution)
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.record.name.cmp(&b.0.record.name))
    });
    ranked.truncate(top_k);

    let weighted = ranked
        .iter()
        .enumerate()
        .map(|(i, (player, score))| {
            let boost = boosts.get(i).copied().unwrap_or(1.0);
            score * seniority_weight(player, &config.seniority) * boost
        })
        .sum();

    RoleSum {
        weighted,
        count: ranked.len(),
        leader: ranked.first().map(|(p, score)| Contributor {
            name: p.record.name.clone(),
            score: *score,
        }),
    }
}

fn composition(team: &[&ProjectedPlayer]) -> RosterComposition {
    let returning: Vec<&&ProjectedPlayer> = team.iter().filter(|p| !p.method.is_generic()).collect();
    let class_count = |class: ClassYear| {
        returning
            .iter()
            .filter(|p| p.record.class == Some(class))
            .count()
    };
    let total_varsity_years: u32 = returning.iter().map(|p| p.record.tenure).sum();
    let avg_varsity_years = if returning.is_empty() {
        0.0
    } else {
        round2(f64::from(total_varsity_years) / returning.len() as f64)
    };
    RosterComposition {
        total_roster: team.len(),
        returning_players: returning.len(),
        returning_seniors: class_count(ClassYear::Senior),
        returning_juniors: class_count(ClassYear::Junior),
        returning_sophomores: class_count(ClassYear::Sophomore),
        total_varsity_years,
        avg_varsity_years,
    }
}

/// Team strength for every team present in `players`, sorted by total power
/// index (highest first, ties by team name).
pub fn aggregate_team_strength(
    players: &[ProjectedPlayer],
    config: &StrengthConfig,
) -> Vec<TeamStrength> {
    let teams: BTreeSet<&str> = players.iter().map(|p| p.record.team.as_str()).collect();

    let mut out: Vec<TeamStrength> = teams
        .into_iter()
        .map(|team| {
            let roster: Vec<&ProjectedPlayer> =
                players.iter().filter(|p| p.record.team == team).collect();
            let offense = role_sum(
                roster
                    .iter()
                    .filter(|p| p.roles.batter)
                    .map(|p| (*p, p.scores.offense)),
                config.top_batters,
                &config.batter_boosts,
                config,
            );
            let pitching = role_sum(
                roster
                    .iter()
                    .filter(|p| p.roles.pitcher)
                    .map(|p| (*p, p.scores.pitching)),
                config.top_pitchers,
                &config.pitcher_boosts,
                config,
            );
            TeamStrength {
                team: team.to_string(),
                total_power_index: 0.0,
                offense_index: 0.0,
                pitching_index: 0.0,
                projected_runs: offense.weighted,
                pitching_dominance: pitching.weighted,
                batters_count: offense.count,
                pitchers_count: pitching.count,
                top_hitter: offense.leader,
                ace: pitching.leader,
                composition: composition(&roster),
            }
        })
        .collect();

    let max_offense = out.iter().map(|t| t.projected_runs).fold(0.0, f64::max);
    let max_pitching = out.iter().map(|t| t.pitching_dominance).fold(0.0, f64::max);
    let offense_divisor = if max_offense > 0.0 { max_offense } else { NORMALIZATION_FLOOR };
    let pitching_divisor = if max_pitching > 0.0 { max_pitching } else { NORMALIZATION_FLOOR };

    for t in &mut out {
        t.offense_index = normalize(t.projected_runs, offense_divisor);
        t.pitching_index = normalize(t.pitching_dominance, pitching_divisor);
        t.total_power_index = (t.offense_index + t.pitching_index) / 2.0;
    }

    out.sort_by(|a, b| {
        b.total_power_index
            .partial_cmp(&a.total_power_index)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.team.cmp(&b.team))
    });
    out
}

fn normalize(raw: f64, divisor: f64) -> f64 {
    (raw / divisor * 100.0).clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Season power rankings for a projected roster.
pub fn season_rankings(roster: &ProjectedRoster, config: &EngineConfig) -> Vec<TeamStrength> {
    let rankings = aggregate_team_strength(&roster.players, &config.strength);
    if let Some(top) = rankings.first() {
        info!(
            "{} power rankings: {} teams, #1 {} ({:.1})",
            roster.target_year,
            rankings.len(),
            top.team,
            top.total_power_index
        );
    }
    rankings
}

/// League-wide averages over a set of team strength records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeagueSummary {
    pub teams: usize,
    pub avg_offense_index: f64,
    pub avg_pitching_index: f64,
    pub avg_total_power: f64,
    pub avg_returning_players: f64,
    pub avg_varsity_years: f64,
}

impl LeagueSummary {
    pub fn from_rankings(rankings: &[TeamStrength]) -> Self {
        if rankings.is_empty() {
            return Self::default();
        }
        let n = rankings.len() as f64;
        let mean = |f: &dyn Fn(&TeamStrength) -> f64| rankings.iter().map(f).sum::<f64>() / n;
        Self {
            teams: rankings.len(),
            avg_offense_index: mean(&|t| t.offense_index),
            avg_pitching_index: mean(&|t| t.pitching_index),
            avg_total_power: mean(&|t| t.total_power_index),
            avg_returning_players: mean(&|t| t.composition.returning_players as f64),
            avg_varsity_years: mean(&|t| f64::from(t.composition.total_varsity_years)),
        }
    }
}
