// Roster projection: carry every returning player into the target season
// through the multiplier fallback, then backfill thin rosters with generic
// profiles and rank everyone within team and league.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ProjectionConfig};
use crate::history::HistoricalTable;
use crate::multipliers::{Cohort, DevelopmentModel, ProgramTier, Transition, TransitionMultipliers};
use crate::profiles::{GenericProfile, GenericProfiles, ProfileRole};
use crate::scoring::{offensive_score, pitching_score, PlayerScores};
use crate::stats::{ClassYear, PlayerSeasonRecord, Roles, Stat, StatGroup, StatLine};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

// ---------------------------------------------------------------------------
// Projection method tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMethod {
    ClassTenure(Cohort),
    Class(Cohort),
    Tenure(Cohort),
    /// No viable transition: every stat carried at 1.0.
    Identity,
    /// Generic profile filling a roster slot, by the team's program tier.
    GenericBackfill(ProgramTier),
    /// Actual season line, used when scoring a completed season.
    Observed,
}

impl ProjectionMethod {
    pub fn label(&self) -> String {
        match self {
            ProjectionMethod::ClassTenure(c) => format!("Class_Tenure (Specific) - {}", c.label()),
            ProjectionMethod::Class(c) => format!("Class (Age-Based) - {}", c.label()),
            ProjectionMethod::Tenure(c) => format!("Tenure (Experience-Based) - {}", c.label()),
            ProjectionMethod::Identity => "Default (1.0)".into(),
            ProjectionMethod::GenericBackfill(_) => "Generic Baseline".into(),
            ProjectionMethod::Observed => "Observed".into(),
        }
    }

    /// Which step-down ladder produced a backfilled slot.
    pub fn ladder(&self) -> Option<&'static str> {
        match self {
            ProjectionMethod::GenericBackfill(ProgramTier::Elite) => Some("Elite Step-Down"),
            ProjectionMethod::GenericBackfill(ProgramTier::Standard) => Some("Standard Step-Down"),
            _ => None,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, ProjectionMethod::GenericBackfill(_))
    }
}

// ---------------------------------------------------------------------------
// Multiplier fallback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    ClassTenure,
    Class,
    Tenure,
}

/// Most specific first. Identity is what remains when none is viable.
const FALLBACK_ORDER: [Strategy; 3] = [Strategy::ClassTenure, Strategy::Class, Strategy::Tenure];

impl Strategy {
    fn transition(self, from: &PlayerSeasonRecord) -> Option<Transition> {
        let next_tenure = from.tenure + 1;
        let next_class = from.class.and_then(ClassYear::next);
        match self {
            Strategy::ClassTenure => Some(Transition::ClassTenure {
                from: (from.class?, from.tenure),
                to: (next_class?, next_tenure),
            }),
            Strategy::Class => Some(Transition::Class {
                from: from.class?,
                to: next_class?,
            }),
            Strategy::Tenure => Some(Transition::Tenure {
                from: from.tenure,
                to: next_tenure,
            }),
        }
    }

    /// Tables consulted, in order. Tenure cohorts are pooled only.
    fn cohorts(self, tier: ProgramTier) -> Vec<Cohort> {
        match self {
            Strategy::ClassTenure | Strategy::Class => vec![Cohort::from(tier), Cohort::Pooled],
            Strategy::Tenure => vec![Cohort::Pooled],
        }
    }

    fn method(self, cohort: Cohort) -> ProjectionMethod {
        match self {
            Strategy::ClassTenure => ProjectionMethod::ClassTenure(cohort),
            Strategy::Class => ProjectionMethod::Class(cohort),
            Strategy::Tenure => ProjectionMethod::Tenure(cohort),
        }
    }
}

fn is_viable(multipliers: &TransitionMultipliers, min_sample: usize) -> bool {
    multipliers.sample_size >= min_sample
}

/// First viable transition for a base-year record, walking the fallback
/// order. `None` means the identity projection.
pub fn select_multipliers<'m>(
    model: &'m DevelopmentModel,
    record: &PlayerSeasonRecord,
    tier: ProgramTier,
    min_sample: usize,
) -> Option<(&'m TransitionMultipliers, ProjectionMethod)> {
    FALLBACK_ORDER.iter().find_map(|strategy| {
        let transition = strategy.transition(record)?;
        strategy.cohorts(tier).into_iter().find_map(|cohort| {
            model
                .table(cohort)
                .get(&transition)
                .filter(|m| is_viable(m, min_sample))
                .map(|m| (m, strategy.method(cohort)))
        })
    })
}

/// Pull a growth multiplier toward 1.0 in proportion to how far the base
/// volume exceeded `threshold` (capped at 100% over).
pub fn regressed_multiplier(multiplier: f64, volume: f64, threshold: f64, strength: f64) -> f64 {
    if multiplier <= 1.0 || volume <= threshold {
        return multiplier;
    }
    let excess = ((volume - threshold) / threshold).min(1.0);
    multiplier + (1.0 - multiplier) * excess * strength
}

// ---------------------------------------------------------------------------
// Percentile ladder
// ---------------------------------------------------------------------------

/// Ordered percentile tiers a program draws backfill from. After the listed
/// tiers the floor tier repeats.
#[derive(Debug, Clone, Copy)]
pub struct PercentileLadder<'a> {
    tiers: &'a [u8],
}

impl<'a> PercentileLadder<'a> {
    pub fn for_tier(tier: ProgramTier, config: &'a ProjectionConfig) -> Self {
        let tiers = match tier {
            ProgramTier::Elite => &config.elite_ladder,
            ProgramTier::Standard => &config.standard_ladder,
        };
        Self { tiers }
    }

    /// A fresh pass over the ladder; each call restarts from the top tier.
    pub fn slots(&self) -> impl Iterator<Item = u8> + 'a {
        let floor = self.tiers.last().copied();
        self.tiers.iter().copied().chain(floor.into_iter().cycle())
    }
}

// ---------------------------------------------------------------------------
// Projected roster
// ---------------------------------------------------------------------------

/// Rank among role-qualified players, 1 = best, ties share the lowest rank.
/// `None` when the player does not hold the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerRanks {
    pub offense_team: Option<u32>,
    pub offense_league: Option<u32>,
    pub pitching_team: Option<u32>,
    pub pitching_league: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPlayer {
    pub record: PlayerSeasonRecord,
    pub method: ProjectionMethod,
    pub roles: Roles,
    pub scores: PlayerScores,
    pub ranks: PlayerRanks,
}

impl ProjectedPlayer {
    /// Score a record under the given roles. Ranks are filled in later by
    /// [`assign_rankings`].
    pub fn new(record: PlayerSeasonRecord, method: ProjectionMethod, roles: Roles) -> Self {
        let scores = PlayerScores {
            offense: offensive_score(&record.stats, roles.batter),
            pitching: pitching_score(&record.stats, roles.pitcher),
        };
        Self {
            record,
            method,
            roles,
            scores,
            ranks: PlayerRanks::default(),
        }
    }

    /// An actual season line with roles derived from its own volume.
    pub fn observed(record: PlayerSeasonRecord, config: &EngineConfig) -> Self {
        let roles = record.roles(&config.roles);
        Self::new(record, ProjectionMethod::Observed, roles)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRoster {
    pub target_year: i32,
    pub players: Vec<ProjectedPlayer>,
}

impl ProjectedRoster {
    pub fn team<'r>(&'r self, team: &'r str) -> impl Iterator<Item = &'r ProjectedPlayer> + 'r {
        self.players.iter().filter(move |p| p.record.team == team)
    }

    pub fn teams(&self) -> BTreeSet<&str> {
        self.players.iter().map(|p| p.record.team.as_str()).collect()
    }
}

/// Fill every player's team and league ranks for both roles.
pub fn assign_rankings(players: Vec<ProjectedPlayer>) -> Vec<ProjectedPlayer> {
    let snapshot: Vec<(String, Option<f64>, Option<f64>)> = players
        .iter()
        .map(|p| {
            (
                p.record.team.clone(),
                p.roles.batter.then_some(p.scores.offense),
                p.roles.pitcher.then_some(p.scores.pitching),
            )
        })
        .collect();

    players
        .into_iter()
        .zip(&snapshot)
        .map(|(mut player, (team, offense, pitching))| {
            let same_team = || snapshot.iter().filter(move |s| &s.0 == team);
            player.ranks = PlayerRanks {
                offense_team: offense.map(|s| min_rank(s, same_team().filter_map(|o| o.1))),
                offense_league: offense.map(|s| min_rank(s, snapshot.iter().filter_map(|o| o.1))),
                pitching_team: pitching.map(|s| min_rank(s, same_team().filter_map(|o| o.2))),
                pitching_league: pitching
                    .map(|s| min_rank(s, snapshot.iter().filter_map(|o| o.2))),
            };
            player
        })
        .collect()
}

fn min_rank(score: f64, pool: impl Iterator<Item = f64>) -> u32 {
    1 + pool.filter(|other| *other > score).count() as u32
}

// ---------------------------------------------------------------------------
// Projector
// ---------------------------------------------------------------------------

pub struct RosterProjector<'a> {
    config: &'a EngineConfig,
    model: &'a DevelopmentModel,
    profiles: &'a GenericProfiles,
}

impl<'a> RosterProjector<'a> {
    pub fn new(
        config: &'a EngineConfig,
        model: &'a DevelopmentModel,
        profiles: &'a GenericProfiles,
    ) -> Self {
        Self {
            config,
            model,
            profiles,
        }
    }

    /// Project `target_year` from the `target_year - 1` base season.
    pub fn project(
        &self,
        history: &HistoricalTable,
        target_year: i32,
    ) -> Result<ProjectedRoster, EngineError> {
        if self.model.is_empty() && self.profiles.is_empty() {
            return Err(EngineError::InsufficientData(
                "no development transitions and no generic profiles".into(),
            ));
        }
        let base_year = target_year - 1;

        let mut players: Vec<ProjectedPlayer> = history
            .season(base_year)
            .filter(|r| r.class != Some(ClassYear::Senior))
            .map(|r| self.project_player(r, target_year))
            .collect();
        let returning = players.len();

        let mut teams = history.teams_in(base_year);
        teams.extend(self.config.programs.teams.iter().cloned());
        if teams.is_empty() {
            return Err(EngineError::InsufficientData(format!(
                "no teams in base year {base_year} and none configured"
            )));
        }

        let mut backfill = Vec::new();
        for team in &teams {
            backfill.extend(self.backfill_team(team, &players, target_year));
        }
        players.extend(backfill);

        let mut players = assign_rankings(players);
        players.sort_by(|a, b| {
            let key = |p: &ProjectedPlayer| {
                (
                    p.ranks.offense_team.unwrap_or(u32::MAX),
                    p.ranks.pitching_team.unwrap_or(u32::MAX),
                )
            };
            a.record.team.cmp(&b.record.team).then(key(a).cmp(&key(b)))
        });

        info!(
            "projected {target_year}: {} teams, {returning} returning players, {} backfilled",
            teams.len(),
            players.len() - returning
        );
        Ok(ProjectedRoster {
            target_year,
            players,
        })
    }

    fn project_player(&self, record: &PlayerSeasonRecord, target_year: i32) -> ProjectedPlayer {
        let settings = &self.config.projection;
        let tier = ProgramTier::of(&record.team, self.config);
        let selected = select_multipliers(
            self.model,
            record,
            tier,
            self.config.multipliers.min_transition_sample,
        );
        let method = selected.map_or(ProjectionMethod::Identity, |(_, m)| m);

        let underclassman = matches!(
            record.class,
            Some(ClassYear::Freshman) | Some(ClassYear::Sophomore)
        );
        let base_pa = record.stats.get(Stat::PlateAppearances);
        let base_ip = record.stats.innings().value();

        let mut stats = StatLine::new();
        let mut regressed = false;
        let mut capped = Vec::new();
        for stat in Stat::ALL {
            let Some(prior) = record.stats.raw(stat) else {
                continue;
            };
            let mut factor = selected.map_or(1.0, |(m, _)| m.factor(stat));
            if underclassman {
                let (volume, threshold) = match stat.group() {
                    StatGroup::Pitching => (base_ip, settings.regression_ip_threshold),
                    _ => (base_pa, settings.regression_pa_threshold),
                };
                let adjusted =
                    regressed_multiplier(factor, volume, threshold, settings.regression_strength);
                regressed |= adjusted != factor;
                factor = adjusted;
            }

            let mut value = round2(prior * factor * settings.survivor_dampening);
            if let Some(cap) = settings.cap_for(stat) {
                if value > cap {
                    value = cap;
                    capped.push(stat.column());
                }
            }
            stats.set(stat, value);
        }

        if regressed {
            debug!(
                "regressed {} ({}): PA={base_pa:.0} IP={base_ip:.1}",
                record.name, record.team
            );
        }
        if !capped.is_empty() {
            debug!("capped {} ({}): {}", record.name, record.team, capped.join(", "));
        }

        let projected = PlayerSeasonRecord {
            name: record.name.clone(),
            team: record.team.clone(),
            season: target_year,
            class: record.class.and_then(ClassYear::next),
            tenure: record.tenure + 1,
            stats,
        };
        let roles = projected.roles(&self.config.roles);
        ProjectedPlayer::new(projected, method, roles)
    }

    /// Generic players needed to bring `team` up to the roster minimums.
    fn backfill_team(
        &self,
        team: &str,
        players: &[ProjectedPlayer],
        target_year: i32,
    ) -> Vec<ProjectedPlayer> {
        let settings = &self.config.projection;
        let roster: Vec<&ProjectedPlayer> =
            players.iter().filter(|p| p.record.team == team).collect();
        let batters = roster.iter().filter(|p| p.roles.batter).count();
        let pitchers = roster.iter().filter(|p| p.roles.pitcher).count();

        let tier = ProgramTier::of(team, self.config);
        let ladder = PercentileLadder::for_tier(tier, settings);

        let mut out = Vec::new();
        for (role, have, minimum) in [
            (ProfileRole::Batter, batters, settings.min_batters),
            (ProfileRole::Pitcher, pitchers, settings.min_pitchers),
        ] {
            let missing = minimum.saturating_sub(have);
            if missing == 0 {
                continue;
            }
            if self.profiles.for_role(role).next().is_none() {
                warn!(
                    "{team}: short {missing} {}s but no generic profiles exist for that role",
                    role.label()
                );
                continue;
            }
            for (slot, percentile) in ladder.slots().take(missing).enumerate() {
                let Some(profile) = self.pick_profile(role, percentile) else {
                    break;
                };
                out.push(generic_player(profile, team, slot + 1, target_year, tier));
            }
            debug!("{team}: backfilled {missing} generic {}s", role.label());
        }
        out
    }

    /// The profile at `percentile`, else the lowest tier available.
    fn pick_profile(&self, role: ProfileRole, percentile: u8) -> Option<&'a GenericProfile> {
        self.profiles
            .find(role, percentile)
            .or_else(|| self.profiles.for_role(role).next())
    }
}

fn generic_player(
    profile: &GenericProfile,
    team: &str,
    slot: usize,
    target_year: i32,
    tier: ProgramTier,
) -> ProjectedPlayer {
    let record = PlayerSeasonRecord {
        name: format!(
            "Generic {} {slot} ({}th)",
            profile.role.label(),
            profile.percentile
        ),
        team: team.to_string(),
        season: target_year,
        class: Some(ClassYear::Sophomore),
        tenure: 1,
        stats: profile.record.stats.clone(),
    };
    let roles = Roles {
        batter: profile.role == ProfileRole::Batter,
        pitcher: profile.role == ProfileRole::Pitcher,
    };
    ProjectedPlayer::new(record, ProjectionMethod::GenericBackfill(tier), roles)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Whole-season convenience
// ---------------------------------------------------------------------------

/// Everything fitted and projected for one target season.
#[derive(Debug, Clone)]
pub struct SeasonProjection {
    pub model: DevelopmentModel,
    pub profiles: GenericProfiles,
    pub roster: ProjectedRoster,
}

/// Fit multipliers and profiles on `history`, then project `target_year`.
pub fn project_season(
    history: &HistoricalTable,
    target_year: i32,
    config: &EngineConfig,
) -> Result<SeasonProjection, EngineError> {
    let model = DevelopmentModel::fit(history, config);
    let profiles = GenericProfiles::generate(history, config);
    let roster = RosterProjector::new(config, &model, &profiles).project(history, target_year)?;
    Ok(SeasonProjection {
        model,
        profiles,
        roster,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
