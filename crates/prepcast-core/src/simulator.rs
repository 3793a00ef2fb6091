// Monte Carlo game simulation: league-relative team ratings, Negative
// Binomial run scoring, confidence labels and schedule-level outlooks.

use std::fmt;

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma, Poisson};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::strength::TeamStrength;

/// Dispersion values at or below 1 collapse the Gamma mixing distribution.
const MIN_DISPERSION: f64 = 1.01;

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// Offense and pitching strength relative to the league average (1.0 = average).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamRating {
    pub offense: f64,
    pub pitching: f64,
}

impl TeamRating {
    pub fn new(offense: f64, pitching: f64) -> Self {
        Self { offense, pitching }
    }

    /// Rating assumed for opponents with no projection.
    pub fn generic(config: &SimulationConfig) -> Self {
        Self::new(
            config.generic_opponent_rating,
            config.generic_opponent_rating,
        )
    }
}

/// Mean offense and pitching index across the league.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeagueAverages {
    pub offense_index: f64,
    pub pitching_index: f64,
}

impl LeagueAverages {
    pub fn new(offense_index: f64, pitching_index: f64) -> Self {
        Self {
            offense_index,
            pitching_index,
        }
    }

    pub fn from_strengths(teams: &[TeamStrength]) -> Self {
        if teams.is_empty() {
            return Self::default();
        }
        let n = teams.len() as f64;
        Self {
            offense_index: teams.iter().map(|t| t.offense_index).sum::<f64>() / n,
            pitching_index: teams.iter().map(|t| t.pitching_index).sum::<f64>() / n,
        }
    }

    /// Convert raw indices into league-relative ratings, floored at
    /// `index_floor`.
    pub fn rating(&self, offense_index: f64, pitching_index: f64, floor: f64) -> TeamRating {
        TeamRating::new(
            relative(offense_index, self.offense_index, floor),
            relative(pitching_index, self.pitching_index, floor),
        )
    }

    pub fn rating_for(&self, team: &TeamStrength, floor: f64) -> TeamRating {
        self.rating(team.offense_index, team.pitching_index, floor)
    }
}

fn relative(index: f64, mean: f64, floor: f64) -> f64 {
    let divisor = if mean > 0.0 { mean } else { 1.0 };
    let value = index / divisor;
    if value.is_finite() {
        value.max(floor)
    } else {
        floor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Home,
    Away,
    Neutral,
}

impl Venue {
    pub fn label(self) -> &'static str {
        match self {
            Venue::Home => "Home",
            Venue::Away => "Away",
            Venue::Neutral => "Neutral",
        }
    }
}

/// Mean runs for `batting` against `fielding`. The opposing pitching rating
/// is floored before the inverse square root so the result stays finite.
pub fn expected_runs(
    batting: TeamRating,
    fielding: TeamRating,
    at_home: bool,
    config: &SimulationConfig,
) -> f64 {
    let pitching = fielding.pitching.max(config.index_floor).max(f64::EPSILON);
    let mut runs = config.league_runs_per_game * batting.offense.max(0.0) / pitching.sqrt();
    if at_home {
        runs *= config.home_field_boost;
    }
    if runs.is_finite() {
        runs
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Run sampling
// ---------------------------------------------------------------------------

/// Negative Binomial run draws as a Gamma-Poisson mixture: mean `mean`,
/// variance `mean * dispersion`.
#[derive(Debug, Clone)]
pub struct RunSampler {
    gamma: Option<Gamma<f64>>,
}

impl RunSampler {
    pub fn new(mean: f64, dispersion: f64) -> Self {
        let d = dispersion.max(MIN_DISPERSION);
        let gamma = if mean.is_finite() && mean > 0.0 {
            Gamma::new(mean / (d - 1.0), d - 1.0).ok()
        } else {
            None
        };
        Self { gamma }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let Some(gamma) = &self.gamma else {
            return 0;
        };
        let lambda: f64 = gamma.sample(rng);
        if !lambda.is_finite() || lambda <= 0.0 {
            return 0;
        }
        match Poisson::new(lambda) {
            Ok(poisson) => {
                let runs: f64 = poisson.sample(rng);
                runs as u32
            }
            Err(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Matchups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matchup {
    pub team: TeamRating,
    pub opponent: TeamRating,
    /// Venue from `team`'s perspective.
    pub venue: Venue,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSummary {
    pub mean: f64,
    pub variance: f64,
}

impl RunSummary {
    fn of(runs: &[u32]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;
        let mean = runs.iter().map(|&r| f64::from(r)).sum::<f64>() / n;
        let variance = runs
            .iter()
            .map(|&r| (f64::from(r) - mean).powi(2))
            .sum::<f64>()
            / n;
        Self { mean, variance }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchupResult {
    pub win_probability: f64,
    pub expected_for: f64,
    pub expected_against: f64,
    pub runs_for: RunSummary,
    pub runs_against: RunSummary,
    /// Iterations that ended level before the coin flip.
    pub ties: usize,
    pub iterations: usize,
    /// Per-iteration result from `team`'s perspective, tie-breaks applied.
    pub outcomes: Vec<bool>,
}

impl MatchupResult {
    pub fn confidence(&self) -> Confidence {
        Confidence::from_probability(self.win_probability)
    }

    /// Average simulated score, "for-against".
    pub fn projected_score(&self) -> String {
        format!("{:.1}-{:.1}", self.runs_for.mean, self.runs_against.mean)
    }
}

/// Play `config.iterations` games. Level scores are settled by a fair coin.
pub fn simulate_matchup<R: Rng + ?Sized>(
    matchup: &Matchup,
    config: &SimulationConfig,
    rng: &mut R,
) -> MatchupResult {
    let expected_for = expected_runs(
        matchup.team,
        matchup.opponent,
        matchup.venue == Venue::Home,
        config,
    );
    let expected_against = expected_runs(
        matchup.opponent,
        matchup.team,
        matchup.venue == Venue::Away,
        config,
    );
    let ours = RunSampler::new(expected_for, config.dispersion);
    let theirs = RunSampler::new(expected_against, config.dispersion);

    let iterations = config.iterations;
    let mut runs_for = Vec::with_capacity(iterations);
    let mut runs_against = Vec::with_capacity(iterations);
    let mut outcomes = Vec::with_capacity(iterations);
    let mut ties = 0;

    for _ in 0..iterations {
        let scored = ours.sample(rng);
        let allowed = theirs.sample(rng);
        let won = match scored.cmp(&allowed) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => {
                ties += 1;
                rng.gen_bool(0.5)
            }
        };
        runs_for.push(scored);
        runs_against.push(allowed);
        outcomes.push(won);
    }

    let wins = outcomes.iter().filter(|w| **w).count();
    let win_probability = if iterations == 0 {
        0.5
    } else {
        wins as f64 / iterations as f64
    };

    MatchupResult {
        win_probability,
        expected_for,
        expected_against,
        runs_for: RunSummary::of(&runs_for),
        runs_against: RunSummary::of(&runs_against),
        ties,
        iterations,
        outcomes,
    }
}

// ---------------------------------------------------------------------------
// Labels and narrative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    LockWin,
    SolidWin,
    TossUp,
    SolidLoss,
    LockLoss,
}

impl Confidence {
    pub fn from_probability(p: f64) -> Self {
        if p > 0.90 {
            Confidence::LockWin
        } else if p > 0.65 {
            Confidence::SolidWin
        } else if p < 0.10 {
            Confidence::LockLoss
        } else if p < 0.35 {
            Confidence::SolidLoss
        } else {
            Confidence::TossUp
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Confidence::LockWin => "Lock (W)",
            Confidence::SolidWin => "Solid (W)",
            Confidence::TossUp => "Toss-up",
            Confidence::SolidLoss => "Solid (L)",
            Confidence::LockLoss => "Lock (L)",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn offense_phrase(diff: f64) -> Option<&'static str> {
    if diff > 0.4 {
        Some("Elite Offense")
    } else if diff > 0.15 {
        Some("Better Bats")
    } else if diff < -0.4 {
        Some("Overmatched Offense")
    } else if diff < -0.15 {
        Some("Weaker Bats")
    } else {
        None
    }
}

fn pitching_phrase(diff: f64) -> Option<&'static str> {
    if diff > 0.4 {
        Some("Dominant Pitching")
    } else if diff > 0.15 {
        Some("Better Arms")
    } else if diff < -0.4 {
        Some("Weak Pitching")
    } else if diff < -0.15 {
        Some("Less Depth")
    } else {
        None
    }
}

/// One-line explanation of a matchup from `team`'s side.
pub fn matchup_narrative(matchup: &Matchup, win_probability: f64) -> String {
    let mut reasons: Vec<&str> = Vec::new();
    reasons.extend(offense_phrase(matchup.team.offense - matchup.opponent.offense));
    reasons.extend(pitching_phrase(
        matchup.team.pitching - matchup.opponent.pitching,
    ));
    if matchup.venue == Venue::Home {
        reasons.push("Home Field");
    }

    if reasons.is_empty() {
        return "Even Matchup".to_string();
    }
    if win_probability < 0.5 {
        let flipped: Vec<&str> = reasons
            .into_iter()
            .map(|r| match r {
                "Elite Offense" => "Their Offense",
                "Dominant Pitching" => "Their Pitching",
                other => other,
            })
            .collect();
        format!("Opponent advantage: {}", flipped.join(", "))
    } else {
        format!("Edge: {}", reasons.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Schedule simulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledGame {
    pub date: Option<NaiveDate>,
    pub home: String,
    pub away: String,
}

/// Maps schedule names onto projected teams.
pub struct TeamResolver<'a> {
    teams: &'a [TeamStrength],
    league: LeagueAverages,
    config: &'a SimulationConfig,
}

impl<'a> TeamResolver<'a> {
    pub fn new(teams: &'a [TeamStrength], config: &'a SimulationConfig) -> Self {
        Self {
            teams,
            league: LeagueAverages::from_strengths(teams),
            config,
        }
    }

    pub fn league(&self) -> LeagueAverages {
        self.league
    }

    /// Exact name first, then the name without any parenthesized suffix as a
    /// substring of a projected team name.
    pub fn lookup(&self, name: &str) -> Option<&'a TeamStrength> {
        let name = name.trim();
        if let Some(team) = self.teams.iter().find(|t| t.team == name) {
            return Some(team);
        }
        let stem = name.split('(').next().unwrap_or(name).trim();
        if stem.is_empty() {
            return None;
        }
        self.teams.iter().find(|t| t.team.contains(stem))
    }

    /// League-relative rating, or the generic rating when unresolved.
    pub fn rating(&self, name: &str) -> TeamRating {
        match self.lookup(name) {
            Some(team) => self.league.rating_for(team, self.config.index_floor),
            None => TeamRating::generic(self.config),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameProjection {
    /// 1-based position in the schedule.
    pub game_number: usize,
    pub date: Option<NaiveDate>,
    pub opponent: String,
    pub venue: Venue,
    pub win_probability: f64,
    pub projected_score: String,
    pub confidence: Confidence,
    pub narrative: String,
    pub team_rating: TeamRating,
    pub opponent_rating: TeamRating,
}

impl GameProjection {
    /// ISO date, or "G{n}" when the schedule row has none.
    pub fn label(&self) -> String {
        match self.date {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => format!("G{}", self.game_number),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonOutlook {
    pub team: String,
    pub games: Vec<GameProjection>,
    pub iterations: usize,
    pub average_wins: f64,
    /// 10th percentile of simulated season win totals.
    pub floor_wins: f64,
    /// 90th percentile of simulated season win totals.
    pub ceiling_wins: f64,
}

impl SeasonOutlook {
    pub fn average_losses(&self) -> f64 {
        self.games.len() as f64 - self.average_wins
    }
}

struct PendingGame {
    index: usize,
    date: Option<NaiveDate>,
    opponent: String,
    matchup: Matchup,
}

/// Simulate every game on `focal_team`'s schedule. Games run in parallel,
/// each with its own RNG seeded from `config.seed` plus the game index.
pub fn simulate_season(
    focal_team: &str,
    schedule: &[ScheduledGame],
    strengths: &[TeamStrength],
    config: &SimulationConfig,
) -> SeasonOutlook {
    let focal_team = focal_team.trim();
    if focal_team.is_empty() {
        warn!(
            "No focal team named; {} schedule rows not simulated",
            schedule.len()
        );
        return SeasonOutlook {
            team: String::new(),
            games: Vec::new(),
            iterations: config.iterations,
            average_wins: 0.0,
            floor_wins: 0.0,
            ceiling_wins: 0.0,
        };
    }

    let resolver = TeamResolver::new(strengths, config);
    let team_rating = match resolver.lookup(focal_team) {
        Some(team) => resolver.league().rating_for(team, config.index_floor),
        None => {
            warn!(
                "Focal team '{}' has no projection; using generic rating",
                focal_team
            );
            TeamRating::generic(config)
        }
    };

    let pending: Vec<PendingGame> = schedule
        .iter()
        .enumerate()
        .filter_map(|(index, game)| {
            let (venue, opponent) = if game.home.contains(focal_team) {
                (Venue::Home, &game.away)
            } else if game.away.contains(focal_team) {
                (Venue::Away, &game.home)
            } else {
                warn!(
                    "Skipping schedule row {} ({} vs {}): '{}' not involved",
                    index + 1,
                    game.home,
                    game.away,
                    focal_team
                );
                return None;
            };
            if resolver.lookup(opponent).is_none() {
                debug!("Opponent '{}' unresolved; using generic rating", opponent);
            }
            Some(PendingGame {
                index,
                date: game.date,
                opponent: opponent.clone(),
                matchup: Matchup {
                    team: team_rating,
                    opponent: resolver.rating(opponent),
                    venue,
                },
            })
        })
        .collect();

    let base_seed = config.seed.unwrap_or_else(rand::random);

    let results: Vec<(GameProjection, Vec<bool>)> = pending
        .par_iter()
        .map(|game| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(game.index as u64));
            let result = simulate_matchup(&game.matchup, config, &mut rng);
            let projection = GameProjection {
                game_number: game.index + 1,
                date: game.date,
                opponent: game.opponent.clone(),
                venue: game.matchup.venue,
                win_probability: result.win_probability,
                projected_score: result.projected_score(),
                confidence: result.confidence(),
                narrative: matchup_narrative(&game.matchup, result.win_probability),
                team_rating: game.matchup.team,
                opponent_rating: game.matchup.opponent,
            };
            (projection, result.outcomes)
        })
        .collect();

    let win_totals: Vec<f64> = (0..config.iterations)
        .map(|i| {
            results
                .iter()
                .filter(|(_, outcomes)| outcomes.get(i).copied().unwrap_or(false))
                .count() as f64
        })
        .collect();

    let average_wins = if win_totals.is_empty() {
        0.0
    } else {
        win_totals.iter().sum::<f64>() / win_totals.len() as f64
    };
    let outlook = SeasonOutlook {
        team: focal_team.to_string(),
        games: results.into_iter().map(|(game, _)| game).collect(),
        iterations: config.iterations,
        average_wins,
        floor_wins: percentile(&win_totals, 10.0),
        ceiling_wins: percentile(&win_totals, 90.0),
    };

    info!(
        "{}: {} games simulated, avg {:.1} wins (p10 {:.0}, p90 {:.0})",
        outlook.team,
        outlook.games.len(),
        outlook.average_wins,
        outlook.floor_wins,
        outlook.ceiling_wins
    );
    outlook
}

/// Linear-interpolated percentile, `pct` in [0, 100].
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
