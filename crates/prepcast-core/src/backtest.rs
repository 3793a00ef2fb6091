// Backtesting: re-run the whole projection on history truncated before a
// completed season and compare against what actually happened.

use std::collections::BTreeMap;

use tracing::info;

use crate::config::EngineConfig;
use crate::history::{HistoricalTable, PlayerKey};
use crate::projector::{
    assign_rankings, project_season, EngineError, ProjectedPlayer, ProjectedRoster,
};
use crate::strength::{aggregate_team_strength, TeamStrength};

/// Team strength for a projected roster. Shares its aggregation with
/// [`crate::strength::season_rankings`].
pub fn projected_strength(roster: &ProjectedRoster, config: &EngineConfig) -> Vec<TeamStrength> {
    aggregate_team_strength(&roster.players, &config.strength)
}

/// A completed season scored as-is, with roles from its own volume.
pub fn observed_roster(history: &HistoricalTable, year: i32, config: &EngineConfig) -> ProjectedRoster {
    let players = history
        .season(year)
        .cloned()
        .map(|r| ProjectedPlayer::observed(r, config))
        .collect();
    ProjectedRoster {
        target_year: year,
        players: assign_rankings(players),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamDelta {
    pub team: String,
    pub projected_total: f64,
    pub actual_total: f64,
    pub projected_offense: f64,
    pub actual_offense: f64,
    pub projected_pitching: f64,
    pub actual_pitching: f64,
}

impl TeamDelta {
    fn between(projected: &TeamStrength, actual: &TeamStrength) -> Self {
        Self {
            team: actual.team.clone(),
            projected_total: projected.total_power_index,
            actual_total: actual.total_power_index,
            projected_offense: projected.offense_index,
            actual_offense: actual.offense_index,
            projected_pitching: projected.pitching_index,
            actual_pitching: actual.pitching_index,
        }
    }

    /// Projected minus actual Total_Power_Index.
    pub fn total_error(&self) -> f64 {
        self.projected_total - self.actual_total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerError {
    pub team: String,
    pub name: String,
    pub projected_offense: f64,
    pub actual_offense: f64,
    pub projected_pitching: f64,
    pub actual_pitching: f64,
}

impl PlayerError {
    pub fn offense_error(&self) -> f64 {
        self.projected_offense - self.actual_offense
    }

    pub fn pitching_error(&self) -> f64 {
        self.projected_pitching - self.actual_pitching
    }
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub target_year: i32,
    pub projected: Vec<TeamStrength>,
    pub actual: Vec<TeamStrength>,
    /// Teams present in both projection and actual season, by name.
    pub teams: Vec<TeamDelta>,
    /// Returning players present in both, by team then name.
    pub players: Vec<PlayerError>,
}

impl BacktestReport {
    pub fn total_mae(&self) -> f64 {
        mean_abs(self.teams.iter().map(TeamDelta::total_error))
    }

    pub fn offense_mae(&self) -> f64 {
        mean_abs(self.teams.iter().map(|t| t.projected_offense - t.actual_offense))
    }

    pub fn pitching_mae(&self) -> f64 {
        mean_abs(self.teams.iter().map(|t| t.projected_pitching - t.actual_pitching))
    }

    pub fn player_offense_mae(&self) -> f64 {
        mean_abs(self.players.iter().map(PlayerError::offense_error))
    }

    pub fn player_pitching_mae(&self) -> f64 {
        mean_abs(self.players.iter().map(PlayerError::pitching_error))
    }
}

fn mean_abs(errors: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = errors.fold((0.0, 0usize), |(s, n), e| (s + e.abs(), n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Project `target_year` using only seasons before it, then diff against the
/// observed `target_year` season.
pub fn run(
    history: &HistoricalTable,
    target_year: i32,
    config: &EngineConfig,
) -> Result<BacktestReport, EngineError> {
    if history.season(target_year).next().is_none() {
        return Err(EngineError::InsufficientData(format!(
            "no observed {target_year} season to compare against"
        )));
    }

    let truncated = history.before(target_year);
    let projection = project_season(&truncated, target_year, config)?;
    let projected = projected_strength(&projection.roster, config);

    let observed = observed_roster(history, target_year, config);
    let actual = aggregate_team_strength(&observed.players, &config.strength);

    let projected_by_team: BTreeMap<&str, &TeamStrength> =
        projected.iter().map(|t| (t.team.as_str(), t)).collect();
    let mut teams: Vec<TeamDelta> = actual
        .iter()
        .filter_map(|a| {
            projected_by_team
                .get(a.team.as_str())
                .map(|p| TeamDelta::between(p, a))
        })
        .collect();
    teams.sort_by(|a, b| a.team.cmp(&b.team));

    let actual_players: BTreeMap<PlayerKey, &ProjectedPlayer> = observed
        .players
        .iter()
        .map(|p| (PlayerKey::of(&p.record), p))
        .collect();
    let mut players: Vec<PlayerError> = projection
        .roster
        .players
        .iter()
        .filter(|p| !p.method.is_generic())
        .filter_map(|p| {
            actual_players
                .get(&PlayerKey::of(&p.record))
                .map(|a| PlayerError {
                    team: p.record.team.clone(),
                    name: p.record.name.clone(),
                    projected_offense: p.scores.offense,
                    actual_offense: a.scores.offense,
                    projected_pitching: p.scores.pitching,
                    actual_pitching: a.scores.pitching,
                })
        })
        .collect();
    players.sort_by(|a, b| (&a.team, &a.name).cmp(&(&b.team, &b.name)));

    let report = BacktestReport {
        target_year,
        projected,
        actual,
        teams,
        players,
    };
    info!(
        "Backtest {}: {} teams, {} players matched, power MAE {:.2}",
        target_year,
        report.teams.len(),
        report.players.len(),
        report.total_mae()
    );
    Ok(report)
}
