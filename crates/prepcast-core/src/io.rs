// CSV boundary: read the historical player-season table and schedules,
// write every engine artifact. Innings are parsed from and written in
// box-score notation; everything in between uses true fractional innings.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::history::HistoricalTable;
use crate::innings::Innings;
use crate::multipliers::MultiplierTable;
use crate::profiles::GenericProfiles;
use crate::projector::ProjectedRoster;
use crate::simulator::{GameProjection, ScheduledGame};
use crate::stats::{ClassYear, PlayerSeasonRecord, Stat, StatLine};
use crate::strength::TeamStrength;

/// Rank written for players who do not hold the role.
const UNRANKED: u32 = 9999;

const SCHEDULE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to access file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Identity columns of a history row. Stat columns are read by position so
/// that any subset of them may be present.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawHistoryRow {
    Name: String,
    Team: String,
    #[serde(alias = "Season")]
    Season_Cleaned: f64,
    #[serde(default, alias = "Class")]
    Class_Cleaned: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawScheduledGame {
    #[serde(default)]
    Date: Option<String>,
    Home: String,
    Away: String,
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

fn parse_stat(stat: Stat, cell: &str) -> Result<Option<f64>, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    if stat == Stat::InningsPitched {
        return Innings::parse(cell)
            .map(|ip| Some(ip.value()))
            .map_err(|e| e.to_string());
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Err(format!("non-finite {stat} value `{cell}`")),
        Err(_) => Err(format!("invalid {stat} value `{cell}`")),
    }
}

fn read_history_from_reader<R: Read>(rdr: R) -> Result<HistoricalTable, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers = reader.headers()?.clone();

    let columns: Vec<(Stat, Option<usize>)> = Stat::ALL
        .iter()
        .map(|&stat| (stat, headers.iter().position(|h| h.trim() == stat.column())))
        .collect();
    for (stat, _) in columns.iter().filter(|(_, pos)| pos.is_none()) {
        warn!("history is missing column {}; filling with zeros", stat.column());
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping malformed history row: {}", e);
                skipped += 1;
                continue;
            }
        };
        let raw: RawHistoryRow = match row.deserialize(Some(&headers)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping history row {}: {}", line + 2, e);
                skipped += 1;
                continue;
            }
        };

        let mut stats = StatLine::new();
        let mut bad_cell = None;
        for &(stat, pos) in &columns {
            let Some(pos) = pos else {
                stats.set(stat, 0.0);
                continue;
            };
            match parse_stat(stat, row.get(pos).unwrap_or("")) {
                Ok(Some(value)) => stats.set(stat, value),
                Ok(None) => {}
                Err(reason) => {
                    bad_cell = Some(reason);
                    break;
                }
            }
        }
        if let Some(reason) = bad_cell {
            warn!("skipping '{}' ({}): {}", raw.Name.trim(), raw.Team.trim(), reason);
            skipped += 1;
            continue;
        }

        let class_text = raw.Class_Cleaned.unwrap_or_default();
        let class = ClassYear::parse(&class_text);
        if class.is_none() && !class_text.trim().is_empty() {
            warn!("unknown class '{}' for '{}'", class_text.trim(), raw.Name.trim());
        }

        let mut record = PlayerSeasonRecord::new(
            raw.Name.trim(),
            raw.Team.trim(),
            raw.Season_Cleaned.round() as i32,
        );
        record.class = class;
        record.stats = stats;
        records.push(record);
    }

    info!("Loaded {} history rows ({} skipped)", records.len(), skipped);
    Ok(HistoricalTable::new(records))
}

fn read_schedule_from_reader<R: Read>(rdr: R) -> Result<Vec<ScheduledGame>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut games = Vec::new();
    for result in reader.deserialize::<RawScheduledGame>() {
        match result {
            Ok(raw) => {
                let date = raw
                    .Date
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .and_then(|d| {
                        let parsed = parse_date(d);
                        if parsed.is_none() {
                            warn!("unparseable schedule date '{}'", d);
                        }
                        parsed
                    });
                games.push(ScheduledGame {
                    date,
                    home: raw.Home.trim().to_string(),
                    away: raw.Away.trim().to_string(),
                });
            }
            Err(e) => {
                warn!("skipping malformed schedule row: {}", e);
            }
        }
    }
    Ok(games)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    SCHEDULE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn open(path: &Path) -> Result<File, DataError> {
    File::open(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the historical player-season table.
pub fn read_history(path: &Path) -> Result<HistoricalTable, DataError> {
    let table = read_history_from_reader(open(path)?).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if table.is_empty() {
        return Err(DataError::Validation(format!(
            "{} contains no usable player rows",
            path.display()
        )));
    }
    Ok(table)
}

/// Load a schedule with `Date` (optional), `Home` and `Away` columns.
pub fn read_schedule(path: &Path) -> Result<Vec<ScheduledGame>, DataError> {
    read_schedule_from_reader(open(path)?).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn stat_cell(stat: Stat, value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if stat == Stat::InningsPitched => Innings::from_innings(v).to_string(),
        Some(v) => v.to_string(),
    }
}

fn stat_cells(stats: &StatLine) -> impl Iterator<Item = String> + '_ {
    Stat::ALL.iter().map(move |&s| stat_cell(s, stats.raw(s)))
}

fn stat_headers() -> impl Iterator<Item = String> {
    Stat::ALL.iter().map(|s| s.column().to_string())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn rank_cell(rank: Option<u32>) -> String {
    rank.unwrap_or(UNRANKED).to_string()
}

fn class_cell(class: Option<ClassYear>) -> String {
    class.map(|c| c.label().to_string()).unwrap_or_default()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn write_multipliers_to_writer<W: Write>(
    table: &MultiplierTable,
    wtr: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    let mut header = vec![
        "Transition".to_string(),
        "Type".to_string(),
        "Sample_Size".to_string(),
        "Avg_Volatility".to_string(),
    ];
    header.extend(stat_headers());
    writer.write_record(&header)?;

    for entry in table.iter() {
        let mut row = vec![
            entry.transition.to_string(),
            entry.transition.kind().label().to_string(),
            entry.sample_size.to_string(),
            format!("{:.3}", entry.volatility),
        ];
        row.extend(Stat::ALL.iter().map(|&s| optional(entry.ratio(s))));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_profiles_to_writer<W: Write>(
    profiles: &GenericProfiles,
    wtr: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    let mut header = vec![
        "Name".to_string(),
        "Role".to_string(),
        "Percentile_Tier".to_string(),
        "Class_Cleaned".to_string(),
        "Varsity_Year".to_string(),
    ];
    header.extend(stat_headers());
    header.extend(["PA_Original", "AB_Original", "IP_Original"].map(String::from));
    writer.write_record(&header)?;

    for profile in profiles.iter() {
        let mut row = vec![
            profile.record.name.clone(),
            profile.role.label().to_string(),
            tier_fraction(profile.percentile),
            class_cell(profile.record.class),
            profile.record.tenure.to_string(),
        ];
        row.extend(stat_cells(&profile.record.stats));
        row.push(optional(profile.original.plate_appearances));
        row.push(optional(profile.original.at_bats));
        row.push(
            profile
                .original
                .innings
                .map(|ip| Innings::from_innings(ip).to_string())
                .unwrap_or_default(),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Percentile tier as a fraction of one: 30 -> "0.3".
fn tier_fraction(percentile: u8) -> String {
    (f64::from(percentile) / 100.0).to_string()
}

fn write_roster_to_writer<W: Write>(roster: &ProjectedRoster, wtr: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    let mut header: Vec<String> = [
        "Team",
        "Name",
        "Season_Cleaned",
        "Class_Cleaned",
        "Varsity_Year",
        "Projection_Method",
        "Offensive_Rank_Team",
        "Pitching_Rank_Team",
    ]
    .map(String::from)
    .to_vec();
    header.extend(stat_headers());
    header.extend(
        [
            "Is_Batter",
            "Is_Pitcher",
            "Offensive_Rank",
            "Pitching_Rank",
            "RC_Score",
            "Pitching_Score",
        ]
        .map(String::from),
    );
    writer.write_record(&header)?;

    for p in &roster.players {
        let mut row = vec![
            p.record.team.clone(),
            p.record.name.clone(),
            p.record.season.to_string(),
            class_cell(p.record.class),
            p.record.tenure.to_string(),
            p.method.label(),
            rank_cell(p.ranks.offense_team),
            rank_cell(p.ranks.pitching_team),
        ];
        row.extend(stat_cells(&p.record.stats));
        row.push(p.roles.batter.to_string());
        row.push(p.roles.pitcher.to_string());
        row.push(rank_cell(p.ranks.offense_league));
        row.push(rank_cell(p.ranks.pitching_league));
        row.push(format!("{:.2}", p.scores.offense));
        row.push(format!("{:.2}", p.scores.pitching));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_strength_to_writer<W: Write>(teams: &[TeamStrength], wtr: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record([
        "Team",
        "Total_Power_Index",
        "Offense_Index",
        "Pitching_Index",
        "Projected_Runs",
        "Pitching_dominance",
        "Batters_Count",
        "Pitchers_Count",
        "Returning_Players",
        "Returning_Seniors",
        "Returning_Juniors",
        "Returning_Sophs",
        "Total_Varsity_Years",
        "Avg_Varsity_Years",
        "Top_Hitter",
        "Top_Hitter_RC",
        "Ace_Pitcher",
        "Ace_Score",
    ])?;

    for t in teams {
        let (hitter, hitter_score) = match &t.top_hitter {
            Some(c) => (c.name.clone(), format!("{:.2}", c.score)),
            None => ("N/A".to_string(), "0".to_string()),
        };
        let (ace, ace_score) = match &t.ace {
            Some(c) => (c.name.clone(), format!("{:.2}", c.score)),
            None => ("N/A".to_string(), "0".to_string()),
        };
        let c = &t.composition;
        writer.write_record([
            t.team.clone(),
            format!("{:.1}", t.total_power_index),
            format!("{:.1}", t.offense_index),
            format!("{:.1}", t.pitching_index),
            format!("{:.2}", t.projected_runs),
            format!("{:.2}", t.pitching_dominance),
            t.batters_count.to_string(),
            t.pitchers_count.to_string(),
            c.returning_players.to_string(),
            c.returning_seniors.to_string(),
            c.returning_juniors.to_string(),
            c.returning_sophomores.to_string(),
            c.total_varsity_years.to_string(),
            format!("{:.2}", c.avg_varsity_years),
            hitter,
            hitter_score,
            ace,
            ace_score,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_schedule_to_writer<W: Write>(games: &[GameProjection], wtr: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record([
        "Date",
        "Opponent",
        "Venue",
        "Win_Pct",
        "Proj_Score",
        "Confidence",
        "Analysis",
        "My_Off_Idx",
        "My_Pit_Idx",
        "Opp_Off_Idx",
        "Opp_Pit_Idx",
    ])?;
    for g in games {
        writer.write_record([
            g.label(),
            g.opponent.clone(),
            g.venue.label().to_string(),
            format!("{:.3}", g.win_probability),
            g.projected_score.clone(),
            g.confidence.label().to_string(),
            g.narrative.clone(),
            round2(g.team_rating.offense).to_string(),
            round2(g.team_rating.pitching).to_string(),
            round2(g.opponent_rating.offense).to_string(),
            round2(g.opponent_rating.pitching).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<File, DataError> {
    let io_err = |e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    File::create(path).map_err(io_err)
}

fn write_with<F>(path: &Path, write: F) -> Result<(), DataError>
where
    F: FnOnce(File) -> Result<(), csv::Error>,
{
    write(create(path)?).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("Wrote {}", path.display());
    Ok(())
}

pub fn write_multipliers(path: &Path, table: &MultiplierTable) -> Result<(), DataError> {
    write_with(path, |f| write_multipliers_to_writer(table, f))
}

pub fn write_profiles(path: &Path, profiles: &GenericProfiles) -> Result<(), DataError> {
    write_with(path, |f| write_profiles_to_writer(profiles, f))
}

pub fn write_roster(path: &Path, roster: &ProjectedRoster) -> Result<(), DataError> {
    write_with(path, |f| write_roster_to_writer(roster, f))
}

pub fn write_team_strength(path: &Path, teams: &[TeamStrength]) -> Result<(), DataError> {
    write_with(path, |f| write_strength_to_writer(teams, f))
}

pub fn write_schedule(path: &Path, games: &[GameProjection]) -> Result<(), DataError> {
    write_with(path, |f| write_schedule_to_writer(games, f))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipliers::{Transition, TransitionMultipliers};
    use crate::profiles::{GenericProfile, OriginalVolume, ProfileRole};
    use crate::projector::{ProjectedPlayer, ProjectionMethod};
    use crate::stats::Roles;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn to_string(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    // -- history --

    #[test]
    fn history_reads_notation_and_aliases() {
        let csv_data = "\
Name,Team,Season,Class,AB,H,IP,K_P,AVG
Ann Lee,Central,2024,So,40,12,10.1,14,.300
Bo Diaz,Central,2024,Junior,,3,0,,
";
        let table = read_history_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let ann = table.records().iter().find(|r| r.name == "Ann Lee").unwrap();
        assert_eq!(ann.season, 2024);
        assert_eq!(ann.class, Some(ClassYear::Sophomore));
        assert!(approx_eq(ann.stats.get(Stat::InningsPitched), 10.0 + 1.0 / 3.0, 1e-9));

        let bo = table.records().iter().find(|r| r.name == "Bo Diaz").unwrap();
        assert_eq!(bo.stats.raw(Stat::AtBats), None);
        assert_eq!(bo.stats.get(Stat::Hits), 3.0);
    }

    #[test]
    fn missing_columns_are_zero_filled() {
        let csv_data = "\
Name,Team,Season_Cleaned,Class_Cleaned,AB,H
Cy Park,North,2023,Freshman,20,5
";
        let table = read_history_from_reader(csv_data.as_bytes()).unwrap();
        let cy = &table.records()[0];
        assert_eq!(cy.stats.raw(Stat::HomeRuns), Some(0.0));
        assert_eq!(cy.stats.raw(Stat::InningsPitched), Some(0.0));
        assert_eq!(cy.stats.get(Stat::Hits), 5.0);
    }

    #[test]
    fn bad_innings_and_bad_rows_are_skipped() {
        let csv_data = "\
Name,Team,Season,Class,IP,H
Good Arm,East,2024,Jr,6.2,1
Bad Arm,East,2024,Jr,4.3,1
Bad Bat,East,2024,Jr,1.0,lots
No Season,East,,Jr,1.0,1
";
        let table = read_history_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].name, "Good Arm");
    }

    #[test]
    fn unknown_class_keeps_the_record() {
        let csv_data = "\
Name,Team,Season,Class,AB
Dee Fox,West,2024,Grad,12
";
        let table = read_history_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].class, None);
    }

    // -- schedule --

    #[test]
    fn schedule_parses_both_date_styles() {
        let csv_data = "\
Date,Home,Away
2026-03-14,Northside HS,Westfield
3/21/2026,Eastbrook, Northside HS
,Northside HS,Lakeview
";
        let games = read_schedule_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].date, NaiveDate::from_ymd_opt(2026, 3, 14));
        assert_eq!(games[1].date, NaiveDate::from_ymd_opt(2026, 3, 21));
        assert_eq!(games[1].away, "Northside HS");
        assert_eq!(games[2].date, None);
    }

    // -- writers --

    #[test]
    fn roster_writes_notation_and_unranked_sentinel() {
        let mut record = PlayerSeasonRecord::new("Eve Ray", "Central", 2026);
        record.class = Some(ClassYear::Junior);
        record.stats = StatLine::new()
            .with(Stat::InningsPitched, 10.0 + 1.0 / 3.0)
            .with(Stat::StrikeoutsPitched, 12.0);
        let player = ProjectedPlayer::new(
            record,
            ProjectionMethod::Identity,
            Roles {
                batter: false,
                pitcher: true,
            },
        );
        let roster = ProjectedRoster {
            target_year: 2026,
            players: crate::projector::assign_rankings(vec![player]),
        };
        let mut out = Vec::new();
        write_roster_to_writer(&roster, &mut out).unwrap();
        let text = to_string(out);
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Team,Name,Season_Cleaned,Class_Cleaned,Varsity_Year"));
        let row = lines.next().unwrap();
        assert!(row.contains(",10.1,"), "{row}");
        assert!(row.contains("Default (1.0)"));
        assert!(row.contains("9999"));
    }

    #[test]
    fn profiles_write_tier_as_fraction() {
        let mut record = PlayerSeasonRecord::new("Generic Sophomore Pitcher (30th %ile)", "", 2025);
        record.class = Some(ClassYear::Sophomore);
        record.stats = StatLine::new().with(Stat::InningsPitched, 12.0 + 2.0 / 3.0);
        let profiles = GenericProfiles::from_profiles(vec![GenericProfile {
            role: ProfileRole::Pitcher,
            percentile: 30,
            record,
            original: OriginalVolume {
                innings: Some(12.0 + 2.0 / 3.0),
                ..OriginalVolume::default()
            },
        }]);
        let mut out = Vec::new();
        write_profiles_to_writer(&profiles, &mut out).unwrap();
        let text = to_string(out);
        let row = text.lines().nth(1).unwrap();
        assert!(row.contains(",Pitcher,0.3,Sophomore,"), "{row}");
        assert!(row.ends_with(",12.2"), "{row}");
        assert_eq!(tier_fraction(50), "0.5");
        assert_eq!(tier_fraction(10), "0.1");
    }

    #[test]
    fn multipliers_leave_missing_ratios_blank() {
        let table = MultiplierTable::from_entries([TransitionMultipliers::new(
            Transition::Class {
                from: ClassYear::Sophomore,
                to: ClassYear::Junior,
            },
            7,
        )
        .with_ratio(Stat::Hits, 1.25)]);
        let mut out = Vec::new();
        write_multipliers_to_writer(&table, &mut out).unwrap();
        let text = to_string(out);
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("Sophomore_to_Junior,Class,7,"));
        assert!(row.contains(",1.25,"));
        assert!(row.contains(",,"));
    }

    #[test]
    fn strength_writes_na_for_missing_leaders() {
        let team = TeamStrength {
            team: "Empty HS".into(),
            total_power_index: 0.0,
            offense_index: 0.0,
            pitching_index: 0.0,
            projected_runs: 0.0,
            pitching_dominance: 0.0,
            batters_count: 0,
            pitchers_count: 0,
            top_hitter: None,
            ace: None,
            composition: Default::default(),
        };
        let mut out = Vec::new();
        write_strength_to_writer(&[team], &mut out).unwrap();
        let text = to_string(out);
        assert_eq!(text.lines().nth(1).unwrap().matches("N/A").count(), 2);
    }
}
