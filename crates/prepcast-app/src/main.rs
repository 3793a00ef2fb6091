// Prepcast entry point.
//
// Pipeline:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Read the historical player-season table
// 4. Fit multipliers and generic profiles, project the target season
// 5. Aggregate team strength into power rankings
// 6. Simulate the focal team's schedule (when configured)
// 7. Backtest the latest completed season
// 8. Write every artifact and print the leaderboard

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use prepcast_core::backtest;
use prepcast_core::config;
use prepcast_core::io;
use prepcast_core::multipliers::Cohort;
use prepcast_core::projector;
use prepcast_core::simulator::{self, SeasonOutlook};
use prepcast_core::strength::{self, LeagueSummary, TeamStrength};

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Prepcast starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let target_year = config.league.target_year;
    info!(
        "Config loaded: league={}, target year {}, {} elite programs",
        config.league.name,
        target_year,
        config.engine.programs.elite.len()
    );

    // 3. Read history
    let history_path = Path::new(&config.data_paths.history);
    let history = io::read_history(history_path)
        .with_context(|| format!("failed to load history from {}", history_path.display()))?;
    info!(
        "History: {} player-seasons across {} seasons",
        history.len(),
        history.seasons().len()
    );

    // 4. Project
    let projection = projector::project_season(&history, target_year, &config.engine)
        .with_context(|| format!("failed to project {target_year}"))?;

    // 5. Rank
    let rankings = strength::season_rankings(&projection.roster, &config.engine);

    let out_dir = PathBuf::from(&config.data_paths.output_dir);
    for (cohort, file) in [
        (Cohort::Pooled, "multipliers_pooled.csv"),
        (Cohort::Elite, "multipliers_elite.csv"),
        (Cohort::Standard, "multipliers_standard.csv"),
    ] {
        io::write_multipliers(&out_dir.join(file), projection.model.table(cohort))
            .context("failed to write multipliers")?;
    }
    io::write_profiles(&out_dir.join("generic_profiles.csv"), &projection.profiles)
        .context("failed to write generic profiles")?;
    io::write_roster(
        &out_dir.join(format!("projected_roster_{target_year}.csv")),
        &projection.roster,
    )
    .context("failed to write projected roster")?;
    io::write_team_strength(
        &out_dir.join(format!("team_strength_{target_year}.csv")),
        &rankings,
    )
    .context("failed to write team strength")?;

    print_leaderboard(&config.league.name, target_year, &rankings);

    // 6. Schedule simulation
    match (&config.league.focal_team, &config.data_paths.schedule) {
        (Some(team), Some(schedule_path)) => {
            let schedule = io::read_schedule(Path::new(schedule_path))
                .with_context(|| format!("failed to load schedule from {schedule_path}"))?;
            let outlook = simulator::simulate_season(
                team,
                &schedule,
                &rankings,
                &config.engine.simulation,
            );
            let file = format!("schedule_{}.csv", file_stem(team));
            io::write_schedule(&out_dir.join(file), &outlook.games)
                .context("failed to write schedule outlook")?;
            print_outlook(&outlook);
        }
        (Some(team), None) => {
            info!("No schedule configured; skipping simulation for {}", team);
        }
        _ => {}
    }

    // 7. Backtest the most recent observed season, if it has a predecessor
    if let Some(&latest) = history.seasons().iter().next_back() {
        if history.seasons().len() >= 2 {
            match backtest::run(&history, latest, &config.engine) {
                Ok(report) => {
                    println!(
                        "\nBacktest {}: power MAE {:.2} (offense {:.2}, pitching {:.2}) over {} teams",
                        latest,
                        report.total_mae(),
                        report.offense_mae(),
                        report.pitching_mae(),
                        report.teams.len()
                    );
                }
                Err(e) => warn!("Backtest for {} skipped: {}", latest, e),
            }
        }
    }

    info!("Prepcast finished");
    Ok(())
}

fn print_leaderboard(league: &str, year: i32, rankings: &[TeamStrength]) {
    println!("{league} - {year} projected power rankings");
    println!(
        "{:>4}  {:<28} {:>7} {:>7} {:>7}  {}",
        "Rank", "Team", "Power", "Offense", "Pitch", "Ace"
    );
    for (i, t) in rankings.iter().enumerate() {
        let ace = t.ace.as_ref().map(|c| c.name.as_str()).unwrap_or("N/A");
        println!(
            "{:>4}  {:<28} {:>7.1} {:>7.1} {:>7.1}  {}",
            i + 1,
            t.team,
            t.total_power_index,
            t.offense_index,
            t.pitching_index,
            ace
        );
    }

    let summary = LeagueSummary::from_rankings(rankings);
    println!(
        "\nLeague averages: power {:.1}, offense {:.1}, pitching {:.1}, {:.1} returning players",
        summary.avg_total_power,
        summary.avg_offense_index,
        summary.avg_pitching_index,
        summary.avg_returning_players
    );
}

fn print_outlook(outlook: &SeasonOutlook) {
    println!("\n{} schedule outlook", outlook.team);
    for g in &outlook.games {
        println!(
            "{:<12} {:<5} {:<28} {:>5.1}%  {:<9} {:<10} {}",
            g.label(),
            g.venue.label(),
            g.opponent,
            g.win_probability * 100.0,
            g.projected_score,
            g.confidence.label(),
            g.narrative
        );
    }
    println!(
        "Average record: {:.1} - {:.1}  (floor {:.0} wins, ceiling {:.0} wins)",
        outlook.average_wins,
        outlook.average_losses(),
        outlook.floor_wins,
        outlook.ceiling_wins
    );
}

fn file_stem(team: &str) -> String {
    team.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Initialize tracing to log to a file so stdout stays clean for reports.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("prepcast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("prepcast_core=info,prepcast_app=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
