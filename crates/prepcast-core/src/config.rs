// Configuration loading and parsing (league.toml, model.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::stats::Stat;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to seed {path} from defaults: {source}")]
    SeedError {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub engine: EngineConfig,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct LeagueSection {
    name: String,
    target_year: i32,
    #[serde(default)]
    focal_team: Option<String>,
    #[serde(default)]
    elite_programs: Vec<String>,
    #[serde(default)]
    teams: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub name: String,
    /// Season being projected. The base year is `target_year - 1`.
    pub target_year: i32,
    /// Team whose schedule gets a game-by-game outlook (optional).
    pub focal_team: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub history: String,
    #[serde(default)]
    pub schedule: Option<String>,
    pub output_dir: String,
}

// ---------------------------------------------------------------------------
// model.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for model.toml. Every section is optional and
/// falls back to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ModelFile {
    roles: RoleConfig,
    multipliers: MultiplierConfig,
    profiles: ProfileConfig,
    projection: ProjectionConfig,
    strength: StrengthConfig,
    simulation: SimulationConfig,
}

/// Every tunable used by the engine, assembled from both config files.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub programs: ProgramConfig,
    pub roles: RoleConfig,
    pub multipliers: MultiplierConfig,
    pub profiles: ProfileConfig,
    pub projection: ProjectionConfig,
    pub strength: StrengthConfig,
    pub simulation: SimulationConfig,
}

impl EngineConfig {
    pub fn is_elite(&self, team: &str) -> bool {
        self.programs.elite.iter().any(|t| t == team)
    }
}

/// Program membership: which teams are elite, plus teams that must appear in
/// the projection even without returning players.
#[derive(Debug, Clone, Default)]
pub struct ProgramConfig {
    pub elite: Vec<String>,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// At-bats needed to count as a batter.
    pub min_at_bats: f64,
    /// True innings needed to count as a pitcher.
    pub min_innings: f64,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            min_at_bats: 10.0,
            min_innings: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MultiplierConfig {
    /// Prior-season plate appearances needed before a pair contributes to a
    /// batting or fielding ratio.
    pub min_prior_pa: f64,
    /// Prior-season innings needed before a pair contributes to a pitching
    /// ratio.
    pub min_prior_ip: f64,
    /// Minimum contributing pairs per stat; fewer yields no ratio (identity).
    pub min_ratio_samples: usize,
    /// Additive smoothing for rare-event stats.
    pub rare_event_smoothing: f64,
    pub floor: f64,
    pub ceiling: f64,
    /// Minimum sample size for a transition to be used by the fallback.
    pub min_transition_sample: usize,
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            min_prior_pa: 10.0,
            min_prior_ip: 5.0,
            min_ratio_samples: 3,
            rare_event_smoothing: 1.0,
            floor: 0.2,
            ceiling: 3.0,
            min_transition_sample: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Percentile tiers (whole percents) to build generic profiles for.
    pub tiers: Vec<u8>,
    /// Qualifying volume for the sophomore batter population.
    pub min_batter_pa: f64,
    /// Qualifying volume for the sophomore pitcher population.
    pub min_pitcher_ip: f64,
    /// Width of the percentile bucket below each tier.
    pub bucket_width: f64,
    /// Extra margin applied on each side when the bucket is empty.
    pub fallback_margin: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            tiers: vec![10, 20, 30, 40, 50],
            min_batter_pa: 10.0,
            min_pitcher_ip: 3.0,
            bucket_width: 0.10,
            fallback_margin: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub min_batters: usize,
    pub min_pitchers: usize,
    /// Global multiplicative dampening applied to every projected stat.
    pub survivor_dampening: f64,
    pub elite_ladder: Vec<u8>,
    pub standard_ladder: Vec<u8>,
    /// Plate appearances above which an underclassman's gains regress.
    pub regression_pa_threshold: f64,
    /// Innings above which an underclassman's gains regress.
    pub regression_ip_threshold: f64,
    pub regression_strength: f64,
    /// Per-stat upper bounds keyed by column name ("HR", "K_P", ...).
    pub caps: BTreeMap<String, f64>,
}

impl ProjectionConfig {
    pub fn cap_for(&self, stat: Stat) -> Option<f64> {
        self.caps.get(stat.column()).copied()
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        let caps = [
            ("H", 75.0),
            ("PA", 200.0),
            ("AB", 180.0),
            ("RBI", 60.0),
            ("R", 60.0),
            ("HR", 15.0),
            ("2B", 25.0),
            ("3B", 10.0),
            ("BB", 50.0),
            ("K", 70.0),
            ("SB", 40.0),
            ("IP", 70.0),
            ("APP", 25.0),
            ("K_P", 100.0),
            ("BB_P", 40.0),
            ("ER", 50.0),
            ("H_P", 80.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            min_batters: 10,
            min_pitchers: 6,
            survivor_dampening: 0.95,
            elite_ladder: vec![50, 20, 10],
            standard_ladder: vec![30, 10],
            regression_pa_threshold: 80.0,
            regression_ip_threshold: 30.0,
            regression_strength: 0.5,
            caps,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrengthConfig {
    pub top_batters: usize,
    pub top_pitchers: usize,
    /// Players scoring at or below this are excluded from aggregation.
    pub min_contribution: f64,
    pub batter_boosts: Vec<f64>,
    pub pitcher_boosts: Vec<f64>,
    pub seniority: SeniorityWeights,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            top_batters: 9,
            top_pitchers: 5,
            min_contribution: 0.1,
            batter_boosts: vec![1.2, 1.15, 1.1],
            pitcher_boosts: vec![1.5, 1.25],
            seniority: SeniorityWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeniorityWeights {
    pub generic: f64,
    pub senior: f64,
    pub junior: f64,
    pub underclass: f64,
}

impl Default for SeniorityWeights {
    fn default() -> Self {
        Self {
            generic: 0.75,
            senior: 1.10,
            junior: 1.00,
            underclass: 0.90,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub iterations: usize,
    /// Variance-to-mean ratio of simulated runs. Must exceed 1.
    pub dispersion: f64,
    pub home_field_boost: f64,
    pub league_runs_per_game: f64,
    /// Lower bound for relative ratings so ratios stay finite.
    pub index_floor: f64,
    /// Relative rating used for opponents with no projection.
    pub generic_opponent_rating: f64,
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000,
            dispersion: 1.3,
            home_field_boost: 1.10,
            league_runs_per_game: 6.0,
            index_floor: 0.1,
            generic_opponent_rating: 0.8,
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/model.toml` relative to `base_dir`. A missing model.toml means
/// built-in defaults for every model section.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    // --- model.toml (optional) ---
    let model_path = config_dir.join("model.toml");
    let model = if model_path.exists() {
        let model_text = read_file(&model_path)?;
        toml::from_str(&model_text).map_err(|e| ConfigError::ParseError {
            path: model_path.clone(),
            source: e,
        })?
    } else {
        ModelFile::default()
    };

    let LeagueFile { league, data_paths } = league_file;
    let config = Config {
        league: LeagueConfig {
            name: league.name,
            target_year: league.target_year,
            focal_team: league.focal_team,
        },
        engine: EngineConfig {
            programs: ProgramConfig {
                elite: league.elite_programs,
                teams: league.teams,
            },
            roles: model.roles,
            multipliers: model.multipliers,
            profiles: model.profiles,
            projection: model.projection,
            strength: model.strength,
            simulation: model.simulation,
        },
        data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Files the pipeline reads from `config/`. Only `league.toml` is required;
/// a missing `model.toml` falls back to the built-in constants.
pub const CONFIG_FILES: [&str; 2] = ["league.toml", "model.toml"];

/// Seed `config/` with any of [`CONFIG_FILES`] it lacks, copied from
/// `defaults/`. Existing files are left alone. Returns the names seeded.
pub fn seed_config_dir(base_dir: &Path) -> Result<Vec<&'static str>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let mut seeded = Vec::new();
    for file in CONFIG_FILES {
        let target = config_dir.join(file);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(file);
        if !source.is_file() {
            debug!("No default for {}; leaving it unset", file);
            continue;
        }
        std::fs::create_dir_all(&config_dir).map_err(|e| seed_error(&config_dir, e))?;
        let content = std::fs::read(&source).map_err(|e| seed_error(&source, e))?;
        // create_new so a file written since the exists() check is kept.
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                std::io::Write::write_all(&mut dest, &content)
                    .map_err(|e| seed_error(&target, e))?;
                info!("Seeded {} from {}", target.display(), source.display());
                seeded.push(file);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(seed_error(&target, e)),
        }
    }
    Ok(seeded)
}

fn seed_error(path: &Path, source: std::io::Error) -> ConfigError {
    ConfigError::SeedError {
        path: path.to_path_buf(),
        source,
    }
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Seeds missing config files from `defaults/` before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    seed_config_dir(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.target_year <= 0 {
        return Err(invalid("league.target_year", "must be a positive year"));
    }
    if let Some(team) = &config.league.focal_team {
        if team.trim().is_empty() {
            return Err(invalid("league.focal_team", "must name a team or be omitted"));
        }
    }
    validate_engine(&config.engine)
}

/// Check every engine tunable. Public so callers building an `EngineConfig`
/// in code get the same guarantees as file-loaded configs.
pub fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    let roles = &engine.roles;
    if roles.min_at_bats < 0.0 {
        return Err(invalid("roles.min_at_bats", "must be >= 0"));
    }
    if roles.min_innings < 0.0 {
        return Err(invalid("roles.min_innings", "must be >= 0"));
    }

    let m = &engine.multipliers;
    if m.floor < 0.0 || m.floor >= m.ceiling {
        return Err(invalid(
            "multipliers.floor",
            format!("must satisfy 0 <= floor < ceiling, got {} / {}", m.floor, m.ceiling),
        ));
    }
    if m.min_ratio_samples == 0 {
        return Err(invalid("multipliers.min_ratio_samples", "must be > 0"));
    }
    if m.rare_event_smoothing < 0.0 {
        return Err(invalid("multipliers.rare_event_smoothing", "must be >= 0"));
    }

    let p = &engine.profiles;
    if p.tiers.is_empty() {
        return Err(invalid("profiles.tiers", "must list at least one tier"));
    }
    if let Some(t) = p.tiers.iter().find(|t| **t == 0 || **t > 100) {
        return Err(invalid("profiles.tiers", format!("tier {t} outside 1..=100")));
    }
    if p.bucket_width <= 0.0 || p.bucket_width > 1.0 {
        return Err(invalid("profiles.bucket_width", "must be in (0, 1]"));
    }

    let proj = &engine.projection;
    if !(proj.survivor_dampening > 0.0 && proj.survivor_dampening <= 1.0) {
        return Err(invalid(
            "projection.survivor_dampening",
            format!("must be in (0, 1], got {}", proj.survivor_dampening),
        ));
    }
    for (field, ladder) in [
        ("projection.elite_ladder", &proj.elite_ladder),
        ("projection.standard_ladder", &proj.standard_ladder),
    ] {
        if ladder.is_empty() {
            return Err(invalid(field, "must list at least one tier"));
        }
        if let Some(t) = ladder.iter().find(|t| !p.tiers.contains(t)) {
            return Err(invalid(field, format!("tier {t} has no generic profile")));
        }
    }
    if proj.elite_ladder.last() != proj.standard_ladder.last() {
        return Err(invalid(
            "projection.standard_ladder",
            "both ladders must bottom out at the same floor tier",
        ));
    }
    if !(0.0..=1.0).contains(&proj.regression_strength) {
        return Err(invalid("projection.regression_strength", "must be in [0, 1]"));
    }
    if proj.regression_pa_threshold <= 0.0 || proj.regression_ip_threshold <= 0.0 {
        return Err(invalid("projection.regression_pa_threshold", "thresholds must be > 0"));
    }
    for (key, cap) in &proj.caps {
        if Stat::from_column(key).is_none() {
            return Err(invalid(&format!("projection.caps.{key}"), "unknown stat column"));
        }
        if *cap < 0.0 {
            return Err(invalid(&format!("projection.caps.{key}"), "must be >= 0"));
        }
    }

    let s = &engine.strength;
    if s.top_batters == 0 {
        return Err(invalid("strength.top_batters", "must be > 0"));
    }
    if s.top_pitchers == 0 {
        return Err(invalid("strength.top_pitchers", "must be > 0"));
    }
    if s.batter_boosts.iter().chain(&s.pitcher_boosts).any(|b| *b <= 0.0) {
        return Err(invalid("strength.batter_boosts", "boosts must be > 0"));
    }

    let sim = &engine.simulation;
    if sim.iterations == 0 {
        return Err(invalid("simulation.iterations", "must be > 0"));
    }
    if sim.dispersion <= 1.0 {
        return Err(invalid(
            "simulation.dispersion",
            format!("must be > 1.0, got {}", sim.dispersion),
        ));
    }
    if sim.home_field_boost <= 0.0 {
        return Err(invalid("simulation.home_field_boost", "must be > 0"));
    }
    if sim.league_runs_per_game <= 0.0 {
        return Err(invalid("simulation.league_runs_per_game", "must be > 0"));
    }
    if sim.index_floor <= 0.0 {
        return Err(invalid("simulation.index_floor", "must be > 0"));
    }
    if sim.generic_opponent_rating <= 0.0 {
        return Err(invalid("simulation.generic_opponent_rating", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let root = manifest.join("../..");
        assert!(
            root.join("defaults").exists(),
            "Cannot locate defaults/ from {manifest:?}"
        );
        root
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    fn copy_default(tmp: &Path, file: &str) {
        fs::copy(
            project_root().join("defaults").join(file),
            tmp.join("config").join(file),
        )
        .unwrap();
    }

    fn expect_validation_field(err: ConfigError, expected: &str) {
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_project_files() {
        let tmp = scratch_dir("prepcast_config_defaults");
        copy_default(&tmp, "league.toml");
        copy_default(&tmp, "model.toml");

        let config = load_config_from(&tmp).expect("should load valid config");
        assert!(config.league.target_year > 2000);
        assert_eq!(config.data_paths.output_dir, "output");
        assert!(!config.engine.programs.elite.is_empty());

        let engine = &config.engine;
        assert_eq!(engine.projection.elite_ladder, vec![50, 20, 10]);
        assert_eq!(engine.projection.standard_ladder, vec![30, 10]);
        assert_eq!(engine.projection.min_batters, 10);
        assert_eq!(engine.projection.cap_for(Stat::HomeRuns), Some(15.0));
        assert_eq!(engine.projection.cap_for(Stat::Putouts), None);
        assert_eq!(engine.strength.top_batters, 9);
        assert!((engine.simulation.dispersion - 1.3).abs() < f64::EPSILON);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_model_toml_uses_defaults() {
        let tmp = scratch_dir("prepcast_config_no_model");
        copy_default(&tmp, "league.toml");

        let config = load_config_from(&tmp).expect("should load without model.toml");
        assert_eq!(config.engine.strength.top_pitchers, 5);
        assert_eq!(config.engine.multipliers.min_transition_sample, 5);
        assert_eq!(config.engine.simulation.iterations, 1_000);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn partial_model_toml_keeps_other_defaults() {
        let tmp = scratch_dir("prepcast_config_partial_model");
        copy_default(&tmp, "league.toml");
        fs::write(
            tmp.join("config/model.toml"),
            "[simulation]\niterations = 500\nseed = 7\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.engine.simulation.iterations, 500);
        assert_eq!(config.engine.simulation.seed, Some(7));
        assert!((config.engine.simulation.home_field_boost - 1.10).abs() < f64::EPSILON);
        assert_eq!(config.engine.projection.min_pitchers, 6);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_dispersion_at_or_below_one() {
        let tmp = scratch_dir("prepcast_config_dispersion");
        copy_default(&tmp, "league.toml");
        fs::write(tmp.join("config/model.toml"), "[simulation]\ndispersion = 1.0\n").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "simulation.dispersion");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_ladder_tier_without_profile() {
        let tmp = scratch_dir("prepcast_config_ladder");
        copy_default(&tmp, "league.toml");
        fs::write(
            tmp.join("config/model.toml"),
            "[projection]\nelite_ladder = [50, 25]\n",
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "projection.elite_ladder");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_cap_column() {
        let tmp = scratch_dir("prepcast_config_caps");
        copy_default(&tmp, "league.toml");
        fs::write(tmp.join("config/model.toml"), "[projection.caps]\nWAR = 3.0\n").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "projection.caps.WAR");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_inverted_multiplier_clamp() {
        let mut engine = EngineConfig::default();
        engine.multipliers.floor = 2.0;
        engine.multipliers.ceiling = 1.5;
        expect_validation_field(validate_engine(&engine).unwrap_err(), "multipliers.floor");
    }

    #[test]
    fn defaults_pass_validation() {
        validate_engine(&EngineConfig::default()).expect("built-in defaults are valid");
    }

    #[test]
    fn file_not_found_for_missing_league_toml() {
        let tmp = scratch_dir("prepcast_config_missing_league");
        copy_default(&tmp, "model.toml");

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("league.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch_dir("prepcast_config_invalid_toml");
        fs::write(tmp.join("config/league.toml"), "this is not valid [[[ toml").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("league.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn elite_membership_is_exact_match() {
        let engine = EngineConfig {
            programs: ProgramConfig {
                elite: vec!["Northside HS".into()],
                teams: vec![],
            },
            ..EngineConfig::default()
        };
        assert!(engine.is_elite("Northside HS"));
        assert!(!engine.is_elite("Northside"));
    }

    #[test]
    fn rejects_blank_focal_team() {
        let tmp = scratch_dir("prepcast_config_blank_focal");
        let league = fs::read_to_string(project_root().join("defaults/league.toml"))
            .unwrap()
            .replace("focal_team = \"Northside HS\"", "focal_team = \"  \"");
        fs::write(tmp.join("config/league.toml"), league).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "league.focal_team");

        let _ = fs::remove_dir_all(&tmp);
    }

    // -- seeding --

    fn defaults_only_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        for file in CONFIG_FILES {
            fs::copy(project_root().join("defaults").join(file), defaults_dir.join(file))
                .unwrap();
        }
        tmp
    }

    #[test]
    fn fresh_checkout_seeds_both_files_and_loads() {
        let tmp = defaults_only_dir("prepcast_config_seed_fresh");
        fs::write(tmp.join("defaults/notes.txt"), "not a config file\n").unwrap();

        let seeded = seed_config_dir(&tmp).expect("seeding should succeed");
        assert_eq!(seeded, vec!["league.toml", "model.toml"]);
        assert!(!tmp.join("config/notes.txt").exists());

        let config = load_config_from(&tmp).expect("seeded config should load");
        assert_eq!(config.league.target_year, 2026);
        assert_eq!(config.league.focal_team.as_deref(), Some("Northside HS"));
        assert!(config.engine.is_elite("Lakeview Academy"));

        // Second run has nothing left to seed.
        assert!(seed_config_dir(&tmp).unwrap().is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn edited_league_file_survives_seeding() {
        let tmp = defaults_only_dir("prepcast_config_seed_keeps_edits");
        fs::create_dir_all(tmp.join("config")).unwrap();
        let edited = fs::read_to_string(tmp.join("defaults/league.toml"))
            .unwrap()
            .replace("target_year = 2026", "target_year = 2027");
        fs::write(tmp.join("config/league.toml"), &edited).unwrap();

        let seeded = seed_config_dir(&tmp).unwrap();
        assert_eq!(seeded, vec!["model.toml"]);
        assert_eq!(
            fs::read_to_string(tmp.join("config/league.toml")).unwrap(),
            edited
        );
        assert_eq!(load_config_from(&tmp).unwrap().league.target_year, 2027);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_defaults_leave_league_file_unresolved() {
        let tmp = std::env::temp_dir().join("prepcast_config_seed_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(seed_config_dir(&tmp).unwrap().is_empty());
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("league.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
