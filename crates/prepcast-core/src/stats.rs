// Player-season records: the statistic catalogue, class years, stat lines,
// derived rate stats, and role qualification.

use std::fmt;

use crate::config::RoleConfig;
use crate::innings::Innings;

// ---------------------------------------------------------------------------
// Statistic catalogue
// ---------------------------------------------------------------------------

/// Which box-score group a statistic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatGroup {
    Batting,
    Pitching,
    Baserunning,
    Fielding,
}

/// Every counting statistic tracked on a player-season.
///
/// Rate stats (AVG, OBP, SLG, ERA, BAA) are never stored; they are derived
/// from these on demand by [`StatLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stat {
    PlateAppearances,
    AtBats,
    Hits,
    Doubles,
    Triples,
    HomeRuns,
    RunsBattedIn,
    Runs,
    SacrificeFlies,
    Walks,
    Strikeouts,
    HitByPitch,
    Appearances,
    InningsPitched,
    BattersFaced,
    StrikeoutsPitched,
    EarnedRuns,
    HitsAllowed,
    DoublesAllowed,
    TriplesAllowed,
    HomeRunsAllowed,
    WalksAllowed,
    StolenBases,
    TotalChances,
    Putouts,
    Assists,
    Errors,
    DoublePlays,
}

impl Stat {
    pub const COUNT: usize = 28;

    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::PlateAppearances,
        Stat::AtBats,
        Stat::Hits,
        Stat::Doubles,
        Stat::Triples,
        Stat::HomeRuns,
        Stat::RunsBattedIn,
        Stat::Runs,
        Stat::SacrificeFlies,
        Stat::Walks,
        Stat::Strikeouts,
        Stat::HitByPitch,
        Stat::Appearances,
        Stat::InningsPitched,
        Stat::BattersFaced,
        Stat::StrikeoutsPitched,
        Stat::EarnedRuns,
        Stat::HitsAllowed,
        Stat::DoublesAllowed,
        Stat::TriplesAllowed,
        Stat::HomeRunsAllowed,
        Stat::WalksAllowed,
        Stat::StolenBases,
        Stat::TotalChances,
        Stat::Putouts,
        Stat::Assists,
        Stat::Errors,
        Stat::DoublePlays,
    ];

    /// Position of this stat inside a [`StatLine`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used in the tabular files.
    pub fn column(self) -> &'static str {
        match self {
            Stat::PlateAppearances => "PA",
            Stat::AtBats => "AB",
            Stat::Hits => "H",
            Stat::Doubles => "2B",
            Stat::Triples => "3B",
            Stat::HomeRuns => "HR",
            Stat::RunsBattedIn => "RBI",
            Stat::Runs => "R",
            Stat::SacrificeFlies => "SF",
            Stat::Walks => "BB",
            Stat::Strikeouts => "K",
            Stat::HitByPitch => "HBP",
            Stat::Appearances => "APP",
            Stat::InningsPitched => "IP",
            Stat::BattersFaced => "BF",
            Stat::StrikeoutsPitched => "K_P",
            Stat::EarnedRuns => "ER",
            Stat::HitsAllowed => "H_P",
            Stat::DoublesAllowed => "2B_P",
            Stat::TriplesAllowed => "3B_P",
            Stat::HomeRunsAllowed => "HR_P",
            Stat::WalksAllowed => "BB_P",
            Stat::StolenBases => "SB",
            Stat::TotalChances => "TC",
            Stat::Putouts => "PO",
            Stat::Assists => "A",
            Stat::Errors => "E",
            Stat::DoublePlays => "DP",
        }
    }

    /// Look up a stat by its column name (case-sensitive, surrounding
    /// whitespace ignored).
    pub fn from_column(column: &str) -> Option<Stat> {
        let column = column.trim();
        Stat::ALL.iter().copied().find(|s| s.column() == column)
    }

    pub fn group(self) -> StatGroup {
        match self {
            Stat::PlateAppearances
            | Stat::AtBats
            | Stat::Hits
            | Stat::Doubles
            | Stat::Triples
            | Stat::HomeRuns
            | Stat::RunsBattedIn
            | Stat::Runs
            | Stat::SacrificeFlies
            | Stat::Walks
            | Stat::Strikeouts
            | Stat::HitByPitch => StatGroup::Batting,
            Stat::Appearances
            | Stat::InningsPitched
            | Stat::BattersFaced
            | Stat::StrikeoutsPitched
            | Stat::EarnedRuns
            | Stat::HitsAllowed
            | Stat::DoublesAllowed
            | Stat::TriplesAllowed
            | Stat::HomeRunsAllowed
            | Stat::WalksAllowed => StatGroup::Pitching,
            Stat::StolenBases => StatGroup::Baserunning,
            Stat::TotalChances
            | Stat::Putouts
            | Stat::Assists
            | Stat::Errors
            | Stat::DoublePlays => StatGroup::Fielding,
        }
    }

    /// Rare events whose year-over-year ratios get additive smoothing.
    pub fn is_rare_event(self) -> bool {
        matches!(
            self,
            Stat::Triples | Stat::HomeRuns | Stat::TriplesAllowed | Stat::HomeRunsAllowed
        )
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Class year
// ---------------------------------------------------------------------------

/// High-school class year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassYear {
    Freshman,
    Sophomore,
    Junior,
    Senior,
}

impl ClassYear {
    pub const ALL: [ClassYear; 4] = [
        ClassYear::Freshman,
        ClassYear::Sophomore,
        ClassYear::Junior,
        ClassYear::Senior,
    ];

    /// The class a player moves into the following season. Seniors graduate.
    pub fn next(self) -> Option<ClassYear> {
        match self {
            ClassYear::Freshman => Some(ClassYear::Sophomore),
            ClassYear::Sophomore => Some(ClassYear::Junior),
            ClassYear::Junior => Some(ClassYear::Senior),
            ClassYear::Senior => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClassYear::Freshman => "Freshman",
            ClassYear::Sophomore => "Sophomore",
            ClassYear::Junior => "Junior",
            ClassYear::Senior => "Senior",
        }
    }

    /// Parse the class labels that appear in roster exports: full names,
    /// abbreviations ("Jr.", "So"), and grade numbers ("11", "11th").
    pub fn parse(text: &str) -> Option<ClassYear> {
        let cleaned = text.trim().trim_end_matches('.').to_ascii_lowercase();
        match cleaned.as_str() {
            "freshman" | "fr" | "9" | "9th" => Some(ClassYear::Freshman),
            "sophomore" | "so" | "soph" | "10" | "10th" => Some(ClassYear::Sophomore),
            "junior" | "jr" | "11" | "11th" => Some(ClassYear::Junior),
            "senior" | "sr" | "12" | "12th" => Some(ClassYear::Senior),
            _ => None,
        }
    }
}

impl fmt::Display for ClassYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Stat line
// ---------------------------------------------------------------------------

/// A fixed set of counting stats. Each slot is `None` when the source row had
/// no value for it; every formula reads through [`StatLine::get`], which
/// treats a missing value as zero.
///
/// `InningsPitched` is stored as true fractional innings (10.1 in box-score
/// notation is stored as 10.333...). Use [`StatLine::innings`] for the typed
/// view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatLine {
    values: [Option<f64>; Stat::COUNT],
}

impl StatLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value with missing treated as zero.
    pub fn get(&self, stat: Stat) -> f64 {
        self.values[stat.index()].unwrap_or(0.0)
    }

    /// Value as recorded, `None` if missing.
    pub fn raw(&self, stat: Stat) -> Option<f64> {
        self.values[stat.index()]
    }

    pub fn set(&mut self, stat: Stat, value: f64) {
        self.values[stat.index()] = Some(value);
    }

    pub fn clear(&mut self, stat: Stat) {
        self.values[stat.index()] = None;
    }

    /// Builder-style setter.
    pub fn with(mut self, stat: Stat, value: f64) -> Self {
        self.set(stat, value);
        self
    }

    /// Set every stat in `group` to exactly zero.
    pub fn zero_group(&mut self, group: StatGroup) {
        for stat in Stat::ALL.iter().filter(|s| s.group() == group) {
            self.values[stat.index()] = Some(0.0);
        }
    }

    pub fn innings(&self) -> Innings {
        Innings::from_innings(self.get(Stat::InningsPitched))
    }

    // -- derived rates --

    pub fn batting_average(&self) -> f64 {
        ratio(self.get(Stat::Hits), self.get(Stat::AtBats))
    }

    pub fn on_base_percentage(&self) -> f64 {
        let on_base = self.get(Stat::Hits) + self.get(Stat::Walks) + self.get(Stat::HitByPitch);
        let chances = self.get(Stat::AtBats)
            + self.get(Stat::Walks)
            + self.get(Stat::HitByPitch)
            + self.get(Stat::SacrificeFlies);
        ratio(on_base, chances)
    }

    pub fn total_bases(&self) -> f64 {
        let hits = self.get(Stat::Hits);
        let doubles = self.get(Stat::Doubles);
        let triples = self.get(Stat::Triples);
        let homers = self.get(Stat::HomeRuns);
        let singles = (hits - (doubles + triples + homers)).max(0.0);
        singles + 2.0 * doubles + 3.0 * triples + 4.0 * homers
    }

    pub fn slugging(&self) -> f64 {
        ratio(self.total_bases(), self.get(Stat::AtBats))
    }

    /// Earned run average over a seven-inning high-school game.
    pub fn earned_run_average(&self) -> f64 {
        ratio(self.get(Stat::EarnedRuns) * 7.0, self.get(Stat::InningsPitched))
    }

    /// Opponent batting average: hits allowed over at-bats faced.
    pub fn batting_average_against(&self) -> f64 {
        let at_bats_faced = self.get(Stat::BattersFaced) - self.get(Stat::WalksAllowed);
        ratio(self.get(Stat::HitsAllowed), at_bats_faced)
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Player-season record
// ---------------------------------------------------------------------------

/// Role capability flags. A player may hold both, one, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roles {
    pub batter: bool,
    pub pitcher: bool,
}

/// One player, one team, one season.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonRecord {
    pub name: String,
    pub team: String,
    pub season: i32,
    /// `None` when the source class label could not be interpreted.
    pub class: Option<ClassYear>,
    /// Count of varsity seasons including this one (1 = first season).
    pub tenure: u32,
    pub stats: StatLine,
}

impl PlayerSeasonRecord {
    pub fn new(name: impl Into<String>, team: impl Into<String>, season: i32) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            season,
            class: None,
            tenure: 1,
            stats: StatLine::new(),
        }
    }

    pub fn is_batter(&self, roles: &RoleConfig) -> bool {
        self.stats.get(Stat::AtBats) >= roles.min_at_bats
    }

    pub fn is_pitcher(&self, roles: &RoleConfig) -> bool {
        self.stats.innings().value() >= roles.min_innings
    }

    pub fn roles(&self, roles: &RoleConfig) -> Roles {
        Roles {
            batter: self.is_batter(roles),
            pitcher: self.is_pitcher(roles),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
