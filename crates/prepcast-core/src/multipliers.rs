// Development multipliers: median year-over-year ratios per statistic, keyed
// by class, tenure, or class+tenure transition, computed separately for the
// pooled league and for elite and standard programs.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::config::{EngineConfig, MultiplierConfig};
use crate::history::{HistoricalTable, SeasonPair};
use crate::stats::{ClassYear, PlayerSeasonRecord, Stat, StatGroup};

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransitionKind {
    Class,
    Tenure,
    ClassTenure,
}

impl TransitionKind {
    pub fn label(self) -> &'static str {
        match self {
            TransitionKind::Class => "Class",
            TransitionKind::Tenure => "Tenure",
            TransitionKind::ClassTenure => "Class_Tenure",
        }
    }
}

/// A directional change between two seasons of the same player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transition {
    Class {
        from: ClassYear,
        to: ClassYear,
    },
    Tenure {
        from: u32,
        to: u32,
    },
    ClassTenure {
        from: (ClassYear, u32),
        to: (ClassYear, u32),
    },
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Transition::Class { .. } => TransitionKind::Class,
            Transition::Tenure { .. } => TransitionKind::Tenure,
            Transition::ClassTenure { .. } => TransitionKind::ClassTenure,
        }
    }

    /// Every transition a season pair belongs to: tenure always, class and
    /// class+tenure only when both seasons carry a class.
    pub fn classify(prior: &PlayerSeasonRecord, next: &PlayerSeasonRecord) -> Vec<Transition> {
        let mut out = vec![Transition::Tenure {
            from: prior.tenure,
            to: next.tenure,
        }];
        if let (Some(from), Some(to)) = (prior.class, next.class) {
            out.push(Transition::Class { from, to });
            out.push(Transition::ClassTenure {
                from: (from, prior.tenure),
                to: (to, next.tenure),
            });
        }
        out
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Class { from, to } => write!(f, "{from}_to_{to}"),
            Transition::Tenure { from, to } => write!(f, "Varsity_Year{from}_to_Year{to}"),
            Transition::ClassTenure { from, to } => {
                write!(f, "{}_Y{}_to_{}_Y{}", from.0, from.1, to.0, to.1)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Multiplier table
// ---------------------------------------------------------------------------

/// Published ratios for one transition. A stat with too few usable
/// observations has no ratio and projects unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMultipliers {
    pub transition: Transition,
    pub sample_size: usize,
    pub volatility: f64,
    ratios: [Option<f64>; Stat::COUNT],
}

impl TransitionMultipliers {
    pub fn new(transition: Transition, sample_size: usize) -> Self {
        Self {
            transition,
            sample_size,
            volatility: 0.0,
            ratios: [None; Stat::COUNT],
        }
    }

    pub fn with_ratio(mut self, stat: Stat, ratio: f64) -> Self {
        self.ratios[stat.index()] = Some(ratio);
        self
    }

    pub fn ratio(&self, stat: Stat) -> Option<f64> {
        self.ratios[stat.index()]
    }

    /// Ratio to apply, 1.0 when none was published.
    pub fn factor(&self, stat: Stat) -> f64 {
        self.ratio(stat).unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiplierTable {
    entries: BTreeMap<Transition, TransitionMultipliers>,
}

impl MultiplierTable {
    pub fn from_entries(entries: impl IntoIterator<Item = TransitionMultipliers>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.transition, e)).collect(),
        }
    }

    /// Bucket every pair by transition and summarize each bucket.
    pub fn compute(pairs: &[SeasonPair<'_>], config: &MultiplierConfig) -> Self {
        let mut buckets: BTreeMap<Transition, Vec<SeasonPair<'_>>> = BTreeMap::new();
        for pair in pairs {
            for transition in Transition::classify(pair.prior, pair.next) {
                buckets.entry(transition).or_default().push(*pair);
            }
        }
        Self::from_entries(
            buckets
                .into_iter()
                .map(|(transition, observed)| summarize(transition, &observed, config)),
        )
    }

    pub fn get(&self, transition: &Transition) -> Option<&TransitionMultipliers> {
        self.entries.get(transition)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionMultipliers> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn summarize(
    transition: Transition,
    pairs: &[SeasonPair<'_>],
    config: &MultiplierConfig,
) -> TransitionMultipliers {
    let mut out = TransitionMultipliers::new(transition, pairs.len());
    let mut spreads = Vec::new();

    for stat in Stat::ALL {
        let samples = stat_ratios(stat, pairs, config);
        if samples.len() < config.min_ratio_samples {
            continue;
        }
        if let Some(sd) = sample_std_dev(&samples) {
            spreads.push(sd);
        }
        if let Some(m) = median(&samples) {
            out.ratios[stat.index()] = Some(round3(m.clamp(config.floor, config.ceiling)));
        }
    }

    if !spreads.is_empty() {
        out.volatility = spreads.iter().sum::<f64>() / spreads.len() as f64;
    }
    debug!(
        "{transition}: n={} volatility={:.3}",
        out.sample_size, out.volatility
    );
    out
}

/// next/prior for every pair with enough prior volume and a positive prior
/// value. Rare events are smoothed on both sides.
fn stat_ratios(stat: Stat, pairs: &[SeasonPair<'_>], config: &MultiplierConfig) -> Vec<f64> {
    let smoothing = if stat.is_rare_event() {
        config.rare_event_smoothing
    } else {
        0.0
    };
    pairs
        .iter()
        .filter(|p| has_prior_volume(stat, p.prior, config))
        .filter_map(|p| {
            let prior = p.prior.stats.raw(stat).filter(|v| *v > 0.0)?;
            let next = p.next.stats.raw(stat)?;
            let ratio = (next + smoothing) / (prior + smoothing);
            (ratio.is_finite() && ratio >= 0.0).then_some(ratio)
        })
        .collect()
}

fn has_prior_volume(stat: Stat, prior: &PlayerSeasonRecord, config: &MultiplierConfig) -> bool {
    match stat.group() {
        StatGroup::Pitching => prior.stats.innings().value() >= config.min_prior_ip,
        _ => prior.stats.get(Stat::PlateAppearances) >= config.min_prior_pa,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Summary helpers
// ---------------------------------------------------------------------------

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
pub(crate) fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

// ---------------------------------------------------------------------------
// Program-tier cohorts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramTier {
    Elite,
    Standard,
}

impl ProgramTier {
    pub fn of(team: &str, config: &EngineConfig) -> Self {
        if config.is_elite(team) {
            ProgramTier::Elite
        } else {
            ProgramTier::Standard
        }
    }
}

/// Which population a multiplier table was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cohort {
    Pooled,
    Elite,
    Standard,
}

impl Cohort {
    pub fn label(self) -> &'static str {
        match self {
            Cohort::Pooled => "Pooled",
            Cohort::Elite => "Elite",
            Cohort::Standard => "Standard",
        }
    }
}

impl From<ProgramTier> for Cohort {
    fn from(tier: ProgramTier) -> Self {
        match tier {
            ProgramTier::Elite => Cohort::Elite,
            ProgramTier::Standard => Cohort::Standard,
        }
    }
}

/// The three multiplier tables fitted from one historical table.
#[derive(Debug, Clone, Default)]
pub struct DevelopmentModel {
    pooled: MultiplierTable,
    elite: MultiplierTable,
    standard: MultiplierTable,
}

impl DevelopmentModel {
    pub fn new(pooled: MultiplierTable, elite: MultiplierTable, standard: MultiplierTable) -> Self {
        Self {
            pooled,
            elite,
            standard,
        }
    }

    /// Fit every cohort. A pair belongs to the elite cohort when its prior
    /// season was played for an elite program.
    pub fn fit(history: &HistoricalTable, config: &EngineConfig) -> Self {
        let pairs = history.adjacent_pairs();
        let (elite_pairs, standard_pairs): (Vec<SeasonPair<'_>>, Vec<SeasonPair<'_>>) = pairs
            .iter()
            .copied()
            .partition(|p| config.is_elite(&p.prior.team));

        let model = Self {
            pooled: MultiplierTable::compute(&pairs, &config.multipliers),
            elite: MultiplierTable::compute(&elite_pairs, &config.multipliers),
            standard: MultiplierTable::compute(&standard_pairs, &config.multipliers),
        };
        info!(
            "development model: {} pairs, {} pooled / {} elite / {} standard transitions",
            pairs.len(),
            model.pooled.len(),
            model.elite.len(),
            model.standard.len()
        );
        model
    }

    pub fn table(&self, cohort: Cohort) -> &MultiplierTable {
        match cohort {
            Cohort::Pooled => &self.pooled,
            Cohort::Elite => &self.elite,
            Cohort::Standard => &self.standard,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pooled.is_empty() && self.elite.is_empty() && self.standard.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgramConfig;
    use crate::stats::StatLine;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn season(
        name: &str,
        team: &str,
        year: i32,
        class: ClassYear,
        stats: StatLine,
    ) -> PlayerSeasonRecord {
        let mut r = PlayerSeasonRecord::new(name, team, year);
        r.class = Some(class);
        r.stats = stats;
        r
    }

    fn batting(pa: f64, hits: f64, homers: f64) -> StatLine {
        StatLine::new()
            .with(Stat::PlateAppearances, pa)
            .with(Stat::AtBats, pa - 5.0)
            .with(Stat::Hits, hits)
            .with(Stat::HomeRuns, homers)
    }

    /// Five sophomores who each double their hits as juniors.
    fn doubling_history(team: &str) -> HistoricalTable {
        let mut records = Vec::new();
        for i in 0..5 {
            let name = format!("Player {i}");
            let base = 10.0 + i as f64;
            records.push(season(&name, team, 2023, ClassYear::Sophomore, batting(40.0, base, 1.0)));
            records.push(season(&name, team, 2024, ClassYear::Junior, batting(60.0, base * 2.0, 3.0)));
        }
        HistoricalTable::new(records)
    }

    // -- transition classification --

    #[test]
    fn classify_yields_three_transitions_with_classes() {
        let mut prior = PlayerSeasonRecord::new("A", "T", 2023);
        prior.class = Some(ClassYear::Sophomore);
        prior.tenure = 1;
        let mut next = PlayerSeasonRecord::new("A", "T", 2024);
        next.class = Some(ClassYear::Junior);
        next.tenure = 2;

        let keys: Vec<String> = Transition::classify(&prior, &next)
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                "Varsity_Year1_to_Year2",
                "Sophomore_to_Junior",
                "Sophomore_Y1_to_Junior_Y2"
            ]
        );
    }

    #[test]
    fn classify_without_class_is_tenure_only() {
        let prior = PlayerSeasonRecord::new("A", "T", 2023);
        let mut next = PlayerSeasonRecord::new("A", "T", 2024);
        next.tenure = 2;
        let transitions = Transition::classify(&prior, &next);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].kind(), TransitionKind::Tenure);
    }

    // -- ratio computation --

    #[test]
    fn median_ratio_and_sample_size() {
        let history = doubling_history("Central");
        let table = MultiplierTable::compute(&history.adjacent_pairs(), &MultiplierConfig::default());
        let t = Transition::Class {
            from: ClassYear::Sophomore,
            to: ClassYear::Junior,
        };
        let m = table.get(&t).expect("transition present");
        assert_eq!(m.sample_size, 5);
        assert_eq!(m.ratio(Stat::Hits), Some(2.0));
        assert_eq!(m.ratio(Stat::PlateAppearances), Some(1.5));
        // Nobody pitched: no ratio, projection treats it as 1.0.
        assert_eq!(m.ratio(Stat::StrikeoutsPitched), None);
        assert_eq!(m.factor(Stat::StrikeoutsPitched), 1.0);
    }

    #[test]
    fn rare_events_are_smoothed_toward_one() {
        let history = doubling_history("Central");
        let table = MultiplierTable::compute(&history.adjacent_pairs(), &MultiplierConfig::default());
        let t = Transition::Tenure { from: 1, to: 2 };
        // HR 1 -> 3 is a raw ratio of 3.0; smoothing gives (3+1)/(1+1) = 2.0.
        assert_eq!(table.get(&t).unwrap().ratio(Stat::HomeRuns), Some(2.0));
    }

    #[test]
    fn ratios_are_clamped_and_rounded() {
        let mut records = Vec::new();
        for i in 0..4 {
            let name = format!("Breakout {i}");
            records.push(season(&name, "East", 2023, ClassYear::Freshman, batting(20.0, 1.0, 0.0)));
            records.push(season(&name, "East", 2024, ClassYear::Sophomore, batting(20.0, 9.0, 0.0)));
        }
        let history = HistoricalTable::new(records);
        let config = MultiplierConfig::default();
        let table = MultiplierTable::compute(&history.adjacent_pairs(), &config);
        let t = Transition::Class {
            from: ClassYear::Freshman,
            to: ClassYear::Sophomore,
        };
        assert_eq!(table.get(&t).unwrap().ratio(Stat::Hits), Some(config.ceiling));
    }

    #[test]
    fn low_prior_volume_is_excluded() {
        let mut records = Vec::new();
        for i in 0..5 {
            let name = format!("Cameo {i}");
            records.push(season(&name, "West", 2023, ClassYear::Junior, batting(6.0, 2.0, 0.0)));
            records.push(season(&name, "West", 2024, ClassYear::Senior, batting(50.0, 15.0, 0.0)));
        }
        let history = HistoricalTable::new(records);
        let table = MultiplierTable::compute(&history.adjacent_pairs(), &MultiplierConfig::default());
        let t = Transition::Class {
            from: ClassYear::Junior,
            to: ClassYear::Senior,
        };
        let m = table.get(&t).unwrap();
        assert_eq!(m.sample_size, 5);
        assert_eq!(m.ratio(Stat::Hits), None);
    }

    #[test]
    fn volatility_is_mean_sample_std_dev() {
        let mut records = Vec::new();
        for (i, next_hits) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            let name = format!("Spread {i}");
            let stats = StatLine::new()
                .with(Stat::PlateAppearances, 40.0)
                .with(Stat::Hits, 10.0);
            records.push(season(&name, "North", 2023, ClassYear::Junior, stats));
            let next = StatLine::new()
                .with(Stat::PlateAppearances, 40.0)
                .with(Stat::Hits, next_hits);
            records.push(season(&name, "North", 2024, ClassYear::Senior, next));
        }
        let history = HistoricalTable::new(records);
        let table = MultiplierTable::compute(&history.adjacent_pairs(), &MultiplierConfig::default());
        let m = table
            .get(&Transition::Class {
                from: ClassYear::Junior,
                to: ClassYear::Senior,
            })
            .unwrap();
        // PA ratios all 1.0 (sd 0), hit ratios 1, 2, 3 (sd 1).
        assert!(approx_eq(m.volatility, 0.5, 1e-12));
    }

    #[test]
    fn median_and_std_dev_helpers() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(sample_std_dev(&[1.0]), None);
        assert!(approx_eq(sample_std_dev(&[1.0, 2.0, 3.0]).unwrap(), 1.0, 1e-12));
    }

    // -- cohorts --

    #[test]
    fn fit_splits_pairs_by_prior_program_tier() {
        let mut records = doubling_history("Northside").records().to_vec();
        records.extend(doubling_history("Southside").records().iter().cloned());
        let history = HistoricalTable::new(records);
        let config = EngineConfig {
            programs: ProgramConfig {
                elite: vec!["Northside".into()],
                teams: vec![],
            },
            ..EngineConfig::default()
        };

        let model = DevelopmentModel::fit(&history, &config);
        let t = Transition::Tenure { from: 1, to: 2 };
        assert_eq!(model.table(Cohort::Pooled).get(&t).unwrap().sample_size, 10);
        assert_eq!(model.table(Cohort::Elite).get(&t).unwrap().sample_size, 5);
        assert_eq!(model.table(Cohort::Standard).get(&t).unwrap().sample_size, 5);
        assert!(!model.is_empty());
    }

    #[test]
    fn empty_history_fits_empty_model() {
        let model = DevelopmentModel::fit(&HistoricalTable::default(), &EngineConfig::default());
        assert!(model.is_empty());
    }
}
