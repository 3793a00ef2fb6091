// Generic player profiles: percentile-tier replacement-level stat lines built
// from the sophomore population, one set per role.

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::history::HistoricalTable;
use crate::multipliers::median;
use crate::stats::{ClassYear, PlayerSeasonRecord, Stat, StatGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileRole {
    Batter,
    Pitcher,
}

impl ProfileRole {
    pub fn label(self) -> &'static str {
        match self {
            ProfileRole::Batter => "Batter",
            ProfileRole::Pitcher => "Pitcher",
        }
    }

    /// Volume stat the population is ranked by.
    fn metric(self) -> Stat {
        match self {
            ProfileRole::Batter => Stat::PlateAppearances,
            ProfileRole::Pitcher => Stat::InningsPitched,
        }
    }

    /// Stat groups that must be exactly zero on a profile of this role.
    fn foreign_groups(self) -> &'static [StatGroup] {
        match self {
            ProfileRole::Batter => &[StatGroup::Pitching],
            ProfileRole::Pitcher => &[StatGroup::Batting, StatGroup::Baserunning],
        }
    }
}

/// Volume values as observed, before any minimum was enforced. `None` for
/// the stats that do not apply to the role.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OriginalVolume {
    pub plate_appearances: Option<f64>,
    pub at_bats: Option<f64>,
    pub innings: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericProfile {
    pub role: ProfileRole,
    /// Whole percent, e.g. 30 for the 30th percentile tier.
    pub percentile: u8,
    pub record: PlayerSeasonRecord,
    pub original: OriginalVolume,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericProfiles {
    profiles: Vec<GenericProfile>,
}

impl GenericProfiles {
    pub fn from_profiles(mut profiles: Vec<GenericProfile>) -> Self {
        profiles.sort_by_key(|p| (p.role, p.percentile));
        Self { profiles }
    }

    /// Build every configured tier for both roles from qualifying sophomores
    /// across all seasons of `history`.
    pub fn generate(history: &HistoricalTable, config: &EngineConfig) -> Self {
        let sophomores: Vec<&PlayerSeasonRecord> = history
            .records()
            .iter()
            .filter(|r| r.class == Some(ClassYear::Sophomore))
            .collect();

        let mut profiles = Vec::new();
        for (role, minimum) in [
            (ProfileRole::Batter, config.profiles.min_batter_pa),
            (ProfileRole::Pitcher, config.profiles.min_pitcher_ip),
        ] {
            let population: Vec<&PlayerSeasonRecord> = sophomores
                .iter()
                .copied()
                .filter(|r| {
                    let volume = r.stats.get(role.metric());
                    volume > 0.0 && volume >= minimum
                })
                .collect();
            if population.is_empty() {
                warn!("no qualifying sophomore {}s; no generic profiles for that role", role.label());
                continue;
            }
            profiles.extend(role_profiles(role, &population, config));
        }

        info!("generated {} generic profiles", profiles.len());
        Self::from_profiles(profiles)
    }

    pub fn find(&self, role: ProfileRole, percentile: u8) -> Option<&GenericProfile> {
        self.profiles
            .iter()
            .find(|p| p.role == role && p.percentile == percentile)
    }

    pub fn for_role(&self, role: ProfileRole) -> impl Iterator<Item = &GenericProfile> {
        self.profiles.iter().filter(move |p| p.role == role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenericProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn role_profiles(
    role: ProfileRole,
    population: &[&PlayerSeasonRecord],
    config: &EngineConfig,
) -> Vec<GenericProfile> {
    let metric: Vec<f64> = population.iter().map(|r| r.stats.get(role.metric())).collect();
    let ranks = percentile_ranks(&metric);
    let width = config.profiles.bucket_width;
    let margin = config.profiles.fallback_margin;

    config
        .profiles
        .tiers
        .iter()
        .filter_map(|&tier| {
            let upper = f64::from(tier) / 100.0;
            let lower = round1(upper - width);
            let mut bucket = select_bucket(population, &ranks, lower, upper);
            if bucket.is_empty() {
                bucket = select_bucket(population, &ranks, lower - margin, upper + margin);
            }
            if bucket.is_empty() {
                warn!("{} tier {tier}: empty percentile bucket", role.label());
                return None;
            }
            Some(build_profile(role, tier, &bucket, config))
        })
        .collect()
}

/// Fractional rank with ties taking the lowest rank: (1 + #smaller) / n.
fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    values
        .iter()
        .map(|v| (1 + values.iter().filter(|o| *o < v).count()) as f64 / n)
        .collect()
}

fn select_bucket<'a>(
    population: &[&'a PlayerSeasonRecord],
    ranks: &[f64],
    lower: f64,
    upper: f64,
) -> Vec<&'a PlayerSeasonRecord> {
    population
        .iter()
        .zip(ranks)
        .filter(|(_, rank)| **rank > lower && **rank <= upper + 1e-9)
        .map(|(r, _)| *r)
        .collect()
}

fn build_profile(
    role: ProfileRole,
    tier: u8,
    bucket: &[&PlayerSeasonRecord],
    config: &EngineConfig,
) -> GenericProfile {
    let mut record = PlayerSeasonRecord::new(
        format!("Generic Sophomore {} ({tier}th %ile)", role.label()),
        "",
        0,
    );
    record.class = Some(ClassYear::Sophomore);
    record.tenure = 1;

    for stat in Stat::ALL {
        let observed: Vec<f64> = bucket.iter().filter_map(|r| r.stats.raw(stat)).collect();
        if let Some(m) = median(&observed) {
            record.stats.set(stat, round2(m));
        }
    }
    for group in role.foreign_groups() {
        record.stats.zero_group(*group);
    }

    let original = match role {
        ProfileRole::Batter => OriginalVolume {
            plate_appearances: Some(record.stats.get(Stat::PlateAppearances)),
            at_bats: Some(record.stats.get(Stat::AtBats)),
            innings: None,
        },
        ProfileRole::Pitcher => OriginalVolume {
            plate_appearances: None,
            at_bats: None,
            innings: Some(record.stats.get(Stat::InningsPitched)),
        },
    };

    // Floors keep every profile inside its role's qualification threshold.
    match role {
        ProfileRole::Batter => {
            let at_bats = record.stats.get(Stat::AtBats);
            if at_bats < config.roles.min_at_bats {
                record.stats.set(Stat::AtBats, config.roles.min_at_bats);
            }
        }
        ProfileRole::Pitcher => {
            let innings = record.stats.get(Stat::InningsPitched);
            if innings < config.roles.min_innings {
                record.stats.set(Stat::InningsPitched, config.roles.min_innings);
            }
        }
    }

    GenericProfile {
        role,
        percentile: tier,
        record,
        original,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
