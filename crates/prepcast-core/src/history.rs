// The historical player-season table: identity keys, tenure derivation,
// season filtering, and adjacent-season pairing.

use std::collections::BTreeSet;

use tracing::debug;

use crate::stats::PlayerSeasonRecord;

/// Identity of one person across seasons: name and team, trimmed and
/// lowercased. Transfers between programs start a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerKey {
    pub name: String,
    pub team: String,
}

impl PlayerKey {
    pub fn of(record: &PlayerSeasonRecord) -> Self {
        Self {
            name: record.name.trim().to_lowercase(),
            team: record.team.trim().to_lowercase(),
        }
    }
}

/// Two seasons of the same person in consecutive years.
#[derive(Debug, Clone, Copy)]
pub struct SeasonPair<'a> {
    pub prior: &'a PlayerSeasonRecord,
    pub next: &'a PlayerSeasonRecord,
}

/// Immutable, identity-ordered set of player-season records.
#[derive(Debug, Clone, Default)]
pub struct HistoricalTable {
    records: Vec<PlayerSeasonRecord>,
}

impl HistoricalTable {
    /// Build the table, ordering records by identity then season and
    /// deriving each record's tenure as its 1-based position within that
    /// identity. Tenure values carried on the input are ignored.
    pub fn new(records: Vec<PlayerSeasonRecord>) -> Self {
        let mut keyed: Vec<(PlayerKey, PlayerSeasonRecord)> = records
            .into_iter()
            .map(|r| (PlayerKey::of(&r), r))
            .collect();
        // Stable sort keeps file order for duplicate (identity, season) rows.
        keyed.sort_by(|(ka, ra), (kb, rb)| {
            (&ka.team, &ka.name, ra.season).cmp(&(&kb.team, &kb.name, rb.season))
        });

        let mut previous: Option<PlayerKey> = None;
        let mut count = 0u32;
        let records = keyed
            .into_iter()
            .map(|(key, mut record)| {
                if previous.as_ref() == Some(&key) {
                    count += 1;
                } else {
                    count = 1;
                    previous = Some(key);
                }
                record.tenure = count;
                record
            })
            .collect::<Vec<_>>();

        debug!("historical table built with {} records", records.len());
        Self { records }
    }

    pub fn records(&self) -> &[PlayerSeasonRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn season(&self, year: i32) -> impl Iterator<Item = &PlayerSeasonRecord> + '_ {
        self.records.iter().filter(move |r| r.season == year)
    }

    pub fn seasons(&self) -> BTreeSet<i32> {
        self.records.iter().map(|r| r.season).collect()
    }

    /// Team names exactly as written in the records of `year`.
    pub fn teams_in(&self, year: i32) -> BTreeSet<String> {
        self.season(year).map(|r| r.team.clone()).collect()
    }

    /// A new table holding only seasons strictly before `year`.
    pub fn before(&self, year: i32) -> HistoricalTable {
        HistoricalTable {
            records: self
                .records
                .iter()
                .filter(|r| r.season < year)
                .cloned()
                .collect(),
        }
    }

    /// Every consecutive-year pair belonging to the same identity.
    pub fn adjacent_pairs(&self) -> Vec<SeasonPair<'_>> {
        self.records
            .windows(2)
            .filter_map(|w| {
                let (prior, next) = (&w[0], &w[1]);
                let same_person = PlayerKey::of(prior) == PlayerKey::of(next);
                (same_person && next.season == prior.season + 1)
                    .then_some(SeasonPair { prior, next })
            })
            .collect()
    }
}
