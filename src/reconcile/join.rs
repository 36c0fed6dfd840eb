//! Enrich game/match records with authoritative team attributes.
//!
//! Feeds embed team fields that are often missing or stale, and do not agree
//! on how a team is identified: some carry the numeric org id, some only the
//! short name, some only the official name. Each side of a record is resolved
//! against the reference list by id, then short name, then full name, and the
//! first hit wins.

use std::collections::HashMap;
use tracing::debug;

use crate::records::{Attribute, EmbeddedTeam, Record, Side, TeamRef};

/// Field written with the conference both teams belong to, or `null`.
pub const SHARED_CONFERENCE_KEY: &str = "shared_conference";

/// How a side was matched to its reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Id,
    ShortName,
    FullName,
}

/// Lookup tables over a reference list. On key collisions the first entry
/// in the list wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    teams: Vec<TeamRef>,
    by_id: HashMap<String, usize>,
    by_short_name: HashMap<String, usize>,
    by_full_name: HashMap<String, usize>,
}

impl ReferenceIndex {
    pub fn new(teams: Vec<TeamRef>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_short_name = HashMap::new();
        let mut by_full_name = HashMap::new();
        for (i, team) in teams.iter().enumerate() {
            if let Some(id) = &team.id {
                by_id.entry(id.clone()).or_insert(i);
            }
            if let Some(short) = &team.short_name {
                by_short_name.entry(short.to_lowercase()).or_insert(i);
            }
            if let Some(full) = &team.full_name {
                by_full_name.entry(full.to_lowercase()).or_insert(i);
            }
        }
        ReferenceIndex {
            teams,
            by_id,
            by_short_name,
            by_full_name,
        }
    }

    /// Build from raw school/team rows.
    pub fn from_records(records: &[Record]) -> Self {
        Self::new(records.iter().map(TeamRef::from_record).collect())
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Find the reference entry for one embedded side.
    pub fn resolve(&self, team: &EmbeddedTeam) -> Option<(&TeamRef, MatchTier)> {
        let hit = |idx: Option<&usize>, tier| idx.map(|&i| (&self.teams[i], tier));

        if let Some(found) = team
            .id
            .as_ref()
            .and_then(|id| hit(self.by_id.get(id), MatchTier::Id))
        {
            return Some(found);
        }
        if let Some(found) = team.name.as_ref().and_then(|name| {
            hit(self.by_short_name.get(&name.to_lowercase()), MatchTier::ShortName)
        }) {
            return Some(found);
        }
        [team.full_name.as_ref(), team.name.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|name| hit(self.by_full_name.get(&name.to_lowercase()), MatchTier::FullName))
    }

    /// Enrich one record. A record neither side of which resolves is returned
    /// unchanged.
    pub fn enrich(&self, record: &Record) -> Record {
        let resolved: Vec<Option<&TeamRef>> = Side::BOTH
            .iter()
            .map(|&side| self.resolve(&record.side(side)).map(|(team, _)| team))
            .collect();

        if resolved.iter().all(Option::is_none) {
            return record.clone();
        }

        let mut out = record.clone();
        for (&side, team) in Side::BOTH.iter().zip(&resolved) {
            if let Some(team) = team {
                apply_reference(&mut out, side, team);
            }
        }

        match shared_conference(resolved[0], resolved[1]) {
            Some(conf) => out.set_text(SHARED_CONFERENCE_KEY, conf),
            None => out.set_null(SHARED_CONFERENCE_KEY),
        }
        out
    }
}

/// Overwrite one side's fields with every attribute the reference provides.
/// Attributes the reference lacks keep their embedded value.
fn apply_reference(record: &mut Record, side: Side, team: &TeamRef) {
    let values = [
        (Attribute::Id, team.id.as_deref()),
        (Attribute::Name, team.display_name()),
        (Attribute::FullName, team.full_name.as_deref()),
        (Attribute::Division, team.division.as_deref()),
        (Attribute::Conference, team.conference.as_deref()),
        (Attribute::Logo, team.logo.as_deref()),
        (Attribute::Rank, team.rank.as_deref()),
    ];
    for (attr, value) in values {
        if let Some(v) = value {
            record.set_text(&attr.output_key(side), v);
        }
    }
}

fn shared_conference<'a>(one: Option<&'a TeamRef>, two: Option<&'a TeamRef>) -> Option<&'a str> {
    let a = one?.conference.as_deref()?;
    let b = two?.conference.as_deref()?;
    (a == b).then_some(a)
}

/// Enrich every record against `reference`.
pub fn join_with_reference(records: &[Record], reference: &[TeamRef]) -> Vec<Record> {
    let index = ReferenceIndex::new(reference.to_vec());
    let joined: Vec<Record> = records.iter().map(|r| index.enrich(r)).collect();
    debug!(
        "Joined {} records against {} reference teams",
        joined.len(),
        index.len()
    );
    joined
}
