//! Distinct filter values offered to the user, derived from the loaded data.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::records::{division_matches, format_conference, Record, Side};

/// Every division either team plays in, sorted.
pub fn divisions(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| Side::BOTH.map(|side| r.side(side).division))
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Conferences of games involving `division` (all games when `None`),
/// formatted for display and sorted with numeric regions first.
pub fn conferences(records: &[Record], division: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = records
        .iter()
        .filter(|r| in_division(r, division))
        .flat_map(|r| Side::BOTH.map(|side| r.side(side).conference))
        .flatten()
        .map(|c| format_conference(&c))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    out.sort_by(compare_conferences);
    out
}

/// Team names available under the current division and conference
/// selection. A side is listed only if its own conference is selected.
pub fn teams(records: &[Record], division: Option<&str>, conferences: &[String]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for record in records.iter().filter(|r| in_division(r, division)) {
        for side in Side::BOTH {
            let team = record.side(side);
            let Some(name) = team.name else { continue };
            let selected = conferences.is_empty()
                || team
                    .conference
                    .is_some_and(|c| conferences.contains(&format_conference(&c)));
            if selected {
                names.insert(name);
            }
        }
    }
    names.into_iter().collect()
}

fn in_division(record: &Record, division: Option<&str>) -> bool {
    match division {
        None => true,
        Some(wanted) => Side::BOTH.iter().any(|&side| {
            record
                .side(side)
                .division
                .is_some_and(|d| division_matches(&d, wanted))
        }),
    }
}

fn region_number(conference: &str) -> Option<u32> {
    conference.strip_prefix("Region ")?.parse().ok()
}

/// Regions first in numeric order, then everything else alphabetically.
fn compare_conferences(a: &String, b: &String) -> Ordering {
    match (region_number(a), region_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
