//! Collapse game records that describe the same match.
//!
//! Overlapping endpoint calls (per-team game lists, date queries, the global
//! results feed) return the same match several times, sometimes with the
//! teams in swapped order. Two records are the same game if they share a
//! match id, or share a date and the same unordered pair of team ids.

use std::collections::HashSet;
use tracing::info;

use crate::records::{Attribute, Record, Side};

const MATCH_ID_KEYS: &[&str] = &["match_id", "game_id"];
const DATE_KEYS: &[&str] = &["date", "start_date"];

/// One way two records can be recognized as the same game. Team ids stay
/// separate fields so ids containing separators never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    MatchId(String),
    TeamPair {
        date: String,
        first: String,
        second: String,
    },
}

/// Every equivalence key a record can be found under. Records with no match
/// id and an incomplete date/team pair have none.
pub fn dedup_keys(record: &Record) -> Vec<DedupKey> {
    let mut keys = Vec::with_capacity(3);
    if let Some(id) = record.first_text(MATCH_ID_KEYS) {
        keys.push(DedupKey::MatchId(id));
    }

    let date = record.first_text(DATE_KEYS);
    let team_1 = record.first_text(Attribute::Id.keys(Side::One));
    let team_2 = record.first_text(Attribute::Id.keys(Side::Two));
    if let (Some(date), Some(a), Some(b)) = (date, team_1, team_2) {
        keys.push(DedupKey::TeamPair {
            date: date.clone(),
            first: a.clone(),
            second: b.clone(),
        });
        keys.push(DedupKey::TeamPair {
            date,
            first: b,
            second: a,
        });
    }
    keys
}

/// Drop every record that shares any key with an earlier kept record.
///
/// Output keeps first-seen order. Because a record registers all of its keys
/// when kept, a later record matching any one of them is recognized even if
/// it shares nothing directly with other duplicates. Records without keys are
/// always kept.
pub fn deduplicate(records: &[Record]) -> Vec<Record> {
    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut unique: Vec<Record> = Vec::with_capacity(records.len());

    for record in records {
        let keys = dedup_keys(record);
        if keys.iter().any(|k| seen.contains(k)) {
            continue;
        }
        seen.extend(keys);
        unique.push(record.clone());
    }

    let removed = records.len() - unique.len();
    if removed > 0 {
        info!(
            "Removed {} duplicate games ({} -> {})",
            removed,
            records.len(),
            unique.len()
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn game(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.text("tag").unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_same_match_id_collapses() {
        let input = vec![
            game(json!({"tag": "a", "match_id": "5"})),
            game(json!({"tag": "b", "match_id": 5})),
        ];
        assert_eq!(ids(&deduplicate(&input)), vec!["a"]);
    }

    #[test]
    fn test_swapped_teams_same_date_collapse() {
        let input = vec![
            game(json!({"tag": "a", "date": "2024-09-01", "team_1_id": "1", "team_2_id": "2"})),
            game(json!({"tag": "b", "date": "2024-09-01", "team_1_id": "2", "team_2_id": "1"})),
            game(json!({"tag": "c", "date": "2024-09-02", "team_1_id": "2", "team_2_id": "1"})),
        ];
        assert_eq!(ids(&deduplicate(&input)), vec!["a", "c"]);
    }

    #[test]
    fn test_transitive_through_earlier_record() {
        // b shares only the id with a; c shares only the team pair with a.
        let input = vec![
            game(json!({"tag": "a", "match_id": "9", "date": "2024-09-01", "team_1_id": "1", "team_2_id": "2"})),
            game(json!({"tag": "b", "match_id": "9"})),
            game(json!({"tag": "c", "match_id": "77", "date": "2024-09-01", "team_1_id": "2", "team_2_id": "1"})),
        ];
        assert_eq!(ids(&deduplicate(&input)), vec!["a"]);
    }

    #[test]
    fn test_separator_in_team_ids_does_not_collide() {
        let input = vec![
            game(json!({"tag": "a", "date": "2024-09-01", "team_1_id": "x:y", "team_2_id": "z"})),
            game(json!({"tag": "b", "date": "2024-09-01", "team_1_id": "x", "team_2_id": "y:z"})),
            game(json!({"tag": "c", "match_id": "pair:2024-09-01:x"})),
        ];
        assert_eq!(ids(&deduplicate(&input)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_keyless_records_always_kept() {
        let input = vec![
            game(json!({"tag": "a", "date": "2024-09-01", "team_1_id": "1"})),
            game(json!({"tag": "b", "date": "2024-09-01", "team_1_id": "1"})),
            game(json!({"tag": "c", "match_id": null, "team_1_id": "1", "team_2_id": "2"})),
        ];
        assert_eq!(deduplicate(&input).len(), 3);
        assert!(dedup_keys(&input[0]).is_empty());
    }

    #[test]
    fn test_dedup_is_idempotent_and_stable() {
        let input = vec![
            game(json!({"tag": "a", "match_id": "1"})),
            game(json!({"tag": "b", "date": "d", "team_1_id": "3", "team_2_id": "4"})),
            game(json!({"tag": "c", "match_id": "1"})),
            game(json!({"tag": "d"})),
            game(json!({"tag": "e", "date": "d", "team_1_id": "4", "team_2_id": "3"})),
            game(json!({"tag": "f", "match_id": "2"})),
        ];
        let once = deduplicate(&input);
        assert_eq!(ids(&once), vec!["a", "b", "d", "f"]);
        assert_eq!(deduplicate(&once), once);
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate(&[]).is_empty());
    }
}
