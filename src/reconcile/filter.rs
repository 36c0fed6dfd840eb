//! Predicate chain that narrows a record list for display.
//!
//! Every stage is a no-op while its criterion is unset. Stages run in a fixed
//! order and a record must pass all of them.

use chrono::NaiveDate;
use std::collections::HashSet;

use super::schedule::parse_date;
use crate::records::{division_matches, format_conference, is_displayable, Record, Side};

/// Fields searched when [`FilterCriteria::search_fields`] is empty.
pub const DEFAULT_SEARCH_FIELDS: &[&str] = &[
    "team_1_name",
    "team_2_name",
    "team_1",
    "team_2",
    "location",
    "date",
    "time",
];

const DATE_KEYS: &[&str] = &["date", "start_date"];

/// Inclusive date bounds. Records without a parseable date always pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub search_fields: Vec<String>,
    /// `"all"` is treated as unset.
    pub division: Option<String>,
    pub conferences: Vec<String>,
    /// Team ids or names; a record passes if either side matches one.
    pub teams: Vec<String>,
    pub ranked_only: bool,
    pub dates: DateWindow,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_division(mut self, division: impl Into<String>) -> Self {
        self.division = Some(division.into());
        self
    }

    pub fn with_conferences<I, S>(mut self, conferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conferences = conferences.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_teams<I, S>(mut self, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.teams = teams.into_iter().map(Into::into).collect();
        self
    }

    pub fn ranked_only(mut self) -> Self {
        self.ranked_only = true;
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.dates = DateWindow { from, to };
        self
    }

    /// Hide games dated before `today`.
    pub fn hide_past(mut self, today: NaiveDate) -> Self {
        self.dates.from = Some(today);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validity,
    Dates,
    Division,
    Conference,
    Team,
    Ranked,
    Search,
}

const STAGES: [Stage; 7] = [
    Stage::Validity,
    Stage::Dates,
    Stage::Division,
    Stage::Conference,
    Stage::Team,
    Stage::Ranked,
    Stage::Search,
];

/// Criteria compiled into lookup-ready form.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    search: Option<String>,
    search_fields: Vec<String>,
    division: Option<String>,
    conferences: HashSet<String>,
    teams: HashSet<String>,
    ranked_only: bool,
    dates: DateWindow,
}

impl FilterPipeline {
    pub fn new(criteria: &FilterCriteria) -> Self {
        let search = criteria
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let search_fields = if criteria.search_fields.is_empty() {
            DEFAULT_SEARCH_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            criteria.search_fields.clone()
        };
        let division = criteria
            .division
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("all"))
            .map(str::to_string);

        FilterPipeline {
            search,
            search_fields,
            division,
            conferences: criteria
                .conferences
                .iter()
                .filter(|c| !c.trim().is_empty())
                .map(|c| format_conference(c))
                .collect(),
            teams: criteria
                .teams
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            ranked_only: criteria.ranked_only,
            dates: criteria.dates,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        STAGES.iter().all(|&stage| self.passes(stage, record))
    }

    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }

    fn passes(&self, stage: Stage, record: &Record) -> bool {
        match stage {
            Stage::Validity => Side::BOTH
                .iter()
                .all(|&side| is_displayable(record.side(side).name.as_deref())),
            Stage::Dates => {
                if self.dates.is_unbounded() {
                    return true;
                }
                match record.first_text(DATE_KEYS).and_then(|d| parse_date(&d)) {
                    Some(date) => self.dates.contains(date),
                    None => true,
                }
            }
            Stage::Division => match &self.division {
                None => true,
                Some(wanted) => Side::BOTH.iter().any(|&side| {
                    record
                        .side(side)
                        .division
                        .is_some_and(|d| division_matches(&d, wanted))
                }),
            },
            Stage::Conference => {
                self.conferences.is_empty()
                    || Side::BOTH.iter().any(|&side| {
                        record
                            .side(side)
                            .conference
                            .is_some_and(|c| self.conferences.contains(&format_conference(&c)))
                    })
            }
            Stage::Team => {
                self.teams.is_empty()
                    || Side::BOTH.iter().any(|&side| {
                        let team = record.side(side);
                        [team.id, team.name]
                            .into_iter()
                            .flatten()
                            .any(|v| self.teams.contains(&v.to_lowercase()))
                    })
            }
            Stage::Ranked => {
                !self.ranked_only || Side::BOTH.iter().any(|&side| record.side(side).is_ranked())
            }
            Stage::Search => match &self.search {
                None => true,
                Some(term) => self.search_fields.iter().any(|field| {
                    record
                        .text(field)
                        .is_some_and(|v| v.to_lowercase().contains(term.as_str()))
                }),
            },
        }
    }
}

/// Records passing every criterion, in input order.
pub fn filter(records: &[Record], criteria: &FilterCriteria) -> Vec<Record> {
    FilterPipeline::new(criteria).apply(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn game(t1: &str, t2: &str, d1: &str, d2: &str) -> Record {
        Record::from_value(json!({
            "team_1_name": t1,
            "team_2_name": t2,
            "team_1_division": d1,
            "team_2_division": d2,
        }))
        .unwrap()
    }

    fn names(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .filter_map(|r| r.text("team_1_name"))
            .collect()
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let criteria = FilterCriteria::new()
            .with_division("D-I")
            .with_search("x")
            .ranked_only();
        assert!(filter(&[], &criteria).is_empty());
    }

    #[test]
    fn test_unset_criteria_pass_everything_valid() {
        let records = vec![game("A", "B", "D-I", "D-I"), game("C", "D", "NAIA", "NAIA")];
        assert_eq!(filter(&records, &FilterCriteria::default()).len(), 2);
    }

    #[test]
    fn test_validity_drops_placeholder_opponents() {
        let records = vec![game("A", "TBA", "D-I", "D-I"), game("C", "D", "D-I", "D-I")];
        assert_eq!(names(&filter(&records, &FilterCriteria::default())), vec!["C"]);
    }

    #[test]
    fn test_division_normalization() {
        let records = vec![
            game("Numeric", "X", "D1", "D1"),
            game("Roman", "X", "D-I", "NAIA"),
            game("Second", "X", "D-II", "D-II"),
            game("Other", "X", "D3", "NAIA"),
        ];
        let out = filter(&records, &FilterCriteria::new().with_division("D-I"));
        assert_eq!(names(&out), vec!["Numeric", "Roman"]);

        let all = filter(&records, &FilterCriteria::new().with_division("all"));
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_conference_set_uses_region_formatting() {
        let records = vec![
            Record::from_value(json!({"team_1_name": "A", "team_2_name": "B", "team_1_conference": "5.0"})).unwrap(),
            Record::from_value(json!({"team_1_name": "C", "team_2_name": "D", "team_2_conference": "Big Ten"})).unwrap(),
            Record::from_value(json!({"team_1_name": "E", "team_2_name": "F", "team_2_conference": "SEC"})).unwrap(),
        ];
        let out = filter(
            &records,
            &FilterCriteria::new().with_conferences(["Region 5", "Big Ten"]),
        );
        assert_eq!(names(&out), vec!["A", "C"]);
    }

    #[test]
    fn test_team_filter_matches_id_or_name() {
        let records = vec![
            Record::from_value(json!({"team_1_name": "A", "team_2_name": "B", "team_2_id": 77})).unwrap(),
            Record::from_value(json!({"team_1_name": "Nebraska", "team_2_name": "D"})).unwrap(),
            Record::from_value(json!({"team_1_name": "E", "team_2_name": "F"})).unwrap(),
        ];
        let out = filter(&records, &FilterCriteria::new().with_teams(["77", "nebraska"]));
        assert_eq!(names(&out), vec!["A", "Nebraska"]);
    }

    #[test]
    fn test_ranked_only() {
        let records = vec![
            Record::from_value(json!({"team_1_name": "A", "team_2_name": "B", "team_2_rank": 4})).unwrap(),
            Record::from_value(json!({"team_1_name": "C", "team_2_name": "D", "team_1_rank": null})).unwrap(),
        ];
        let out = filter(&records, &FilterCriteria::new().ranked_only());
        assert_eq!(names(&out), vec!["A"]);
    }

    #[test]
    fn test_search_default_and_custom_fields() {
        let records = vec![
            Record::from_value(json!({"team_1_name": "Penn State", "team_2_name": "Ohio State", "location": "Rec Hall"})).unwrap(),
            Record::from_value(json!({"team_1_name": "Purdue", "team_2_name": "Iowa", "coach": "rec"})).unwrap(),
        ];
        let out = filter(&records, &FilterCriteria::new().with_search("  REC "));
        assert_eq!(names(&out), vec!["Penn State"]);

        let by_coach = filter(
            &records,
            &FilterCriteria::new().with_search("rec").with_search_fields(["coach"]),
        );
        assert_eq!(names(&by_coach), vec!["Purdue"]);
    }

    #[test]
    fn test_date_window_and_hide_past() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
        let records = vec![
            Record::from_value(json!({"team_1_name": "Past", "team_2_name": "X", "date": "2024-09-09"})).unwrap(),
            Record::from_value(json!({"team_1_name": "Today", "team_2_name": "X", "date": "09/10/2024"})).unwrap(),
            Record::from_value(json!({"team_1_name": "Undated", "team_2_name": "X"})).unwrap(),
            Record::from_value(json!({"team_1_name": "Later", "team_2_name": "X", "date": "2024-10-01"})).unwrap(),
        ];
        let upcoming = filter(&records, &FilterCriteria::new().hide_past(today));
        assert_eq!(names(&upcoming), vec!["Today", "Undated", "Later"]);

        let window = filter(
            &records,
            &FilterCriteria::new().between(Some(today), NaiveDate::from_ymd_opt(2024, 9, 30)),
        );
        assert_eq!(names(&window), vec!["Today", "Undated"]);
    }

    #[test]
    fn test_stages_compose_with_and() {
        let records = vec![
            Record::from_value(json!({"team_1_name": "Texas", "team_2_name": "Baylor", "team_1_division": "D1", "team_1_conference": "Big 12", "team_1_rank": 2})).unwrap(),
            Record::from_value(json!({"team_1_name": "Texas", "team_2_name": "TCU", "team_1_division": "D1", "team_1_conference": "Big 12"})).unwrap(),
            Record::from_value(json!({"team_1_name": "Texas A&M-CC", "team_2_name": "Lamar", "team_1_division": "D1", "team_1_conference": "Southland", "team_1_rank": 20})).unwrap(),
        ];
        let criteria = FilterCriteria::new()
            .with_division("D-I")
            .with_conferences(["Big 12"])
            .ranked_only()
            .with_search("texas");
        let out = filter(&records, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text("team_2_name").as_deref(), Some("Baylor"));
    }
}
