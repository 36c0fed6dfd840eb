pub mod models;

pub use models::{Attribute, EmbeddedTeam, Side, TeamRef};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A loosely-typed entity record (game, match, player, school) exactly as the
/// upstream API returned it.
///
/// Fields are never required. Readers go through [`Record::text`] or
/// [`Record::first_text`], which coerce numbers to strings and treat `null`
/// and blank strings as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(Map::new())
    }

    /// Wrap a JSON value. Non-object values yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Record(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String view of a field. Numbers are rendered without a trailing `.0`
    /// for integral values so that `5` and `"5"` compare equal as ids.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => i.to_string(),
                None => n.to_string(),
            }),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Ordered lookup: the first key holding a usable value wins.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.text(k))
    }

    /// Numeric view of a field; numeric strings are parsed.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), Value::String(value.into()));
    }

    pub fn set_null(&mut self, key: &str) {
        self.0.insert(key.to_string(), Value::Null);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// One side of a two-team record, read through the attribute precedence
    /// lists.
    pub fn side(&self, side: Side) -> EmbeddedTeam {
        EmbeddedTeam::from_record(self, side)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

/// Collect every object in a JSON array into records, skipping anything else.
pub fn records_from_values(values: &[Value]) -> Vec<Record> {
    values
        .iter()
        .filter_map(|v| Record::from_value(v.clone()))
        .collect()
}

/// Placeholder names the upstream uses for undecided opponents.
const PLACEHOLDER_NAMES: &[&str] = &["TBA", "TBD"];

/// Whether a team name can be shown as-is.
pub fn is_displayable(name: Option<&str>) -> bool {
    match name {
        Some(n) => {
            let n = n.trim();
            !n.is_empty() && !PLACEHOLDER_NAMES.iter().any(|p| p.eq_ignore_ascii_case(n))
        }
        None => false,
    }
}

/// Render numeric conference codes as regions: `"5"` and `"5.0"` become
/// `"Region 5"`. Anything else is returned unchanged.
pub fn format_conference(conference: &str) -> String {
    let trimmed = conference.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        format!("Region {}", digits)
    } else {
        trimmed.to_string()
    }
}

/// Comparable form of a division label.
///
/// Non-alphanumerics are stripped and the result uppercased, then a trailing
/// arabic tier after `D` is rewritten as a roman numeral so `"D-I"`, `"d1"`
/// and `"D 1"` all normalize to `"DI"`, and `"NJCAA D-2"` to `"NJCAADII"`.
pub fn normalize_division(division: &str) -> String {
    let stripped: String = division
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect();

    let digits_start = stripped
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    match digits_start {
        Some(i) if i > 0 && stripped[..i].ends_with('D') => {
            let roman = match &stripped[i..] {
                "1" => "I",
                "2" => "II",
                "3" => "III",
                _ => return stripped,
            };
            format!("{}{}", &stripped[..i], roman)
        }
        _ => stripped,
    }
}

/// Equality under [`normalize_division`].
pub fn division_matches(division: &str, wanted: &str) -> bool {
    division == wanted || normalize_division(division) == normalize_division(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_text_coerces_numbers_and_skips_blanks() {
        let r = record(json!({"id": 42, "score": 2.5, "name": "  ", "nil": null, "s": " Stanford "}));
        assert_eq!(r.text("id"), Some("42".to_string()));
        assert_eq!(r.text("score"), Some("2.5".to_string()));
        assert_eq!(r.text("name"), None);
        assert_eq!(r.text("nil"), None);
        assert_eq!(r.text("missing"), None);
        assert_eq!(r.text("s"), Some("Stanford".to_string()));
    }

    #[test]
    fn test_first_text_respects_order() {
        let r = record(json!({"short_name": "UCLA", "school_name": "University of California"}));
        assert_eq!(
            r.first_text(&["name", "short_name", "school_name"]),
            Some("UCLA".to_string())
        );
        assert_eq!(r.first_text(&["nope", "also_nope"]), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("x")).is_none());
        let values = vec![json!({"a": 1}), json!(3), json!({"b": 2})];
        assert_eq!(records_from_values(&values).len(), 2);
    }

    #[test]
    fn test_is_displayable() {
        assert!(is_displayable(Some("Texas")));
        assert!(!is_displayable(Some("TBA")));
        assert!(!is_displayable(Some("tbd")));
        assert!(!is_displayable(Some("")));
        assert!(!is_displayable(None));
    }

    #[test]
    fn test_format_conference_regions() {
        assert_eq!(format_conference("5.0"), "Region 5");
        assert_eq!(format_conference("12"), "Region 12");
        assert_eq!(format_conference("Big Ten"), "Big Ten");
        assert_eq!(format_conference("Pac-12"), "Pac-12");
    }

    #[test]
    fn test_normalize_division_variants() {
        assert_eq!(normalize_division("D-I"), "DI");
        assert_eq!(normalize_division("D1"), "DI");
        assert_eq!(normalize_division("d 1"), "DI");
        assert_eq!(normalize_division("D-II"), "DII");
        assert_eq!(normalize_division("D3"), "DIII");
        assert_eq!(normalize_division("NJCAA D-2"), "NJCAADII");
        assert_eq!(normalize_division("NAIA"), "NAIA");
        assert!(division_matches("D1", "D-I"));
        assert!(!division_matches("D-II", "D-I"));
        assert!(!division_matches("D2", "D-III"));
    }
}
