use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};

use super::dedup::deduplicate;
use crate::records::{Attribute, Record, Side};

/// Parse the date formats the feeds use: `YYYY-MM-DD` (optionally followed by
/// a time), `MM/DD/YYYY` and `MM-DD-YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m-%d-%Y"))
        .ok()
}

/// Schedule rows spell divisions `D1`/`D2`/`D3`; everything else uses roman
/// numerals.
pub fn canonical_division(label: &str) -> String {
    match label.trim() {
        "D1" => "D-I".to_string(),
        "D2" => "D-II".to_string(),
        "D3" => "D-III".to_string(),
        other => other.to_string(),
    }
}

/// A start time converted to 24-hour form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTime {
    /// `HH:MM`, 24-hour.
    pub time: String,
    /// 12-hour form after correction, with the zone suffix kept, e.g.
    /// `"06:00PM ET"`.
    pub display: String,
    /// Whether the AM/PM marker was flipped.
    pub corrected: bool,
}

const ZONES: &[&str] = &["EST", "CST", "MST", "PST", "ET", "CT", "MT", "PT"];

/// Convert `"06:00PM ET"` style times to 24-hour form.
///
/// The feed frequently swaps AM and PM, so 1:00-8:59 AM is read as PM and
/// 9:00-11:59 PM as AM. Returns `None` when the input is not a 12-hour time.
pub fn normalize_start_time(raw: &str) -> Option<StartTime> {
    let trimmed = raw.trim();
    let (clock, zone) = match trimmed.rsplit_once(char::is_whitespace) {
        Some((clock, zone)) if ZONES.iter().any(|z| z.eq_ignore_ascii_case(zone)) => {
            (clock.trim(), Some(zone.to_uppercase()))
        }
        _ => (trimmed, None),
    };

    let upper = clock.to_ascii_uppercase();
    let (digits, marker) = if let Some(d) = upper.strip_suffix("AM") {
        (d, "AM")
    } else if let Some(d) = upper.strip_suffix("PM") {
        (d, "PM")
    } else {
        return None;
    };
    let (h, m) = digits.trim().split_once(':')?;
    let hours: u32 = h.parse().ok()?;
    if !(1..=12).contains(&hours) || m.len() != 2 || m.parse::<u32>().ok()? > 59 {
        return None;
    }

    let fixed_marker = match marker {
        "AM" if (1..9).contains(&hours) => "PM",
        "PM" if (9..12).contains(&hours) => "AM",
        other => other,
    };
    let corrected = fixed_marker != marker;
    if corrected {
        debug!("Correcting {}:{} {} to {}", hours, m, marker, fixed_marker);
    }

    let hours_24 = match (fixed_marker, hours) {
        ("AM", 12) => 0,
        ("AM", h) => h,
        ("PM", 12) => 12,
        (_, h) => h + 12,
    };

    let mut display = format!("{:02}:{}{}", hours, m, fixed_marker);
    if let Some(zone) = zone {
        display.push(' ');
        display.push_str(&zone);
    }

    Some(StartTime {
        time: format!("{:02}:{}", hours_24, m),
        display,
        corrected,
    })
}

/// Canonicalize one schedule row: division labels, 24-hour `time`, and the
/// corrected display time in `original_time`.
pub fn normalize_schedule_game(game: &Record) -> Record {
    let mut out = game.clone();
    for side in Side::BOTH {
        let key = Attribute::Division.output_key(side);
        if let Some(division) = game.text(&key) {
            out.set_text(&key, canonical_division(&division));
        }
    }

    if let Some(raw_time) = game.text("start_time") {
        match normalize_start_time(&raw_time) {
            Some(start) => {
                out.set_text("time", start.time);
                out.set_text("original_time", start.display);
                out.set("time_was_corrected", Value::Bool(start.corrected));
            }
            None => {
                out.set_text("time", raw_time.clone());
                out.set_text("original_time", raw_time);
                out.set("time_was_corrected", Value::Bool(false));
            }
        }
    }
    if let Some(start_date) = game.text("start_date") {
        out.set_text("original_date", start_date);
    }
    out
}

/// Normalize every row, then drop duplicate games.
pub fn normalize_schedule(games: &[Record]) -> Vec<Record> {
    let normalized: Vec<Record> = games.iter().map(normalize_schedule_game).collect();
    let unique = deduplicate(&normalized);

    let corrected = unique
        .iter()
        .filter(|g| g.get("time_was_corrected") == Some(&Value::Bool(true)))
        .count();
    if corrected > 0 {
        info!("Corrected AM/PM for {} games", corrected);
    }
    unique
}
