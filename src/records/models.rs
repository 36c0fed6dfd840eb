use serde::{Deserialize, Serialize};

use super::Record;

/// Which team of a two-team record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    /// Canonical field prefix written back by the joiner.
    pub fn prefix(self) -> &'static str {
        match self {
            Side::One => "team_1",
            Side::Two => "team_2",
        }
    }
}

/// Logical team attribute embedded in a game/match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Id,
    Name,
    FullName,
    Division,
    Conference,
    Logo,
    Rank,
}

impl Attribute {
    /// Field names probed for this attribute, most authoritative first.
    ///
    /// Feeds disagree on naming: `/results` uses `team_1` for the display
    /// name, `/schedule` uses `team_1_name`, `/live` carries `team_1_school`.
    pub fn keys(self, side: Side) -> &'static [&'static str] {
        match (self, side) {
            (Attribute::Id, Side::One) => &["team_1_id", "team_1_org_id"],
            (Attribute::Id, Side::Two) => &["team_2_id", "team_2_org_id"],
            (Attribute::Name, Side::One) => {
                &["team_1_name", "team_1", "team_1_short_name", "team_1_school"]
            }
            (Attribute::Name, Side::Two) => {
                &["team_2_name", "team_2", "team_2_short_name", "team_2_school"]
            }
            (Attribute::FullName, Side::One) => &["team_1_full_name", "team_1_school_name"],
            (Attribute::FullName, Side::Two) => &["team_2_full_name", "team_2_school_name"],
            (Attribute::Division, Side::One) => &["team_1_division"],
            (Attribute::Division, Side::Two) => &["team_2_division"],
            (Attribute::Conference, Side::One) => &["team_1_conference"],
            (Attribute::Conference, Side::Two) => &["team_2_conference"],
            (Attribute::Logo, Side::One) => &["team_1_logo", "team_1_logo_url"],
            (Attribute::Logo, Side::Two) => &["team_2_logo", "team_2_logo_url"],
            (Attribute::Rank, Side::One) => &["team_1_rank", "team_1_ranking"],
            (Attribute::Rank, Side::Two) => &["team_2_rank", "team_2_ranking"],
        }
    }

    /// Field the joiner writes the resolved value into.
    pub fn output_key(self, side: Side) -> String {
        let suffix = match self {
            Attribute::Id => "id",
            Attribute::Name => "name",
            Attribute::FullName => "full_name",
            Attribute::Division => "division",
            Attribute::Conference => "conference",
            Attribute::Logo => "logo",
            Attribute::Rank => "rank",
        };
        format!("{}_{}", side.prefix(), suffix)
    }
}

/// One side of a game record as embedded by the feed. Every field may be
/// missing or stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedTeam {
    pub id: Option<String>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub division: Option<String>,
    pub conference: Option<String>,
    pub logo: Option<String>,
    pub rank: Option<String>,
}

impl EmbeddedTeam {
    pub fn from_record(record: &Record, side: Side) -> Self {
        let read = |attr: Attribute| record.first_text(attr.keys(side));
        EmbeddedTeam {
            id: read(Attribute::Id),
            name: read(Attribute::Name),
            full_name: read(Attribute::FullName),
            division: read(Attribute::Division),
            conference: read(Attribute::Conference),
            logo: read(Attribute::Logo),
            rank: read(Attribute::Rank),
        }
    }

    /// Ranked means a positive numeric rank.
    pub fn is_ranked(&self) -> bool {
        self.rank
            .as_deref()
            .and_then(|r| r.parse::<f64>().ok())
            .is_some_and(|r| r > 0.0)
    }
}

/// Authoritative team/school descriptor used to enrich game records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: Option<String>,
    pub short_name: Option<String>,
    pub full_name: Option<String>,
    pub division: Option<String>,
    pub conference: Option<String>,
    pub logo: Option<String>,
    pub rank: Option<String>,
}

impl TeamRef {
    const ID_KEYS: &'static [&'static str] = &["team_id", "org_id", "id"];
    const SHORT_NAME_KEYS: &'static [&'static str] = &["school_short", "short_name", "name"];
    const FULL_NAME_KEYS: &'static [&'static str] =
        &["name_official", "full_name", "school_name"];
    const LOGO_KEYS: &'static [&'static str] = &["logo_url", "logo"];
    const RANK_KEYS: &'static [&'static str] = &["rank", "ranking"];

    /// Build a reference entry from a loosely-typed school/team row.
    pub fn from_record(record: &Record) -> Self {
        TeamRef {
            id: record.first_text(Self::ID_KEYS),
            short_name: record.first_text(Self::SHORT_NAME_KEYS),
            full_name: record.first_text(Self::FULL_NAME_KEYS),
            division: record.text("division"),
            conference: record.text("conference"),
            logo: record.first_text(Self::LOGO_KEYS),
            rank: record.first_text(Self::RANK_KEYS),
        }
    }

    /// Best display name: short name, falling back to the official name.
    pub fn display_name(&self) -> Option<&str> {
        self.short_name.as_deref().or(self.full_name.as_deref())
    }
}
