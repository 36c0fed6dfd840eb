use serde::Serialize;

use crate::records::{Record, Side};

/// Matches are best of five.
pub const MAX_SETS: usize = 5;
const SETS_TO_WIN: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetScore {
    pub team_1: u32,
    pub team_2: u32,
}

impl SetScore {
    /// `None` for a tied (still running or malformed) set.
    pub fn winner(&self) -> Option<Side> {
        match self.team_1.cmp(&self.team_2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    NotStarted,
    InProgress { current_set: usize },
    Completed { sets_played: usize, winner: Side },
}

/// Set-win tally plus status for one live match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSummary {
    pub sets: Vec<SetScore>,
    pub team_1_set_wins: u32,
    pub team_2_set_wins: u32,
    pub status: MatchStatus,
}

/// Sets with both sides scored, read from `set_N_team_1`/`set_N_team_2`.
pub fn completed_sets(record: &Record) -> Vec<SetScore> {
    (1..=MAX_SETS)
        .filter_map(|n| {
            let team_1 = record.number(&format!("set_{}_team_1", n))?;
            let team_2 = record.number(&format!("set_{}_team_2", n))?;
            Some(SetScore {
                team_1: team_1.max(0.0) as u32,
                team_2: team_2.max(0.0) as u32,
            })
        })
        .collect()
}

pub fn score_summary(record: &Record) -> ScoreSummary {
    let sets = completed_sets(record);
    let team_1_set_wins = sets.iter().filter(|s| s.winner() == Some(Side::One)).count() as u32;
    let team_2_set_wins = sets.iter().filter(|s| s.winner() == Some(Side::Two)).count() as u32;

    let status = if sets.is_empty() {
        MatchStatus::NotStarted
    } else if team_1_set_wins >= SETS_TO_WIN || team_2_set_wins >= SETS_TO_WIN {
        MatchStatus::Completed {
            sets_played: sets.len(),
            winner: if team_1_set_wins > team_2_set_wins {
                Side::One
            } else {
                Side::Two
            },
        }
    } else {
        MatchStatus::InProgress {
            current_set: sets.len() + 1,
        }
    };

    ScoreSummary {
        sets,
        team_1_set_wins,
        team_2_set_wins,
        status,
    }
}

pub fn match_status(record: &Record) -> MatchStatus {
    score_summary(record).status
}

/// `"25-20, 18-25, 25-22"`; empty when no set has been scored.
pub fn score_line(record: &Record) -> String {
    completed_sets(record)
        .iter()
        .map(|s| format!("{}-{}", s.team_1, s.team_2))
        .collect::<Vec<_>>()
        .join(", ")
}
