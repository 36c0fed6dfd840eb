use serde::Serialize;
use std::collections::HashMap;

use crate::records::{division_matches, format_conference, Record, Side};

/// Season record of one team, derived from result rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStanding {
    pub team: String,
    pub conference: String,
    pub location: String,
    pub wins: u32,
    pub losses: u32,
    pub games: u32,
    pub win_percentage: f64,
}

impl TeamStanding {
    fn new(team: String, conference: Option<String>, location: Option<String>) -> Self {
        TeamStanding {
            team,
            conference: conference
                .map(|c| format_conference(&c))
                .unwrap_or_else(|| "Unknown".to_string()),
            location: location.unwrap_or_default(),
            wins: 0,
            losses: 0,
            games: 0,
            win_percentage: 0.0,
        }
    }

    /// `"W-L"`.
    pub fn record(&self) -> String {
        format!("{}-{}", self.wins, self.losses)
    }
}

/// Win/loss table for every team appearing in a `division` game, sorted by
/// win percentage then wins. Games without a recognizable winner count as
/// played but neither won nor lost.
pub fn compute_standings(results: &[Record], division: &str) -> Vec<TeamStanding> {
    let mut table: Vec<TeamStanding> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for game in results.iter().filter(|g| involves_division(g, division)) {
        let winner = game.text("winner").map(|w| w.to_lowercase());
        let winner_id = game.text("winner_id");

        let mut slots = [None, None];
        for (slot, side) in slots.iter_mut().zip(Side::BOTH) {
            let team = game.side(side);
            let Some(name) = team.name.clone() else {
                continue;
            };
            let location = game.text(&format!("{}_location", side.prefix()));
            let idx = *index.entry(name.clone()).or_insert_with(|| {
                table.push(TeamStanding::new(name.clone(), team.conference.clone(), location));
                table.len() - 1
            });
            table[idx].games += 1;

            let won = winner.as_deref() == Some(name.to_lowercase().as_str())
                || (winner_id.is_some() && winner_id == team.id);
            *slot = Some((idx, won));
        }

        let decided = slots.iter().flatten().any(|&(_, won)| won);
        if decided {
            for &(idx, won) in slots.iter().flatten() {
                if won {
                    table[idx].wins += 1;
                } else {
                    table[idx].losses += 1;
                }
            }
        }
    }

    for row in &mut table {
        row.win_percentage = if row.games > 0 {
            row.wins as f64 / row.games as f64
        } else {
            0.0
        };
    }

    table.sort_by(|a, b| {
        b.win_percentage
            .partial_cmp(&a.win_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.wins.cmp(&a.wins))
    });
    table
}

fn involves_division(game: &Record, division: &str) -> bool {
    Side::BOTH.iter().any(|&side| {
        game.side(side)
            .division
            .is_some_and(|d| division_matches(&d, division))
    })
}
