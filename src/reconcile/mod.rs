pub mod dedup;
pub mod facets;
pub mod filter;
pub mod join;
pub mod schedule;
pub mod standings;

pub use dedup::{dedup_keys, deduplicate, DedupKey};
pub use filter::{filter, DateWindow, FilterCriteria, FilterPipeline};
pub use join::{join_with_reference, MatchTier, ReferenceIndex, SHARED_CONFERENCE_KEY};
pub use schedule::{normalize_schedule, parse_date};
pub use standings::{compute_standings, TeamStanding};

use crate::records::Record;

/// Dedup then enrich: the standard path for score and live feeds.
pub fn reconcile(raw: &[Record], reference: &ReferenceIndex) -> Vec<Record> {
    deduplicate(raw)
        .iter()
        .map(|record| reference.enrich(record))
        .collect()
}
