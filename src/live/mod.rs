pub mod feed;
pub mod match_status;
pub mod polling;
pub mod source;

pub use feed::LiveMatchFeed;
pub use match_status::{match_status, score_line, score_summary, MatchStatus, ScoreSummary, SetScore};
pub use polling::{FeedState, FetchMode, PollingFetcher};
pub use source::LiveSource;
