pub mod api;
pub mod error;
pub mod live;
pub mod reconcile;
pub mod records;

pub use api::{ClientConfig, ExpiringCache, RetryPolicy, VbdbClient};
pub use error::{FetchError, FetchOutcome};
pub use live::{FeedState, FetchMode, LiveMatchFeed, LiveSource, PollingFetcher};
pub use reconcile::{FilterCriteria, FilterPipeline, ReferenceIndex};
pub use records::{Record, Side, TeamRef};
