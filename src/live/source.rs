use async_trait::async_trait;

use crate::error::FetchOutcome;
use crate::records::Record;

/// Anything a [`PollingFetcher`](super::PollingFetcher) can refresh from.
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Fetch a complete snapshot. The fetcher replaces its data with it.
    async fn fetch(&self) -> FetchOutcome<Vec<Record>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
