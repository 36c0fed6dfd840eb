use async_trait::async_trait;
use tracing::{info, warn};

use super::source::LiveSource;
use crate::api::VbdbClient;
use crate::error::FetchOutcome;
use crate::reconcile::{reconcile, ReferenceIndex};
use crate::records::Record;

/// Live matches from `/live`, deduplicated and joined against the cached
/// schools list.
pub struct LiveMatchFeed {
    client: VbdbClient,
}

impl LiveMatchFeed {
    pub fn new(client: VbdbClient) -> Self {
        LiveMatchFeed { client }
    }

    /// Schools reference index. Unavailable reference data yields an empty
    /// index so matches are still served un-joined. `None` when a newer
    /// schools request superseded this one.
    async fn reference(&self) -> Option<ReferenceIndex> {
        match self.client.schools().await {
            FetchOutcome::Success(rows) => Some(ReferenceIndex::from_records(&rows)),
            FetchOutcome::Cancelled => None,
            FetchOutcome::TransientFailure(e) | FetchOutcome::PermanentFailure(e) => {
                warn!("Schools unavailable, serving un-joined live matches: {}", e);
                Some(ReferenceIndex::default())
            }
        }
    }
}

#[async_trait]
impl LiveSource for LiveMatchFeed {
    async fn fetch(&self) -> FetchOutcome<Vec<Record>> {
        let raw = match self.client.live().await {
            FetchOutcome::Success(raw) => raw,
            FetchOutcome::Cancelled => return FetchOutcome::Cancelled,
            FetchOutcome::TransientFailure(e) => return FetchOutcome::TransientFailure(e),
            FetchOutcome::PermanentFailure(e) => return FetchOutcome::PermanentFailure(e),
        };
        if raw.is_empty() {
            return FetchOutcome::Success(raw);
        }

        let Some(reference) = self.reference().await else {
            return FetchOutcome::Cancelled;
        };
        let matches = reconcile(&raw, &reference);
        info!(
            "Reconciled {} live matches ({} reference teams)",
            matches.len(),
            reference.len()
        );
        FetchOutcome::Success(matches)
    }

    fn name(&self) -> &str {
        "vbdb-live"
    }
}
