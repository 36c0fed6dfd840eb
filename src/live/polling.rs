//! Periodic background refresh of a live data source.
//!
//! A [`PollingFetcher`] owns at most one repeating timer task. Polling ticks
//! run silently (the loading flag is left alone) while an explicit
//! foreground fetch raises it until every overlapping foreground fetch has
//! finished. Results are
//! published on a `watch` channel so consumers can read the latest snapshot
//! or await changes.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::source::LiveSource;
use crate::error::FetchOutcome;
use crate::records::Record;

/// What consumers see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub data: Vec<Record>,
    /// Raised while at least one foreground fetch is running.
    pub loading: bool,
    /// Message of the most recent failed fetch; cleared by the next success.
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// User-initiated: toggles the loading flag.
    Foreground,
    /// Background refresh: leaves the loading flag untouched.
    Silent,
}

/// Owns the polling timer for one consumer. Dropping it stops polling.
pub struct PollingFetcher {
    source: Arc<dyn LiveSource>,
    state: Arc<watch::Sender<FeedState>>,
    task: Mutex<Option<JoinHandle<()>>>,
    foreground: AtomicUsize,
}

impl PollingFetcher {
    pub fn new(source: Arc<dyn LiveSource>) -> Self {
        let (tx, _rx) = watch::channel(FeedState::default());
        PollingFetcher {
            source,
            state: Arc::new(tx),
            task: Mutex::new(None),
            foreground: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.lock_task().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run one fetch cycle now, independent of the polling timer.
    pub async fn fetch(&self, mode: FetchMode) {
        let _loading = match mode {
            FetchMode::Foreground => Some(LoadingGuard::raise(&self.state, &self.foreground)),
            FetchMode::Silent => None,
        };
        run_cycle(self.source.as_ref(), &self.state).await;
    }

    /// Start refreshing every `interval`, first tick one interval from now.
    /// Returns `false` without doing anything if already polling or if the
    /// interval is zero. Must be called inside a tokio runtime.
    pub fn start_polling(&self, interval: Duration) -> bool {
        if interval.is_zero() {
            warn!("[{}] Refusing to poll with a zero interval", self.source.name());
            return false;
        }

        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("[{}] Already polling", self.source.name());
            return false;
        }

        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                run_cycle(source.as_ref(), &state).await;
            }
        }));

        info!(
            "[{}] Polling started (interval={:?})",
            self.source.name(),
            interval
        );
        true
    }

    /// Cancel the polling timer. Returns whether one was running. Safe to
    /// call repeatedly and before any `start_polling`.
    pub fn stop_polling(&self) -> bool {
        match self.lock_task().take() {
            Some(handle) => {
                handle.abort();
                info!("[{}] Polling stopped", self.source.name());
                true
            }
            None => false,
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PollingFetcher {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

/// Counts one running foreground fetch. `loading` stays raised until the last
/// guard is dropped, including when the fetch future itself is dropped.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<FeedState>,
    active: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
    fn raise(state: &'a watch::Sender<FeedState>, active: &'a AtomicUsize) -> Self {
        state.send_modify(|s| {
            active.fetch_add(1, Ordering::SeqCst);
            s.loading = true;
        });
        LoadingGuard { state, active }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let active = self.active;
        self.state.send_modify(|s| {
            s.loading = active.fetch_sub(1, Ordering::SeqCst) > 1;
        });
    }
}

async fn run_cycle(source: &dyn LiveSource, state: &watch::Sender<FeedState>) {
    match source.fetch().await {
        FetchOutcome::Success(data) => {
            debug!("[{}] Refreshed {} records", source.name(), data.len());
            state.send_modify(|s| {
                s.data = data;
                s.error = None;
                s.last_updated = Some(Utc::now());
            });
        }
        FetchOutcome::Cancelled => {
            debug!("[{}] Fetch superseded, keeping current data", source.name());
        }
        FetchOutcome::TransientFailure(e) | FetchOutcome::PermanentFailure(e) => {
            error!("[{}] Fetch failed: {}", source.name(), e);
            state.send_modify(|s| {
                s.data.clear();
                s.error = Some(e.to_string());
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct MockSource {
        calls: AtomicUsize,
        failing: AtomicBool,
        cancelled: AtomicBool,
        observer: Mutex<Option<watch::Receiver<FeedState>>>,
        seen_loading: Mutex<Vec<bool>>,
    }

    impl MockSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LiveSource for MockSource {
        async fn fetch(&self) -> FetchOutcome<Vec<Record>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(rx) = self.observer.lock().unwrap().as_ref() {
                self.seen_loading.lock().unwrap().push(rx.borrow().loading);
            }
            if self.cancelled.load(Ordering::SeqCst) {
                return FetchOutcome::Cancelled;
            }
            if self.failing.load(Ordering::SeqCst) {
                return FetchOutcome::from_error(FetchError::Status {
                    status: StatusCode::BAD_GATEWAY,
                    body: "upstream down".into(),
                });
            }
            FetchOutcome::Success(vec![Record::from_value(json!({"cycle": n})).unwrap()])
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    /// Holds every fetch until a permit is released for it.
    struct GatedSource {
        gate: Semaphore,
        entered: AtomicUsize,
    }

    impl GatedSource {
        fn new() -> Self {
            GatedSource {
                gate: Semaphore::new(0),
                entered: AtomicUsize::new(0),
            }
        }

        async fn wait_entered(&self, n: usize) {
            while self.entered.load(Ordering::SeqCst) < n {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl LiveSource for GatedSource {
        async fn fetch(&self) -> FetchOutcome<Vec<Record>> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            FetchOutcome::Success(Vec::new())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    fn spawn_foreground(fetcher: &Arc<PollingFetcher>) -> JoinHandle<()> {
        let fetcher = Arc::clone(fetcher);
        tokio::spawn(async move { fetcher.fetch(FetchMode::Foreground).await })
    }

    fn fetcher() -> (Arc<MockSource>, PollingFetcher) {
        let source = Arc::new(MockSource::default());
        let fetcher = PollingFetcher::new(source.clone());
        (source, fetcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_installs_one_timer() {
        let (source, fetcher) = fetcher();
        assert!(fetcher.start_polling(Duration::from_millis(100)));
        assert!(!fetcher.start_polling(Duration::from_millis(100)));
        assert!(fetcher.is_polling());

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(source.calls(), 3);

        assert!(fetcher.stop_polling());
        assert!(!fetcher.stop_polling());
        assert!(!fetcher.is_polling());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let (source, fetcher) = fetcher();
        assert!(!fetcher.stop_polling());
        assert_eq!(source.calls(), 0);
        assert_eq!(fetcher.snapshot(), FeedState::default());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let (_source, fetcher) = fetcher();
        assert!(!fetcher.start_polling(Duration::ZERO));
        assert!(!fetcher.is_polling());
    }

    #[tokio::test]
    async fn test_foreground_fetch_toggles_loading_silent_does_not() {
        let (source, fetcher) = fetcher();
        *source.observer.lock().unwrap() = Some(fetcher.subscribe());

        fetcher.fetch(FetchMode::Foreground).await;
        fetcher.fetch(FetchMode::Silent).await;

        assert_eq!(*source.seen_loading.lock().unwrap(), vec![true, false]);
        let snap = fetcher.snapshot();
        assert!(!snap.loading);
        assert_eq!(snap.data[0].text("cycle").as_deref(), Some("2"));
        assert!(snap.last_updated.is_some());
        assert!(!fetcher.is_polling());
    }

    #[tokio::test]
    async fn test_overlapping_foreground_fetches_keep_loading() {
        let source = Arc::new(GatedSource::new());
        let fetcher = Arc::new(PollingFetcher::new(source.clone()));

        let first = spawn_foreground(&fetcher);
        let second = spawn_foreground(&fetcher);
        source.wait_entered(2).await;
        assert!(fetcher.snapshot().loading);

        source.gate.add_permits(1);
        while !(first.is_finished() || second.is_finished()) {
            tokio::task::yield_now().await;
        }
        assert!(fetcher.snapshot().loading);

        source.gate.add_permits(1);
        first.await.unwrap();
        second.await.unwrap();
        assert!(!fetcher.snapshot().loading);
    }

    #[tokio::test]
    async fn test_aborted_foreground_fetch_lowers_loading() {
        let source = Arc::new(GatedSource::new());
        let fetcher = Arc::new(PollingFetcher::new(source.clone()));

        let pending = spawn_foreground(&fetcher);
        source.wait_entered(1).await;
        assert!(fetcher.snapshot().loading);

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        assert!(!fetcher.snapshot().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_polling() {
        let (source, fetcher) = fetcher();
        fetcher.fetch(FetchMode::Foreground).await;
        assert_eq!(fetcher.snapshot().data.len(), 1);

        source.failing.store(true, Ordering::SeqCst);
        fetcher.start_polling(Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(250)).await;

        let snap = fetcher.snapshot();
        assert_eq!(source.calls(), 3);
        assert!(snap.data.is_empty());
        assert!(snap.error.as_deref().unwrap().contains("upstream down"));
        assert!(fetcher.is_polling());

        source.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let snap = fetcher.snapshot();
        assert_eq!(source.calls(), 4);
        assert_eq!(snap.error, None);
        assert_eq!(snap.data.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_keeps_previous_data() {
        let (source, fetcher) = fetcher();
        fetcher.fetch(FetchMode::Foreground).await;
        let before = fetcher.snapshot();

        source.cancelled.store(true, Ordering::SeqCst);
        fetcher.fetch(FetchMode::Foreground).await;
        let after = fetcher.snapshot();
        assert_eq!(after.data, before.data);
        assert_eq!(after.error, None);
        assert!(!after.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_timer() {
        let (source, fetcher) = fetcher();
        fetcher.start_polling(Duration::from_millis(100));
        drop(fetcher);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_refreshes() {
        let (_source, fetcher) = fetcher();
        let mut rx = fetcher.subscribe();
        fetcher.start_polling(Duration::from_millis(100));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().data.len(), 1);
        fetcher.stop_polling();
    }
}
