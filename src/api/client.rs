use anyhow::Context;
use futures_util::future::{AbortHandle, Abortable};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::ExpiringCache;
use super::retry::{retry_when, RetryPolicy};
use crate::error::{FetchError, FetchOutcome};
use crate::records::Record;

pub const DEFAULT_API_URL: &str = "https://api.volleyballdatabased.com";

const MINUTE: u64 = 60;

/// Connection settings for [`VbdbClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent as the `x-api-key` header when present.
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Cache lifetime of the schools and teams reference lists.
    pub reference_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            reference_ttl: Duration::from_secs(30 * MINUTE),
        }
    }
}

/// Filters accepted by the `/players` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub division: Option<String>,
    pub conference: Option<String>,
    pub team_id: Option<String>,
    pub position: Option<String>,
    pub search: Option<String>,
}

impl PlayerQuery {
    /// URL-encoded query string without the leading `?`. Unset fields are
    /// omitted; field order is fixed so equal queries share a cache key.
    pub fn to_query(&self) -> String {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        if let Some(page) = self.page {
            ser.append_pair("page", &page.to_string());
        }
        if let Some(per_page) = self.per_page {
            ser.append_pair("per_page", &per_page.to_string());
        }
        let text_params = [
            ("division", &self.division),
            ("conference", &self.conference),
            ("team_id", &self.team_id),
            ("position", &self.position),
            ("search", &self.search),
        ];
        for (name, value) in text_params {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                ser.append_pair(name, v);
            }
        }
        ser.finish()
    }
}

struct InFlight {
    id: u64,
    handle: AbortHandle,
}

/// Client for the volleyball stats REST API.
///
/// Clones share the response cache and the in-flight request table, so a
/// request made through one clone supersedes a request for the same endpoint
/// made through another.
#[derive(Clone)]
pub struct VbdbClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
    reference_ttl: Duration,
    cache: ExpiringCache<Value>,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    next_request_id: Arc<AtomicU64>,
}

impl VbdbClient {
    pub fn new(config: ClientConfig, cache: ExpiringCache<Value>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Url::parse(&config.base_url)
            .with_context(|| format!("Invalid API base URL: {}", config.base_url))?;
        Ok(VbdbClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            retry: config.retry,
            reference_ttl: config.reference_ttl,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_request_id: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn cache(&self) -> &ExpiringCache<Value> {
        &self.cache
    }

    /// Serve `cache_key` from the cache, or fetch `endpoint` and cache the
    /// response for `ttl`. Failures and cancellations are never cached.
    pub async fn get_cached_or_fetch(
        &self,
        endpoint: &str,
        cache_key: &str,
        ttl: Duration,
    ) -> FetchOutcome<Value> {
        if let Some(cached) = self.cache.get(cache_key).await {
            debug!("Cache hit: {}", cache_key);
            return FetchOutcome::Success(cached);
        }
        debug!("Cache miss: {}", cache_key);

        let outcome = self.fetch_uncached(endpoint).await;
        if let FetchOutcome::Success(value) = &outcome {
            self.cache.set(cache_key, value.clone(), ttl).await;
        }
        outcome
    }

    /// Fetch `endpoint`, aborting any request for the same endpoint that is
    /// still in flight. The aborted call resolves to `Cancelled`.
    pub async fn fetch_uncached(&self, endpoint: &str) -> FetchOutcome<Value> {
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut in_flight = self.lock_in_flight();
            if let Some(previous) = in_flight.insert(endpoint.to_string(), InFlight { id, handle }) {
                previous.handle.abort();
                debug!("Superseding in-flight request: {}", endpoint);
            }
        }

        let result = Abortable::new(self.fetch_json(endpoint), registration).await;

        {
            let mut in_flight = self.lock_in_flight();
            if in_flight.get(endpoint).is_some_and(|f| f.id == id) {
                in_flight.remove(endpoint);
            }
        }

        match result {
            Err(_aborted) => {
                debug!("Request cancelled: {}", endpoint);
                FetchOutcome::Cancelled
            }
            Ok(Ok(value)) => FetchOutcome::Success(value),
            Ok(Err(e)) => {
                warn!("Error fetching {}: {}", endpoint, e);
                FetchOutcome::from_error(e)
            }
        }
    }

    /// Abort the in-flight request for `endpoint`. Returns whether there was
    /// one.
    pub fn cancel(&self, endpoint: &str) -> bool {
        match self.lock_in_flight().remove(endpoint) {
            Some(f) => {
                f.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Re-run `op` under the configured retry policy while it keeps failing
    /// transiently.
    pub async fn with_retry<T, F, Fut>(&self, mut op: F) -> FetchOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchOutcome<T>>,
    {
        let result = retry_when(
            self.retry,
            || {
                let fut = op();
                async move { fut.await.into_result() }
            },
            FetchError::is_retryable,
        )
        .await;

        match result {
            Ok(Some(value)) => FetchOutcome::Success(value),
            Ok(None) => FetchOutcome::Cancelled,
            Err(e) => FetchOutcome::from_error(e),
        }
    }

    // ── Endpoints ────────────────────────────────────────────────────────────

    pub async fn schools(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/schools", "schools-all", self.reference_ttl.as_secs())
            .await
    }

    pub async fn teams(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/teams", "teams-all", self.reference_ttl.as_secs())
            .await
    }

    pub async fn team(&self, team_id: &str) -> FetchOutcome<Option<Record>> {
        let endpoint = format!("/teams/{}", team_id);
        let key = format!("team-{}", team_id);
        self.cached_value(&endpoint, &key, 10 * MINUTE)
            .await
            .map(Record::from_value)
    }

    pub async fn team_games(&self, team_id: &str) -> FetchOutcome<Vec<Record>> {
        let endpoint = format!("/games/{}", team_id);
        let key = format!("games-{}", team_id);
        self.cached_records(&endpoint, &key, 5 * MINUTE).await
    }

    /// Teams of one conference. Cached like the other reference lists.
    pub async fn conference_teams(&self, conference: &str) -> FetchOutcome<Vec<Record>> {
        let endpoint = format!("/conferences/{}/teams", path_segment(conference));
        let key = format!("conference-teams-{}", conference);
        self.cached_records(&endpoint, &key, self.reference_ttl.as_secs())
            .await
    }

    /// Combined game listing. `params` are sent in the given order and also
    /// form the cache key.
    pub async fn mega_games(&self, params: &[(&str, &str)]) -> FetchOutcome<Vec<Record>> {
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        let endpoint = if qs.is_empty() {
            "/megagames".to_string()
        } else {
            format!("/megagames?{}", qs)
        };
        let key = format!("megagames-{}", qs);
        self.cached_records(&endpoint, &key, 5 * MINUTE).await
    }

    pub async fn schedule(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/schedule", "schedule-all", 10 * MINUTE).await
    }

    pub async fn team_schedule(&self, team_id: &str) -> FetchOutcome<Vec<Record>> {
        let endpoint = format!("/schedule/{}", path_segment(team_id));
        let key = format!("schedule-{}", team_id);
        self.cached_records(&endpoint, &key, 10 * MINUTE).await
    }

    pub async fn results(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/results", "results-all", 5 * MINUTE).await
    }

    pub async fn team_results(&self, team_id: &str) -> FetchOutcome<Vec<Record>> {
        let endpoint = format!("/results/{}", path_segment(team_id));
        let key = format!("results-{}", team_id);
        self.cached_records(&endpoint, &key, 5 * MINUTE).await
    }

    pub async fn seasons(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/seasons", "seasons-all", 60 * MINUTE).await
    }

    pub async fn rankings(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/avca_rankings", "rankings-avca", 60 * MINUTE).await
    }

    pub async fn standings(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/standings", "standings-all", 10 * MINUTE).await
    }

    /// CCCAA standings, best win percentage first. Rows without a
    /// percentage sort as zero.
    pub async fn cccaa_standings(&self) -> FetchOutcome<Vec<Record>> {
        self.cached_records("/cccaa_standings", "standings-cccaa", 10 * MINUTE)
            .await
            .map(|mut rows| {
                let pct = |r: &Record| r.number("win_percentage").unwrap_or(0.0);
                rows.sort_by(|a, b| {
                    pct(b)
                        .partial_cmp(&pct(a))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                rows
            })
    }

    pub async fn players(&self, query: &PlayerQuery) -> FetchOutcome<Vec<Record>> {
        let qs = query.to_query();
        let endpoint = if qs.is_empty() {
            "/players".to_string()
        } else {
            format!("/players?{}", qs)
        };
        let key = format!("players-{}", qs);
        self.cached_records(&endpoint, &key, 5 * MINUTE).await
    }

    pub async fn team_players(&self, team_id: &str) -> FetchOutcome<Vec<Record>> {
        let endpoint = format!("/players/{}", path_segment(team_id));
        let key = format!("roster-{}", team_id);
        self.cached_records(&endpoint, &key, 5 * MINUTE).await
    }

    /// Live matches. Never cached: every call goes to the network.
    pub async fn live(&self) -> FetchOutcome<Vec<Record>> {
        let outcome = self.fetch_uncached("/live").await.map(parse_records);
        if let FetchOutcome::Success(records) = &outcome {
            info!("Fetched {} live matches", records.len());
        }
        outcome
    }

    // ── Internals ───────────────────────────────────────────────────────────

    async fn cached_value(&self, endpoint: &str, key: &str, ttl_secs: u64) -> FetchOutcome<Value> {
        let ttl = Duration::from_secs(ttl_secs);
        self.with_retry(move || self.get_cached_or_fetch(endpoint, key, ttl))
            .await
    }

    async fn cached_records(
        &self,
        endpoint: &str,
        key: &str,
        ttl_secs: u64,
    ) -> FetchOutcome<Vec<Record>> {
        self.cached_value(endpoint, key, ttl_secs)
            .await
            .map(parse_records)
    }

    async fn fetch_json(&self, endpoint: &str) -> Result<Value, FetchError> {
        let url = Url::parse(&format!("{}{}", self.base_url, endpoint))?;
        debug!("GET {}", url);

        let mut req = self.http.get(url);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Percent-encode one path segment (`"Big Ten"` becomes `"Big%20Ten"`).
fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Extract entity records from a response body.
///
/// Accepts a bare array, an `{ "items": [...] }` envelope (paginated
/// endpoints) or a `{ "data": [...] }` envelope. Non-object array members
/// are skipped.
pub fn parse_records(raw: Value) -> Vec<Record> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            _ => return vec![],
        },
        _ => return vec![],
    };
    items.into_iter().filter_map(Record::from_value).collect()
}
