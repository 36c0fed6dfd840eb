use clap::Parser;
use std::time::Duration;

use vbdb_sync::api::{ClientConfig, RetryPolicy, DEFAULT_API_URL};
use vbdb_sync::reconcile::FilterCriteria;

/// Watch live volleyball matches, reconciled against reference data
#[derive(Parser, Debug, Clone)]
#[command(name = "vbdb-watch", version, about)]
pub struct Config {
    /// Volleyball database API base URL
    #[arg(long, env = "VBDB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// API key, sent as the x-api-key header
    #[arg(long, env = "VBDB_API_KEY")]
    pub api_key: Option<String>,

    /// Live match polling interval in seconds
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "30")]
    pub poll_interval_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// Retries after a transient failure (0 disables retrying)
    #[arg(long, env = "MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled on each further attempt
    #[arg(long, env = "RETRY_DELAY_MS", default_value = "500")]
    pub retry_delay_ms: u64,

    /// Minutes reference data (schools, teams) stays cached
    #[arg(long, env = "REFERENCE_TTL_MINUTES", default_value = "30")]
    pub reference_ttl_minutes: u64,

    /// Only show matches involving this division (e.g. D-I, NAIA)
    #[arg(long, env = "DIVISION")]
    pub division: Option<String>,

    /// Only show matches involving these conferences (repeatable)
    #[arg(long = "conference", env = "CONFERENCE", value_delimiter = ',')]
    pub conferences: Vec<String>,

    /// Only show matches involving these team ids or names (repeatable)
    #[arg(long = "team", env = "TEAMS", value_delimiter = ',')]
    pub teams: Vec<String>,

    /// Free-text search over team names
    #[arg(long, env = "SEARCH")]
    pub search: Option<String>,

    /// Only show matches with at least one ranked team
    #[arg(long, env = "RANKED_ONLY", default_value = "false")]
    pub ranked_only: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        if self.reference_ttl_minutes == 0 {
            anyhow::bail!("reference_ttl_minutes must be positive");
        }
        if url::Url::parse(&self.api_url).is_err() {
            anyhow::bail!("VBDB_API_URL is not a valid URL: {}", self.api_url);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
            retry: RetryPolicy::new(
                self.max_retries,
                Duration::from_millis(self.retry_delay_ms),
            ),
            reference_ttl: Duration::from_secs(self.reference_ttl_minutes.saturating_mul(60)),
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new()
            .with_conferences(self.conferences.iter().cloned())
            .with_teams(self.teams.iter().cloned());
        if let Some(division) = &self.division {
            criteria = criteria.with_division(division.clone());
        }
        if let Some(search) = &self.search {
            criteria = criteria.with_search(search.clone());
        }
        if self.ranked_only {
            criteria = criteria.ranked_only();
        }
        criteria
    }
}
