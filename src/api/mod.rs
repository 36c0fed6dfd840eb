pub mod cache;
pub mod client;
pub mod retry;

pub use cache::{Clock, ExpiringCache, ManualClock, SystemClock};
pub use client::{parse_records, ClientConfig, PlayerQuery, VbdbClient, DEFAULT_API_URL};
pub use retry::{retry, retry_when, RetryPolicy};
