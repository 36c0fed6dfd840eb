use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

mod config;

use config::Config;
use vbdb_sync::api::{ExpiringCache, VbdbClient};
use vbdb_sync::live::{score_line, FeedState, FetchMode, LiveMatchFeed, PollingFetcher};
use vbdb_sync::reconcile::FilterPipeline;
use vbdb_sync::records::Side;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let client = VbdbClient::new(config.client_config(), ExpiringCache::new())?;
    info!("Watching live matches from {}", config.api_url);

    let pipeline = FilterPipeline::new(&config.criteria());
    let fetcher = PollingFetcher::new(Arc::new(LiveMatchFeed::new(client)));
    let mut updates = fetcher.subscribe();

    fetcher.fetch(FetchMode::Foreground).await;
    report(&fetcher.snapshot(), &pipeline);
    let _ = updates.borrow_and_update();

    fetcher.start_polling(config.poll_interval());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if !state.loading {
                    report(&state, &pipeline);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    fetcher.stop_polling();
    Ok(())
}

fn report(state: &FeedState, pipeline: &FilterPipeline) {
    if let Some(err) = &state.error {
        warn!("Live data unavailable: {}", err);
        return;
    }

    let visible = pipeline.apply(&state.data);
    info!(
        "{} live matches ({} after filters)",
        state.data.len(),
        visible.len()
    );
    for m in &visible {
        let name = |side: Side| m.side(side).name.unwrap_or_else(|| "?".to_string());
        info!(
            "  {} vs {}  [{}]",
            name(Side::One),
            name(Side::Two),
            score_line(m)
        );
    }
}
