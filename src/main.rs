use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use feedloop::app::App;
use feedloop::config::Config;
use feedloop::fetcher::HttpGateway;
use feedloop::scheduler;
use feedloop::state::StateEvent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedloop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("feedloop.toml")?;
    info!("Loaded {} feeds from configuration", config.feeds.len());

    let gateway = match &config.proxy {
        Some(endpoint) => HttpGateway::with_proxy(Url::parse(endpoint)?),
        None => HttpGateway::new(),
    };
    let app = Arc::new(App::new(Arc::new(gateway)));

    // Log every engine event; a UI layer would subscribe the same way.
    let mut events = app.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StateEvent::FeedsChanged) => info!("Feed list changed"),
                Ok(StateEvent::PostsChanged) => info!("Post list changed"),
                Ok(StateEvent::FormStateChanged(state)) => info!("Form state: {:?}", state),
                Ok(StateEvent::SelectionChanged(id)) => info!("Selected {}", id),
                Err(RecvError::Lagged(skipped)) => {
                    info!("Event log fell behind, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Seed the engine with the configured feeds; a bad feed is logged,
    // not fatal.
    for feed in &config.feeds {
        if let Err(e) = app.submit(&feed.url).await {
            error!("Failed to add feed '{}': {}", feed.url, e);
        }
    }

    let handle = scheduler::spawn(
        app.clone(),
        Duration::from_millis(config.refresh_interval_ms),
    );
    info!("Refresh scheduler started");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.shutdown().await;

    Ok(())
}
