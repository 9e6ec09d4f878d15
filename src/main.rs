use anyhow::Context;
use email_notifier::{Notifier, SendGridClient};
use reddit_client::{RedditApiClient, SubredditSource};
use std::sync::Arc;
use stream_monitor::{MonitorConfig, StreamMonitor};
use subwatch_core::{AppConfig, KeywordStore, SeenPostCache};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "subwatch=info,stream_monitor=info,reddit_client=info,email_notifier=info,subwatch_core=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting Subwatch - Reddit keyword monitor");

    let config = AppConfig::load().context("failed to load configuration")?;
    let settings = config.settings;

    let keywords = Arc::new(KeywordStore::new(&settings.keywords_file));
    let seen = Arc::new(SeenPostCache::new(settings.seen_capacity));

    let reddit = Arc::new(
        RedditApiClient::new(config.reddit).context("failed to create Reddit client")?,
    );
    let source = Arc::new(SubredditSource::new(reddit, settings.subreddits.clone()));

    let sendgrid = SendGridClient::new(config.email).context("failed to create SendGrid client")?;
    let notifier = Notifier::new(Arc::new(sendgrid));

    let monitor = StreamMonitor::new(
        source,
        keywords,
        seen,
        notifier,
        MonitorConfig::from(&settings),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            // Keep the sender alive so the monitor keeps running.
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let stats = monitor.run(shutdown_rx).await;
    tracing::info!(
        "Processed {} posts, {} matches, {} alerts sent, {} dropped",
        stats.posts_received,
        stats.matches,
        stats.notifications_delivered,
        stats.notifications_dropped
    );

    Ok(())
}
