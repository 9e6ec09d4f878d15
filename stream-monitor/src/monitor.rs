use crate::watcher::{refresh_off_thread, KeywordWatcher};
use email_notifier::{Notifier, NotifyOutcome};
use std::sync::Arc;
use std::time::Duration;
use subwatch_core::{
    match_keywords, CoreError, ErrorReporter, KeywordStore, MonitorSettings, PostSource,
    RedditPost, SeenPostCache,
};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Starting,
    Watching,
    Error,
    Stopped,
}

/// Counters reported when the monitor stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub posts_received: u64,
    pub duplicates_skipped: u64,
    pub matches: u64,
    pub notifications_delivered: u64,
    pub notifications_dropped: u64,
    pub stream_errors: u64,
    pub stream_opens: u64,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause after a stream failure before reopening it
    pub error_retry_delay: Duration,
    /// Keyword file poll interval when file watching is unavailable
    pub keyword_poll_interval: Duration,
    /// Whether to follow keyword file edits while running
    pub watch_keywords: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from(&MonitorSettings::default())
    }
}

impl From<&MonitorSettings> for MonitorConfig {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            error_retry_delay: settings.error_retry_delay(),
            keyword_poll_interval: settings.keyword_poll_interval(),
            watch_keywords: true,
        }
    }
}

/// Pulls posts from a [`PostSource`], filters them and sends alerts.
///
/// Posts are handled one at a time in stream order. Any stream failure is
/// logged and followed by `error_retry_delay` before the stream is reopened;
/// the monitor only stops when the shutdown signal fires.
pub struct StreamMonitor {
    source: Arc<dyn PostSource>,
    keywords: Arc<KeywordStore>,
    seen: Arc<SeenPostCache>,
    notifier: Notifier,
    config: MonitorConfig,
    reporter: ErrorReporter,
    state: watch::Sender<MonitorState>,
    stats: MonitorStats,
}

impl StreamMonitor {
    pub fn new(
        source: Arc<dyn PostSource>,
        keywords: Arc<KeywordStore>,
        seen: Arc<SeenPostCache>,
        notifier: Notifier,
        config: MonitorConfig,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Starting);
        Self {
            source,
            keywords,
            seen,
            notifier,
            config,
            reporter: ErrorReporter::new(),
            state,
            stats: MonitorStats::default(),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// Runs until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> MonitorStats {
        self.set_state(MonitorState::Starting);
        refresh_off_thread(&self.keywords).await;
        info!(
            "Monitoring {} for {} keywords",
            self.source.describe(),
            self.keywords.snapshot().len()
        );

        // Dropped on every path out of this function, which stops the watch.
        let _watcher = self.config.watch_keywords.then(|| {
            KeywordWatcher::start(Arc::clone(&self.keywords), self.config.keyword_poll_interval)
        });

        loop {
            let error = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                error = self.watch_stream() => error,
            };

            self.set_state(MonitorState::Error);
            self.stats.stream_errors += 1;
            self.reporter.report_error(&error);
            info!(
                "Reopening {} in {:?}",
                self.source.describe(),
                self.config.error_retry_delay
            );

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = tokio::time::sleep(self.config.error_retry_delay) => {}
            }
        }

        self.set_state(MonitorState::Stopped);
        info!("Monitor stopped: {:?}", self.stats);
        self.stats
    }

    /// Opens the stream and consumes it until it fails. Only returns the failure.
    async fn watch_stream(&mut self) -> CoreError {
        let mut stream = match self.source.open().await {
            Ok(stream) => stream,
            Err(e) => return e,
        };
        self.stats.stream_opens += 1;
        self.set_state(MonitorState::Watching);

        loop {
            match stream.next_post().await {
                Ok(Some(post)) => {
                    self.process_post(&post).await;
                }
                Ok(None) => {
                    return CoreError::StreamExhausted {
                        source_name: self.source.describe(),
                    }
                }
                Err(e) => return e,
            }
        }
    }

    /// Deduplicates, matches and, on a match, notifies for one post.
    pub async fn process_post(&mut self, post: &RedditPost) -> Option<NotifyOutcome> {
        self.stats.posts_received += 1;
        if self.seen.check_and_add(&post.id) {
            self.stats.duplicates_skipped += 1;
            debug!("Skipping already seen post {}", post.id);
            return None;
        }

        let keywords = self.keywords.snapshot();
        let matched = match_keywords(post, &keywords);
        if matched.is_empty() {
            return None;
        }

        info!("Match found: {}", post.title);
        self.stats.matches += 1;
        let outcome = self.notifier.notify(post, &matched).await;
        match outcome {
            NotifyOutcome::Delivered(_) => self.stats.notifications_delivered += 1,
            NotifyOutcome::Dropped => self.stats.notifications_dropped += 1,
        }
        Some(outcome)
    }

    fn set_state(&self, next: MonitorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("Monitor state {:?} -> {:?}", previous, next);
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
