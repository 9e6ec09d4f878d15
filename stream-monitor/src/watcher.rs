//! Keyword file change detection.
//!
//! The platform watcher only posts a refresh request on a channel; one
//! refresh task consumes the requests and re-reads the file off the async
//! threads. When no platform watcher can be created the task polls instead.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use subwatch_core::{KeywordStore, RefreshOutcome};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// `tokio::time::interval` rejects a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Keeps the keyword store in sync with its file until dropped.
pub struct KeywordWatcher {
    watcher: Option<RecommendedWatcher>,
    refresh_task: JoinHandle<()>,
}

impl KeywordWatcher {
    /// Watches the store's file, falling back to polling every `poll_interval`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(store: Arc<KeywordStore>, poll_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        match create_watcher(store.path(), tx) {
            Ok(watcher) => {
                info!("Watching {} for keyword changes", store.path().display());
                Self {
                    watcher: Some(watcher),
                    refresh_task: tokio::spawn(consume_refresh_requests(store, rx)),
                }
            }
            Err(e) => {
                warn!(
                    "Cannot watch {} ({}), polling every {:?} instead",
                    store.path().display(),
                    e,
                    poll_interval
                );
                Self::polling(store, poll_interval)
            }
        }
    }

    /// Polls the store's file on a fixed interval without a platform watcher.
    pub fn polling(store: Arc<KeywordStore>, poll_interval: Duration) -> Self {
        Self {
            watcher: None,
            refresh_task: tokio::spawn(poll_keyword_file(store, poll_interval)),
        }
    }

    pub fn is_polling(&self) -> bool {
        self.watcher.is_none()
    }
}

impl Drop for KeywordWatcher {
    fn drop(&mut self) {
        self.refresh_task.abort();
        debug!("Stopped keyword file watcher");
    }
}

fn create_watcher(
    path: &Path,
    tx: UnboundedSender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let file_name: Option<OsString> = path.file_name().map(|name| name.to_os_string());
    // Editors often replace the file instead of writing it in place, so the
    // directory is watched and events are filtered by file name.
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let ours = event
                    .paths
                    .iter()
                    .any(|changed| changed.file_name() == file_name.as_deref());
                if ours && should_process_event(&event) {
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!("Keyword file watch error: {}", e),
        },
        notify::Config::default(),
    )?;
    watcher.watch(directory, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn should_process_event(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
}

async fn consume_refresh_requests(store: Arc<KeywordStore>, mut rx: UnboundedReceiver<()>) {
    while rx.recv().await.is_some() {
        // One re-read covers a burst of events.
        while rx.try_recv().is_ok() {}
        refresh_off_thread(&store).await;
    }
}

async fn poll_keyword_file(store: Arc<KeywordStore>, poll_interval: Duration) {
    let mut ticker = tokio::time::interval(poll_interval.max(MIN_POLL_INTERVAL));
    loop {
        ticker.tick().await;
        refresh_off_thread(&store).await;
    }
}

/// Runs [`KeywordStore::refresh_if_changed`] on the blocking pool.
pub(crate) async fn refresh_off_thread(store: &Arc<KeywordStore>) -> Option<RefreshOutcome> {
    let store = Arc::clone(store);
    match tokio::task::spawn_blocking(move || store.refresh_if_changed()).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!("Keyword refresh task failed: {}", e);
            None
        }
    }
}
