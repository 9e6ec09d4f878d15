use crate::api::RedditApiClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use subwatch_core::{CoreError, PostSource, PostStream, RedditPost, SeenPostCache};
use tracing::{debug, info};

const LISTING_LIMIT: u32 = 100;
/// Identifiers the stream itself remembers between polls.
const STREAM_SEEN_WINDOW: usize = 301;

/// Pause between polls that returned nothing new; doubles up to `max_pause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPacing {
    pub min_pause: Duration,
    pub max_pause: Duration,
}

impl Default for StreamPacing {
    fn default() -> Self {
        Self {
            min_pause: Duration::from_secs(1),
            max_pause: Duration::from_secs(16),
        }
    }
}

/// Opens submission streams over one or more `+`-joined subreddits.
pub struct SubredditSource {
    client: Arc<RedditApiClient>,
    subreddits: String,
    skip_existing: bool,
    pacing: StreamPacing,
}

impl SubredditSource {
    pub fn new(client: Arc<RedditApiClient>, subreddits: impl Into<String>) -> Self {
        Self {
            client,
            subreddits: subreddits.into(),
            skip_existing: true,
            pacing: StreamPacing::default(),
        }
    }

    /// Whether posts already listed when a stream opens are yielded too.
    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    pub fn with_pacing(mut self, pacing: StreamPacing) -> Self {
        self.pacing = pacing;
        self
    }
}

#[async_trait]
impl PostSource for SubredditSource {
    async fn open(&self) -> Result<Box<dyn PostStream>, CoreError> {
        info!("Opening submission stream for r/{}", self.subreddits);
        Ok(Box::new(SubmissionStream::new(
            Arc::clone(&self.client),
            self.subreddits.clone(),
            self.skip_existing,
            self.pacing,
        )))
    }

    fn describe(&self) -> String {
        format!("r/{}", self.subreddits)
    }
}

/// Polls `/r/<subreddits>/new` and yields each unseen submission once, oldest first.
pub struct SubmissionStream {
    client: Arc<RedditApiClient>,
    subreddits: String,
    seen: SeenPostCache,
    buffer: VecDeque<RedditPost>,
    skip_next_batch: bool,
    pacing: StreamPacing,
    pause: Duration,
}

impl SubmissionStream {
    pub fn new(
        client: Arc<RedditApiClient>,
        subreddits: String,
        skip_existing: bool,
        pacing: StreamPacing,
    ) -> Self {
        Self {
            client,
            subreddits,
            seen: SeenPostCache::new(STREAM_SEEN_WINDOW),
            buffer: VecDeque::new(),
            skip_next_batch: skip_existing,
            pacing,
            pause: pacing.min_pause,
        }
    }

    /// Fetches one listing and queues what has not been yielded yet. Returns the number queued.
    async fn poll_listing(&mut self) -> Result<usize, CoreError> {
        let listing = self
            .client
            .get_new_posts(&self.subreddits, LISTING_LIMIT)
            .await?;

        let skip = std::mem::take(&mut self.skip_next_batch);
        let mut queued = 0;
        for child in listing.data.children.into_iter().rev() {
            let post = RedditPost::from(child.data);
            if self.seen.check_and_add(&post.id) || skip {
                continue;
            }
            self.buffer.push_back(post);
            queued += 1;
        }

        if skip {
            debug!(
                "Skipped {} existing posts in r/{}",
                self.seen.len(),
                self.subreddits
            );
        }
        Ok(queued)
    }
}

#[async_trait]
impl PostStream for SubmissionStream {
    async fn next_post(&mut self) -> Result<Option<RedditPost>, CoreError> {
        loop {
            if let Some(post) = self.buffer.pop_front() {
                return Ok(Some(post));
            }

            if self.poll_listing().await? > 0 {
                self.pause = self.pacing.min_pause;
                continue;
            }

            tokio::time::sleep(self.pause).await;
            self.pause = (self.pause * 2).min(self.pacing.max_pause);
        }
    }
}
