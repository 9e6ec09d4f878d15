use crate::error::CoreError;
use crate::types::RedditPost;
use async_trait::async_trait;

/// An open, ordered stream of newly published posts.
#[async_trait]
pub trait PostStream: Send {
    /// Waits for the next post. `Ok(None)` means the stream is exhausted and must be reopened.
    async fn next_post(&mut self) -> Result<Option<RedditPost>, CoreError>;
}

/// Opens post streams; called again after every stream failure.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PostStream>, CoreError>;

    /// Human readable name used in logs.
    fn describe(&self) -> String;
}
