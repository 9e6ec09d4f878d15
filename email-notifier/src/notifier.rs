use crate::{DeliveryStatus, EmailSender};
use std::sync::Arc;
use subwatch_core::{ErrorExt, RedditPost};
use tracing::{info, warn};

const SUBJECT_PREFIX: &str = "Reddit Alert";
const DELETED_AUTHOR_PLACEHOLDER: &str = "Deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered(DeliveryStatus),
    /// Delivery failed; the alert is not retried.
    Dropped,
}

/// Formats keyword alerts and hands them to an [`EmailSender`].
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }

    /// Sends one alert for `post`. Failures are logged, never returned.
    pub async fn notify(&self, post: &RedditPost, matched_keywords: &[String]) -> NotifyOutcome {
        let subject = format_subject(matched_keywords);
        let body = format_body(post, matched_keywords);

        match self.sender.send(&subject, &body).await {
            Ok(status) => {
                info!("Email sent! Status code: {}", status.status_code);
                NotifyOutcome::Delivered(status)
            }
            Err(e) => {
                e.log_error();
                warn!(
                    "Dropped alert for post {}: {}",
                    post.id,
                    e.user_friendly_message()
                );
                NotifyOutcome::Dropped
            }
        }
    }
}

pub fn format_subject(matched_keywords: &[String]) -> String {
    format!("{}: {}", SUBJECT_PREFIX, matched_keywords.join(", "))
}

pub fn format_body(post: &RedditPost, matched_keywords: &[String]) -> String {
    let author = post.author.as_deref().unwrap_or(DELETED_AUTHOR_PLACEHOLDER);
    let url = escape_html(&post.url);

    let mut body = String::new();
    body.push_str("<strong>New Reddit post matching your keywords:</strong><br><br>\n");
    body.push_str(&format!(
        "<strong>Matched keywords:</strong> {}<br>\n",
        escape_html(&matched_keywords.join(", "))
    ));
    body.push_str(&format!(
        "<strong>Title:</strong> {}<br>\n",
        escape_html(&post.title)
    ));
    body.push_str(&format!(
        "<strong>Subreddit:</strong> {}<br>\n",
        escape_html(&post.subreddit)
    ));
    body.push_str(&format!(
        "<strong>Author:</strong> {}<br>\n",
        escape_html(author)
    ));
    if let Some(created) = post.created_utc {
        body.push_str(&format!(
            "<strong>Posted:</strong> {}<br>\n",
            created.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    body.push_str(&format!(
        "<strong>Link:</strong> <a href=\"{url}\">{url}</a><br>\n"
    ));
    if let Some(permalink) = post.permalink.as_deref() {
        let permalink = escape_html(permalink);
        body.push_str(&format!(
            "<strong>Comments:</strong> <a href=\"{permalink}\">{permalink}</a><br>\n"
        ));
    }
    body
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
