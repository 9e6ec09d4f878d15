use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub body: String,
    pub subreddit: String,
    /// `None` when the account was deleted.
    pub author: Option<String>,
    pub url: String,
    pub permalink: Option<String>,
    pub created_utc: Option<DateTime<Utc>>,
}

impl RedditPost {
    /// Lowercased `title` and `body` as the text keywords are matched against.
    pub fn searchable_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.body).to_lowercase()
    }
}

/// A keyword as written in the keyword file, with its lowercase form cached for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub text: String,
    normalized: String,
}

impl Keyword {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let normalized = text.to_lowercase();
        Self { text, normalized }
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl From<&str> for Keyword {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
