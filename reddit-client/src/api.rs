use crate::auth::{AppOnlyAuth, REDDIT_TOKEN_URL};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subwatch_core::{ConfigError, CoreError, RedditApiError, RedditCredentials, RedditPost};
use tracing::debug;
use url::Url;

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const DELETED_AUTHOR: &str = "[deleted]";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub created_utc: Option<f64>,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    auth: AppOnlyAuth,
    api_base: Url,
}

impl RedditApiClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, CoreError> {
        Self::with_endpoints(credentials, REDDIT_API_BASE, REDDIT_TOKEN_URL)
    }

    /// Builds a client against other hosts, e.g. a local mock server.
    pub fn with_endpoints(
        credentials: RedditCredentials,
        api_base: &str,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let api_base = Url::parse(api_base).map_err(|_| ConfigError::InvalidValue {
            field: "api_base".to_string(),
            value: api_base.to_string(),
        })?;

        let http_client = Client::builder()
            .user_agent(&credentials.user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        let auth = AppOnlyAuth::new(credentials.client_id, credentials.client_secret, token_url)?;

        Ok(Self {
            http_client,
            auth,
            api_base,
        })
    }

    async fn make_request(
        &self,
        subreddits: &str,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = self
            .api_base
            .join(endpoint)
            .map_err(|e| CoreError::Internal {
                message: format!("invalid endpoint {}: {}", endpoint, e),
            })?;
        let access_token = self.auth.access_token(&self.http_client).await?;

        debug!("Making Reddit API request: GET {}", endpoint);
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .query(query_params)
            .send()
            .await
            .map_err(|e| {
                debug!("Network error for GET {}: {}", endpoint, e);
                if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        debug!("Request failed with status: {} for {}", status, endpoint);
        let error = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                debug!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            StatusCode::UNAUTHORIZED => {
                self.auth.invalidate().await;
                RedditApiError::InvalidToken
            }
            StatusCode::FORBIDDEN => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            StatusCode::NOT_FOUND => RedditApiError::SubredditNotFound {
                subreddit: subreddits.to_string(),
            },
            status if status.is_server_error() => RedditApiError::ServerError {
                status_code: status.as_u16(),
            },
            status => RedditApiError::InvalidResponse {
                details: format!("unexpected status {} for {}", status, endpoint),
            },
        };
        Err(error.into())
    }

    /// Newest submissions first, as Reddit lists them.
    pub async fn get_new_posts(
        &self,
        subreddits: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddits);
        let limit = limit.to_string();
        let params = [("limit", limit.as_str()), ("raw_json", "1")];

        let response = self.make_request(subreddits, &endpoint, &params).await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            debug!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddits),
            })
        })?;

        debug!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddits
        );
        Ok(listing)
    }
}

impl From<RedditPostData> for RedditPost {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.id,
            title: post_data.title,
            body: post_data.selftext,
            subreddit: post_data.subreddit,
            author: post_data
                .author
                .filter(|name| !name.is_empty() && name != DELETED_AUTHOR),
            url: post_data.url,
            permalink: post_data
                .permalink
                .map(|path| format!("https://www.reddit.com{}", path)),
            created_utc: post_data
                .created_utc
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0)),
        }
    }
}
