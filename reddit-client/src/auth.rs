//! Application-only OAuth2 for Reddit.
//!
//! Reading public listings only needs the client-credentials grant: the
//! app's id and secret are exchanged for a bearer token, which is cached
//! until shortly before it expires.

use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    TokenResponse, TokenUrl,
};
use reqwest::Client;
use std::time::{Duration, Instant};
use subwatch_core::{ConfigError, CoreError, RedditApiError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are renewed this long before Reddit would reject them.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct AppToken {
    access_token: String,
    expires_at: Instant,
}

impl AppToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug)]
pub struct AppOnlyAuth {
    oauth_client: BasicClient,
    token: Mutex<Option<AppToken>>,
}

impl AppOnlyAuth {
    pub fn new(
        client_id: String,
        client_secret: String,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "auth_url".to_string(),
                value: e.to_string(),
            }
        })?;
        let token_url =
            TokenUrl::new(token_url.to_string()).map_err(|_| ConfigError::InvalidValue {
                field: "token_url".to_string(),
                value: token_url.to_string(),
            })?;

        let oauth_client = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        Ok(Self {
            oauth_client,
            token: Mutex::new(None),
        })
    }

    /// Returns a cached token, requesting a new one when none is fresh.
    pub async fn access_token(&self, http_client: &Client) -> Result<String, CoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let token = self.request_token(http_client).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next request authenticates again.
    pub async fn invalidate(&self) {
        if self.token.lock().await.take().is_some() {
            debug!("Discarded cached Reddit token");
        }
    }

    async fn request_token(&self, http_client: &Client) -> Result<AppToken, CoreError> {
        let http_client = http_client.clone();
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(move |request| send_token_request(http_client, request))
            .await
            .map_err(|e| -> CoreError {
                match e {
                    RequestTokenError::ServerResponse(response) => {
                        RedditApiError::AuthenticationFailed {
                            reason: response.to_string(),
                        }
                        .into()
                    }
                    RequestTokenError::Request(e) => CoreError::Network(e),
                    RequestTokenError::Parse(e, _) => RedditApiError::AuthenticationFailed {
                        reason: format!("unexpected token response: {}", e),
                    }
                    .into(),
                    RequestTokenError::Other(reason) => {
                        RedditApiError::AuthenticationFailed { reason }.into()
                    }
                }
            })?;

        let lifetime = response.expires_in().unwrap_or_else(|| {
            warn!("Reddit token response had no expiry, assuming one hour");
            DEFAULT_TOKEN_LIFETIME
        });
        info!("Obtained Reddit application token valid for {:?}", lifetime);

        Ok(AppToken {
            access_token: response.access_token().secret().clone(),
            expires_at: Instant::now() + lifetime,
        })
    }
}

/// Sends oauth2's token request through the shared client so the user agent Reddit requires is set.
async fn send_token_request(
    http_client: Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http_client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
