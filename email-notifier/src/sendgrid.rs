use crate::{DeliveryStatus, EmailSender};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use subwatch_core::{CoreError, EmailSettings, NotificationError};
use tracing::debug;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

/// Sends single-recipient HTML mail through the SendGrid v3 API.
pub struct SendGridClient {
    http_client: Client,
    settings: EmailSettings,
    endpoint: String,
}

impl SendGridClient {
    pub fn new(settings: EmailSettings) -> Result<Self, CoreError> {
        Self::with_endpoint(settings, SENDGRID_SEND_URL)
    }

    pub fn with_endpoint(settings: EmailSettings, endpoint: &str) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            settings,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl EmailSender for SendGridClient {
    async fn send(&self, subject: &str, html_content: &str) -> Result<DeliveryStatus, CoreError> {
        let request = MailRequest {
            personalizations: [Personalization {
                to: [Address {
                    email: &self.settings.recipient,
                }],
            }],
            from: Address {
                email: &self.settings.sender,
            },
            subject,
            content: [Content {
                content_type: "text/html",
                value: html_content,
            }],
        };

        debug!("Sending email to {}: {}", self.settings.recipient, subject);
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                debug!("Network error sending email: {}", e);
                NotificationError::DeliveryFailed {
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(DeliveryStatus {
                status_code: status.as_u16(),
            });
        }

        let error = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                NotificationError::AuthenticationFailed {
                    status_code: status.as_u16(),
                }
            }
            StatusCode::TOO_MANY_REQUESTS => NotificationError::RateLimitExceeded {
                retry_after: response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse().ok()),
            },
            _ => NotificationError::Rejected {
                status_code: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            },
        };
        Err(error.into())
    }
}
