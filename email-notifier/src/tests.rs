#[cfg(test)]
mod tests {
    use crate::{
        format_body, format_subject, DeliveryStatus, EmailSender, Notifier, NotifyOutcome,
        SendGridClient,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use subwatch_core::{CoreError, EmailSettings, NotificationError, RedditPost};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_settings() -> EmailSettings {
        EmailSettings {
            api_key: "SG.test".to_string(),
            sender: "alerts@example.com".to_string(),
            recipient: "me@example.com".to_string(),
        }
    }

    fn create_test_post(author: Option<&str>) -> RedditPost {
        RedditPost {
            id: "abc123".to_string(),
            title: "Free V-Bucks giveaway".to_string(),
            body: String::new(),
            subreddit: "FortNiteBR".to_string(),
            author: author.map(str::to_string),
            url: "https://example.com/giveaway".to_string(),
            permalink: Some("https://www.reddit.com/r/FortNiteBR/comments/abc123/".to_string()),
            created_utc: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()),
        }
    }

    async fn create_client(server: &MockServer) -> SendGridClient {
        SendGridClient::with_endpoint(
            create_test_settings(),
            &format!("{}/v3/mail/send", server.uri()),
        )
        .unwrap()
    }

    /// Records messages and fails on demand.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, subject: &str, html_content: &str) -> Result<DeliveryStatus, CoreError> {
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), html_content.to_string()));
            if self.fail {
                Err(NotificationError::DeliveryFailed {
                    reason: "connection reset".to_string(),
                }
                .into())
            } else {
                Ok(DeliveryStatus { status_code: 202 })
            }
        }
    }

    #[test]
    fn test_subject_joins_keywords() {
        let matched = vec!["giveaway".to_string(), "V-Bucks".to_string()];
        assert_eq!(format_subject(&matched), "Reddit Alert: giveaway, V-Bucks");
    }

    #[test]
    fn test_body_lists_post_details() {
        let body = format_body(&create_test_post(Some("spez")), &["giveaway".to_string()]);
        assert!(body.contains("<strong>Matched keywords:</strong> giveaway"));
        assert!(body.contains("<strong>Title:</strong> Free V-Bucks giveaway"));
        assert!(body.contains("<strong>Subreddit:</strong> FortNiteBR"));
        assert!(body.contains("<strong>Author:</strong> spez"));
        assert!(body.contains("<strong>Posted:</strong> 2024-03-01 12:30 UTC"));
        assert!(body.contains(
            "<a href=\"https://example.com/giveaway\">https://example.com/giveaway</a>"
        ));
        assert!(body.contains("comments/abc123"));
    }

    #[test]
    fn test_body_uses_placeholder_for_deleted_author() {
        let body = format_body(&create_test_post(None), &["giveaway".to_string()]);
        assert!(body.contains("<strong>Author:</strong> Deleted"));
    }

    #[test]
    fn test_body_escapes_markup() {
        let mut post = create_test_post(Some("user"));
        post.title = "<script>alert('x')</script> & more".to_string();
        let body = format_body(&post, &["more".to_string()]);
        assert!(body.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
        assert!(!body.contains("<script>"));
    }

    #[tokio::test]
    async fn test_sendgrid_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.test"))
            .and(body_json(json!({
                "personalizations": [{"to": [{"email": "me@example.com"}]}],
                "from": {"email": "alerts@example.com"},
                "subject": "Reddit Alert: giveaway",
                "content": [{"type": "text/html", "value": "<b>hi</b>"}]
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client(&server).await;
        let status = client
            .send("Reddit Alert: giveaway", "<b>hi</b>")
            .await
            .unwrap();
        assert_eq!(status, DeliveryStatus { status_code: 202 });
    }

    #[tokio::test]
    async fn test_sendgrid_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid from address"))
            .mount(&server)
            .await;

        let client = create_client(&server).await;
        assert!(matches!(
            client.send("s", "b").await,
            Err(CoreError::Notification(
                NotificationError::AuthenticationFailed { status_code: 401 }
            ))
        ));
        assert!(matches!(
            client.send("s", "b").await,
            Err(CoreError::Notification(NotificationError::RateLimitExceeded {
                retry_after: Some(30)
            }))
        ));
        match client.send("s", "b").await {
            Err(CoreError::Notification(NotificationError::Rejected { status_code, body })) => {
                assert_eq!(status_code, 400);
                assert_eq!(body, "invalid from address");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sendgrid_unreachable() {
        // Nothing listens on port 1.
        let client =
            SendGridClient::with_endpoint(create_test_settings(), "http://127.0.0.1:1/v3/mail/send")
                .unwrap();
        assert!(matches!(
            client.send("s", "b").await,
            Err(CoreError::Notification(NotificationError::DeliveryFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_notifier_delivers_one_message() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(sender.clone());

        let outcome = notifier
            .notify(&create_test_post(Some("spez")), &["giveaway".to_string()])
            .await;
        assert_eq!(
            outcome,
            NotifyOutcome::Delivered(DeliveryStatus { status_code: 202 })
        );

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Reddit Alert: giveaway");
        assert!(sent[0].1.contains("Free V-Bucks giveaway"));
    }

    #[tokio::test]
    async fn test_notifier_swallows_delivery_failure() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..Default::default()
        });
        let notifier = Notifier::new(sender.clone());

        let outcome = notifier
            .notify(&create_test_post(None), &["giveaway".to_string()])
            .await;
        assert_eq!(outcome, NotifyOutcome::Dropped);
        // Exactly one attempt, no retry.
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }
}
