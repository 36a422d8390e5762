use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Notifier, NotifyError};
use crate::config::WebhookConfig;

/// Posts `{"text": message}` to a team incoming-webhook.
///
/// The webhook path carries its credentials, so errors and logs only name the host.
pub struct WebhookNotifier {
    client: Client,
    config: WebhookConfig,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, config: WebhookConfig) -> Self {
        let endpoint = redacted_endpoint(&config.url);
        Self {
            client,
            config,
            endpoint,
        }
    }
}

fn redacted_endpoint(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => match parsed.port() {
                Some(port) => format!("{}://{}:{}/***", parsed.scheme(), host, port),
                None => format!("{}://{}/***", parsed.scheme(), host),
            },
            None => "webhook".to_string(),
        },
        Err(_) => "webhook".to_string(),
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let url = self.config.url.as_str();
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "text": message }))
            .send()
            .await
            .map_err(|e| NotifyError::transport(&self.endpoint, &e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        debug!(endpoint = %self.endpoint, "Webhook notification posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(url: String) -> WebhookNotifier {
        WebhookNotifier::new(Client::new(), WebhookConfig { url })
    }

    #[tokio::test]
    async fn posts_text_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({ "text": "🔴 https://svc down, status=500" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("1"))
            .expect(1)
            .mount(&server)
            .await;

        notifier(format!("{}/hook", server.uri()))
            .send("🔴 https://svc down, status=500")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Text is required"))
            .expect(1)
            .mount(&server)
            .await;

        let err = notifier(server.uri()).send("x").await.unwrap_err();
        match err {
            NotifyError::Rejected { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, "Text is required");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn errors_do_not_reveal_webhook_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = notifier(format!("{}/webhookb2/secret-token", server.uri()))
            .send("x")
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(!text.contains("secret-token"), "{}", text);
        assert!(text.contains("127.0.0.1"), "{}", text);

        // Nothing listens on the discard port.
        let err = notifier("http://127.0.0.1:9/webhookb2/secret-token".into())
            .send("x")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Transport { .. }));
        assert!(!err.to_string().contains("secret-token"), "{}", err);
    }

    #[test]
    fn redacted_endpoint_keeps_host_only() {
        assert_eq!(
            redacted_endpoint("https://example.webhook.office.com/webhookb2/abc/IncomingWebhook/def"),
            "https://example.webhook.office.com/***"
        );
        assert_eq!(redacted_endpoint("not a url"), "webhook");
    }

    #[tokio::test]
    async fn does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        assert!(notifier(server.uri()).send("x").await.is_err());
    }
}
