use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Notifier, NotifyError};
use crate::config::TelegramConfig;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Error envelope returned by the Bot API.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

/// Sends every message to each configured chat through the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    /// `client` may be routed through a proxy; see [`super::build_proxied_client`].
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    async fn send_to(&self, endpoint: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        // The endpoint embeds the bot token; never put it in errors or logs.
        let redacted = format!("{}/bot***/sendMessage", self.config.api_base.trim_end_matches('/'));

        let response = self
            .client
            .post(endpoint)
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .map_err(|e| NotifyError::Transport {
                endpoint: redacted.clone(),
                reason: crate::probe::http::error_chain(&e.without_url()),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(api) => warn!(
                chat_id,
                status = status.as_u16(),
                error_code = api.error_code.unwrap_or_default(),
                description = api.description.as_deref().unwrap_or(""),
                "Telegram API rejected message"
            ),
            Err(_) => warn!(chat_id, status = status.as_u16(), body = %body, "Telegram API rejected message"),
        }

        Err(NotifyError::Rejected {
            endpoint: redacted,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let endpoint = self.endpoint();
        let sends = self.config.chat_ids.iter().map(|chat_id| {
            let endpoint = endpoint.as_str();
            async move { (chat_id, self.send_to(endpoint, chat_id, message).await) }
        });

        let mut failed = 0;
        for (chat_id, result) in join_all(sends).await {
            match result {
                Ok(()) => debug!(chat_id = %chat_id, "Telegram message sent"),
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "Telegram message failed");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(NotifyError::Partial {
                failed,
                total: self.config.chat_ids.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer, chats: &[&str]) -> TelegramNotifier {
        let config = TelegramConfig::new("123:abc", chats.iter().map(|c| c.to_string()).collect())
            .with_api_base(server.uri());
        TelegramNotifier::new(Client::new(), config)
    }

    #[tokio::test]
    async fn sends_to_every_chat() {
        let server = MockServer::start().await;
        for chat in ["100", "200"] {
            Mock::given(method("POST"))
                .and(path("/bot123:abc/sendMessage"))
                .and(body_json(serde_json::json!({ "chat_id": chat, "text": "hello" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
                .expect(1)
                .mount(&server)
                .await;
        }

        notifier(&server, &["100", "200"]).send("hello").await.unwrap();
    }

    #[tokio::test]
    async fn one_failing_chat_does_not_block_others() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({ "chat_id": "bad", "text": "down" })))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({ "chat_id": "good", "text": "down" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let err = notifier(&server, &["bad", "good"]).send("down").await.unwrap_err();
        assert!(matches!(err, NotifyError::Partial { failed: 1, total: 2 }), "{}", err);
    }

    #[tokio::test]
    async fn rejected_error_keeps_body_and_hides_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#))
            .mount(&server)
            .await;

        let n = notifier(&server, &["1"]);
        let err = n.send_to(&n.endpoint(), "1", "x").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("401"), "{}", text);
        assert!(text.contains("Unauthorized"), "{}", text);
        assert!(!text.contains("123:abc"), "{}", text);
    }

    #[tokio::test]
    async fn unreachable_api_is_transport_error() {
        let config = TelegramConfig::new("123:abc", vec!["1".into()])
            .with_api_base("http://127.0.0.1:9");
        let n = TelegramNotifier::new(Client::new(), config);
        let err = n.send_to(&n.endpoint(), "1", "x").await.unwrap_err();
        assert!(matches!(err, NotifyError::Transport { .. }), "{}", err);
        assert!(!err.to_string().contains("123:abc"));
    }
}
