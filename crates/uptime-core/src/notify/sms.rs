use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Notifier, NotifyError};
use crate::config::SmsConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkSend<'a> {
    line_number: serde_json::Value,
    message_text: &'a str,
    mobiles: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BulkReply {
    status: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// One bulk-send call per message from a fixed sender line.
pub struct SmsNotifier {
    client: Client,
    config: SmsConfig,
}

impl SmsNotifier {
    pub fn new(client: Client, config: SmsConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/send/bulk", self.config.api_base.trim_end_matches('/'))
    }

    // The gateway expects a numeric line; fall back to the raw string otherwise.
    fn line_number(&self) -> serde_json::Value {
        match self.config.line_number.parse::<u64>() {
            Ok(n) => n.into(),
            Err(_) => self.config.line_number.clone().into(),
        }
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    fn name(&self) -> &str {
        "sms"
    }

    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let endpoint = self.endpoint();
        let request = BulkSend {
            line_number: self.line_number(),
            message_text: message,
            mobiles: &self.config.recipients,
        };

        let response = self
            .client
            .post(&endpoint)
            .header("X-API-KEY", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::transport(&endpoint, &e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        // A 200 can still carry an application-level failure.
        if let Ok(BulkReply {
            status: Some(code),
            message: reason,
        }) = serde_json::from_str::<BulkReply>(&body)
        {
            if code != 1 {
                return Err(NotifyError::Rejected {
                    endpoint,
                    status: status.as_u16(),
                    body: reason.unwrap_or(body),
                });
            }
        }

        debug!(recipients = self.config.recipients.len(), "SMS bulk send accepted");
        Ok(())
    }
}
