use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{ProbeTransport, TransportError};

/// reqwest-backed transport for probing the target directly (never proxied).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Self::build_client(timeout)?,
        })
    }

    pub fn from_config(config: &crate::config::MonitorConfig) -> reqwest::Result<Self> {
        Self::new(config.request_timeout)
    }

    pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn fetch_status(&self, url: &str) -> Result<u16, TransportError> {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(url, status, "Probe response received");
                Ok(status)
            }
            Err(e) if e.is_timeout() => Err(TransportError::Timeout {
                url: url.to_string(),
            }),
            Err(e) => Err(TransportError::Network {
                url: url.to_string(),
                reason: error_chain(&e),
            }),
        }
    }
}

/// reqwest's top-level message is generic; the root cause lives in the source chain.
pub(crate) fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
