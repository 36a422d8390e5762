pub(crate) mod http;

pub use http::HttpTransport;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Classified availability of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Healthy,
    Unhealthy(u16),
    Unreachable,
}

impl Status {
    pub fn from_code(code: u16) -> Self {
        if code == 200 {
            Self::Healthy
        } else {
            Self::Unhealthy(code)
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy(code) => write!(f, "unhealthy ({})", code),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// A request that did not produce an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout fetching {url}")]
    Timeout { url: String },
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
}

/// Performs a single request and reports the response status code.
///
/// Implementations must not retry; retry policy belongs to [`Prober`].
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn fetch_status(&self, url: &str) -> Result<u16, TransportError>;
}

/// Outcome of one probe, including every retry it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: Status,
    /// Last transport error, set only when `status` is [`Status::Unreachable`].
    pub error: Option<String>,
    pub attempts: u32,
}

/// Bounded-retry prober: transport errors are retried, received responses never are.
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn ProbeTransport>,
    max_retries: u32,
}

impl Prober {
    pub fn new(transport: Arc<dyn ProbeTransport>, max_retries: u32) -> Self {
        Self {
            transport,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn probe(&self, target: &str) -> ProbeResult {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.transport.fetch_status(target).await {
                Ok(code) => {
                    let status = Status::from_code(code);
                    debug!(target_url = target, code, attempt, %status, "Probe completed");
                    return ProbeResult {
                        status,
                        error: None,
                        attempts: attempt + 1,
                    };
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        warn!(
                            target_url = target,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            error = %e,
                            "Probe failed, retrying"
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        ProbeResult {
            status: Status::Unreachable,
            error: last_error.map(|e| e.to_string()),
            attempts: self.max_retries + 1,
        }
    }
}
