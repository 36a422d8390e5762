//! Alert delivery.
//!
//! Every backend implements [`Notifier`] and receives the same plain-text message.
//! The [`Dispatcher`] fans a [`Notification`] out to all of them at once and
//! collects the outcomes into a [`DispatchReport`] instead of failing.

mod dispatcher;
mod sms;
mod telegram;
mod webhook;

pub use dispatcher::{DeliveryOutcome, DispatchReport, Dispatcher};
pub use sms::SmsNotifier;
pub use telegram::TelegramNotifier;
pub use webhook::WebhookNotifier;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ConfigError, ProxyConfig};
use crate::monitor::Alert;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("{endpoint} rejected the message with HTTP {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("delivery failed for {failed} of {total} recipients")]
    Partial { failed: usize, total: usize },
    #[error("notifier panicked: {0}")]
    Panicked(String),
}

impl NotifyError {
    pub(crate) fn transport(endpoint: &str, err: &reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            reason: crate::probe::http::error_chain(err),
        }
    }
}

/// A single alert channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in logs and dispatch reports (e.g. "telegram").
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Recovered,
    Down,
    Error,
}

impl Severity {
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Info => "🚀",
            Self::Recovered => "✅",
            Self::Down => "🔴",
            Self::Error => "⚠️",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Recovered => write!(f, "recovered"),
            Self::Down => write!(f, "down"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Immutable message handed to every backend.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub text: String,
}

impl Notification {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            severity,
            text: text.into(),
        }
    }

    pub fn from_alert(alert: &Alert, target: &str) -> Self {
        let severity = match alert {
            Alert::Recovered => Severity::Recovered,
            Alert::Down { .. } => Severity::Down,
            Alert::Unreachable { .. } => Severity::Error,
        };
        Self::new(
            severity,
            format!("{} {} {}", severity.emoji(), target, alert),
        )
    }

    pub fn startup(target: &str, interval: Duration) -> Self {
        Self::new(
            Severity::Info,
            format!(
                "{} Starting monitoring of {} every {}s",
                Severity::Info.emoji(),
                target,
                interval.as_secs_f64()
            ),
        )
    }
}

/// Client for direct notification traffic. Proxy environment variables are ignored.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
        .no_proxy()
        .build()
}

/// Client routed through `proxy`, used for chat-bot traffic.
pub fn build_proxied_client(timeout: Duration, proxy: &ProxyConfig) -> Result<Client, ConfigError> {
    let url = proxy.to_url()?;
    let invalid = |e: reqwest::Error| ConfigError::Invalid {
        name: "PROXY_TYPE",
        reason: e.to_string(),
    };
    let proxy = reqwest::Proxy::all(url.as_str()).map_err(invalid)?;
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
        .proxy(proxy)
        .build()
        .map_err(invalid)
}
