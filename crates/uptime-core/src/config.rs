use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration for the probe loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// The endpoint to probe.
    pub target_url: String,
    /// Interval between probe cycles (default: 20s).
    pub check_interval: Duration,
    /// Timeout applied to each probe attempt.
    pub request_timeout: Duration,
    /// Additional attempts made after a transport error.
    pub max_retries: u32,
}

impl MonitorConfig {
    pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 20_000;
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            check_interval: Duration::from_millis(Self::DEFAULT_CHECK_INTERVAL_MS),
            request_timeout: Duration::from_millis(Self::DEFAULT_REQUEST_TIMEOUT_MS),
            max_retries: Self::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_check_interval(mut self, ms: u64) -> Self {
        self.check_interval = Duration::from_millis(ms.max(1));
        self
    }

    pub fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout = Duration::from_millis(ms.max(1));
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Telegram bot credentials and the chats that receive every alert.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_ids: Vec<String>,
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_ids: Vec<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_ids,
            api_base: default_telegram_api(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Incoming-webhook endpoint for team notifications.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
}

/// Bulk SMS credentials. SMS is best-effort and only enabled when every field is set.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_key: String,
    pub line_number: String,
    pub recipients: Vec<String>,
    pub api_base: String,
}

fn default_sms_api() -> String {
    "https://api.sms.ir".into()
}

impl SmsConfig {
    pub fn new(
        api_key: impl Into<String>,
        line_number: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            line_number: line_number.into(),
            recipients,
            api_base: default_sms_api(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Socks5,
    Socks5h,
    Http,
    Https,
}

impl ProxyKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "socks" | "socks5" => Ok(Self::Socks5),
            "socks5h" => Ok(Self::Socks5h),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(ConfigError::Invalid {
                name: "PROXY_TYPE",
                reason: format!("unsupported proxy type '{}'", other),
            }),
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            Self::Socks5 => "socks5",
            Self::Socks5h => "socks5h",
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Outbound proxy used for chat-bot traffic only.
#[derive(Clone)]
pub struct ProxyConfig {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL with credentials percent-encoded into the userinfo part.
    pub fn to_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            name: "PROXY_HOST",
            reason,
        };
        let mut url = Url::parse(&format!("{}://{}:{}", self.kind, self.host, self.port))
            .map_err(|e| invalid(format!("{} ({})", self.host, e)))?;
        if let Some(user) = self.username.as_deref().filter(|u| !u.is_empty()) {
            url.set_username(user)
                .map_err(|_| invalid("proxy URL cannot carry credentials".into()))?;
            url.set_password(self.password.as_deref())
                .map_err(|_| invalid("proxy URL cannot carry credentials".into()))?;
        }
        Ok(url)
    }
}

// Keeps credentials out of logs.
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
