//! Environment-variable configuration.
//!
//! Example `.env`:
//!
//! ```text
//! TARGET_URL=https://api.example.com/health
//! CHECK_INTERVAL_MS=20000
//! TELEGRAM_BOT_TOKEN=123456:ABC-DEF
//! TELEGRAM_CHAT_IDS=11111111,-100222222
//! TEAMS_WEBHOOK_URL=https://example.webhook.office.com/webhookb2/...
//! SMS_API_KEY=...
//! SMS_LINE_NUMBER=30004505000123
//! SMS_RECIPIENTS=09120000001,09120000002
//! PROXY_TYPE=socks5
//! PROXY_HOST=127.0.0.1
//! PROXY_PORT=1080
//! LOG_FORMAT=json
//! ```

use serde::Deserialize;
use uptime_core::{
    split_list, ConfigError, MonitorConfig, ProxyConfig, ProxyKind, SmsConfig, TelegramConfig,
    WebhookConfig,
};

use crate::error::StartupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Raw environment, one field per variable (keys are matched lowercased).
#[derive(Debug, Deserialize)]
struct EnvConfig {
    #[serde(default)]
    target_url: Option<String>,
    #[serde(default = "default_check_interval_ms")]
    check_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    #[serde(default)]
    telegram_bot_token: Option<String>,
    #[serde(default)]
    telegram_chat_ids: Option<String>,
    #[serde(default)]
    teams_webhook_url: Option<String>,

    #[serde(default)]
    sms_api_key: Option<String>,
    #[serde(default)]
    sms_line_number: Option<String>,
    #[serde(default)]
    sms_recipients: Option<String>,

    #[serde(default)]
    proxy_type: Option<String>,
    #[serde(default)]
    proxy_host: Option<String>,
    #[serde(default)]
    proxy_port: Option<u16>,
    #[serde(default)]
    proxy_username: Option<String>,
    #[serde(default)]
    proxy_password: Option<String>,

    #[serde(default = "default_log_format")]
    log_format: String,
}

fn default_check_interval_ms() -> u64 {
    MonitorConfig::DEFAULT_CHECK_INTERVAL_MS
}

fn default_request_timeout_ms() -> u64 {
    MonitorConfig::DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_max_retries() -> u32 {
    MonitorConfig::DEFAULT_MAX_RETRIES
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub telegram: TelegramConfig,
    pub webhook: WebhookConfig,
    pub sms: Option<SmsConfig>,
    /// Why SMS is off although some of its variables were set.
    pub sms_disabled: Option<&'static str>,
    pub proxy: Option<ProxyConfig>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn load() -> Result<Self, StartupError> {
        Self::from_environment(::config::Environment::default())
    }

    fn from_environment(env: ::config::Environment) -> Result<Self, StartupError> {
        // Values stay strings so phone numbers keep their leading zeros.
        let raw: EnvConfig = ::config::Config::builder()
            .add_source(env.ignore_empty(true).try_parsing(false))
            .build()?
            .try_deserialize()?;
        Ok(raw.validate()?)
    }
}

impl EnvConfig {
    fn validate(self) -> Result<AppConfig, ConfigError> {
        let target_url = required("TARGET_URL", self.target_url)?;
        validate_url("TARGET_URL", &target_url)?;
        let check_interval_ms = positive("CHECK_INTERVAL_MS", self.check_interval_ms)?;
        let request_timeout_ms = positive("REQUEST_TIMEOUT_MS", self.request_timeout_ms)?;
        let monitor = MonitorConfig::new(target_url)
            .with_check_interval(check_interval_ms)
            .with_request_timeout(request_timeout_ms)
            .with_max_retries(self.max_retries);

        let bot_token = required("TELEGRAM_BOT_TOKEN", self.telegram_bot_token)?;
        let chat_ids = split_list(&required("TELEGRAM_CHAT_IDS", self.telegram_chat_ids)?);
        if chat_ids.is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_CHAT_IDS"));
        }

        let webhook_url = required("TEAMS_WEBHOOK_URL", self.teams_webhook_url)?;
        validate_url("TEAMS_WEBHOOK_URL", &webhook_url)?;

        let (sms, sms_disabled) = match (
            present(self.sms_api_key),
            present(self.sms_line_number),
            present(self.sms_recipients),
        ) {
            (Some(key), Some(line), Some(recipients)) => {
                let recipients = split_list(&recipients);
                if recipients.is_empty() {
                    (None, Some("SMS_RECIPIENTS lists no phone numbers"))
                } else {
                    (Some(SmsConfig::new(key, line, recipients)), None)
                }
            }
            (None, None, None) => (None, None),
            _ => (
                None,
                Some("SMS_API_KEY, SMS_LINE_NUMBER and SMS_RECIPIENTS must all be set"),
            ),
        };

        let proxy = match present(self.proxy_type) {
            Some(kind) => {
                let proxy = ProxyConfig {
                    kind: ProxyKind::parse(&kind)?,
                    host: required("PROXY_HOST", self.proxy_host)?,
                    port: self.proxy_port.ok_or(ConfigError::Missing("PROXY_PORT"))?,
                    username: present(self.proxy_username),
                    password: present(self.proxy_password),
                };
                proxy.to_url()?;
                Some(proxy)
            }
            None => None,
        };

        let log_format = match self.log_format.trim() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    reason: format!("'{}' must be 'pretty' or 'json'", other),
                })
            }
        };

        Ok(AppConfig {
            monitor,
            telegram: TelegramConfig::new(bot_token, chat_ids),
            webhook: WebhookConfig { url: webhook_url },
            sms,
            sms_disabled,
            proxy,
            log_format,
        })
    }
}

/// Blank values count as unset.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    present(value).ok_or(ConfigError::Missing(name))
}

fn positive(name: &'static str, ms: u64) -> Result<u64, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(ms)
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("{} ({})", value, e),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{} must use http or https", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, StartupError> {
        let vars: ::config::Map<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_environment(::config::Environment::default().source(Some(vars)))
    }

    fn config_error(result: Result<AppConfig, StartupError>) -> ConfigError {
        match result {
            Err(StartupError::Config(e)) => e,
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("configuration unexpectedly accepted"),
        }
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("TARGET_URL", "https://api.example.com/health"),
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_IDS", "111, -222"),
        ("TEAMS_WEBHOOK_URL", "https://hooks.example.com/team"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut v = REQUIRED.to_vec();
        v.extend_from_slice(extra);
        v
    }

    #[test]
    fn parse_minimal_config() {
        let c = load(REQUIRED).unwrap();
        assert_eq!(c.monitor.target_url, "https://api.example.com/health");
        assert_eq!(c.monitor.check_interval, Duration::from_millis(20_000));
        assert_eq!(c.monitor.request_timeout, Duration::from_millis(10_000));
        assert_eq!(c.monitor.max_retries, 3);
        assert_eq!(c.telegram.chat_ids, vec!["111", "-222"]);
        assert_eq!(c.webhook.url, "https://hooks.example.com/team");
        assert!(c.sms.is_none());
        assert!(c.sms_disabled.is_none());
        assert!(c.proxy.is_none());
        assert_eq!(c.log_format, LogFormat::Pretty);
    }

    #[test]
    fn parse_full_config() {
        let c = load(&with(&[
            ("CHECK_INTERVAL_MS", "5000"),
            ("REQUEST_TIMEOUT_MS", "2500"),
            ("MAX_RETRIES", "1"),
            ("SMS_API_KEY", "key"),
            ("SMS_LINE_NUMBER", "3000"),
            ("SMS_RECIPIENTS", "0912,0935"),
            ("PROXY_TYPE", "socks"),
            ("PROXY_HOST", "127.0.0.1"),
            ("PROXY_PORT", "1080"),
            ("PROXY_USERNAME", "u"),
            ("PROXY_PASSWORD", "p"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(c.monitor.check_interval.as_millis(), 5000);
        assert_eq!(c.monitor.request_timeout.as_millis(), 2500);
        assert_eq!(c.monitor.max_retries, 1);
        let sms = c.sms.unwrap();
        assert_eq!(sms.line_number, "3000");
        assert_eq!(sms.recipients, vec!["0912", "0935"]);
        let proxy = c.proxy.unwrap();
        assert_eq!(proxy.kind, ProxyKind::Socks5);
        assert_eq!(proxy.port, 1080);
        assert_eq!(proxy.username.as_deref(), Some("u"));
        assert_eq!(c.log_format, LogFormat::Json);
    }

    #[test]
    fn single_recipient_keeps_leading_zero() {
        let c = load(&with(&[
            ("SMS_API_KEY", "key"),
            ("SMS_LINE_NUMBER", "3000"),
            ("SMS_RECIPIENTS", "09120000001"),
        ]))
        .unwrap();
        assert_eq!(c.sms.unwrap().recipients, vec!["09120000001"]);
    }

    #[test]
    fn missing_required_variables() {
        for key in ["TARGET_URL", "TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_IDS", "TEAMS_WEBHOOK_URL"] {
            let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != key).collect();
            assert_eq!(config_error(load(&pairs)), ConfigError::Missing(key));
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut pairs = with(&[]);
        pairs[1] = ("TELEGRAM_BOT_TOKEN", "");
        assert_eq!(
            config_error(load(&pairs)),
            ConfigError::Missing("TELEGRAM_BOT_TOKEN")
        );
    }

    #[test]
    fn blank_chat_list_is_missing() {
        let mut pairs = with(&[]);
        pairs.retain(|(k, _)| *k != "TELEGRAM_CHAT_IDS");
        pairs.push(("TELEGRAM_CHAT_IDS", " , "));
        assert_eq!(
            config_error(load(&pairs)),
            ConfigError::Missing("TELEGRAM_CHAT_IDS")
        );
    }

    #[test]
    fn partial_sms_group_disables_sms() {
        let c = load(&with(&[("SMS_API_KEY", "key")])).unwrap();
        assert!(c.sms.is_none());
        assert!(c.sms_disabled.unwrap().contains("must all be set"));
    }

    #[test]
    fn blank_recipient_list_disables_sms_with_reason() {
        let c = load(&with(&[
            ("SMS_API_KEY", "key"),
            ("SMS_LINE_NUMBER", "3000"),
            ("SMS_RECIPIENTS", " , ,"),
        ]))
        .unwrap();
        assert!(c.sms.is_none());
        assert!(c.sms_disabled.unwrap().contains("SMS_RECIPIENTS"));
    }

    #[test]
    fn rejects_non_http_target() {
        let mut pairs = with(&[]);
        pairs[0] = ("TARGET_URL", "ftp://example.com");
        let err = config_error(load(&pairs));
        assert!(err.to_string().contains("http or https"), "{}", err);
    }

    #[test]
    fn rejects_bad_interval() {
        let err = load(&with(&[("CHECK_INTERVAL_MS", "soon")])).unwrap_err();
        assert!(matches!(err, StartupError::Environment(_)), "{}", err);
    }

    #[test]
    fn rejects_zero_durations() {
        let err = config_error(load(&with(&[("CHECK_INTERVAL_MS", "0")])));
        assert!(matches!(err, ConfigError::Invalid { name: "CHECK_INTERVAL_MS", .. }));

        let err = config_error(load(&with(&[("REQUEST_TIMEOUT_MS", "0")])));
        assert!(matches!(err, ConfigError::Invalid { name: "REQUEST_TIMEOUT_MS", .. }));
    }

    #[test]
    fn proxy_requires_host_and_port() {
        let err = config_error(load(&with(&[("PROXY_TYPE", "http"), ("PROXY_HOST", "proxy")])));
        assert_eq!(err, ConfigError::Missing("PROXY_PORT"));

        let err = config_error(load(&with(&[
            ("PROXY_TYPE", "gopher"),
            ("PROXY_HOST", "proxy"),
            ("PROXY_PORT", "1"),
        ])));
        assert!(matches!(err, ConfigError::Invalid { name: "PROXY_TYPE", .. }));
    }

    #[test]
    fn rejects_unknown_log_format() {
        let err = config_error(load(&with(&[("LOG_FORMAT", "xml")])));
        assert!(err.to_string().contains("LOG_FORMAT"), "{}", err);
    }
}
