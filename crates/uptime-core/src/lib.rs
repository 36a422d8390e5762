#![forbid(unsafe_code)]

pub mod config;
pub mod monitor;
pub mod notify;
pub mod probe;

pub use config::{
    split_list, ConfigError, MonitorConfig, ProxyConfig, ProxyKind, SmsConfig, TelegramConfig,
    WebhookConfig,
};
pub use monitor::{Alert, CycleReport, Monitor, MonitorState};
pub use notify::{
    build_client, build_proxied_client, DeliveryOutcome, DispatchReport, Dispatcher,
    Notification, Notifier, NotifyError, Severity, SmsNotifier, TelegramNotifier,
    WebhookNotifier,
};
pub use probe::{HttpTransport, ProbeResult, ProbeTransport, Prober, Status, TransportError};
