mod config;
mod error;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use uptime_core::{
    build_client, build_proxied_client, Dispatcher, HttpTransport, Monitor, Notifier, Prober,
    SmsNotifier, TelegramNotifier, WebhookNotifier,
};

use crate::config::{AppConfig, LogFormat};
use crate::error::StartupError;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn version_string() -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        VERSION.to_string()
    } else {
        format!("{VERSION} ({GIT_HASH})")
    }
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    let config = match AppConfig::load() {
        Ok(c) => {
            init_tracing(c.log_format);
            c
        }
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    tracing::info!(version = %version_string(), target_url = %config.monitor.target_url, "Starting uptime monitor");
    if let Some(reason) = config.sms_disabled {
        tracing::warn!(reason, "SMS disabled");
    }

    let monitor = match build_monitor(&config) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(channels = ?monitor.dispatcher().names(), "Notification channels configured");

    let report = monitor.announce_start().await;
    if !report.all_succeeded() {
        tracing::warn!(
            failed = report.failed_count(),
            "Startup notification not delivered to every channel"
        );
    }

    monitor.run(shutdown_signal(), DRAIN_TIMEOUT).await;
    tracing::info!("Shutdown complete");
}

fn build_monitor(config: &AppConfig) -> Result<Monitor, StartupError> {
    let transport =
        HttpTransport::from_config(&config.monitor).map_err(|source| StartupError::Client {
            purpose: "probe",
            source,
        })?;
    let prober = Prober::new(Arc::new(transport), config.monitor.max_retries);

    let direct = build_client(NOTIFY_TIMEOUT).map_err(|source| StartupError::Client {
        purpose: "notification",
        source,
    })?;
    let chat_client = match &config.proxy {
        Some(proxy) => {
            tracing::info!(kind = %proxy.kind, host = %proxy.host, port = proxy.port, "Routing chat-bot traffic through proxy");
            build_proxied_client(NOTIFY_TIMEOUT, proxy)?
        }
        None => direct.clone(),
    };

    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![
        Arc::new(TelegramNotifier::new(chat_client, config.telegram.clone())),
        Arc::new(WebhookNotifier::new(direct.clone(), config.webhook.clone())),
    ];
    match &config.sms {
        Some(sms) => notifiers.push(Arc::new(SmsNotifier::new(direct, sms.clone()))),
        None if config.sms_disabled.is_none() => tracing::info!("SMS not configured, skipping"),
        None => {}
    }

    Ok(Monitor::new(
        config.monitor.clone(),
        prober,
        Dispatcher::new(notifiers),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        LogFormat::Json => {
            fmt().with_env_filter(filter).json().init();
        }
        LogFormat::Pretty => {
            fmt().with_env_filter(filter).init();
        }
    }
}
