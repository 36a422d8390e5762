use thiserror::Error;

/// Everything that stops the monitor from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] uptime_core::ConfigError),
    #[error("failed to read configuration from the environment: {0}")]
    Environment(#[from] ::config::ConfigError),
    #[error("failed to build {purpose} HTTP client: {source}")]
    Client {
        purpose: &'static str,
        #[source]
        source: reqwest::Error,
    },
}
