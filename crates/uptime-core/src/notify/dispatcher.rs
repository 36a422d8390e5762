use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, error, warn};

use super::{Notification, Notifier, NotifyError};

/// Result of delivering one notification through one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub notifier: String,
    pub result: Result<(), String>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn outcome(&self, notifier: &str) -> Option<&DeliveryOutcome> {
        self.outcomes.iter().find(|o| o.notifier == notifier)
    }
}

/// Fans each notification out to every configured backend concurrently.
#[derive(Clone, Default)]
pub struct Dispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Deliver `notification` through every backend and wait for all of them.
    ///
    /// Never fails: each backend's error is logged and recorded in the report.
    /// A backend that panics is recorded as failed; the others still deliver.
    pub async fn dispatch(&self, notification: &Notification) -> DispatchReport {
        let text = notification.text.as_str();
        let sends = self.notifiers.iter().map(|notifier| async move {
            let result = AssertUnwindSafe(notifier.send(text))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(NotifyError::Panicked(panic_message(&*panic))));
            match &result {
                Ok(()) => debug!(
                    notifier = notifier.name(),
                    notification_id = %notification.id,
                    "Notification delivered"
                ),
                Err(e) => warn!(
                    notifier = notifier.name(),
                    notification_id = %notification.id,
                    error = %e,
                    "Notification delivery failed"
                ),
            }
            DeliveryOutcome {
                notifier: notifier.name().to_string(),
                result: result.map_err(|e| e.to_string()),
            }
        });

        let report = DispatchReport {
            outcomes: join_all(sends).await,
        };

        let failed = report.failed_count();
        if failed > 0 {
            error!(
                notification_id = %notification.id,
                severity = %notification.severity,
                failed,
                total = report.outcomes.len(),
                created_at = %notification.timestamp,
                "Notification not delivered to every channel"
            );
        }
        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
