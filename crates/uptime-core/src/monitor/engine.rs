use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::monitor::state::{Alert, MonitorState};
use crate::notify::{DispatchReport, Dispatcher, Notification};
use crate::probe::{ProbeResult, Prober, Status};

/// What one probe cycle observed and did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub probe: ProbeResult,
    pub alert: Option<Alert>,
    pub dispatch: Option<DispatchReport>,
}

/// Drives probe cycles for a single target and owns its availability state.
pub struct Monitor {
    config: MonitorConfig,
    prober: Prober,
    dispatcher: Dispatcher,
    state: Arc<Mutex<MonitorState>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, prober: Prober, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            prober,
            dispatcher,
            state: Arc::new(Mutex::new(MonitorState::new())),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn last_status(&self) -> Status {
        self.state.lock().await.last()
    }

    /// Send the "starting monitoring" notice through every channel.
    pub async fn announce_start(&self) -> DispatchReport {
        let notification =
            Notification::startup(&self.config.target_url, self.config.check_interval);
        self.dispatcher.dispatch(&notification).await
    }

    /// Run one probe cycle.
    ///
    /// Returns `None` when another cycle is still probing; the trigger is dropped.
    /// The state is updated and released before the alert is dispatched.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        let Ok(mut state) = self.state.try_lock() else {
            warn!(
                target_url = %self.config.target_url,
                "Previous probe cycle still running, skipping"
            );
            return None;
        };

        let probe = self.prober.probe(&self.config.target_url).await;
        let previous = state.last();
        let alert = state.evaluate(probe.status, probe.error.as_deref());
        drop(state);

        let Some(alert) = alert else {
            debug!(
                target_url = %self.config.target_url,
                status = %probe.status,
                attempts = probe.attempts,
                "Status unchanged"
            );
            return Some(CycleReport {
                probe,
                alert: None,
                dispatch: None,
            });
        };

        info!(
            target_url = %self.config.target_url,
            from = %previous,
            to = %probe.status,
            attempts = probe.attempts,
            %alert,
            "Status changed, alerting"
        );
        let notification = Notification::from_alert(&alert, &self.config.target_url);
        let dispatch = self.dispatcher.dispatch(&notification).await;

        Some(CycleReport {
            probe,
            alert: Some(alert),
            dispatch: Some(dispatch),
        })
    }

    /// Trigger a cycle every `check_interval` until `shutdown` resolves.
    ///
    /// Each cycle runs in its own task so a slow dispatch never delays the next tick.
    /// In-flight cycles get `drain_timeout` to finish after shutdown.
    pub async fn run(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()>,
        drain_timeout: Duration,
    ) {
        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        info!(
            target_url = %self.config.target_url,
            interval_ms = self.config.check_interval.as_millis() as u64,
            max_retries = self.prober.max_retries(),
            "Monitoring started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let monitor = Arc::clone(&self);
                    cycles.spawn(async move {
                        monitor.run_cycle().await;
                    });
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Probe cycle task failed");
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        info!(in_flight = cycles.len(), "Stopping monitor");
        let drain = async { while cycles.join_next().await.is_some() {} };
        if tokio::time::timeout(drain_timeout, drain).await.is_err() {
            warn!("Probe cycles did not finish in time, aborting");
            cycles.abort_all();
        }
        info!("Monitor stopped");
    }
}
