use std::fmt;

use crate::probe::Status;

/// An alert-worthy transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Recovered,
    Down { code: u16 },
    Unreachable { reason: String },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recovered => write!(f, "back online"),
            Self::Down { code } => write!(f, "down, status={}", code),
            Self::Unreachable { reason } => write!(f, "error: {}", reason),
        }
    }
}

/// Last reported status of the target.
///
/// Holds either the last confirmed-healthy status or the exact failure status that
/// was already alerted for. Starts as [`Status::Healthy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    last: Status,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            last: Status::Healthy,
        }
    }

    pub fn last(&self) -> Status {
        self.last
    }

    /// Record `status` and return the alert it warrants, if any.
    ///
    /// `error` is the transport error that produced an [`Status::Unreachable`] result.
    pub fn evaluate(&mut self, status: Status, error: Option<&str>) -> Option<Alert> {
        if status == self.last {
            return None;
        }
        self.last = status;

        Some(match status {
            Status::Healthy => Alert::Recovered,
            Status::Unhealthy(code) => Alert::Down { code },
            Status::Unreachable => Alert::Unreachable {
                reason: error.unwrap_or("unknown error").to_string(),
            },
        })
    }
}
