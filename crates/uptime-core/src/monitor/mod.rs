pub mod engine;
pub mod state;

pub use engine::{CycleReport, Monitor};
pub use state::{Alert, MonitorState};
