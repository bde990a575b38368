//! Status LED driver boundary.
//!
//! The real driver is filesystem-backed (GPIO via sysfs or similar) and
//! stays out of scope; this crate only owns the phase vocabulary and the
//! trait the motion/command layer drives it through, so an operator without
//! a console can still distinguish rig phases by flash count.

use async_trait::async_trait;
use serde::Deserialize;

use crate::logging::{LogFlags, TrackerLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum::Display)]
pub enum StatusPhase {
    Booting,
    WaitingForCommand,
    Tracking,
    ShuttingDown,
}

/// Drives a "flashes per pause" status indicator through rig phases. A
/// configurable flash count per phase lets an operator without a console
/// distinguish booting/waiting/tracking/shutting-down.
#[async_trait]
pub trait StatusIndicator: Send + Sync {
    async fn set_phase(&self, phase: StatusPhase);
    async fn start_flashing(&self);
    async fn stop_flashing(&self);
}

/// Stands in for the real GPIO-backed driver: logs phase transitions
/// instead of toggling hardware, for bring-up without a status LED wired up.
pub struct LoggingStatusIndicator {
    log: TrackerLog,
}

impl LoggingStatusIndicator {
    pub fn new(log: TrackerLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl StatusIndicator for LoggingStatusIndicator {
    async fn set_phase(&self, phase: StatusPhase) {
        tlog!(self.log, LogFlags::STATUS_LED, "status phase -> {phase}");
    }

    async fn start_flashing(&self) {
        tlog!(self.log, LogFlags::STATUS_LED, "status led flashing started");
    }

    async fn stop_flashing(&self) {
        tlog!(self.log, LogFlags::STATUS_LED, "status led flashing stopped");
    }
}
