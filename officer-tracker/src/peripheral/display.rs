//! HSV calibration display window boundary.
//!
//! The interactive GUI itself (the one an operator uses to eyeball HSV
//! bounds while pointing the camera at a sample officer) is out of scope;
//! this crate owns only the trait a frame callback pushes the current
//! frame through for display.

use async_trait::async_trait;

use crate::camera::Frame;
use crate::logging::{LogFlags, TrackerLog};

#[async_trait]
pub trait DisplayWindow: Send + Sync {
    async fn show_frame(&self, frame: &Frame);
}

/// Logs frame arrivals instead of rendering a window, for headless
/// operation.
pub struct LoggingDisplayWindow {
    log: TrackerLog,
}

impl LoggingDisplayWindow {
    pub fn new(log: TrackerLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl DisplayWindow for LoggingDisplayWindow {
    async fn show_frame(&self, frame: &Frame) {
        tlog!(self.log, LogFlags::FRAMES, "display received frame {}", frame.index);
    }
}
