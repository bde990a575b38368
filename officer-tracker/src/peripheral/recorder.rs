//! AVI recorder boundary.
//!
//! The real recorder MJPG-encodes frames to `<N>_OfficerFootage.avi` (and
//! optionally a second filtered stream) at the camera's running resolution
//! and frame rate. That file-writing path is out of scope; this crate owns
//! only the trait a frame callback pushes frames through.

use async_trait::async_trait;

use crate::camera::Frame;
use crate::logging::{LogFlags, TrackerLog};

#[async_trait]
pub trait Recorder: Send + Sync {
    async fn push_frame(&self, frame: &Frame);
    async fn start_recording(&self);
    async fn stop_recording(&self);
}

/// Logs frame pushes instead of encoding to disk, for bring-up without the
/// AVI writer wired up.
pub struct LoggingRecorder {
    log: TrackerLog,
}

impl LoggingRecorder {
    pub fn new(log: TrackerLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Recorder for LoggingRecorder {
    async fn push_frame(&self, frame: &Frame) {
        tlog!(self.log, LogFlags::FRAMES, "recorder received frame {}", frame.index);
    }

    async fn start_recording(&self) {
        tlog!(self.log, LogFlags::FRAMES, "recording started");
    }

    async fn stop_recording(&self) {
        tlog!(self.log, LogFlags::FRAMES, "recording stopped");
    }
}
