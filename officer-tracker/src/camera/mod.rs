//! Supervised camera session: maintains the camera connection across
//! transient hardware faults without dropping the frame pipeline.

pub mod pipeline;

pub use pipeline::{CallbackRegistry, FramePipeline};

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{CameraError, ProgrammerError};
use crate::locator::DetectionBox;
use crate::logging::{LogFlags, TrackerLog};

/// One acquired frame: a monotonically increasing index, its RGB8 pixel
/// buffer, and any embedded detections the vision SDK attached.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub detections: Vec<DetectionBox>,
}

/// User-configured camera settings, reapplied in this field order after
/// every power cycle: width, height, rate, filter, buffer count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub filter: Option<i32>,
    /// Desired number of frame buffers the adapter should hold in flight.
    /// `0` (the default) means "leave the adapter's own default alone".
    pub buffer_count: u32,
}

/// The external machine-vision SDK boundary. A real implementation wraps
/// vendor SDK calls; tests substitute a fake.
#[async_trait]
pub trait CameraAdapter: Send + Sync {
    async fn find_device(&self, serial: &str) -> bool;
    async fn connect(&self, serial: &str) -> Result<(), CameraError>;
    async fn disconnect(&self);
    async fn set_width(&self, width: u32) -> Result<(), CameraError>;
    async fn set_height(&self, height: u32) -> Result<(), CameraError>;
    async fn set_fps(&self, fps: f64) -> Result<(), CameraError>;
    async fn set_filter(&self, filter: i32) -> Result<(), CameraError>;
    /// Requests `count` in-flight frame buffers; the adapter may clamp to
    /// its own device maximum.
    async fn set_buffer_count(&self, count: u32) -> Result<(), CameraError>;
    /// Blocks up to `timeout` for the next frame; `None` signals a timeout,
    /// not an error — the caller treats it as transient.
    async fn next_frame(&self, timeout: Duration) -> Result<Option<Frame>, CameraError>;
}

/// Owns the camera connection lifecycle: `shouldBeConnected` is set once on
/// first successful connect and only cleared on explicit shutdown, so any
/// transient disconnect is observed by callers only as added latency, never
/// as an error.
pub struct CameraSession {
    adapter: Box<dyn CameraAdapter>,
    serial: String,
    settings: Mutex<CameraSettings>,
    should_be_connected: std::sync::atomic::AtomicBool,
    live_feed_running: std::sync::atomic::AtomicBool,
    log: TrackerLog,
}

const CONNECT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

impl CameraSession {
    pub fn new(adapter: Box<dyn CameraAdapter>, serial: String, settings: CameraSettings, log: TrackerLog) -> Self {
        Self {
            adapter,
            serial,
            settings: Mutex::new(settings),
            should_be_connected: std::sync::atomic::AtomicBool::new(false),
            live_feed_running: std::sync::atomic::AtomicBool::new(false),
            log,
        }
    }

    /// Tracked by `FramePipeline::start_live_feed`/`stop_live_feed` so
    /// `capture_single_frame` can refuse to race the live-feed loop for the
    /// same camera handle.
    pub(crate) fn mark_live_feed_running(&self, running: bool) {
        self.live_feed_running
            .store(running, std::sync::atomic::Ordering::Relaxed);
    }

    /// Captures exactly one frame outside the live-feed loop. Raises if the
    /// live feed is currently running: reading a single frame while the
    /// loop already owns the camera handle is a caller bug, not a
    /// recoverable condition.
    pub async fn capture_single_frame(&self) -> Result<Option<Frame>, ProgrammerError> {
        if self.live_feed_running.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(ProgrammerError::LiveFeedAlreadyRunning);
        }
        Ok(self.next_frame().await)
    }

    /// Retries forever with a fixed backoff until the device is found and
    /// connected, applying every configured setting once connected. Per the
    /// error-handling design's "fatal init" category, there is no give-up
    /// path: the device is expected to eventually appear.
    pub async fn ensure_connected(&self) {
        loop {
            if self.adapter.find_device(&self.serial).await {
                if self.adapter.connect(&self.serial).await.is_ok() {
                    self.apply_settings().await;
                    self.should_be_connected
                        .store(true, std::sync::atomic::Ordering::Relaxed);
                    return;
                }
            }
            twarn!(
                self.log,
                LogFlags::CAMERA,
                "camera {} not yet available, retrying in {:?}",
                self.serial,
                CONNECT_RETRY_BACKOFF
            );
            tokio::time::sleep(CONNECT_RETRY_BACKOFF).await;
        }
    }

    /// Blocks (reconnecting as needed) until the camera is connected. Any
    /// public method that reads live camera state calls this first.
    pub async fn wait_for_connected(&self) {
        if !self
            .should_be_connected
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            self.ensure_connected().await;
        }
    }

    /// Resets the device, waits for it to reappear, reconnects, and
    /// reapplies every user setting in order: width, height, rate, filter.
    pub async fn power_cycle(&self) {
        tlog!(self.log, LogFlags::CAMERA, "power-cycling camera {}", self.serial);
        self.adapter.disconnect().await;
        self.ensure_connected().await;
    }

    /// Retries a single attribute set forever on the same fixed backoff
    /// `ensure_connected` uses: a camera that rejects a setting is a "fatal
    /// init" error per the error-handling design, not something to silently
    /// treat as configured.
    async fn retry_until_set<Fut>(&self, attribute: &str, mut attempt: impl FnMut() -> Fut)
    where
        Fut: std::future::Future<Output = Result<(), CameraError>>,
    {
        loop {
            match attempt().await {
                Ok(()) => return,
                Err(e) => {
                    twarn!(
                        self.log,
                        LogFlags::CAMERA,
                        "failed to set camera {attribute}: {e}, retrying in {:?}",
                        CONNECT_RETRY_BACKOFF
                    );
                    tokio::time::sleep(CONNECT_RETRY_BACKOFF).await;
                }
            }
        }
    }

    async fn apply_settings(&self) {
        let settings = *self.settings.lock().await;
        if let Some(width) = settings.width {
            self.retry_until_set("width", || self.adapter.set_width(width)).await;
        }
        if let Some(height) = settings.height {
            self.retry_until_set("height", || self.adapter.set_height(height)).await;
        }
        if let Some(fps) = settings.fps {
            self.retry_until_set("fps", || self.adapter.set_fps(fps)).await;
        }
        if let Some(filter) = settings.filter {
            self.retry_until_set("filter", || self.adapter.set_filter(filter)).await;
        }
        if settings.buffer_count > 0 {
            self.retry_until_set("buffer_count", || self.adapter.set_buffer_count(settings.buffer_count))
                .await;
        }
    }

    /// Blocks for up to 1s for the next frame. On timeout/error, ends
    /// acquisition, power-cycles, and resumes — the caller is expected to
    /// retry without incrementing any frame index on `None`.
    pub async fn next_frame(&self) -> Option<Frame> {
        self.wait_for_connected().await;
        match self.adapter.next_frame(Duration::from_secs(1)).await {
            Ok(frame) => frame,
            Err(_) => {
                self.power_cycle().await;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeCamera {
        connect_attempts: AtomicU32,
        fail_connects: u32,
    }

    #[async_trait]
    impl CameraAdapter for FakeCamera {
        async fn find_device(&self, _serial: &str) -> bool {
            true
        }

        async fn connect(&self, _serial: &str) -> Result<(), CameraError> {
            let attempt = self.connect_attempts.fetch_add(1, Ordering::Relaxed);
            if attempt < self.fail_connects {
                Err(CameraError::DeviceNotFound("fake".into()))
            } else {
                Ok(())
            }
        }

        async fn disconnect(&self) {}

        async fn set_width(&self, _w: u32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_height(&self, _h: u32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_fps(&self, _fps: f64) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_filter(&self, _f: i32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_buffer_count(&self, _count: u32) -> Result<(), CameraError> {
            Ok(())
        }

        async fn next_frame(&self, _timeout: Duration) -> Result<Option<Frame>, CameraError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn ensure_connected_marks_should_be_connected() {
        let session = CameraSession::new(
            Box::new(FakeCamera { connect_attempts: AtomicU32::new(0), fail_connects: 0 }),
            "1234".to_string(),
            CameraSettings::default(),
            TrackerLog::default(),
        );
        session.ensure_connected().await;
        assert!(session.should_be_connected.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn capture_single_frame_raises_while_live_feed_is_running() {
        use crate::camera::pipeline::FramePipeline;
        use crate::error::ProgrammerError;
        use std::sync::Arc;

        let session = Arc::new(CameraSession::new(
            Box::new(FakeCamera { connect_attempts: AtomicU32::new(0), fail_connects: 0 }),
            "1234".to_string(),
            CameraSettings::default(),
            TrackerLog::default(),
        ));

        assert!(session.capture_single_frame().await.is_ok());

        let pipeline = FramePipeline::new(Arc::clone(&session), TrackerLog::default());
        let handle = pipeline.start_live_feed().expect("live feed starts");

        match session.capture_single_frame().await {
            Err(ProgrammerError::LiveFeedAlreadyRunning) => {}
            other => panic!("expected LiveFeedAlreadyRunning, got {other:?}"),
        }

        pipeline.stop_live_feed();
        handle.abort();
        let _ = handle.await;
    }

    /// Acquisition loop substitute: the camera fires a single timeout
    /// partway through a run, forcing `next_frame` through the power-cycle
    /// path exactly once.
    struct FaultyAfterOneCamera {
        calls: AtomicU32,
        fault_on_call: u32,
    }

    #[async_trait]
    impl CameraAdapter for FaultyAfterOneCamera {
        async fn find_device(&self, _serial: &str) -> bool {
            true
        }
        async fn connect(&self, _serial: &str) -> Result<(), CameraError> {
            Ok(())
        }
        async fn disconnect(&self) {}
        async fn set_width(&self, _w: u32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_height(&self, _h: u32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_fps(&self, _fps: f64) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_filter(&self, _f: i32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_buffer_count(&self, _count: u32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn next_frame(&self, _timeout: Duration) -> Result<Option<Frame>, CameraError> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            if call == self.fault_on_call {
                return Err(CameraError::FrameTimeout);
            }
            Ok(Some(Frame { index: 0, width: 1, height: 1, pixels: Vec::new(), detections: Vec::new() }))
        }
    }

    /// A mid-feed fault triggers `power_cycle` and yields `None` for that
    /// iteration, but never skips or repeats a frame once reconnected: the
    /// pipeline's own index counter, not the adapter, owns the sequence, and
    /// it only advances on a successful frame.
    #[tokio::test]
    async fn power_cycle_mid_feed_leaves_no_gap_or_duplicate_in_dispatched_frames() {
        use crate::camera::pipeline::FramePipeline;
        use std::sync::Arc;

        let session = Arc::new(CameraSession::new(
            Box::new(FaultyAfterOneCamera { calls: AtomicU32::new(0), fault_on_call: 50 }),
            "fake".to_string(),
            CameraSettings::default(),
            TrackerLog::default(),
        ));
        let pipeline = Arc::new(FramePipeline::new(session, TrackerLog::default()));

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        pipeline.registry().register(move |frame| seen_clone.lock().push(frame.index));

        let handle = pipeline.start_live_feed().expect("live feed starts");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while seen.lock().len() < 60 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        pipeline.stop_live_feed();
        handle.abort();
        let _ = handle.await;

        let indices: Vec<u64> = seen.lock().iter().take(60).copied().collect();
        assert_eq!(indices.len(), 60, "the fault must not have stalled dispatch");
        let expected: Vec<u64> = (0..60).collect();
        assert_eq!(indices, expected, "frame indices stay contiguous across the power-cycle");
    }

    /// Rejects the first `rejections_left` attempts to set the buffer
    /// count, then records the value it's finally asked to apply.
    struct FlakyAttributeCamera {
        rejections_left: AtomicU32,
        buffer_count_set_to: Arc<parking_lot::Mutex<Option<u32>>>,
    }

    #[async_trait]
    impl CameraAdapter for FlakyAttributeCamera {
        async fn find_device(&self, _serial: &str) -> bool {
            true
        }
        async fn connect(&self, _serial: &str) -> Result<(), CameraError> {
            Ok(())
        }
        async fn disconnect(&self) {}

        async fn set_width(&self, _w: u32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_height(&self, _h: u32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_fps(&self, _fps: f64) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_filter(&self, _f: i32) -> Result<(), CameraError> {
            Ok(())
        }
        async fn set_buffer_count(&self, count: u32) -> Result<(), CameraError> {
            if self.rejections_left.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1)).is_ok()
            {
                return Err(CameraError::SetAttributeFailed {
                    attribute: "buffer_count".into(),
                    reason: "rejected".into(),
                });
            }
            *self.buffer_count_set_to.lock() = Some(count);
            Ok(())
        }

        async fn next_frame(&self, _timeout: Duration) -> Result<Option<Frame>, CameraError> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn apply_settings_retries_a_rejected_attribute_until_it_is_accepted() {
        use std::sync::Arc;

        let buffer_count_set_to = Arc::new(parking_lot::Mutex::new(None));
        let adapter = FlakyAttributeCamera {
            rejections_left: AtomicU32::new(2),
            buffer_count_set_to: Arc::clone(&buffer_count_set_to),
        };
        let session = CameraSession::new(
            Box::new(adapter),
            "1234".to_string(),
            CameraSettings { buffer_count: 8, ..CameraSettings::default() },
            TrackerLog::default(),
        );

        let connect = tokio::spawn(async move {
            session.ensure_connected().await;
        });
        // Two rejections, each retried after `CONNECT_RETRY_BACKOFF`.
        tokio::time::advance(CONNECT_RETRY_BACKOFF * 3).await;
        connect.await.expect("ensure_connected task");

        assert_eq!(*buffer_count_set_to.lock(), Some(8));
    }
}
