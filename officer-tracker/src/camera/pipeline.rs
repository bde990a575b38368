//! Frame fan-out: a single producer pulls frames from the camera session
//! and dispatches each to a dynamic set of consumers under a
//! mutation-safe registration discipline.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::camera::{CameraSession, Frame};
use crate::locator::{FramePixels, OfficerLocator};
use crate::logging::{LogFlags, TrackerLog};
use crate::motion::MotionController;

type Callback = dyn Fn(&Frame) + Send + Sync;

/// Callbacks keyed by a strictly increasing `u32` counter. A `BTreeMap`'s
/// iteration order follows key order, and since keys only ever increase,
/// that is exactly registration order — even after arbitrary removals —
/// satisfying the deterministic-dispatch-order invariant without a
/// dedicated slot-map.
#[derive(Default)]
pub struct CallbackRegistry {
    next_key: AtomicU32,
    callbacks: Mutex<BTreeMap<u32, Arc<Callback>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`, returning a key unique for the process
    /// lifetime.
    pub fn register<F>(&self, callback: F) -> u32
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().insert(key, Arc::new(callback));
        key
    }

    /// Removing an unknown key is a documented no-op: no panic, no effect.
    pub fn unregister(&self, key: u32) {
        self.callbacks.lock().remove(&key);
    }

    /// Dispatches `frame` to every registered callback, in registration
    /// order. The registry lock is held only long enough to clone the
    /// `Arc`s into a snapshot `Vec`, preserving `BTreeMap` key order; the
    /// callbacks themselves run with the lock released, so a callback that
    /// registers or unregisters does not deadlock against this dispatch. A
    /// concurrently unregistered callback either is or isn't in the
    /// snapshot depending on whether `unregister` happened before this
    /// lock was taken — once `unregister` returns, its callback is
    /// guaranteed not to fire from any dispatch that starts afterwards.
    pub fn dispatch(&self, frame: &Frame) {
        let snapshot: Vec<Arc<Callback>> = {
            let guard = self.callbacks.lock();
            guard.values().cloned().collect()
        };
        for callback in snapshot {
            callback(frame);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `index % (camera_frames_to_skip + 1) == 0` — the tracking consumer's
/// skip policy, factored out so it's testable without a real motor/locator.
fn should_track_frame(index: u64, camera_frames_to_skip: u32) -> bool {
    (index % (camera_frames_to_skip as u64 + 1)) == 0
}

/// Drives the live-feed loop: repeatedly pulls frames from a
/// `CameraSession`, converts/indexes them, and fans them out through a
/// `CallbackRegistry`.
pub struct FramePipeline {
    session: Arc<CameraSession>,
    registry: Arc<CallbackRegistry>,
    running: Arc<AtomicBool>,
    next_index: Arc<AtomicU32>,
    log: TrackerLog,
}

impl FramePipeline {
    pub fn new(session: Arc<CameraSession>, log: TrackerLog) -> Self {
        Self {
            session,
            registry: Arc::new(CallbackRegistry::new()),
            running: Arc::new(AtomicBool::new(false)),
            next_index: Arc::new(AtomicU32::new(0)),
            log,
        }
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Registers the tracking consumer: on frames where
    /// `index % (camera_frames_to_skip + 1) == 0`, locates the officer and
    /// drives the motion controller from the result. Every other frame is
    /// skipped entirely, matching the skip policy's "controller treats
    /// every call it does receive as authoritative" contract — skipped
    /// frames never reach `guide_to`.
    ///
    /// `locate` itself runs synchronously inside the dispatch loop (it
    /// touches no I/O), but `guide_to` awaits the motor ack protocol, so
    /// it's driven from a spawned task to keep dispatch to the other
    /// fan-out consumers (recorder, display) from blocking on motor I/O.
    pub fn register_tracking(
        &self,
        locator: Arc<tokio::sync::Mutex<OfficerLocator>>,
        motion: Arc<tokio::sync::Mutex<MotionController>>,
        camera_frames_to_skip: u32,
    ) -> u32 {
        let log = self.log.clone();
        self.registry.register(move |frame| {
            if !should_track_frame(frame.index, camera_frames_to_skip) {
                return;
            }

            let locator = Arc::clone(&locator);
            let motion = Arc::clone(&motion);
            let frame = frame.clone();
            let log = log.clone();

            tokio::spawn(async move {
                let pixels = FramePixels { pixels: &frame.pixels, width: frame.width };
                let decision = {
                    let mut locator = locator.lock().await;
                    locator.locate(&frame.detections, frame.width, frame.height, &pixels)
                };

                let mut motion = motion.lock().await;
                if let Err(e) = motion.guide_to(decision).await {
                    twarn!(log, LogFlags::ERROR, "guide_to failed: {e}");
                }
            });
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawns the live-feed task if not already running.
    pub fn start_live_feed(&self) -> Option<tokio::task::JoinHandle<()>> {
        if self.running.swap(true, Ordering::Relaxed) {
            return None;
        }
        self.session.mark_live_feed_running(true);

        let session = Arc::clone(&self.session);
        let registry = Arc::clone(&self.registry);
        let running = Arc::clone(&self.running);
        let next_index = Arc::clone(&self.next_index);
        let log = self.log.clone();

        Some(tokio::spawn(async move {
            while running.load(Ordering::Relaxed) {
                match session.next_frame().await {
                    Some(mut frame) => {
                        let index = next_index.fetch_add(1, Ordering::Relaxed) as u64;
                        frame.index = index;
                        tlog!(log, LogFlags::FRAMES, "dispatching frame {index}");
                        registry.dispatch(&frame);
                    }
                    None => {
                        // Timeout or fault already handled (power-cycle) by
                        // the session; the frame index is not advanced.
                        continue;
                    }
                }
            }
            session.mark_live_feed_running(false);
        }))
    }

    /// Idempotent: signals the loop via the running flag. Callers join the
    /// returned handle themselves; there is no internal timeout, matching
    /// the "observe the flag within one blocking-read interval" contract.
    pub fn stop_live_feed(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> Frame {
        Frame {
            index,
            width: 10,
            height: 10,
            pixels: Vec::new(),
            detections: Vec::new(),
        }
    }

    #[test]
    fn skip_policy_tracks_every_frame_when_skip_is_zero() {
        for index in 0..5u64 {
            assert!(should_track_frame(index, 0));
        }
    }

    #[test]
    fn skip_policy_tracks_every_other_frame_when_skip_is_one() {
        let tracked: Vec<bool> = (0..6u64).map(|i| should_track_frame(i, 1)).collect();
        assert_eq!(tracked, vec![true, false, true, false, true, false]);
    }

    #[test]
    fn skip_policy_tracks_every_third_frame_when_skip_is_two() {
        let tracked: Vec<bool> = (0..6u64).map(|i| should_track_frame(i, 2)).collect();
        assert_eq!(tracked, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn callbacks_fire_in_registration_order() {
        let registry = CallbackRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5u32 {
            let order = Arc::clone(&order);
            registry.register(move |_frame| order.lock().push(i));
        }

        registry.dispatch(&frame(0));
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn each_callback_fires_exactly_once() {
        let registry = CallbackRegistry::new();
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = Arc::clone(&count);
        registry.register(move |_frame| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });

        registry.dispatch(&frame(0));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn registry_keys_are_pairwise_distinct() {
        let registry = CallbackRegistry::new();
        let mut keys = Vec::new();
        for _ in 0..100 {
            keys.push(registry.register(|_| {}));
        }
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());
    }

    #[test]
    fn unregister_preserves_remaining_order_and_unknown_key_is_noop() {
        let registry = CallbackRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let keys: Vec<u32> = (0..3u32)
            .map(|i| {
                let order = Arc::clone(&order);
                registry.register(move |_frame| order.lock().push(i))
            })
            .collect();

        registry.unregister(keys[1]);
        registry.unregister(999_999); // unknown key: no panic, no effect

        registry.dispatch(&frame(0));
        assert_eq!(*order.lock(), vec![0, 2]);
    }

    #[test]
    fn unregister_takes_effect_before_next_dispatch() {
        let registry = CallbackRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));
        let fired_clone = Arc::clone(&fired);
        let key = registry.register(move |_| {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        });

        registry.unregister(key);
        registry.dispatch(&frame(0));
        assert_eq!(fired.load(Ordering::Relaxed), 0);
    }
}
