//! Daemon entry point: loads the settings file, brings up the serial mux,
//! motor driver, motion controller, officer locator, and camera pipeline,
//! then waits for the handheld command dispatch loop (external, per
//! `spec.md` §1) to drive them.
//!
//! This binary only wires components together; the actual command dispatch
//! logic and the JSON settings loader stay out of scope, so this `main`
//! stands in for the latter with a direct `TrackerConfig::from_reader` call
//! and exits once the core is initialized.

use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};

use officer_tracker::camera::{CameraSettings, FramePipeline};
use officer_tracker::command::CommandBus;
use officer_tracker::config::TrackerConfig;
use officer_tracker::locator::strategy::{BoxSelectionStrategy, ConfidenceStrategy, HsvConfirmationStrategy};
use officer_tracker::locator::OfficerLocator;
use officer_tracker::logging::TrackerLog;
use officer_tracker::motion::{FieldOfView, MotionController};
use officer_tracker::motor::MotorDriver;
use officer_tracker::peripheral::{LoggingDisplayWindow, LoggingRecorder, LoggingStatusIndicator};
use officer_tracker::serial::{DeviceMux, SerialLink};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/officer-tracker/config.json".to_string());

    let file = File::open(&config_path)
        .with_context(|| format!("failed to open config file {config_path}"))?;
    let config = TrackerConfig::from_reader(file)
        .with_context(|| format!("failed to parse config file {config_path}"))?;

    let log = TrackerLog::new(config.log_flags());
    init_tracing();

    tracing::info!("starting officer-tracker daemon");

    let link = SerialLink::open(&config.serial.path, config.serial.baud)
        .context("failed to open serial link")?;
    let mux = DeviceMux::new(link, log.clone());
    mux.start_gathering();

    let _command_bus = CommandBus::new(Arc::clone(&mux));
    let motor = MotorDriver::new(Arc::clone(&mux), log.clone());

    let fov = FieldOfView::for_resolution(config.camera.width, config.camera.height);
    let motion = MotionController::new(
        motor,
        config.motion.pan.clone().into(),
        config.motion.tilt.clone().into(),
        fov,
        config.motion.home_angles,
        (config.motion.angle_x_bounds_min, config.motion.angle_x_bounds_max),
        config.motion.motor_speeds,
    );
    motion.initialize_guidance().await.context("failed to initialize motor guidance")?;

    let strategy: Box<dyn BoxSelectionStrategy> = match (config.locator.min_hsv, config.locator.max_hsv) {
        (Some(min_hsv), Some(max_hsv)) => Box::new(HsvConfirmationStrategy {
            min_hsv,
            max_hsv,
            officer_threshold: config.locator.officer_threshold,
        }),
        _ => Box::new(ConfidenceStrategy),
    };
    let _locator = Arc::new(tokio::sync::Mutex::new(OfficerLocator::new(
        config.locator.officer_class_id,
        config.locator.confidence_threshold,
        config.locator.target_region_proportion,
        config.locator.safe_region_proportion,
        strategy,
    )));
    let _motion = Arc::new(tokio::sync::Mutex::new(motion));

    let _status = LoggingStatusIndicator::new(log.clone());
    let _recorder = LoggingRecorder::new(log.clone());
    let _display = LoggingDisplayWindow::new(log.clone());

    let _settings = CameraSettings {
        width: Some(config.camera.width),
        height: Some(config.camera.height),
        fps: Some(config.camera.fps),
        filter: config.camera.filter,
        buffer_count: config.camera.buffer_count,
    };

    // The camera adapter is an external SDK boundary (spec.md §1): once the
    // command dispatch loop (also external) builds a `CameraSession` over a
    // real adapter and a `FramePipeline` over that session, it registers the
    // tracking consumer like so:
    //
    //   let pipeline = FramePipeline::new(session, log.clone());
    //   pipeline.register_tracking(locator, motion, config.motion.camera_frames_to_skip);
    //   pipeline.start_live_feed();
    let _pipeline_placeholder: Option<Arc<FramePipeline>> = None;

    tracing::info!("core initialized, handing off to command dispatch");
    Ok(())
}

/// Layers `tracing-subscriber`'s `fmt` output with `journald`, matching how
/// the daemon this crate grew from logs when run as a systemd service; if
/// no journald socket is reachable (e.g. running interactively off-device),
/// the journald layer is simply omitted rather than failing startup.
fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let registry = tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer());

    match tracing_journald::layer() {
        Ok(journald) => registry.with(journald).init(),
        Err(_) => registry.init(),
    }
}
