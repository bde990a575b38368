//! Error taxonomy shared across the core subsystems.
//!
//! Each variant group corresponds to one of the categories from the error
//! handling design: transient conditions are handled in place and never
//! constructed here, protocol violations and fatal-init failures are
//! returned to the immediate caller.

use thiserror::Error;

/// Errors from the serial transport (`serial::link`).
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("failed to open serial device {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error on serial device: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the device multiplexer (`serial::mux`).
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("payload of {0} bytes exceeds the 7-byte maximum")]
    PayloadTooLarge(usize),
    #[error(transparent)]
    Serial(#[from] SerialError),
}

/// Errors from the motor driver (`motor`).
#[derive(Debug, Error)]
pub enum MotorError {
    #[error(transparent)]
    Mux(#[from] MuxError),
}

/// Errors from the command bus (`command`).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command code {0:#x}")]
    UnknownCommand(u8),
    #[error(transparent)]
    Mux(#[from] MuxError),
}

/// Errors from camera session management (`camera`).
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera with serial {0} was not found")]
    DeviceNotFound(String),
    #[error("failed to set camera attribute {attribute}: {reason}")]
    SetAttributeFailed { attribute: String, reason: String },
    #[error("camera frame acquisition timed out")]
    FrameTimeout,
}

/// Programmer errors: caller bugs that are not recoverable at runtime.
///
/// These are raised (not silently ignored) per the error handling design's
/// "Programmer" category, with one explicit exception: unregistering an
/// unknown callback key is a documented no-op (see `camera::pipeline`), not
/// a `ProgrammerError`.
#[derive(Debug, Error)]
pub enum ProgrammerError {
    #[error("cannot read a single frame while the live feed is running")]
    LiveFeedAlreadyRunning,
}
