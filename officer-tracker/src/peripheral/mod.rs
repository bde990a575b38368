//! External collaborators named by `spec.md` §1's Out-of-scope list: the
//! status-LED driver, the AVI recorder, and the calibration display window
//! are all real hardware/file/GUI integrations this crate does not
//! implement. What's here are the thin trait boundaries the core talks to,
//! plus logging-only stand-ins useful for bring-up without the real thing
//! attached.

pub mod display;
pub mod recorder;
pub mod status_led;

pub use display::{DisplayWindow, LoggingDisplayWindow};
pub use recorder::{LoggingRecorder, Recorder};
pub use status_led::{LoggingStatusIndicator, StatusIndicator, StatusPhase};
