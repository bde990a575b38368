//! Bitmap-gated logging handle.
//!
//! The source controller gates every log line on a process-wide bitmap of
//! enabled categories (`RawSerial`, `Movements`, `Officers`, ...), so an
//! operator can dial up exactly the noise they need on an embedded box with
//! no attached console other than a serial terminal. We keep that bitmap,
//! but own it as an explicit handle rather than a global: every component
//! holds a `TrackerLog` (cheaply `Clone`, an `Arc` underneath) instead of
//! reaching for a singleton, and the bitmap layers on top of `tracing`'s own
//! level filtering rather than replacing it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// Log categories, mirrored from the source's log flag bitmap.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LogFlags: u32 {
        /// Per-frame pipeline activity (acquisition, dispatch, conversion).
        const FRAMES        = 0b0000_0001;
        /// Officer-locator decisions (region classification, box selection).
        const OFFICERS      = 0b0000_0010;
        /// Motor movement commands issued by the motion controller.
        const MOVEMENTS     = 0b0000_0100;
        /// Device-serial framing: message assembly, queue operations.
        const DEVICE_SERIAL = 0b0000_1000;
        /// Raw bytes read from / written to the serial link.
        const RAW_SERIAL    = 0b0001_0000;
        /// Ack/success-token handshaking with the motor firmware.
        const ACKNOWLEDGE   = 0b0010_0000;
        /// Camera connect/reconnect/power-cycle lifecycle.
        const CAMERA        = 0b0100_0000;
        /// Status LED phase changes.
        const STATUS_LED    = 0b1000_0000;
        /// Errors and faults, always worth seeing.
        const ERROR         = 0b1_0000_0000;
    }
}

impl Default for LogFlags {
    fn default() -> Self {
        LogFlags::ERROR | LogFlags::OFFICERS | LogFlags::MOVEMENTS | LogFlags::CAMERA
    }
}

/// A cheaply-cloneable logging handle carrying the currently configured
/// bitmap. Passed explicitly to every component that needs to log, never
/// accessed through a global.
#[derive(Debug, Clone)]
pub struct TrackerLog {
    flags: Arc<AtomicU32>,
}

impl TrackerLog {
    pub fn new(flags: LogFlags) -> Self {
        Self {
            flags: Arc::new(AtomicU32::new(flags.bits())),
        }
    }

    /// Replace the configured bitmap (e.g. after a config reload).
    pub fn set_flags(&self, flags: LogFlags) {
        self.flags.store(flags.bits(), Ordering::Relaxed);
    }

    pub fn flags(&self) -> LogFlags {
        LogFlags::from_bits_truncate(self.flags.load(Ordering::Relaxed))
    }

    /// A message fires iff `msg_flags & configured_flags != 0`, matching the
    /// source's bitmap semantics exactly.
    pub fn enabled(&self, msg_flags: LogFlags) -> bool {
        !(self.flags() & msg_flags).is_empty()
    }
}

impl Default for TrackerLog {
    fn default() -> Self {
        Self::new(LogFlags::default())
    }
}

/// Emit a `tracing` event gated by the bitmap, at `info` level.
#[macro_export]
macro_rules! tlog {
    ($log:expr, $flags:expr, $($arg:tt)*) => {
        if $log.enabled($flags) {
            tracing::info!($($arg)*);
        }
    };
}

/// Emit a `tracing` warning gated by the bitmap.
#[macro_export]
macro_rules! twarn {
    ($log:expr, $flags:expr, $($arg:tt)*) => {
        if $log.enabled($flags) {
            tracing::warn!($($arg)*);
        }
    };
}

/// Format a byte slice the way the source's `SerialPort::ToHex` helper does,
/// for the `RAW_SERIAL` category: `"0xAA 0xBB 0xCC"`.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{}", hex::encode_upper([*b])))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_matches_source_semantics() {
        let log = TrackerLog::new(LogFlags::MOVEMENTS | LogFlags::ERROR);
        assert!(log.enabled(LogFlags::MOVEMENTS));
        assert!(log.enabled(LogFlags::MOVEMENTS | LogFlags::CAMERA));
        assert!(!log.enabled(LogFlags::CAMERA));
        assert!(!log.enabled(LogFlags::FRAMES));
    }

    #[test]
    fn set_flags_replaces_bitmap() {
        let log = TrackerLog::new(LogFlags::empty());
        assert!(!log.enabled(LogFlags::FRAMES));
        log.set_flags(LogFlags::FRAMES);
        assert!(log.enabled(LogFlags::FRAMES));
    }

    #[test]
    fn to_hex_formats_like_source() {
        assert_eq!(to_hex(&[0xAA, 0x01]), "0xAA 0x01");
        assert_eq!(to_hex(&[]), "");
    }
}
