//! Stateless translator from high-level motion requests to motor wire
//! commands, layered directly on `DeviceMux`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::MotorError;
use crate::logging::{LogFlags, TrackerLog};
use crate::serial::mux::{Device, DeviceMux};

/// Ack sentinel: Motors device, `extraLen=0`, command nibble `0xF`.
pub const ACK_HEADER: u8 = 0x8F;
/// Success token: Motors device, `extraLen=0`, command nibble `0x1`.
pub const SUCCESS_HEADER: u8 = 0x81;
/// Low nibble marking a fault report from the motor firmware.
pub const FAULT_NIBBLE: u8 = 0x02;

const CMD_REL_MOVE_SYNC: u8 = 5;
const CMD_REL_MOVE_ASYNC: u8 = 6;
const CMD_ABS_MOVE_SYNC: u8 = 7;
const CMD_ABS_MOVE_ASYNC: u8 = 8;
const CMD_ACTIVATE: u8 = 9;
const CMD_DEACTIVATE: u8 = 10;
const CMD_SET_SPEEDS: u8 = 11;
const CMD_SET_HEADLIGHTS: u8 = 4;

/// Angle and step ranges for one axis. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    pub angle_min: f64,
    pub angle_max: f64,
    pub steps: StepRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRange {
    pub min: i32,
    pub max: i32,
}

/// Linear interpolation from degrees to motor steps, rounded toward zero.
/// `angle_to_step(angle_min) == step_min` and `angle_to_step(angle_max) ==
/// step_max` exactly; the motor firmware enforces range, not this function.
pub fn angle_to_step(config: &MotorConfig, angle: f64) -> i32 {
    let span = config.angle_max - config.angle_min;
    let fraction = (angle - config.angle_min) / span;
    let step = config.steps.min as f64
        + fraction * (config.steps.max - config.steps.min) as f64;
    step.trunc() as i32
}

fn encode_move_payload(pan_step: i32, tilt_step: i32) -> [u8; 6] {
    let pan = pan_step.to_be_bytes();
    let tilt = tilt_step.to_be_bytes();
    // 24-bit big-endian signed: drop the sign-extension byte of each i32.
    [pan[1], pan[2], pan[3], tilt[1], tilt[2], tilt[3]]
}

/// Decodes a 6-byte move payload back into `(pan_step, tilt_step)`, sign
/// extending each 24-bit field. Used by the dissector and by round-trip
/// tests; the motor firmware never needs to decode its own wire format.
pub fn decode_move_payload(payload: &[u8; 6]) -> (i32, i32) {
    let pan = sign_extend_24(payload[0], payload[1], payload[2]);
    let tilt = sign_extend_24(payload[3], payload[4], payload[5]);
    (pan, tilt)
}

fn sign_extend_24(b0: u8, b1: u8, b2: u8) -> i32 {
    let unsigned = ((b0 as u32) << 16) | ((b1 as u32) << 8) | b2 as u32;
    let shifted = (unsigned << 8) as i32;
    shifted >> 8
}

/// Driver over the Motors logical peer of a `DeviceMux`. Cheap to clone
/// (the mux itself is an `Arc`); every method awaits the ack/success
/// protocol, so callers may block for as long as the hardware takes.
#[derive(Clone)]
pub struct MotorDriver {
    mux: Arc<DeviceMux>,
    log: TrackerLog,
    faults_seen: Arc<AtomicU64>,
    headlights_on: Arc<std::sync::atomic::AtomicBool>,
}

impl MotorDriver {
    pub fn new(mux: Arc<DeviceMux>, log: TrackerLog) -> Self {
        Self {
            mux,
            log,
            faults_seen: Arc::new(AtomicU64::new(0)),
            headlights_on: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn faults_seen(&self) -> u64 {
        self.faults_seen.load(Ordering::Relaxed)
    }

    async fn write_and_await_ack(&self, command: u8, payload: &[u8]) -> Result<(), MotorError> {
        self.mux.write(Device::Motors, command, payload).await?;
        self.await_ack().await;
        Ok(())
    }

    /// Awaits the motor ack sentinel, transparently discarding interleaved
    /// success tokens and logging (non-fatally) any fault markers.
    async fn await_ack(&self) {
        loop {
            let message = self.mux.read(Device::Motors).await;
            let low_nibble = message.command();

            if message.header() == ACK_HEADER {
                return;
            }
            if low_nibble == FAULT_NIBBLE {
                self.faults_seen.fetch_add(1, Ordering::Relaxed);
                twarn!(self.log, LogFlags::ERROR, "motor fault reported");
            }
            // Anything else (most commonly a success token from a prior
            // synchronous move) is discarded here; `try_read_message`
            // exposes it separately for callers that want it.
            tlog!(
                self.log,
                LogFlags::ACKNOWLEDGE,
                "discarding non-ack motor message while awaiting ack: 0x{:02x}",
                message.header()
            );
        }
    }

    /// Awaits the success token specifically (used after `activate`).
    async fn await_success(&self) {
        self.mux
            .read_with_header(Device::Motors, SUCCESS_HEADER)
            .await;
    }

    pub async fn rel_move_async(&self, pan_step: i32, tilt_step: i32) -> Result<(), MotorError> {
        let payload = encode_move_payload(pan_step, tilt_step);
        self.write_and_await_ack(CMD_REL_MOVE_ASYNC, &payload).await
    }

    pub async fn rel_move_sync(&self, pan_step: i32, tilt_step: i32) -> Result<(), MotorError> {
        let payload = encode_move_payload(pan_step, tilt_step);
        self.write_and_await_ack(CMD_REL_MOVE_SYNC, &payload).await
    }

    pub async fn abs_move_async(&self, pan_step: i32, tilt_step: i32) -> Result<(), MotorError> {
        let payload = encode_move_payload(pan_step, tilt_step);
        self.write_and_await_ack(CMD_ABS_MOVE_ASYNC, &payload).await
    }

    pub async fn abs_move_sync(&self, pan_step: i32, tilt_step: i32) -> Result<(), MotorError> {
        let payload = encode_move_payload(pan_step, tilt_step);
        self.write_and_await_ack(CMD_ABS_MOVE_SYNC, &payload).await
    }

    /// Sends Activate, awaits the ack, then awaits the success token
    /// signaling calibration has completed.
    pub async fn activate(&self) -> Result<(), MotorError> {
        self.mux.write(Device::Motors, CMD_ACTIVATE, &[]).await?;
        self.await_ack().await;
        self.await_success().await;
        Ok(())
    }

    pub async fn deactivate(&self) -> Result<(), MotorError> {
        self.write_and_await_ack(CMD_DEACTIVATE, &[]).await
    }

    pub async fn set_speeds(&self, vx: u8, vy: u8) -> Result<(), MotorError> {
        self.write_and_await_ack(CMD_SET_SPEEDS, &[vx, vy]).await
    }

    /// No-op if the requested state matches the currently tracked state.
    pub async fn set_headlights(&self, on: bool) -> Result<(), MotorError> {
        if self.headlights_on.load(Ordering::Relaxed) == on {
            return Ok(());
        }
        self.write_and_await_ack(CMD_SET_HEADLIGHTS, &[on as u8])
            .await?;
        self.headlights_on.store(on, Ordering::Relaxed);
        Ok(())
    }

    /// Non-blocking poll for a pending motor message (most useful for
    /// observing success tokens emitted outside the ack protocol, e.g.
    /// during the search FSM's circling phase).
    pub fn try_read_message(&self) -> Option<u8> {
        self.mux.try_read(Device::Motors).map(|m| m.header())
    }
}
