//! Demultiplexes one physical serial link into two logical peer queues.
//!
//! Wire format (LSB-to-MSB within a byte), per `spec.md` §4.2 and §6:
//!
//! ```text
//! byte 0 (header):  device(1 bit, MSB) | extraLen(3 bits) | command(4 bits)
//! bytes 1..=extraLen: payload
//! ```
//!
//! `device` is 0 for Handheld, 1 for Motors. A single long-lived gather task
//! reads the link byte-by-byte and enqueues assembled messages into a
//! mutex-guarded buffer; any thread may then pop messages for its device.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::MuxError;
use crate::logging::{LogFlags, TrackerLog};
use crate::serial::link::SerialLink;

/// A logical peer sharing the physical serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Device {
    Handheld,
    Motors,
}

impl Device {
    fn bit(self) -> u8 {
        match self {
            Device::Handheld => 0,
            Device::Motors => 1,
        }
    }

    fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Device::Handheld
        } else {
            Device::Motors
        }
    }
}

/// A fully assembled message for one device: header byte followed by its
/// payload, exactly as it appeared on the wire (invariant 2, `spec.md` §8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMessage {
    pub device: Device,
    pub bytes: Vec<u8>,
}

impl DeviceMessage {
    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    /// Low nibble of the header byte — the command/ack code.
    pub fn command(&self) -> u8 {
        self.bytes[0] & 0x0f
    }
}

/// Encodes a header byte for `device`/`command` with `extra_len` payload
/// bytes to follow. `extra_len` must be `0..=7`.
pub fn encode_header(device: Device, command: u8, extra_len: usize) -> Result<u8, MuxError> {
    if extra_len > 7 {
        return Err(MuxError::PayloadTooLarge(extra_len));
    }
    Ok((device.bit() << 7) | ((extra_len as u8) << 4) | (command & 0x0f))
}

/// Decodes a header byte into `(device, extra_len, command)`.
pub fn decode_header(header: u8) -> (Device, usize, u8) {
    let device = Device::from_bit(header >> 7);
    let extra_len = ((header & 0b0111_0000) >> 4) as usize;
    let command = header & 0x0f;
    (device, extra_len, command)
}

/// Incremental per-byte frame assembler driving the gather loop. Kept
/// separate from the task itself so it's unit-testable on bare byte slices
/// without a real serial link.
#[derive(Default)]
struct Assembler {
    current_device: Option<Device>,
    expected_len: usize,
    bytes: Vec<u8>,
}

impl Assembler {
    /// Feeds one byte; returns a completed message if this byte finished one.
    fn push(&mut self, byte: u8) -> Option<DeviceMessage> {
        if self.current_device.is_none() {
            let (device, extra_len, _command) = decode_header(byte);
            self.current_device = Some(device);
            self.expected_len = 1 + extra_len;
            self.bytes.clear();
        }

        self.bytes.push(byte);

        if self.bytes.len() == self.expected_len {
            let message = DeviceMessage {
                device: self.current_device.take().unwrap(),
                bytes: std::mem::take(&mut self.bytes),
            };
            Some(message)
        } else {
            None
        }
    }
}

/// Demultiplexes a raw captured byte stream into `DeviceMessage`s without a
/// live link, driving the same `Assembler` the gather task uses. Exists for
/// offline tooling (the protocol dissector) and tests that want to replay a
/// fixed byte sequence.
pub fn assemble_stream(bytes: &[u8]) -> Vec<DeviceMessage> {
    let mut assembler = Assembler::default();
    let mut messages = Vec::new();
    for &byte in bytes {
        if let Some(message) = assembler.push(byte) {
            messages.push(message);
        }
    }
    messages
}

/// Demultiplexes a `SerialLink` into per-device message queues.
///
/// The link itself is guarded by a `tokio::sync::Mutex`, not
/// `parking_lot::Mutex`: the gather task holds the guard across the read's
/// `.await` point, and only an async-aware mutex keeps that future `Send`.
/// The message buffer never holds its lock across an `.await`, so it stays
/// on the cheaper `parking_lot::Mutex`.
pub struct DeviceMux {
    link: tokio::sync::Mutex<SerialLink>,
    buffer: Arc<Mutex<VecDeque<DeviceMessage>>>,
    gathering: CancellationToken,
    gather_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    log: TrackerLog,
}

impl DeviceMux {
    pub fn new(link: SerialLink, log: TrackerLog) -> Arc<Self> {
        Arc::new(Self {
            link: tokio::sync::Mutex::new(link),
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            gathering: CancellationToken::new(),
            gather_task: Mutex::new(None),
            log,
        })
    }

    pub fn is_gathering(&self) -> bool {
        self.gather_task.lock().is_some()
    }

    /// Starts the long-lived background gather task, if not already running.
    pub fn start_gathering(self: &Arc<Self>) {
        let mut guard = self.gather_task.lock();
        if guard.is_some() {
            return;
        }

        let mux = Arc::clone(self);
        let token = self.gathering.clone();
        *guard = Some(tokio::spawn(async move {
            mux.gather(token).await;
        }));
    }

    /// Signals the gather task to stop and waits for it to exit.
    pub async fn stop_gathering(self: &Arc<Self>) {
        let task = self.gather_task.lock().take();
        if let Some(task) = task {
            self.gathering.cancel();
            let _ = task.await;
        }
    }

    async fn gather(self: Arc<Self>, token: CancellationToken) {
        let mut assembler = Assembler::default();
        let mut byte = [0u8; 1];

        while !token.is_cancelled() {
            let read = {
                let mut link = self.link.lock().await;
                link.read(&mut byte).await
            };

            match read {
                Ok(0) => {
                    // Idle-line timeout; the read itself was our sleep.
                    continue;
                }
                Ok(_) => {
                    tlog!(
                        self.log,
                        LogFlags::RAW_SERIAL,
                        "read byte 0x{:02x}",
                        byte[0]
                    );
                    if let Some(message) = assembler.push(byte[0]) {
                        self.buffer.lock().push_back(message);
                    }
                }
                Err(e) => {
                    twarn!(self.log, LogFlags::ERROR, "serial read error: {e}");
                }
            }
        }
    }

    /// Scans the buffer in FIFO order, removing and returning the first
    /// message whose device matches.
    pub fn try_read(&self, device: Device) -> Option<DeviceMessage> {
        let mut buffer = self.buffer.lock();
        let pos = buffer.iter().position(|m| m.device == device)?;
        buffer.remove(pos)
    }

    /// Blocks by polling `try_read` with a short sleep until a message
    /// arrives.
    pub async fn read(&self, device: Device) -> DeviceMessage {
        loop {
            if let Some(message) = self.try_read(device) {
                return message;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Repeatedly reads until a message whose first byte equals `header` is
    /// found, discarding any others. This is how acks and success tokens are
    /// awaited over an interleaved stream.
    pub async fn read_with_header(&self, device: Device, header: u8) -> DeviceMessage {
        loop {
            let message = self.read(device).await;
            if message.header() == header {
                return message;
            }
        }
    }

    /// Rejects payloads over 7 bytes, composes the header byte, and writes
    /// header||payload atomically to the link.
    pub async fn write(&self, device: Device, command: u8, payload: &[u8]) -> Result<(), MuxError> {
        if payload.len() > 7 {
            return Err(MuxError::PayloadTooLarge(payload.len()));
        }

        let header = encode_header(device, command, payload.len())?;
        let mut frame = Vec::with_capacity(1 + payload.len());
        frame.push(header);
        frame.extend_from_slice(payload);

        tlog!(
            self.log,
            LogFlags::RAW_SERIAL,
            "writing {} bytes to {device}: {}",
            frame.len(),
            crate::logging::to_hex(&frame)
        );

        let mut link = self.link.lock().await;
        link.write(&frame).await?;
        Ok(())
    }
}
