//! Reads a captured byte stream off disk and assembles it into
//! `DeviceMessage`s using the same `Assembler` the daemon's gather task
//! drives, via `officer_tracker::serial::assemble_stream`.
//!
//! Captures are read as raw bytes unless the file looks like a hex dump
//! (every non-whitespace byte is an ASCII hex digit), in which case it's
//! decoded first. Logic-analyzer exports are commonly saved as hex text,
//! while a straight `tee` of the serial device is raw binary.

use anyhow::{Context, Result};
use officer_tracker::serial::{assemble_stream, DeviceMessage};

pub fn read_capture(path: &str) -> Result<Vec<u8>> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read capture {path}"))?;
    if looks_like_hex_text(&raw) {
        let text: String = raw.iter().map(|&b| b as char).filter(|c| !c.is_whitespace()).collect();
        hex::decode(&text).with_context(|| format!("failed to hex-decode capture {path}"))
    } else {
        Ok(raw)
    }
}

fn looks_like_hex_text(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && bytes
            .iter()
            .all(|&b| b.is_ascii_hexdigit() || b.is_ascii_whitespace())
}

pub fn assemble(bytes: &[u8]) -> Vec<DeviceMessage> {
    assemble_stream(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hex_text() {
        assert!(looks_like_hex_text(b"90 aa bb 01 cc\n"));
        assert!(!looks_like_hex_text(&[0x90, 0xAA, 0xBB]));
    }

    #[test]
    fn empty_capture_is_not_hex_text() {
        assert!(!looks_like_hex_text(b""));
    }
}
