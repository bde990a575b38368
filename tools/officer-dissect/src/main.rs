//! Offline protocol dissector: replays a captured officer-tracker serial
//! stream through the same `DeviceMux` assembler and wire-format decoders
//! the daemon uses, and prints a human-readable trace of every Handheld and
//! Motors message seen.

mod dissect;
mod output;
mod serial;

use anyhow::{Context, Result};
use clap::Parser;

use output::OutputConfig;

/// Dissect a captured officer-tracker serial stream.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the captured byte stream (raw binary or hex text).
    capture: String,

    /// Append each message's raw bytes as hex.
    #[arg(long)]
    raw_hex: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,

    /// Only show messages for this device.
    #[arg(long, value_enum)]
    device: Option<DeviceFilter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum DeviceFilter {
    Handheld,
    Motors,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let bytes = serial::read_capture(&args.capture)
        .with_context(|| format!("failed to load capture {}", args.capture))?;
    tracing::debug!(bytes = bytes.len(), "loaded capture");
    let messages = serial::assemble(&bytes);
    tracing::debug!(messages = messages.len(), "assembled messages");

    let config = OutputConfig { show_raw_hex: args.raw_hex, use_color: !args.no_color };

    for (index, message) in messages.into_iter().enumerate() {
        if let Some(filter) = args.device {
            let matches = match (filter, message.device) {
                (DeviceFilter::Handheld, officer_tracker::serial::Device::Handheld) => true,
                (DeviceFilter::Motors, officer_tracker::serial::Device::Motors) => true,
                _ => false,
            };
            if !matches {
                continue;
            }
        }

        let frame = dissect::dissect_message(index, message);
        println!("{}", output::format_frame(&frame, &config));
    }

    Ok(())
}
