//! Output formatting for dissected frames.

use colored::Colorize;

use crate::dissect::{DissectedFrame, FrameContent};
use officer_tracker::serial::Device;

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub show_raw_hex: bool,
    pub use_color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { show_raw_hex: false, use_color: true }
    }
}

pub fn format_frame(frame: &DissectedFrame, config: &OutputConfig) -> String {
    let device_str = match frame.device {
        Device::Handheld => "Handheld",
        Device::Motors => "Motors  ",
    };

    let mut content_str = frame.content.to_string();
    if config.use_color {
        content_str = match &frame.content {
            FrameContent::MotorFault => content_str.red().to_string(),
            FrameContent::Unknown(_) => content_str.yellow().to_string(),
            FrameContent::MotorSuccess => content_str.green().to_string(),
            _ => content_str,
        };
    }

    let mut result = format!("[{:>5}] {device_str}: {content_str}", frame.index);

    if config.show_raw_hex {
        result.push_str(&format!(" [{}]", hex::encode(&frame.raw)));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::dissect_message;
    use officer_tracker::motor::ACK_HEADER;
    use officer_tracker::serial::DeviceMessage;

    #[test]
    fn formats_without_color_or_hex() {
        let message = DeviceMessage { device: Device::Motors, bytes: vec![ACK_HEADER] };
        let frame = dissect_message(0, message);
        let config = OutputConfig { show_raw_hex: false, use_color: false };
        let line = format_frame(&frame, &config);
        assert_eq!(line, "[    0] Motors  : Ack");
    }

    #[test]
    fn appends_raw_hex_when_requested() {
        let message = DeviceMessage { device: Device::Handheld, bytes: vec![0x01] };
        let frame = dissect_message(3, message);
        let config = OutputConfig { show_raw_hex: true, use_color: false };
        assert!(format_frame(&frame, &config).ends_with("[01]"));
    }
}
