//! Settings data model.
//!
//! The JSON settings file itself is loaded by an external collaborator (see
//! `spec.md` §1 Out of scope); this module only owns the shape that loader
//! deserializes into, since every core component is constructed from it.

use serde::Deserialize;

use crate::locator::HsvBound;
use crate::logging::LogFlags;
use crate::motion::Vec2;
use crate::motor::{MotorConfig, StepRange};
use crate::peripheral::status_led::StatusPhase;

fn default_officer_threshold() -> f32 {
    0.15
}

fn default_confidence_threshold() -> f32 {
    0.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    pub path: String,
    pub baud: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraSettingsConfig {
    pub serial: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub buffer_count: u32,
    /// White-balance light-source filter, as an opaque SDK enum value.
    pub filter: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocatorConfig {
    pub officer_class_id: i16,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    pub target_region_proportion: Vec2,
    pub safe_region_proportion: Vec2,
    pub min_hsv: Option<HsvBound>,
    pub max_hsv: Option<HsvBound>,
    #[serde(default = "default_officer_threshold")]
    pub officer_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotorAxisConfig {
    pub angle_min: f64,
    pub angle_max: f64,
    pub step_min: i32,
    pub step_max: i32,
}

impl From<MotorAxisConfig> for MotorConfig {
    fn from(c: MotorAxisConfig) -> Self {
        MotorConfig {
            angle_min: c.angle_min,
            angle_max: c.angle_max,
            steps: StepRange {
                min: c.step_min,
                max: c.step_max,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    pub pan: MotorAxisConfig,
    pub tilt: MotorAxisConfig,
    pub home_angles: Vec2,
    pub angle_x_bounds_min: f64,
    pub angle_x_bounds_max: f64,
    pub motor_speeds: (u8, u8),
    #[serde(default)]
    pub camera_frames_to_skip: u32,
}

/// Keyed by `StatusPhase`'s `Display` name (e.g. `"Booting"`) rather than
/// the enum itself, since the settings file is plain JSON and this avoids
/// relying on enum-keyed map deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusLedConfig {
    pub flashes_per_pause: std::collections::HashMap<String, u32>,
}

impl StatusLedConfig {
    pub fn flashes_for(&self, phase: StatusPhase) -> Option<u32> {
        self.flashes_per_pause.get(&phase.to_string()).copied()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// The single physical link `DeviceMux` demultiplexes into the
    /// Handheld and Motors logical peers.
    pub serial: SerialConfig,
    pub camera: CameraSettingsConfig,
    pub locator: LocatorConfig,
    pub motion: MotionConfig,
    pub status_led: StatusLedConfig,
    #[serde(default)]
    pub log_flags: u32,
}

impl TrackerConfig {
    pub fn from_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    pub fn log_flags(&self) -> LogFlags {
        LogFlags::from_bits_truncate(self.log_flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "serial": { "path": "/dev/ttyUSB0", "baud": 115200 },
        "camera": { "serial": "1234", "width": 1440, "height": 1080, "fps": 30.0, "buffer_count": 4, "filter": null },
        "locator": {
            "officer_class_id": 1,
            "target_region_proportion": { "x": 0.2, "y": 0.2 },
            "safe_region_proportion": { "x": 0.6, "y": 0.6 }
        },
        "motion": {
            "pan": { "angle_min": -45.0, "angle_max": 45.0, "step_min": 0, "step_max": 1000 },
            "tilt": { "angle_min": -30.0, "angle_max": 30.0, "step_min": 0, "step_max": 1000 },
            "home_angles": { "x": 0.0, "y": 0.0 },
            "angle_x_bounds_min": 0.0,
            "angle_x_bounds_max": 359.0,
            "motor_speeds": [127, 127]
        },
        "status_led": { "flashes_per_pause": {} }
    }
    "#;

    #[test]
    fn parses_sample_config_with_defaults() {
        let cfg = TrackerConfig::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.locator.confidence_threshold, 0.0);
        assert_eq!(cfg.locator.officer_threshold, 0.15);
        assert_eq!(cfg.motion.camera_frames_to_skip, 0);
        assert_eq!(cfg.motion.pan.step_max, 1000);
    }
}
