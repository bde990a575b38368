//! Drives the motor from per-frame locator decisions and owns the search
//! state machine used when the subject is lost.

use serde::Deserialize;

use crate::locator::OfficerDecision;
use crate::motor::{angle_to_step, MotorConfig, MotorDriver};

/// Shared two-dimensional value: region proportions, home angles, and
/// normalized movement offsets all use this one type.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

/// Horizontal/vertical field of view, linear in resolution relative to a
/// 1440x1080 reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldOfView {
    pub horizontal_deg: f64,
    pub vertical_deg: f64,
}

impl FieldOfView {
    pub fn for_resolution(width: u32, height: u32) -> Self {
        Self {
            horizontal_deg: 44.8 * width as f64 / 1440.0,
            vertical_deg: 34.6 * height as f64 / 1080.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchState {
    NotSearching,
    CheckingLastSeen,
    Circling { moving_towards_min: bool },
}

pub struct MotionController {
    motor: MotorDriver,
    pan_config: MotorConfig,
    tilt_config: MotorConfig,
    fov: FieldOfView,
    home_angles: Vec2,
    angle_x_bounds: (f64, f64),
    motor_speeds: (u8, u8),
    search: SearchState,
    last_seen: Option<OfficerDecision>,
}

impl MotionController {
    pub fn new(
        motor: MotorDriver,
        pan_config: MotorConfig,
        tilt_config: MotorConfig,
        fov: FieldOfView,
        home_angles: Vec2,
        angle_x_bounds: (f64, f64),
        motor_speeds: (u8, u8),
    ) -> Self {
        Self {
            motor,
            pan_config,
            tilt_config,
            fov,
            home_angles,
            angle_x_bounds,
            motor_speeds,
            search: SearchState::NotSearching,
            last_seen: None,
        }
    }

    pub async fn initialize_guidance(&self) -> Result<(), crate::error::MotorError> {
        self.motor.activate().await?;
        self.motor.set_speeds(self.motor_speeds.0, self.motor_speeds.1).await
    }

    pub async fn uninitialize_guidance(&self) -> Result<(), crate::error::MotorError> {
        self.motor.deactivate().await
    }

    fn angle_to_pan_step(&self, angle: f64) -> i32 {
        angle_to_step(&self.pan_config, angle)
    }

    fn angle_to_tilt_step(&self, angle: f64) -> i32 {
        angle_to_step(&self.tilt_config, angle)
    }

    /// Drives the motor for one locator decision; `found=false` steps the
    /// search FSM instead of moving directly.
    pub async fn guide_to(&mut self, decision: OfficerDecision) -> Result<(), crate::error::MotorError> {
        if decision.found {
            self.last_seen = Some(decision);
            self.search = SearchState::NotSearching;

            let (dx, dy) = if decision.should_move {
                (decision.movement.x, -decision.movement.y)
            } else {
                (0.0, 0.0)
            };

            let pan_step = self.angle_to_pan_step(dx * self.fov.horizontal_deg / 2.0);
            let tilt_step = self.angle_to_tilt_step(dy * self.fov.vertical_deg / 2.0);
            self.motor.rel_move_async(pan_step, tilt_step).await
        } else {
            self.step_search().await
        }
    }

    async fn step_search(&mut self) -> Result<(), crate::error::MotorError> {
        match self.search {
            SearchState::NotSearching => {
                self.search = SearchState::CheckingLastSeen;
                self.check_last_seen().await
            }
            SearchState::CheckingLastSeen => {
                if self.motor.try_read_message() == Some(crate::motor::SUCCESS_HEADER) {
                    // The subject is probably not where we last saw it; go
                    // straight home by circling to the min bound, the same
                    // instant the transition happens rather than on the
                    // next tick.
                    self.search = SearchState::Circling { moving_towards_min: true };
                    let pan_step = self.angle_to_pan_step(self.angle_x_bounds.0);
                    let tilt_step = self.angle_to_tilt_step(self.home_angles.y);
                    self.motor.abs_move_sync(pan_step, tilt_step).await
                } else {
                    Ok(())
                }
            }
            SearchState::Circling { moving_towards_min } => {
                if self.motor.try_read_message() == Some(crate::motor::SUCCESS_HEADER) {
                    let next_towards_min = !moving_towards_min;
                    self.search = SearchState::Circling { moving_towards_min: next_towards_min };
                    let bound = if next_towards_min {
                        self.angle_x_bounds.0
                    } else {
                        self.angle_x_bounds.1
                    };
                    let pan_step = self.angle_to_pan_step(bound);
                    let tilt_step = self.angle_to_tilt_step(self.home_angles.y);
                    self.motor.abs_move_sync(pan_step, tilt_step).await
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn check_last_seen(&mut self) -> Result<(), crate::error::MotorError> {
        match self.last_seen.take() {
            Some(mut seen) if seen.found => {
                seen.found = false; // clear lastSeen.found per the spec's FSM
                let pan_step = self.angle_to_pan_step(seen.movement.x * self.fov.horizontal_deg);
                let tilt_step = self.angle_to_tilt_step(seen.movement.y * self.fov.vertical_deg);
                self.motor.abs_move_sync(pan_step, tilt_step).await
            }
            _ => {
                self.search = SearchState::Circling { moving_towards_min: true };
                let pan_step = self.angle_to_pan_step(self.angle_x_bounds.0);
                let tilt_step = self.angle_to_tilt_step(self.home_angles.y);
                self.motor.abs_move_sync(pan_step, tilt_step).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fov_scales_linearly_with_resolution() {
        let fov = FieldOfView::for_resolution(1440, 1080);
        assert!((fov.horizontal_deg - 44.8).abs() < 1e-6);
        assert!((fov.vertical_deg - 34.6).abs() < 1e-6);

        let half = FieldOfView::for_resolution(720, 540);
        assert!((half.horizontal_deg - 22.4).abs() < 1e-6);
        assert!((half.vertical_deg - 17.3).abs() < 1e-6);
    }
}
