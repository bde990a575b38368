//! Converts a frame's detection metadata into a movement decision, using a
//! two-region (target/safe) hysteresis policy and a pluggable box-selection
//! strategy.

pub mod color;
pub mod strategy;

pub use color::HsvBound;
pub use strategy::{BoxSelectionStrategy, FramePixels};

use crate::motion::Vec2;

/// A single object-detection result, already clamped to the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionBox {
    pub class_id: i16,
    pub confidence: f32,
    pub top_left: (u32, u32),
    pub bottom_right: (u32, u32),
}

impl DetectionBox {
    /// Clamps `top_left`/`bottom_right` into `[0, w-1] x [0, h-1]`, leaving
    /// non-negative width/height.
    pub fn clamped(mut self, width: u32, height: u32) -> Self {
        let clamp_x = |v: u32| v.min(width.saturating_sub(1));
        let clamp_y = |v: u32| v.min(height.saturating_sub(1));

        let (tlx, tly) = (clamp_x(self.top_left.0), clamp_y(self.top_left.1));
        let (mut brx, mut bry) = (clamp_x(self.bottom_right.0), clamp_y(self.bottom_right.1));
        brx = brx.max(tlx);
        bry = bry.max(tly);

        self.top_left = (tlx, tly);
        self.bottom_right = (brx, bry);
        self
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.top_left.0 + self.bottom_right.0) as f64 / 2.0,
            (self.top_left.1 + self.bottom_right.1) as f64 / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfficerDecision {
    pub found: bool,
    pub should_move: bool,
    /// Normalized `[-1, +1]^2` offset from frame center, `+y` up. Undefined
    /// (but always present as a value) when `found` is false — callers must
    /// not inspect it in that case.
    pub movement: Vec2,
}

impl OfficerDecision {
    fn not_found() -> Self {
        Self {
            found: false,
            should_move: false,
            movement: Vec2 { x: 0.0, y: 0.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    None,
    Safe,
    Target,
}

/// Persists across frames: whether the subject is mid-transit toward the
/// target region, and the last region it was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocatorState {
    pub is_traveling_to_target: bool,
    pub last_region: Option<Region>,
}

pub struct OfficerLocator {
    officer_class_id: i16,
    confidence_threshold: f32,
    target_region_proportion: Vec2,
    safe_region_proportion: Vec2,
    strategy: Box<dyn BoxSelectionStrategy>,
    state: LocatorState,
}

impl OfficerLocator {
    pub fn new(
        officer_class_id: i16,
        confidence_threshold: f32,
        target_region_proportion: Vec2,
        safe_region_proportion: Vec2,
        strategy: Box<dyn BoxSelectionStrategy>,
    ) -> Self {
        Self {
            officer_class_id,
            confidence_threshold,
            target_region_proportion,
            safe_region_proportion,
            strategy,
            state: LocatorState::default(),
        }
    }

    pub fn state(&self) -> LocatorState {
        self.state
    }

    fn classify_region(&self, x_n: f64, y_n: f64) -> Region {
        let in_region = |p: Vec2| x_n.abs() < p.x / 2.0 && y_n.abs() < p.y / 2.0;

        if in_region(self.target_region_proportion) {
            Region::Target
        } else if in_region(self.safe_region_proportion) {
            Region::Safe
        } else {
            Region::None
        }
    }

    /// `shouldMove` hysteresis: enter "traveling" on `None`, remain
    /// traveling through `Safe`, clear on reaching `Target`.
    fn update_hysteresis(&mut self, region: Region) -> bool {
        match region {
            Region::None => self.state.is_traveling_to_target = true,
            Region::Target => self.state.is_traveling_to_target = false,
            Region::Safe => {}
        }
        self.state.last_region = Some(region);
        self.state.is_traveling_to_target
    }

    /// Runs the full per-frame pipeline: filter by class/confidence, clamp,
    /// strategy selection, region classification, hysteresis update.
    pub fn locate(
        &mut self,
        detections: &[DetectionBox],
        frame_width: u32,
        frame_height: u32,
        frame: &FramePixels<'_>,
    ) -> OfficerDecision {
        let candidates: Vec<DetectionBox> = detections
            .iter()
            .copied()
            .filter(|d| d.class_id == self.officer_class_id && d.confidence >= self.confidence_threshold)
            .map(|d| d.clamped(frame_width, frame_height))
            .collect();

        let Some(best) = self.strategy.pick_best(&candidates, frame) else {
            return OfficerDecision::not_found();
        };

        let (cx, cy) = best.center();
        let x_n = cx / (frame_width as f64 / 2.0) - 1.0;
        let y_n = 1.0 - cy / (frame_height as f64 / 2.0);

        let region = self.classify_region(x_n, y_n);
        let should_move = self.update_hysteresis(region);

        OfficerDecision {
            found: true,
            should_move,
            movement: Vec2 { x: x_n, y: y_n },
        }
    }
}
