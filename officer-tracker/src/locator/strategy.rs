//! Pluggable box-selection strategies.
//!
//! The source picks a detection box via a class hierarchy
//! (`OfficerLocator` → `Confidence`/`Smart`/`Test` variants). The redesign
//! flag calls for a capability interface instead: implementers of
//! `BoxSelectionStrategy` are interchangeable, no inheritance required.

use crate::locator::color::{hsv_in_range_fraction, HsvBound};
use crate::locator::DetectionBox;

/// A frame's RGB8 pixel buffer, borrowed just long enough for a strategy to
/// sample pixels from candidate boxes.
pub struct FramePixels<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
}

pub trait BoxSelectionStrategy: Send + Sync {
    /// Picks one box (or none) from `candidates`, which have already been
    /// filtered by class id and confidence threshold and clamped to the
    /// frame.
    fn pick_best(&self, candidates: &[DetectionBox], frame: &FramePixels<'_>) -> Option<DetectionBox>;
}

/// Returns the candidate with maximum confidence, with no pixel inspection.
pub struct ConfidenceStrategy;

impl BoxSelectionStrategy for ConfidenceStrategy {
    fn pick_best(&self, candidates: &[DetectionBox], _frame: &FramePixels<'_>) -> Option<DetectionBox> {
        candidates
            .iter()
            .copied()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// Confirms candidates against an HSV color band before falling back to
/// confidence: a box only becomes eligible once its subsampled HSV-in-range
/// pixel fraction reaches `officer_threshold`; among eligible boxes, the
/// maximum-confidence one wins.
pub struct HsvConfirmationStrategy {
    pub min_hsv: HsvBound,
    pub max_hsv: HsvBound,
    pub officer_threshold: f32,
}

impl BoxSelectionStrategy for HsvConfirmationStrategy {
    fn pick_best(&self, candidates: &[DetectionBox], frame: &FramePixels<'_>) -> Option<DetectionBox> {
        candidates
            .iter()
            .copied()
            .filter(|candidate| {
                let fraction = hsv_in_range_fraction(
                    frame.pixels,
                    frame.width,
                    (candidate.top_left, candidate.bottom_right),
                    self.min_hsv,
                    self.max_hsv,
                );
                fraction >= self.officer_threshold
            })
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}
