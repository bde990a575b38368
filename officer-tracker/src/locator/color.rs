//! RGB8 → HSV conversion and subsampled in-range fraction, used by
//! `HSVConfirmationStrategy`.

use serde::Deserialize;

/// Inclusive HSV bound, hue in `[0, 360)`, saturation/value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HsvBound {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    fn in_range(self, min: HsvBound, max: HsvBound) -> bool {
        self.h >= min.h && self.h <= max.h && self.s >= min.s && self.s <= max.s
            && self.v >= min.v && self.v <= max.v
    }
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };

    let s = if max == 0.0 { 0.0 } else { delta / max };
    let v = max;

    Hsv { h, s, v }
}

/// Fraction of pixels in `rect` (a pixel-coordinate, top-left/bottom-right
/// rectangle into `pixels`, row-major RGB8 of the given `width`) whose HSV
/// value lies within `[min, max]`, sampled on a stride-10 grid in each
/// axis (1-in-100 pixels).
pub fn hsv_in_range_fraction(
    pixels: &[u8],
    width: u32,
    rect: ((u32, u32), (u32, u32)),
    min: HsvBound,
    max: HsvBound,
) -> f32 {
    const STRIDE: u32 = 10;

    let ((x0, y0), (x1, y1)) = rect;
    let mut sampled = 0u32;
    let mut matching = 0u32;

    let mut y = y0;
    while y <= y1 {
        let mut x = x0;
        while x <= x1 {
            let offset = (y as usize * width as usize + x as usize) * 3;
            if offset + 2 < pixels.len() {
                let hsv = rgb_to_hsv(pixels[offset], pixels[offset + 1], pixels[offset + 2]);
                sampled += 1;
                if hsv.in_range(min, max) {
                    matching += 1;
                }
            }
            x += STRIDE;
        }
        y += STRIDE;
    }

    if sampled == 0 {
        0.0
    } else {
        matching as f32 / sampled as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_red_has_zero_hue() {
        let hsv = rgb_to_hsv(255, 0, 0);
        assert!((hsv.h - 0.0).abs() < 1e-3);
        assert!((hsv.s - 1.0).abs() < 1e-3);
        assert!((hsv.v - 1.0).abs() < 1e-3);
    }

    #[test]
    fn gray_has_zero_saturation() {
        let hsv = rgb_to_hsv(128, 128, 128);
        assert_eq!(hsv.s, 0.0);
    }

    #[test]
    fn in_range_fraction_counts_uniform_patch_as_1() {
        let width = 20u32;
        let height = 20u32;
        let mut pixels = vec![0u8; (width * height * 3) as usize];
        for px in pixels.chunks_mut(3) {
            px[0] = 0;
            px[1] = 255;
            px[2] = 0;
        }
        let green = rgb_to_hsv(0, 255, 0);
        let bound = HsvBound {
            h: green.h,
            s: green.s,
            v: green.v,
        };
        let fraction = hsv_in_range_fraction(
            &pixels,
            width,
            ((0, 0), (width - 1, height - 1)),
            bound,
            bound,
        );
        assert_eq!(fraction, 1.0);
    }

    #[test]
    fn in_range_fraction_is_zero_when_bounds_dont_match() {
        let width = 20u32;
        let height = 20u32;
        let pixels = vec![0u8; (width * height * 3) as usize]; // all black
        let bound = HsvBound { h: 120.0, s: 1.0, v: 1.0 };
        let fraction = hsv_in_range_fraction(
            &pixels,
            width,
            ((0, 0), (width - 1, height - 1)),
            bound,
            bound,
        );
        assert_eq!(fraction, 0.0);
    }
}
