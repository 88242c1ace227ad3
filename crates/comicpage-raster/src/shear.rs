//! Bijective shears and rotations.
//!
//! A shear moves every column (or row) by a whole number of pixels, so it
//! never resamples. Shifts are measured from the anchor and rounded with
//! `floor` for non-negative shears and `ceil` for negative ones: that makes
//! `shift(-s) == -shift(s)` for every line, so a shear followed by its
//! inverse lands every pixel exactly where it started.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::canvas::{Anchor, RasterCanvas};
use crate::error::{RasterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// Columns slide up or down.
    Vertical,
    /// Rows slide left or right.
    Horizontal,
}

/// Whole-pixel displacement of the line `distance` lines away from the anchor.
fn line_shift(distance: i64, shear: f64) -> i64 {
    let raw = distance as f64 * shear;
    if shear < 0.0 {
        raw.ceil() as i64
    } else {
        raw.floor() as i64
    }
}

/// Brings an angle into [-π, π] without touching angles already inside.
fn normalize_angle(radians: f64) -> f64 {
    if (-PI..=PI).contains(&radians) {
        radians
    } else {
        (radians + PI).rem_euclid(TAU) - PI
    }
}

impl RasterCanvas {
    /// Shifts column `x` down by `shear * (x - anchor.x)` pixels.
    pub fn shear_vertical(&self, shear: f64) -> RasterCanvas {
        self.shear_along(shear, Axis::Vertical)
    }

    /// Shifts row `y` right by `shear * (y - anchor.y)` pixels.
    pub fn shear_horizontal(&self, shear: f64) -> RasterCanvas {
        self.shear_along(shear, Axis::Horizontal)
    }

    fn shear_along(&self, shear: f64, axis: Axis) -> RasterCanvas {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let (ax, ay) = (self.anchor.x as i64, self.anchor.y as i64);
        // `lines` is the axis the lines are indexed by, `span` the one they slide along.
        let (lines, span, line_anchor) = match axis {
            Axis::Vertical => (w, h, ax),
            Axis::Horizontal => (h, w, ay),
        };

        let first = line_shift(-line_anchor, shear);
        let last = line_shift(lines - 1 - line_anchor, shear);
        let offset = first.min(last);
        let grown = span - offset + first.max(last);

        let (out_w, out_h) = match axis {
            Axis::Vertical => (w, grown),
            Axis::Horizontal => (grown, h),
        };
        let mut out = RasterCanvas::blank(out_w as u32, out_h as u32, self.mode());

        for line in 0..lines {
            let shift = line_shift(line - line_anchor, shear) - offset;
            for k in 0..span {
                let (sx, sy, dx, dy) = match axis {
                    Axis::Vertical => (line, k, line, k + shift),
                    Axis::Horizontal => (k, line, k + shift, line),
                };
                out.copy_pixel(self, sx as u32, sy as u32, dx as u32, dy as u32);
            }
        }

        out.anchor = match axis {
            Axis::Vertical => Anchor::new(ax as u32, (ay - offset) as u32),
            Axis::Horizontal => Anchor::new((ax - offset) as u32, ay as u32),
        };
        out
    }

    /// Rotates about the anchor by `radians` without resampling.
    ///
    /// The rotation is three shears (vertical `-tan(a/2)`, horizontal
    /// `sin(a)`, vertical `-tan(a/2)`), so the pixel mapping is a bijection and
    /// `rotate(-a)` undoes `rotate(a)` exactly. Beyond a quarter turn the
    /// tangent blows up, so the angle is split into an exact half turn and a
    /// shear rotation by the remainder. The half turn goes last for positive
    /// angles and first for negative ones, keeping the two directions mirror
    /// images of each other.
    ///
    /// The result is larger than the input; crop it with [`RasterCanvas::reset`].
    pub fn rotate(&self, radians: f64) -> RasterCanvas {
        let angle = normalize_angle(radians);
        if angle > FRAC_PI_2 {
            self.rotate_by_shears(angle - PI).half_turn()
        } else if angle < -FRAC_PI_2 {
            self.half_turn().rotate_by_shears(angle + PI)
        } else {
            self.rotate_by_shears(angle)
        }
    }

    fn rotate_by_shears(&self, angle: f64) -> RasterCanvas {
        // Computed from the magnitude so that opposite angles get exactly opposite shears.
        let sign = angle.signum();
        let alpha = -sign * (angle.abs() / 2.0).tan();
        let beta = sign * angle.abs().sin();
        self.shear_vertical(alpha)
            .shear_horizontal(beta)
            .shear_vertical(alpha)
    }

    /// Point reflection through the anchor.
    fn half_turn(&self) -> RasterCanvas {
        let (w, h) = (self.width(), self.height());
        let mut out = RasterCanvas::blank(w, h, self.mode());
        for y in 0..h {
            for x in 0..w {
                out.copy_pixel(self, x, y, w - 1 - x, h - 1 - y);
            }
        }
        out.anchor = Anchor::new(w - 1 - self.anchor.x, h - 1 - self.anchor.y);
        out
    }

    /// Crops to `width` x `height` so that pixel (0,0) is the current anchor pixel.
    ///
    /// Pixels that fall outside this canvas come out blank. The returned canvas
    /// is anchored at (0,0).
    pub fn reset(&self, width: u32, height: u32) -> Result<RasterCanvas> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        let mut out = RasterCanvas::blank(width, height, self.mode());
        let cols = width.min(self.width() - self.anchor.x);
        let rows = height.min(self.height() - self.anchor.y);
        for y in 0..rows {
            for x in 0..cols {
                out.copy_pixel(self, x + self.anchor.x, y + self.anchor.y, x, y);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ChannelMode;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn gradient(width: u32, height: u32) -> RasterCanvas {
        let data = (0..width * height * 3).map(|i| (i * 7 % 251) as u8).collect();
        RasterCanvas::from_raw(width, height, ChannelMode::Rgb, data).unwrap()
    }

    #[test]
    fn test_line_shift_rounding_is_antisymmetric() {
        assert_eq!(line_shift(3, 0.5), 1);
        assert_eq!(line_shift(3, -0.5), -1);
        assert_eq!(line_shift(-3, 0.5), -2);
        assert_eq!(line_shift(-3, -0.5), 2);
    }

    #[test]
    fn test_shear_vertical_grows_and_tracks_anchor() {
        let canvas = gradient(4, 3);
        let sheared = canvas.shear_vertical(1.0);
        assert_eq!((sheared.width(), sheared.height()), (4, 6));
        assert_eq!(sheared.anchor(), Anchor::new(0, 0));
        // Column 3 moved down by three rows.
        assert_eq!(sheared.pixel(3, 3), canvas.pixel(3, 0));

        let back = sheared.shear_vertical(-1.0);
        assert_eq!(back.anchor(), Anchor::new(0, 3));
    }

    #[test]
    fn test_shear_horizontal_negative_offsets_content() {
        let canvas = gradient(3, 4);
        let sheared = canvas.shear_horizontal(-1.0);
        assert_eq!((sheared.width(), sheared.height()), (6, 4));
        assert_eq!(sheared.anchor(), Anchor::new(3, 0));
        assert_eq!(sheared.pixel(3, 0), canvas.pixel(0, 0));
        assert_eq!(sheared.pixel(0, 3), canvas.pixel(0, 3));
    }

    #[test]
    fn test_reset_fills_missing_pixels_with_blank() {
        let canvas = gradient(2, 2);
        let out = canvas.reset(3, 3).unwrap();
        assert_eq!(out.pixel(1, 1), canvas.pixel(1, 1));
        assert_eq!(out.pixel(2, 2).unwrap().r, 0);
        assert!(canvas.reset(0, 1).is_err());
    }

    #[quickcheck]
    fn prop_shear_roundtrip_is_identity(shear: i16, w: u8, h: u8) -> TestResult {
        if w == 0 || h == 0 || w > 40 || h > 40 {
            return TestResult::discard();
        }
        let s = f64::from(shear) / 1000.0;
        let canvas = gradient(u32::from(w), u32::from(h));
        let restored = canvas
            .shear_vertical(s)
            .shear_vertical(-s)
            .reset(canvas.width(), canvas.height())
            .unwrap();
        let restored_h = canvas
            .shear_horizontal(s)
            .shear_horizontal(-s)
            .reset(canvas.width(), canvas.height())
            .unwrap();
        TestResult::from_bool(
            restored.data() == canvas.data() && restored_h.data() == canvas.data(),
        )
    }

    #[test]
    fn test_rotate_roundtrip_is_identity() {
        let canvas = gradient(13, 9);
        for angle in [0.0, PI / 6.0, PI / 4.0, PI / 2.0, PI, -PI / 3.0, 2.5] {
            let restored = canvas
                .rotate(angle)
                .rotate(-angle)
                .reset(canvas.width(), canvas.height())
                .unwrap();
            assert_eq!(restored.data(), canvas.data(), "angle {angle}");
        }
    }

    #[test]
    fn test_rotate_is_a_bijection() {
        let canvas = RasterCanvas::from_raw(5, 5, ChannelMode::Grey, vec![1; 25]).unwrap();
        let rotated = canvas.rotate(PI / 5.0);
        let lit = rotated.data().iter().filter(|&&v| v == 1).count();
        assert_eq!(lit, 25);
    }

    #[test]
    fn test_half_turn_flips_about_anchor() {
        let canvas = gradient(3, 2);
        let turned = canvas.rotate(PI);
        assert_eq!((turned.width(), turned.height()), (3, 2));
        assert_eq!(turned.anchor(), Anchor::new(2, 1));
        assert_eq!(turned.pixel(2, 1), canvas.pixel(0, 0));
        assert_eq!(turned.pixel(0, 0), canvas.pixel(2, 1));
    }
}
