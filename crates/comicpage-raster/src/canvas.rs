use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::{Channel, ChannelMode, Color};
use crate::error::{RasterError, Result};

/// Buffer coordinate of the pixel that held the original (0,0) sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Anchor {
    pub x: u32,
    pub y: u32,
}

impl Anchor {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A pixel buffer that remembers where its logical origin lives.
///
/// Shears and rotations grow the buffer and push content to non-negative
/// coordinates; the [`Anchor`] follows the original origin pixel through every
/// transform so that [`RasterCanvas::reset`] can crop the padding away again.
/// Transforms return new canvases. Only the additive drawing calls mutate in
/// place, and each of those bumps [`RasterCanvas::version`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterCanvas {
    id: Uuid,
    version: u64,
    width: u32,
    height: u32,
    mode: ChannelMode,
    pub(crate) anchor: Anchor,
    data: Vec<u8>,
}

impl RasterCanvas {
    /// Creates a blank (all zero) canvas anchored at (0,0).
    pub fn new(width: u32, height: u32, mode: ChannelMode) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        Ok(Self::blank(width, height, mode))
    }

    /// Copies externally decoded pixels (row-major, `mode.channels()` bytes per pixel).
    pub fn from_raw(width: u32, height: u32, mode: ChannelMode, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * mode.channels();
        if data.len() != expected {
            return Err(RasterError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            version: 0,
            width,
            height,
            mode,
            anchor: Anchor::default(),
            data,
        })
    }

    /// Copies `other` into a canvas of the requested mode, keeping its anchor.
    pub fn from_canvas(other: &RasterCanvas, mode: ChannelMode) -> Self {
        let mut canvas = Self::blank(other.width, other.height, mode);
        for y in 0..other.height {
            for x in 0..other.width {
                canvas.store(x, y, other.color_at(x, y));
            }
        }
        canvas.anchor = other.anchor;
        canvas
    }

    pub(crate) fn blank(width: u32, height: u32, mode: ChannelMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            width,
            height,
            mode,
            anchor: Anchor::default(),
            data: vec![0; width as usize * height as usize * mode.channels()],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Identity of this canvas; every constructor and transform yields a fresh one.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of in-place drawing calls applied since creation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Raw row-major pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.color_at(x, y))
        } else {
            None
        }
    }

    /// Value of one channel; greyscale canvases report their intensity for every channel.
    pub fn channel_value(&self, x: u32, y: u32, channel: Channel) -> Option<u8> {
        self.pixel(x, y).map(|c| c.channel(channel))
    }

    /// A same-sized greyscale copy, anchor preserved.
    pub fn to_greyscale(&self) -> RasterCanvas {
        Self::from_canvas(self, ChannelMode::Grey)
    }

    // ── Additive drawing ─────────────────────────────────────────────

    /// Adds `color` to the pixel at (x, y), saturating each channel.
    /// Coordinates outside the canvas are ignored.
    pub fn add_dot(&mut self, x: i64, y: i64, color: Color) {
        self.accumulate(x, y, color);
        self.version += 1;
    }

    /// Adds `source` on top of this canvas with its top-left corner at (x, y),
    /// clipped to this canvas.
    pub fn add_image(&mut self, x: i64, y: i64, source: &RasterCanvas) {
        for j in 0..source.height {
            for i in 0..source.width {
                self.accumulate(x + i as i64, y + j as i64, source.color_at(i, j));
            }
        }
        self.version += 1;
    }

    /// Draws a filled disk of radius `r` centred on (cx, cy) with additive compositing.
    pub fn draw_circle(&mut self, cx: i64, cy: i64, r: f64, color: Color) {
        if r <= 0.0 || !r.is_finite() {
            return;
        }
        let reach = r as i64;
        let start_x = (cx - reach).max(0);
        let end_x = (cx + reach + 1).min(self.width as i64 - 1);
        let start_y = (cy - reach).max(0);
        let end_y = (cy + reach + 1).min(self.height as i64 - 1);
        let r_sq = r * r;
        for i in start_x..=end_x {
            for j in start_y..=end_y {
                let dx = (i - cx) as f64;
                let dy = (j - cy) as f64;
                if dx * dx + dy * dy <= r_sq {
                    self.accumulate(i, j, color);
                }
            }
        }
        self.version += 1;
    }

    fn accumulate(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let sum = self.color_at(x, y).saturating_add(color);
        self.store(x, y, sum);
    }

    // ── Raw access used by the transforms ────────────────────────────

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.mode.channels()
    }

    pub(crate) fn color_at(&self, x: u32, y: u32) -> Color {
        let i = self.offset(x, y);
        match self.mode {
            ChannelMode::Grey => Color::grey(self.data[i]),
            ChannelMode::Rgb => Color::new(self.data[i], self.data[i + 1], self.data[i + 2]),
        }
    }

    pub(crate) fn store(&mut self, x: u32, y: u32, color: Color) {
        let i = self.offset(x, y);
        match self.mode {
            ChannelMode::Grey => self.data[i] = color.luma(),
            ChannelMode::Rgb => {
                self.data[i] = color.r;
                self.data[i + 1] = color.g;
                self.data[i + 2] = color.b;
            }
        }
    }

    /// Copies one pixel verbatim from a canvas of the same mode.
    pub(crate) fn copy_pixel(&mut self, src: &RasterCanvas, sx: u32, sy: u32, dx: u32, dy: u32) {
        let n = self.mode.channels();
        let from = src.offset(sx, sy);
        let to = self.offset(dx, dy);
        self.data[to..to + n].copy_from_slice(&src.data[from..from + n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_canvas() {
        assert_eq!(
            RasterCanvas::new(0, 4, ChannelMode::Rgb).unwrap_err(),
            RasterError::InvalidDimensions { width: 0, height: 4 }
        );
    }

    #[test]
    fn test_from_raw_checks_buffer_length() {
        let err = RasterCanvas::from_raw(2, 2, ChannelMode::Rgb, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            RasterError::BufferSizeMismatch { expected: 12, actual: 11 }
        );
    }

    #[test]
    fn test_greyscale_keeps_size_and_anchor() {
        let data = vec![255, 0, 0, 0, 255, 0];
        let mut canvas = RasterCanvas::from_raw(2, 1, ChannelMode::Rgb, data).unwrap();
        canvas.anchor = Anchor::new(1, 0);
        let grey = canvas.to_greyscale();
        assert_eq!(grey.mode(), ChannelMode::Grey);
        assert_eq!((grey.width(), grey.height()), (2, 1));
        assert_eq!(grey.anchor(), Anchor::new(1, 0));
        assert_eq!(grey.pixel(0, 0), Some(Color::grey(76)));
        assert_eq!(grey.pixel(1, 0), Some(Color::grey(150)));
    }

    #[test]
    fn test_add_dot_saturates_and_clips() {
        let mut canvas = RasterCanvas::new(2, 2, ChannelMode::Rgb).unwrap();
        canvas.add_dot(0, 0, Color::new(200, 0, 0));
        canvas.add_dot(0, 0, Color::new(200, 0, 10));
        canvas.add_dot(-1, 5, Color::WHITE);
        assert_eq!(canvas.pixel(0, 0), Some(Color::new(255, 0, 10)));
        assert_eq!(canvas.pixel(1, 1), Some(Color::BLACK));
        assert_eq!(canvas.version(), 3);
    }

    #[test]
    fn test_add_image_is_clipped_to_destination() {
        let mut canvas = RasterCanvas::new(3, 3, ChannelMode::Grey).unwrap();
        let source = RasterCanvas::from_raw(2, 2, ChannelMode::Grey, vec![10, 20, 30, 40]).unwrap();
        canvas.add_image(2, 2, &source);
        assert_eq!(canvas.pixel(2, 2), Some(Color::grey(10)));
        assert_eq!(canvas.pixel(1, 1), Some(Color::grey(0)));
    }

    #[test]
    fn test_draw_circle_membership() {
        let mut canvas = RasterCanvas::new(11, 11, ChannelMode::Grey).unwrap();
        canvas.draw_circle(5, 5, 3.0, Color::grey(128));
        assert_eq!(canvas.pixel(5, 5), Some(Color::grey(128)));
        assert_eq!(canvas.pixel(8, 5), Some(Color::grey(128)));
        assert_eq!(canvas.pixel(8, 8), Some(Color::grey(0)));
        assert_eq!(canvas.pixel(5, 9), Some(Color::grey(0)));
    }

    #[test]
    fn test_draw_circle_zero_radius_draws_nothing() {
        let mut canvas = RasterCanvas::new(3, 3, ChannelMode::Grey).unwrap();
        canvas.draw_circle(1, 1, 0.0, Color::grey(128));
        assert!(canvas.data().iter().all(|&v| v == 0));
    }
}
