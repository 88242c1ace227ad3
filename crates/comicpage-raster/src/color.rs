use serde::{Deserialize, Serialize};

/// Maximum intensity of a single channel.
pub const MAX_INTENSITY: u8 = u8::MAX;

/// Storage layout of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelMode {
    /// Single intensity channel.
    Grey,
    /// Red, green and blue channels.
    Rgb,
}

impl ChannelMode {
    /// Bytes stored per pixel.
    pub fn channels(&self) -> usize {
        match self {
            ChannelMode::Grey => 1,
            ChannelMode::Rgb => 3,
        }
    }
}

/// One colour channel of an RGB pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

/// An opaque RGB colour. Greyscale pixels read back with all three channels equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: MAX_INTENSITY,
        g: MAX_INTENSITY,
        b: MAX_INTENSITY,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn grey(value: u8) -> Self {
        Self {
            r: value,
            g: value,
            b: value,
        }
    }

    /// Luminance projection used for greyscale conversion.
    pub fn luma(&self) -> u8 {
        let y = 0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b);
        y.round().clamp(0.0, f64::from(MAX_INTENSITY)) as u8
    }

    pub fn channel(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.r,
            Channel::Green => self.g,
            Channel::Blue => self.b,
        }
    }

    /// Per-channel sum, clamped to [`MAX_INTENSITY`].
    pub fn saturating_add(&self, other: Color) -> Color {
        Color {
            r: self.r.saturating_add(other.r),
            g: self.g.saturating_add(other.g),
            b: self.b.saturating_add(other.b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_of_primaries() {
        assert_eq!(Color::WHITE.luma(), 255);
        assert_eq!(Color::BLACK.luma(), 0);
        assert_eq!(Color::new(255, 0, 0).luma(), 76);
        assert_eq!(Color::grey(128).luma(), 128);
    }

    #[test]
    fn test_saturating_add_clamps() {
        let sum = Color::new(200, 10, 128).saturating_add(Color::new(100, 10, 128));
        assert_eq!(sum, Color::new(255, 20, 255));
    }
}
