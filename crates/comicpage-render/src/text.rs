//! Glyph measurement and word wrapping inside a border polygon.

use fontdue::{Font, FontSettings};

use comicpage_core::{BBox, BorderPolygon, Point};

use crate::error::{RenderError, Result};

/// Coverage bitmap of one glyph, positioned relative to the pen on the baseline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    /// Offset from the pen to the bitmap's left edge.
    pub xmin: i32,
    /// Offset from the baseline up to the bitmap's bottom edge.
    pub ymin: i32,
    /// Row-major coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
}

/// Something that can measure and draw characters at a pixel size.
pub trait GlyphSource: Send + Sync {
    /// Horizontal pen advance in pixels.
    fn advance(&self, c: char, size: f32) -> f32;

    /// Distance between consecutive baselines.
    fn line_height(&self, size: f32) -> f32;

    fn rasterize(&self, c: char, size: f32) -> GlyphBitmap;
}

/// Glyphs from a TrueType or OpenType font.
pub struct FontdueGlyphs {
    font: Font,
}

impl FontdueGlyphs {
    /// Parses font file bytes supplied by the caller.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { font })
    }
}

impl GlyphSource for FontdueGlyphs {
    fn advance(&self, c: char, size: f32) -> f32 {
        self.font.metrics(c, size).advance_width
    }

    fn line_height(&self, size: f32) -> f32 {
        self.font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2)
    }

    fn rasterize(&self, c: char, size: f32) -> GlyphBitmap {
        let (metrics, coverage) = self.font.rasterize(c, size);
        GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            coverage,
        }
    }
}

/// Fixed-pitch stand-in used when no font is loaded: every visible character
/// is drawn as a hollow box.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxGlyphs;

impl GlyphSource for BoxGlyphs {
    fn advance(&self, _c: char, size: f32) -> f32 {
        (size * 0.6).ceil()
    }

    fn line_height(&self, size: f32) -> f32 {
        (size * 1.2).ceil()
    }

    fn rasterize(&self, c: char, size: f32) -> GlyphBitmap {
        if c.is_whitespace() || c.is_control() {
            return GlyphBitmap::default();
        }
        let width = (self.advance(c, size) as usize).saturating_sub(2).max(1);
        let height = ((size * 0.7).round() as usize).max(1);
        let mut coverage = vec![0; width * height];
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    coverage[y * width + x] = 255;
                }
            }
        }
        GlyphBitmap {
            width,
            height,
            xmin: 1,
            ymin: 0,
            coverage,
        }
    }
}

/// Whole-pixel advance used both for wrapping and for drawing.
pub(crate) fn glyph_width(glyphs: &dyn GlyphSource, c: char, size: f32) -> i32 {
    glyphs.advance(c, size).round().max(1.0) as i32
}

pub(crate) fn line_height(glyphs: &dyn GlyphSource, size: f32) -> i32 {
    glyphs.line_height(size).round().max(1.0) as i32
}

/// Lays `text` out from `origin` so that no glyph box crosses the border.
///
/// A character whose box would stick out is held back and a padding space is
/// emitted in its place, pushing the pen right until the character fits or
/// the line ends. Lines break after the pen passes the right edge of the
/// border's bounding box (measured from `origin`), and layout stops once it
/// passes the bottom. Returns the text with the inserted spaces and breaks.
pub fn wrap_to_border(
    text: &str,
    border: &BorderPolygon,
    origin: Point,
    glyphs: &dyn GlyphSource,
    size: f32,
) -> String {
    let bounds = border.bounds();
    let right = origin.x + bounds.width();
    let bottom = origin.y + bounds.height();
    let height = line_height(glyphs, size);
    let pad = glyph_width(glyphs, ' ', size);

    let chars: Vec<char> = text.chars().collect();
    let mut wrapped = String::with_capacity(text.len());
    let (mut x, mut y) = (origin.x, origin.y);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            wrapped.push('\n');
            x = origin.x;
            y += height;
            i += 1;
            continue;
        }

        let width = glyph_width(glyphs, c, size);
        if border.contains_rect(BBox::from_origin_size(x, y, width, height)) {
            wrapped.push(c);
            x += width;
            i += 1;
        } else {
            wrapped.push(' ');
            x += pad;
        }

        if x > right {
            wrapped.push('\n');
            x = origin.x;
            y += height;
        }
        if y > bottom {
            break;
        }
    }
    wrapped
}
