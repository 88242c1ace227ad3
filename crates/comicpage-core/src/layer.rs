use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use comicpage_raster::{ImageEffect, RasterCanvas, RasterError, MIN_CELL_SIZE};

use crate::border::BorderPolygon;
use crate::error::{BorderError, LayerError};
use crate::geometry::{BBox, Point};

/// A unique layer identifier.
pub type LayerId = Uuid;

pub const DEFAULT_BORDER_WIDTH: f32 = 5.0;
pub const DEFAULT_FONT_SIZE: f32 = 16.0;
pub const DEFAULT_HALFTONE_SIZE: u32 = 8;

/// Gap between the left edge of a border and the first letter of text.
const TEXT_INSET: i32 = 3;

const BACKSPACE: char = '\u{8}';

/// RGBA color used for borders, text and backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl LayerColor {
    pub const BLACK: LayerColor = LayerColor::opaque(0, 0, 0);
    pub const WHITE: LayerColor = LayerColor::opaque(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl Default for LayerColor {
    fn default() -> Self {
        Self::BLACK
    }
}

/// How a layer's border is stroked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub color: LayerColor,
    pub width: f32,
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self {
            color: LayerColor::BLACK,
            width: DEFAULT_BORDER_WIDTH,
        }
    }
}

/// Where a layer's image or text is drawn, independent of the border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRegion {
    pub position: Point,
    pub width: i32,
    pub height: i32,
}

impl ContentRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            position: Point::new(x, y),
            width,
            height,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_origin_size(self.position.x, self.position.y, self.width, self.height)
    }
}

/// Image content: the loaded picture and the effect it is shown with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    image: Option<Arc<RasterCanvas>>,
    effect: ImageEffect,
    halftone_size: u32,
}

impl Default for ImageContent {
    fn default() -> Self {
        Self {
            image: None,
            effect: ImageEffect::None,
            halftone_size: DEFAULT_HALFTONE_SIZE,
        }
    }
}

impl ImageContent {
    pub fn image(&self) -> Option<&Arc<RasterCanvas>> {
        self.image.as_ref()
    }

    pub fn effect(&self) -> ImageEffect {
        self.effect
    }

    pub fn halftone_size(&self) -> u32 {
        self.halftone_size
    }
}

/// Text content typed into a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// `None` until the first key is typed.
    text: Option<String>,
    pub text_paint: LayerColor,
    pub background: LayerColor,
    pub font_size: f32,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            text: None,
            text_paint: LayerColor::BLACK,
            background: LayerColor::WHITE,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl TextContent {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// What a layer shows inside its border.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerContent {
    Image(ImageContent),
    Text(TextContent),
}

/// One polygon-bounded panel on a page.
///
/// A layer covers the whole page; only the area inside its border is drawn.
/// The border and the content region move and scale independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    width: u32,
    height: u32,
    border: BorderPolygon,
    pub border_style: BorderStyle,
    contents: ContentRegion,
    content: LayerContent,
}

impl Layer {
    fn with_content(width: u32, height: u32, content: LayerContent) -> Self {
        let border = BorderPolygon::centered_rect(width, height);
        let (w, h) = (width as i32, height as i32);
        Self {
            id: Uuid::new_v4(),
            width,
            height,
            border,
            border_style: BorderStyle::default(),
            contents: ContentRegion::new(w / 4, h / 4, w / 2, h / 2),
            content,
        }
    }

    /// An empty image layer with the default centred border.
    pub fn new_image(width: u32, height: u32) -> Self {
        Self::with_content(width, height, LayerContent::Image(ImageContent::default()))
    }

    /// An empty text layer with the default centred border.
    pub fn new_text(width: u32, height: u32) -> Self {
        Self::with_content(width, height, LayerContent::Text(TextContent::default()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn border(&self) -> &BorderPolygon {
        &self.border
    }

    pub fn border_mut(&mut self) -> &mut BorderPolygon {
        &mut self.border
    }

    pub fn contents(&self) -> ContentRegion {
        self.contents
    }

    pub fn content(&self) -> &LayerContent {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut LayerContent {
        &mut self.content
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, LayerContent::Text(_))
    }

    // ── Moving and scaling ───────────────────────────────────────────

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.translate_border(dx, dy);
        self.translate_contents(dx, dy);
    }

    /// Scales the border, then the contents about the scaled border's centre.
    pub fn scale(&mut self, factor: f64) -> Result<(), BorderError> {
        self.scale_border(factor)?;
        self.scale_contents(factor)
    }

    pub fn translate_border(&mut self, dx: i32, dy: i32) {
        self.border.translate(dx, dy);
    }

    pub fn scale_border(&mut self, factor: f64) -> Result<(), BorderError> {
        self.border.scale(factor)
    }

    pub fn translate_contents(&mut self, dx: i32, dy: i32) {
        self.contents.position = self.contents.position.translate(dx, dy);
    }

    /// Scales the content region about the border's centre. Text grows its
    /// font by the same factor.
    pub fn scale_contents(&mut self, factor: f64) -> Result<(), BorderError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(BorderError::InvalidScaleFactor(factor));
        }
        let (cx, cy) = self.border.bounds().center();
        let round = |v: f64| (v + 0.5).floor() as i32;
        let pos = self.contents.position;
        self.contents = ContentRegion::new(
            round((f64::from(pos.x) - cx) * factor + cx),
            round((f64::from(pos.y) - cy) * factor + cy),
            round(f64::from(self.contents.width) * factor),
            round(f64::from(self.contents.height) * factor),
        );
        if let LayerContent::Text(text) = &mut self.content {
            text.font_size = (f64::from(text.font_size) * factor) as f32;
        }
        Ok(())
    }

    // ── Image content ────────────────────────────────────────────────

    fn image_content_mut(&mut self) -> Result<&mut ImageContent, LayerError> {
        match &mut self.content {
            LayerContent::Image(image) => Ok(image),
            LayerContent::Text(_) => Err(LayerError::NotAnImageLayer),
        }
    }

    /// Loads a picture, resets the effect, and sizes the content region so the
    /// picture covers the border's bounding box without stretching, centred on it.
    pub fn set_image(&mut self, image: Arc<RasterCanvas>) -> Result<(), LayerError> {
        let rect = self.border.bounds();
        let (iw, ih) = (f64::from(image.width()), f64::from(image.height()));
        let factor = (f64::from(rect.width()) / iw).max(f64::from(rect.height()) / ih);
        let width = (iw * factor) as i32;
        let height = (ih * factor) as i32;
        let x = (f64::from(rect.min.x) + f64::from(rect.width() - width) / 2.0) as i32;
        let y = (f64::from(rect.min.y) + f64::from(rect.height() - height) / 2.0) as i32;

        let content = self.image_content_mut()?;
        log::debug!("Image {}x{} set on layer", image.width(), image.height());
        content.image = Some(image);
        content.effect = ImageEffect::None;
        self.contents = ContentRegion::new(x, y, width, height);
        Ok(())
    }

    /// Chooses how the image is shown. Halftone effects also set the layer's
    /// halftone cell size.
    pub fn set_effect(&mut self, effect: ImageEffect) -> Result<(), LayerError> {
        let content = self.image_content_mut()?;
        match effect {
            ImageEffect::RgbHalftone { cell_size } | ImageEffect::BwHalftone { cell_size } => {
                if cell_size < MIN_CELL_SIZE {
                    return Err(RasterError::InvalidHalftoneSize(cell_size).into());
                }
                content.halftone_size = cell_size;
            }
            ImageEffect::None | ImageEffect::Greyscale => {}
        }
        content.effect = effect;
        Ok(())
    }

    /// Changes the halftone cell size, carrying it into a halftone effect already chosen.
    pub fn set_halftone_size(&mut self, size: u32) -> Result<(), LayerError> {
        if size < MIN_CELL_SIZE {
            return Err(RasterError::InvalidHalftoneSize(size).into());
        }
        let content = self.image_content_mut()?;
        content.halftone_size = size;
        content.effect = content.effect.with_cell_size(size);
        Ok(())
    }

    // ── Text content ─────────────────────────────────────────────────

    /// Applies one typed character: newline or carriage return break the line,
    /// backspace deletes the last character, anything else is appended.
    ///
    /// The first key typed into an empty layer stretches the content region
    /// over the border's bounding box, inset slightly from the left.
    pub fn append_text(&mut self, c: char) -> Result<(), LayerError> {
        let bounds = self.border.bounds();
        let text = match &mut self.content {
            LayerContent::Text(text) => text,
            LayerContent::Image(_) => return Err(LayerError::NotATextLayer),
        };
        if text.text.is_none() {
            self.contents = ContentRegion::new(
                bounds.min.x + TEXT_INSET,
                bounds.min.y,
                bounds.width(),
                bounds.height(),
            );
        }
        let buffer = text.text.get_or_insert_with(String::new);
        match c {
            '\n' | '\r' => buffer.push('\n'),
            BACKSPACE => {
                buffer.pop();
            }
            other => buffer.push(other),
        }
        Ok(())
    }

    /// Replaces the whole text at once.
    pub fn set_text(&mut self, value: &str) -> Result<(), LayerError> {
        match &mut self.content {
            LayerContent::Text(text) => {
                text.text = None;
            }
            LayerContent::Image(_) => return Err(LayerError::NotATextLayer),
        }
        for c in value.chars() {
            self.append_text(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comicpage_raster::ChannelMode;

    fn canvas(width: u32, height: u32) -> Arc<RasterCanvas> {
        Arc::new(RasterCanvas::new(width, height, ChannelMode::Rgb).unwrap())
    }

    #[test]
    fn test_new_layer_defaults() {
        let layer = Layer::new_image(400, 200);
        assert_eq!(layer.contents(), ContentRegion::new(100, 50, 200, 100));
        assert_eq!(
            layer.border().bounds(),
            BBox::new(Point::new(100, 50), Point::new(300, 150))
        );
        assert_eq!(layer.border_style, BorderStyle::default());
        assert!((layer.border_style.width - 5.0).abs() < 1e-6);
        assert!(!layer.is_text());
    }

    #[test]
    fn test_translate_moves_border_and_contents() {
        let mut layer = Layer::new_image(400, 200);
        layer.translate(10, -5);
        assert_eq!(layer.contents().position, Point::new(110, 45));
        assert_eq!(layer.border().bounds().min, Point::new(110, 45));
    }

    #[test]
    fn test_scale_contents_about_border_center() {
        let mut layer = Layer::new_text(400, 200);
        layer.scale_contents(2.0).unwrap();
        assert_eq!(layer.contents(), ContentRegion::new(0, 0, 400, 200));
        match layer.content() {
            LayerContent::Text(text) => assert!((text.font_size - 32.0).abs() < 1e-6),
            LayerContent::Image(_) => panic!("expected text"),
        }
        assert!(layer.scale_contents(-1.0).is_err());
    }

    #[test]
    fn test_set_image_covers_border_and_centres() {
        let mut layer = Layer::new_image(400, 200);
        // Border bounds are 200x100; a square image must grow to 200x200.
        layer.set_image(canvas(50, 50)).unwrap();
        assert_eq!(layer.contents(), ContentRegion::new(100, 0, 200, 200));
    }

    #[test]
    fn test_set_image_resets_effect() {
        let mut layer = Layer::new_image(100, 100);
        layer.set_effect(ImageEffect::Greyscale).unwrap();
        layer.set_image(canvas(10, 10)).unwrap();
        match layer.content() {
            LayerContent::Image(image) => {
                assert_eq!(image.effect(), ImageEffect::None);
                assert!(image.image().is_some());
            }
            LayerContent::Text(_) => panic!("expected image"),
        }
    }

    #[test]
    fn test_effect_and_halftone_size() {
        let mut layer = Layer::new_image(100, 100);
        layer.set_effect(ImageEffect::BwHalftone { cell_size: 6 }).unwrap();
        layer.set_halftone_size(12).unwrap();
        match layer.content() {
            LayerContent::Image(image) => {
                assert_eq!(image.effect(), ImageEffect::BwHalftone { cell_size: 12 });
                assert_eq!(image.halftone_size(), 12);
            }
            LayerContent::Text(_) => panic!("expected image"),
        }
        assert_eq!(
            layer.set_halftone_size(1).unwrap_err(),
            LayerError::Raster(RasterError::InvalidHalftoneSize(1))
        );
        let too_small = ImageEffect::RgbHalftone { cell_size: 0 };
        assert!(layer.set_effect(too_small).is_err());
    }

    #[test]
    fn test_image_ops_rejected_on_text_layer() {
        let mut layer = Layer::new_text(100, 100);
        assert_eq!(
            layer.set_image(canvas(4, 4)).unwrap_err(),
            LayerError::NotAnImageLayer
        );
        let mut image = Layer::new_image(100, 100);
        assert_eq!(
            image.append_text('a').unwrap_err(),
            LayerError::NotATextLayer
        );
    }

    #[test]
    fn test_append_text_editing_keys() {
        let mut layer = Layer::new_text(400, 200);
        for c in ['H', 'i', '\r', 'x', '\u{8}', 'y', '\n'] {
            layer.append_text(c).unwrap();
        }
        match layer.content() {
            LayerContent::Text(text) => assert_eq!(text.text(), Some("Hi\ny\n")),
            LayerContent::Image(_) => panic!("expected text"),
        }
        assert_eq!(layer.contents(), ContentRegion::new(103, 50, 200, 100));
    }

    #[test]
    fn test_backspace_on_empty_text() {
        let mut layer = Layer::new_text(100, 100);
        layer.append_text('\u{8}').unwrap();
        layer.set_text("ok").unwrap();
        match layer.content() {
            LayerContent::Text(text) => assert_eq!(text.text(), Some("ok")),
            LayerContent::Image(_) => panic!("expected text"),
        }
    }
}
