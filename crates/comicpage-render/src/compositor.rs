use std::sync::Arc;
use std::time::Instant;

use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Mask, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, Rect, Stroke, Transform,
};
use uuid::Uuid;

use comicpage_core::settings::RenderSettings;
use comicpage_core::{
    BorderPolygon, BorderStyle, ContentRegion, Layer, LayerColor, LayerContent, Page, Settings,
    TextContent,
};
use comicpage_raster::{
    ChannelMode, EffectCache, HalftoneEngine, HalftoneTask, ImageEffect, RasterCanvas,
    ScreenAngles,
};

use crate::error::{RenderError, Result};
use crate::text::{glyph_width, line_height, wrap_to_border, BoxGlyphs, GlyphBitmap, GlyphSource};

/// Draws layers and pages into pixel buffers.
///
/// Holds the effect cache, so re-rendering a page whose images have not
/// changed does not repeat greyscale or halftone work.
pub struct LayerCompositor {
    settings: RenderSettings,
    angles: ScreenAngles,
    cache: EffectCache,
    glyphs: Box<dyn GlyphSource>,
}

impl LayerCompositor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.render.clone(),
            angles: settings.halftone.angles,
            cache: EffectCache::with_angles(settings.halftone.angles),
            glyphs: Box::new(BoxGlyphs),
        }
    }

    /// Replaces the box glyphs used for text layers, typically with a loaded font.
    pub fn with_glyphs(mut self, glyphs: impl GlyphSource + 'static) -> Self {
        self.glyphs = Box::new(glyphs);
        self
    }

    pub fn cache(&self) -> &EffectCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut EffectCache {
        &mut self.cache
    }

    // ── Layers ───────────────────────────────────────────────────────

    /// Renders one layer onto a transparent layer-sized pixmap: the filled
    /// border interior, the clipped image or text, the border stroke, and
    /// grid dots when the border has a grid.
    pub fn render_layer(&mut self, layer: &Layer) -> Result<Pixmap> {
        let (width, height) = (layer.width(), layer.height());
        let mut pixmap = new_pixmap(width, height)?;
        let path = border_path(layer.border()).ok_or(RenderError::DegenerateBorder)?;
        let mut clip = Mask::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;
        clip.fill_path(&path, FillRule::EvenOdd, false, Transform::identity());

        match layer.content() {
            LayerContent::Image(image) => {
                fill_interior(&mut pixmap, &path, self.settings.image_background);
                if let Some(source) = image.image() {
                    let shown = self.cache.get_or_apply(source, image.effect())?;
                    draw_image(&mut pixmap, &shown, layer.contents(), &clip)?;
                }
            }
            LayerContent::Text(text) => {
                fill_interior(&mut pixmap, &path, text.background);
                if let Some(value) = text.text() {
                    self.draw_text(&mut pixmap, layer, text, value, &clip)?;
                }
            }
        }

        draw_border(&mut pixmap, &path, &layer.border_style);
        if let Some(spacing) = layer.border().grid() {
            draw_grid(&mut pixmap, spacing, self.settings.grid_dot_alpha);
        }
        Ok(pixmap)
    }

    fn draw_text(
        &self,
        pixmap: &mut Pixmap,
        layer: &Layer,
        text: &TextContent,
        value: &str,
        clip: &Mask,
    ) -> Result<()> {
        let (width, height) = (layer.width(), layer.height());
        let origin = layer.contents().position;
        let size = text.font_size;
        let glyphs = self.glyphs.as_ref();
        let wrapped = wrap_to_border(value, layer.border(), origin, glyphs, size);
        let advance = line_height(glyphs, size);

        let mut ink = new_pixmap(width, height)?;
        for (n, line) in wrapped.split('\n').enumerate() {
            let baseline = origin.y + (n as i32 + 1) * advance;
            let mut pen = origin.x;
            for c in line.chars() {
                let glyph = glyphs.rasterize(c, size);
                let top = baseline - glyph.ymin - glyph.height as i32;
                stamp_glyph(&mut ink, &glyph, pen + glyph.xmin, top, text.text_paint);
                pen += glyph_width(glyphs, c, size);
            }
        }
        let paint = PixmapPaint::default();
        let identity = Transform::identity();
        pixmap.draw_pixmap(0, 0, ink.as_ref(), &paint, identity, Some(clip));
        Ok(())
    }

    // ── Pages ────────────────────────────────────────────────────────

    /// Flattens a page: background first, then each layer from the bottom
    /// of the stack up. The result is an opaque RGB canvas.
    ///
    /// Cached effects of images no longer on the page are dropped.
    pub fn render_page(&mut self, page: &Page) -> Result<RasterCanvas> {
        let started = Instant::now();
        let (width, height) = (page.width(), page.height());
        let mut pixmap = new_pixmap(width, height)?;
        pixmap.fill(skia_color(page.background));
        self.cache.retain_sources(&image_ids(page));

        let paint = PixmapPaint::default();
        for layer in page.layers() {
            let rendered = self.render_layer(layer)?;
            pixmap.draw_pixmap(0, 0, rendered.as_ref(), &paint, Transform::identity(), None);
        }

        let canvas = pixmap_to_canvas(&pixmap)?;
        log::info!(
            "Rendered {}x{} page with {} layers in {:.1?}",
            width,
            height,
            page.layer_count(),
            started.elapsed()
        );
        Ok(canvas)
    }

    // ── Background effects ───────────────────────────────────────────

    /// Starts screening the layer's image on a worker thread when its
    /// halftone effect is not cached yet. Returns `None` for layers that
    /// need no background work.
    ///
    /// Hand the finished canvas to [`store_effect`](Self::store_effect) so
    /// the next render picks it up.
    pub fn spawn_effect(&mut self, layer: &Layer) -> Result<Option<HalftoneTask>> {
        let LayerContent::Image(content) = layer.content() else {
            return Ok(None);
        };
        let Some(source) = content.image() else {
            return Ok(None);
        };
        let effect = content.effect();
        if self.cache.get(source, effect).is_some() {
            return Ok(None);
        }
        let (cell_size, input) = match effect {
            ImageEffect::RgbHalftone { cell_size } => (cell_size, Arc::clone(source)),
            ImageEffect::BwHalftone { cell_size } => {
                let grey = self.cache.get_or_apply(source, ImageEffect::Greyscale)?;
                (cell_size, grey)
            }
            ImageEffect::None | ImageEffect::Greyscale => return Ok(None),
        };
        let engine = HalftoneEngine::new(cell_size)?.with_angles(self.angles);
        log::debug!("Spawning {:?} for {}", effect, source.id());
        Ok(Some(HalftoneTask::spawn(engine, input)))
    }

    pub fn store_effect(
        &mut self,
        source: &RasterCanvas,
        effect: ImageEffect,
        derived: RasterCanvas,
    ) -> Arc<RasterCanvas> {
        self.cache.store(source, effect, derived)
    }
}

// ── Drawing helpers ──────────────────────────────────────────────────

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })
}

/// Ids of the images shown by the page's layers.
fn image_ids(page: &Page) -> Vec<Uuid> {
    page.layers()
        .iter()
        .filter_map(|layer| match layer.content() {
            LayerContent::Image(content) => content.image().map(|image| image.id()),
            LayerContent::Text(_) => None,
        })
        .collect()
}

fn skia_color(color: LayerColor) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn solid_paint(color: LayerColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = false;
    paint
}

/// `None` when the border has no area.
fn border_path(border: &BorderPolygon) -> Option<Path> {
    let bounds = border.bounds();
    if bounds.width() <= 0 || bounds.height() <= 0 {
        return None;
    }
    let (first, rest) = border.vertices().split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(first.x as f32, first.y as f32);
    for p in rest {
        builder.line_to(p.x as f32, p.y as f32);
    }
    builder.close();
    builder.finish()
}

fn fill_interior(pixmap: &mut Pixmap, path: &Path, color: LayerColor) {
    let paint = solid_paint(color);
    pixmap.fill_path(path, &paint, FillRule::EvenOdd, Transform::identity(), None);
}

/// Scales `image` onto the content region, clipped to the border.
fn draw_image(
    pixmap: &mut Pixmap,
    image: &RasterCanvas,
    region: ContentRegion,
    clip: &Mask,
) -> Result<()> {
    if region.width <= 0 || region.height <= 0 {
        return Ok(());
    }
    let source = canvas_to_pixmap(image)?;
    let sx = region.width as f32 / image.width() as f32;
    let sy = region.height as f32 / image.height() as f32;
    let (tx, ty) = (region.position.x as f32, region.position.y as f32);
    let transform = Transform::from_row(sx, 0.0, 0.0, sy, tx, ty);
    let paint = PixmapPaint {
        quality: FilterQuality::Nearest,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, Some(clip));
    Ok(())
}

/// Concentric strokes, widest and faintest first, so the line darkens toward
/// the border path.
fn draw_border(pixmap: &mut Pixmap, path: &Path, style: &BorderStyle) {
    let steps = (style.width * 2.0).ceil().max(0.0) as u32;
    if steps == 0 {
        return;
    }
    let alpha_step = u32::from(style.color.a) / steps;
    for s in 0..steps {
        let alpha = ((s + 1) * alpha_step).min(255) as u8;
        let paint = solid_paint(style.color.with_alpha(alpha));
        let stroke = Stroke {
            width: style.width - 0.5 * s as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Miter,
            ..Stroke::default()
        };
        pixmap.stroke_path(path, &paint, &stroke, Transform::identity(), None);
    }
}

/// A faint 3x3 square with a solid centre pixel at every grid intersection.
fn draw_grid(pixmap: &mut Pixmap, spacing: u32, faint_alpha: u8) {
    let step = spacing.max(1) as usize;
    let faint = solid_paint(LayerColor::BLACK.with_alpha(faint_alpha));
    let solid = solid_paint(LayerColor::BLACK);
    let start = step / 2;
    for x in (start..pixmap.width() as usize).step_by(step) {
        for y in (start..pixmap.height() as usize).step_by(step) {
            let (fx, fy) = (x as f32, y as f32);
            if let Some(rect) = Rect::from_xywh(fx - 1.0, fy - 1.0, 3.0, 3.0) {
                pixmap.fill_rect(rect, &faint, Transform::identity(), None);
            }
            if let Some(rect) = Rect::from_xywh(fx, fy, 1.0, 1.0) {
                pixmap.fill_rect(rect, &solid, Transform::identity(), None);
            }
        }
    }
}

/// Writes glyph coverage into `ink` in `color`, keeping the stronger
/// coverage where glyphs overlap.
fn stamp_glyph(ink: &mut Pixmap, glyph: &GlyphBitmap, left: i32, top: i32, color: LayerColor) {
    let (width, height) = (ink.width() as i32, ink.height() as i32);
    let pixels = ink.pixels_mut();
    for gy in 0..glyph.height {
        let y = top + gy as i32;
        if y < 0 || y >= height {
            continue;
        }
        for gx in 0..glyph.width {
            let x = left + gx as i32;
            if x < 0 || x >= width {
                continue;
            }
            let coverage = u32::from(glyph.coverage[gy * glyph.width + gx]);
            if coverage == 0 {
                continue;
            }
            let alpha = (coverage * u32::from(color.a) / 255) as u8;
            let pixel = &mut pixels[(y * width + x) as usize];
            if alpha > pixel.alpha() {
                *pixel = ColorU8::from_rgba(color.r, color.g, color.b, alpha).premultiply();
            }
        }
    }
}

fn canvas_to_pixmap(canvas: &RasterCanvas) -> Result<Pixmap> {
    let (width, height) = (canvas.width(), canvas.height());
    let mut pixmap = new_pixmap(width, height)?;
    let w = width as usize;
    for (i, pixel) in pixmap.pixels_mut().iter_mut().enumerate() {
        let (x, y) = ((i % w) as u32, (i / w) as u32);
        if let Some(c) = canvas.pixel(x, y) {
            *pixel = ColorU8::from_rgba(c.r, c.g, c.b, 255).premultiply();
        }
    }
    Ok(pixmap)
}

fn pixmap_to_canvas(pixmap: &Pixmap) -> Result<RasterCanvas> {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 3);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue()]);
    }
    let (width, height) = (pixmap.width(), pixmap.height());
    Ok(RasterCanvas::from_raw(width, height, ChannelMode::Rgb, data)?)
}
