//! # Comicpage Render
//!
//! Turns the page model into pixels. Each layer is drawn onto its own
//! pixmap: the border interior is filled, the image (with its effect) or the
//! wrapped text is clipped to the border, and the border stroke and grid dots
//! are drawn on top. Pages stack their layers over the page background.
//!
//! Text is measured through [`GlyphSource`]; load a font with
//! [`FontdueGlyphs`] or fall back to the fixed-pitch [`BoxGlyphs`].

pub mod compositor;
pub mod error;
pub mod text;

pub use compositor::LayerCompositor;
pub use error::RenderError;
pub use text::{wrap_to_border, BoxGlyphs, FontdueGlyphs, GlyphBitmap, GlyphSource};
