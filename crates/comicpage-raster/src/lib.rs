//! # Comicpage Raster
//!
//! Pixel canvases that track their origin through transforms, bijective
//! rotation built from three shears, and multi-channel halftone screening.
//!
//! Every transform returns a new canvas, so canvases can be shared freely
//! between threads once built. Screening, the one expensive operation, can run
//! on a worker through [`HalftoneTask`], and derived images are memoized by
//! [`EffectCache`].

pub mod cache;
pub mod canvas;
pub mod color;
pub mod error;
pub mod halftone;
pub mod shear;
pub mod task;

pub use cache::{EffectCache, ImageEffect};
pub use canvas::{Anchor, RasterCanvas};
pub use color::{Channel, ChannelMode, Color, MAX_INTENSITY};
pub use error::RasterError;
pub use halftone::{dot_radius, CancelFlag, HalftoneEngine, ScreenAngles, MIN_CELL_SIZE};
pub use task::HalftoneTask;
