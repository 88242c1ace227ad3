use thiserror::Error;

use comicpage_raster::RasterError;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot allocate a {width}x{height} pixmap")]
    InvalidSize { width: u32, height: u32 },

    #[error("Border does not enclose an area")]
    DegenerateBorder,

    #[error("Font error: {0}")]
    Font(String),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
