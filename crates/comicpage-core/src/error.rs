use thiserror::Error;

use comicpage_raster::RasterError;

/// Rejected border edits. The polygon is left untouched whenever one is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BorderError {
    #[error("Point ({x}, {y}) lies outside the bounds [0, {max_x}] x [0, {max_y}]")]
    OutOfBounds { x: i32, y: i32, max_x: i32, max_y: i32 },

    #[error("Point ({x}, {y}) is not on the grid of spacing {grid}")]
    OffGrid { x: i32, y: i32, grid: u32 },

    #[error("Grid spacing {0} is below 2 or leaves no grid line inside the bounds")]
    InvalidGridSpacing(u32),

    #[error("A border needs at least 3 vertices, would have {0}")]
    TooFewVertices(usize),

    #[error("Vertex index {index} out of range for {len} vertices")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Scale factor must be finite and positive, got {0}")]
    InvalidScaleFactor(f64),
}

/// Errors from operations on a single layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("Border error: {0}")]
    Border(#[from] BorderError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Layer holds text, not an image")]
    NotAnImageLayer,

    #[error("Layer holds an image, not text")]
    NotATextLayer,
}

/// Errors from page and book operations.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Layer index {index} out of range for {len} layers")]
    LayerIndexOutOfRange { index: usize, len: usize },

    #[error("Page index {index} out of range for {len} pages")]
    PageIndexOutOfRange { index: usize, len: usize },
}

/// Invalid configuration values.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting {name}: {message}")]
    Invalid { name: &'static str, message: String },
}
