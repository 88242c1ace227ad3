use thiserror::Error;

/// Errors produced by canvas transforms and halftone screening.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("Halftone cell size must be at least 2, got {0}")]
    InvalidHalftoneSize(u32),

    #[error("Invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Halftone screening was cancelled")]
    Cancelled,

    #[error("Halftone worker exited without producing a result")]
    WorkerLost,
}

pub type Result<T> = std::result::Result<T, RasterError>;
