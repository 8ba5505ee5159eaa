//! Error types for the glyph cache engine.

use thiserror::Error;

/// Errors that can occur while caching and rasterizing glyphs.
///
/// Most failure conditions in this engine are resolved locally and surface
/// to callers as "no glyph" rather than as an error value; see the crate
/// documentation for the recovery protocol. This type names the conditions
/// for logging and for the atlas-full handler callback.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RasterError {
    /// The glyph atlas has no room for a requested rectangle.
    #[error("glyph atlas is full")]
    AtlasFull,

    /// The requested font size is zero, negative, or above the supported ceiling.
    #[error("invalid font size: {size}")]
    InvalidFontSize { size: f32 },

    /// Atlas dimensions must be positive.
    #[error("invalid atlas size: {width}x{height}")]
    InvalidAtlasSize { width: i32, height: i32 },
}

/// Result type for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;
