//! The font face abstraction the engine rasterizes through.
//!
//! A [`Face`] wraps one loaded font face (FreeType, stb_truetype, or any
//! other backend) and answers the four questions the cache needs: which
//! glyph index a codepoint maps to, the face-wide metrics at a size, the
//! per-glyph metrics at a size, and the rasterized coverage for a glyph.
//! Face loading and file parsing are deliberately outside this crate.

use std::rc::Rc;

/// Face-wide vertical metrics, already scaled to a requested size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceMetrics {
    /// Distance from the baseline to the top of the tallest glyph.
    pub ascender: f32,
    /// Distance from the baseline to the bottom of the lowest glyph
    /// (typically negative).
    pub descender: f32,
    /// Recommended line height.
    pub height: f32,
    /// Widest advance of any glyph in the face.
    pub max_advance: f32,
}

/// Per-glyph metrics in pixels, already scaled to a requested size.
///
/// Immutable once computed for a given codepoint, size and face.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    /// Width of the glyph bitmap.
    pub width: i32,
    /// Height of the glyph bitmap.
    pub height: i32,
    /// Horizontal offset from the pen position to the bitmap's left edge.
    pub bitmap_left: i32,
    /// Vertical offset from the baseline up to the bitmap's top edge.
    pub bitmap_top: i32,
    /// Horizontal pen advance after this glyph.
    pub advance_x: f32,
}

/// A rasterization backend for one font face.
///
/// Glyph index `0` is the face's "missing glyph" (notdef) by convention;
/// [`Face::glyph_index`] returning `0` therefore means the face does not
/// cover the codepoint, and is what drives fallback-chain resolution.
pub trait Face {
    /// Map a codepoint to this face's glyph index. `0` means missing.
    fn glyph_index(&self, codepoint: char) -> u32;

    /// Face-wide metrics scaled to `size`.
    fn metrics(&self, size: f32) -> FaceMetrics;

    /// Compute metrics for one glyph scaled to `size`.
    fn build_glyph(&self, index: u32, size: f32) -> GlyphMetrics;

    /// Rasterize a glyph into a caller-owned bitmap.
    ///
    /// `buffer` is a row-major bitmap of 1 byte per pixel with `pitch`
    /// pixels per row; the glyph's top-left lands at `(pen_x, pen_y)`.
    /// The destination rectangle is guaranteed to lie inside the buffer.
    fn render_glyph(
        &self,
        index: u32,
        size: f32,
        buffer: &mut [u8],
        pitch: usize,
        pen_x: i32,
        pen_y: i32,
    );

    /// Kerning adjustment between two glyph indices at `size`.
    ///
    /// Backends without kerning data can rely on the default.
    fn kerning(&self, _size: f32, _left: u32, _right: u32) -> f32 {
        0.0
    }
}

/// Shared handle to a face. Faces are reference counted because several
/// fonts (a font and the fallbacks that resolved to it) may rasterize
/// through the same face within one single-threaded engine.
pub type FaceHandle = Rc<dyn Face>;
