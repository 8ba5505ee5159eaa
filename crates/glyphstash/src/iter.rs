//! Incremental layout: turning a text run into positioned glyph quads.
//!
//! [`TextIter`] walks a run codepoint by codepoint, advancing a pen the
//! same way measurement does (advance, kerning, extra spacing) and
//! yielding one [`GlyphQuad`] per resolved glyph. Backends consume the
//! quads directly; the batch renderer turns them into vertices.

use std::str::Chars;

use crate::context::{RasterContext, TextState};
use crate::face::FaceMetrics;
use crate::font::{FontParams, Glyph};
use crate::registry::FontHandle;

/// One textured rectangle: device-space corners plus normalized atlas
/// texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub s0: f32,
    pub t0: f32,
    pub s1: f32,
    pub t1: f32,
}

/// A resolved glyph together with its placed quad.
#[derive(Debug, Clone, Copy)]
pub struct GlyphQuad {
    pub glyph: Glyph,
    pub quad: Quad,
}

/// Iterator over the positioned glyphs of one text run.
///
/// The iterator fuses on the first glyph the context cannot supply
/// (invalid size, unrecovered full atlas): the rest of the run is
/// skipped rather than drawn with holes in unpredictable places.
pub struct TextIter<'a, 't> {
    ctx: &'a mut RasterContext,
    font: FontHandle,
    chars: Chars<'t>,
    state: TextState,
    metrics: FaceMetrics,
    x: f32,
    y: f32,
    prev: Option<char>,
    need_bitmap: bool,
    done: bool,
}

impl<'a, 't> TextIter<'a, 't> {
    /// Current pen position.
    #[inline]
    pub fn pen(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Iterator for TextIter<'_, '_> {
    type Item = GlyphQuad;

    fn next(&mut self) -> Option<GlyphQuad> {
        if self.done {
            return None;
        }
        let codepoint = self.chars.next()?;
        let params = FontParams {
            context: self.ctx.id(),
            codepoint,
            size: self.state.size,
            blur: self.state.blur,
        };

        if let Some(prev) = self.prev {
            self.x += self.font.borrow().kerning(self.state.size, prev, codepoint);
            self.x += self.state.spacing;
        }
        self.prev = Some(codepoint);

        let Some(glyph) = self.ctx.glyph(&self.font, params, self.need_bitmap) else {
            self.done = true;
            return None;
        };

        let metrics = glyph.metrics;
        let y_offset = self.metrics.ascender - metrics.bitmap_top as f32;
        let x0 = self.x + metrics.bitmap_left as f32;
        let y0 = self.y + y_offset;

        let (atlas_w, atlas_h) = self.ctx.atlas_size();
        let (gx, gy) = glyph.position.unwrap_or((-1, -1));
        let quad = Quad {
            x0,
            y0,
            x1: x0 + metrics.width as f32,
            y1: y0 + metrics.height as f32,
            s0: gx as f32 / atlas_w as f32,
            t0: gy as f32 / atlas_h as f32,
            s1: (gx + metrics.width) as f32 / atlas_w as f32,
            t1: (gy + metrics.height) as f32 / atlas_h as f32,
        };

        self.x += metrics.advance_x;
        Some(GlyphQuad { glyph, quad })
    }
}

impl std::fmt::Debug for TextIter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextIter")
            .field("pen", &(self.x, self.y))
            .field("prev", &self.prev)
            .field("need_bitmap", &self.need_bitmap)
            .finish_non_exhaustive()
    }
}

impl RasterContext {
    /// Lay out a text run anchored at `(x, y)` under the current state.
    ///
    /// The run is measured first and the anchor translated per the current
    /// alignment, so the yielded quads land exactly where
    /// [`RasterContext::text_bounds`] predicts. With `need_bitmap`, every
    /// yielded glyph is rasterized into the atlas as a side effect.
    ///
    /// Returns `None` when no font is selected.
    pub fn glyph_quads<'a, 't>(
        &'a mut self,
        x: f32,
        y: f32,
        text: &'t str,
        need_bitmap: bool,
    ) -> Option<TextIter<'a, 't>> {
        let font = self.current_font()?;
        let state = *self.state();
        let metrics = font.borrow().metrics_of(state.size);
        let size = self.measure_text(text);
        let (dx, dy) = state.align.offset_for(size, metrics);
        Some(TextIter {
            ctx: self,
            font,
            chars: text.chars(),
            state,
            metrics,
            x: x + dx,
            y: y + dy,
            prev: None,
            need_bitmap,
            done: false,
        })
    }
}
