//! Batched text drawing over a pluggable GPU backend.
//!
//! [`TextBatchRenderer`] pairs a [`RasterContext`] with a [`TextBackend`]
//! and accumulates one vertex per drawn glyph until [`flush`] submits
//! them. It installs the default atlas-full recovery: flush whatever is
//! batched (its texture coordinates reference the current atlas layout),
//! double the atlas in place, and tell the backend to resize its texture.
//!
//! [`flush`]: TextBatchRenderer::flush

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::context::{RasterContext, TextState};
use crate::error::RasterResult;
use crate::face::FaceMetrics;
use crate::iter::GlyphQuad;
use crate::registry::{FontId, RegistryHandle};
use crate::types::{Align, Bounds, Color, DirtyRect, Size};

/// Rendering callbacks the batch renderer drives.
///
/// The backend owns the atlas texture. `upload` pushes changed atlas
/// pixels into it, `draw` submits batched glyph vertices against it, and
/// `resize` reallocates it after the atlas grew or was reset (content is
/// re-uploaded through subsequent `upload` calls).
pub trait TextBackend {
    /// Reallocate the atlas texture to new dimensions.
    fn resize(&mut self, width: i32, height: i32);

    /// Upload the given region of the atlas bitmap into the texture.
    ///
    /// `bitmap` is the full atlas, row-major, `width` pixels per row.
    fn upload(&mut self, rect: DirtyRect, bitmap: &[u8], width: i32, height: i32);

    /// Draw a batch of glyph vertices.
    ///
    /// Backends may stage the vertices rather than submit them; `flush`
    /// follows every `draw` within the same batch flush.
    fn draw(&mut self, vertices: &[Vertex]);

    /// Force submission of everything staged since the last flush.
    fn flush(&mut self);
}

/// One glyph instance: its atlas rectangle in pixels and its destination
/// rectangle in device space.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub glyph_x: i32,
    pub glyph_y: i32,
    pub glyph_w: i32,
    pub glyph_h: i32,
    pub screen_x: f32,
    pub screen_y: f32,
    pub screen_w: f32,
    pub screen_h: f32,
    pub color: Color,
}

impl Vertex {
    fn from_quad(gq: &GlyphQuad, color: Color) -> Self {
        let (glyph_x, glyph_y) = gq.glyph.position.unwrap_or((0, 0));
        Self {
            glyph_x,
            glyph_y,
            glyph_w: gq.glyph.metrics.width,
            glyph_h: gq.glyph.metrics.height,
            screen_x: gq.quad.x0,
            screen_y: gq.quad.y0,
            screen_w: gq.quad.x1 - gq.quad.x0,
            screen_h: gq.quad.y1 - gq.quad.y0,
            color,
        }
    }
}

/// Pending vertices plus the backend they will be submitted to.
///
/// Shared between the renderer and the atlas-full handler installed on
/// the context, which must flush mid-draw before relayouting the atlas.
struct Batch<B> {
    vertices: Vec<Vertex>,
    backend: B,
}

impl<B: TextBackend> Batch<B> {
    /// Upload pending atlas changes and submit pending vertices.
    fn flush(&mut self, ctx: &mut RasterContext) {
        if let Some(rect) = ctx.validate() {
            let (width, height) = ctx.atlas_size();
            self.backend.upload(rect, ctx.bitmap(), width, height);
        }
        if !self.vertices.is_empty() {
            self.backend.draw(&self.vertices);
            self.backend.flush();
            self.vertices.clear();
        }
    }
}

/// A text renderer that batches glyph vertices between flushes.
pub struct TextBatchRenderer<B: TextBackend> {
    ctx: RasterContext,
    batch: Rc<RefCell<Batch<B>>>,
}

impl<B: TextBackend + 'static> TextBatchRenderer<B> {
    /// Create a renderer with its own raster context of the given size.
    pub fn new(
        registry: RegistryHandle,
        width: i32,
        height: i32,
        backend: B,
    ) -> RasterResult<Self> {
        let mut ctx = RasterContext::new(registry, width, height)?;
        let batch = Rc::new(RefCell::new(Batch {
            vertices: Vec::new(),
            backend,
        }));

        // Default atlas-full recovery: flush geometry referencing the
        // current layout, then double the atlas and resize the texture.
        let handler_batch = Rc::clone(&batch);
        ctx.set_error_handler(move |ctx, error| {
            debug!(%error, "growing atlas");
            let mut batch = handler_batch.borrow_mut();
            batch.flush(ctx);
            let (width, height) = ctx.atlas_size();
            ctx.expand_atlas(width * 2, height * 2);
            let (width, height) = ctx.atlas_size();
            batch.backend.resize(width, height);
            true
        });

        Ok(Self { ctx, batch })
    }

    /// The underlying raster context.
    #[inline]
    pub fn context(&self) -> &RasterContext {
        &self.ctx
    }

    /// Mutable access to the underlying raster context.
    #[inline]
    pub fn context_mut(&mut self) -> &mut RasterContext {
        &mut self.ctx
    }

    /// Borrow the backend.
    pub fn backend_mut(&mut self) -> RefMut<'_, B> {
        RefMut::map(self.batch.borrow_mut(), |batch| &mut batch.backend)
    }

    /// Draw a run of text anchored at `(x, y)` with the current state.
    ///
    /// Glyphs are rasterized into the atlas as needed and their vertices
    /// appended to the batch; nothing reaches the backend until a flush.
    /// Returns the pen x position after the last drawn glyph.
    pub fn draw_text(&mut self, x: f32, y: f32, text: &str) -> f32 {
        let color = self.ctx.state().color;
        let batch = Rc::clone(&self.batch);
        let Some(mut iter) = self.ctx.glyph_quads(x, y, text, true) else {
            return x;
        };
        // The batch is borrowed only between iterator steps; a step may
        // re-enter the atlas-full handler, which borrows it too.
        while let Some(gq) = iter.next() {
            batch.borrow_mut().vertices.push(Vertex::from_quad(&gq, color));
        }
        iter.pen().0
    }

    /// Upload pending atlas changes and submit batched vertices.
    pub fn flush(&mut self) {
        self.batch.borrow_mut().flush(&mut self.ctx);
    }

    /// Number of vertices waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.batch.borrow().vertices.len()
    }

    /// Grow the atlas, preserving content, and resize the backend texture.
    pub fn expand_atlas(&mut self, width: i32, height: i32) {
        self.flush();
        self.ctx.expand_atlas(width, height);
        let (width, height) = self.ctx.atlas_size();
        self.batch.borrow_mut().backend.resize(width, height);
    }

    /// Discard all atlas content and start over at the given size.
    pub fn reset_atlas(&mut self, width: i32, height: i32) -> RasterResult<()> {
        self.flush();
        self.ctx.reset_atlas(width, height)?;
        let (width, height) = self.ctx.atlas_size();
        self.batch.borrow_mut().backend.resize(width, height);
        Ok(())
    }

    // --- state and measurement passthrough --------------------------------

    /// The current drawing state.
    pub fn state(&self) -> &TextState {
        self.ctx.state()
    }

    /// Push a copy of the current drawing state.
    pub fn push_state(&mut self) {
        self.ctx.push_state();
    }

    /// Pop back to the previously pushed drawing state.
    pub fn pop_state(&mut self) {
        self.ctx.pop_state();
    }

    /// Reset the current drawing state to defaults.
    pub fn clear_state(&mut self) {
        self.ctx.clear_state();
    }

    /// Select the font for subsequent operations.
    pub fn set_font(&mut self, id: FontId) {
        self.ctx.set_font(id);
    }

    /// Set the font size in pixels.
    pub fn set_size(&mut self, size: f32) {
        self.ctx.set_size(size);
    }

    /// Set the blur radius in pixels.
    pub fn set_blur(&mut self, blur: i16) {
        self.ctx.set_blur(blur);
    }

    /// Set the extra advance between glyphs.
    pub fn set_spacing(&mut self, spacing: f32) {
        self.ctx.set_spacing(spacing);
    }

    /// Set the anchor alignment.
    pub fn set_align(&mut self, align: Align) {
        self.ctx.set_align(align);
    }

    /// Set the text color.
    pub fn set_color(&mut self, color: Color) {
        self.ctx.set_color(color);
    }

    /// Measure a run of text with the current state.
    pub fn measure_text(&mut self, text: &str) -> Size {
        self.ctx.measure_text(text)
    }

    /// Advance plus aligned bounds of a run anchored at `(x, y)`.
    pub fn text_bounds(&mut self, x: f32, y: f32, text: &str) -> (f32, Bounds) {
        self.ctx.text_bounds(x, y, text)
    }

    /// Vertical metrics of the current font at the current size.
    pub fn vert_metrics(&self) -> Option<FaceMetrics> {
        self.ctx.vert_metrics()
    }

    /// Vertical extent of a line anchored at `y`.
    pub fn line_bounds(&self, y: f32) -> Option<(f32, f32)> {
        self.ctx.line_bounds(y)
    }
}

impl<B: TextBackend> std::fmt::Debug for TextBatchRenderer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBatchRenderer")
            .field("ctx", &self.ctx)
            .field("pending", &self.batch.borrow().vertices.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{Face, FaceMetrics, GlyphMetrics};
    use crate::font::FontParams;
    use crate::registry::FontRegistry;

    /// Renders every covered codepoint as a solid `side x side` block.
    struct BlockFace {
        side: i32,
    }

    impl Face for BlockFace {
        fn glyph_index(&self, codepoint: char) -> u32 {
            codepoint as u32
        }
        fn metrics(&self, _size: f32) -> FaceMetrics {
            FaceMetrics {
                ascender: self.side as f32,
                descender: 0.0,
                height: self.side as f32,
                max_advance: self.side as f32,
            }
        }
        fn build_glyph(&self, _index: u32, _size: f32) -> GlyphMetrics {
            GlyphMetrics {
                width: self.side,
                height: self.side,
                bitmap_left: 0,
                bitmap_top: self.side,
                advance_x: self.side as f32,
            }
        }
        fn render_glyph(
            &self,
            _index: u32,
            _size: f32,
            buffer: &mut [u8],
            pitch: usize,
            pen_x: i32,
            pen_y: i32,
        ) {
            for row in 0..self.side {
                let start = (pen_y + row) as usize * pitch + pen_x as usize;
                buffer[start..start + self.side as usize].fill(0xFF);
            }
        }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Resize(i32, i32),
        Upload(DirtyRect),
        Draw(usize),
        Flush,
    }

    #[derive(Default)]
    struct RecordingBackend {
        events: Vec<Event>,
    }

    impl TextBackend for RecordingBackend {
        fn resize(&mut self, width: i32, height: i32) {
            self.events.push(Event::Resize(width, height));
        }
        fn upload(&mut self, rect: DirtyRect, bitmap: &[u8], width: i32, height: i32) {
            assert_eq!(bitmap.len(), (width * height) as usize);
            self.events.push(Event::Upload(rect));
        }
        fn draw(&mut self, vertices: &[Vertex]) {
            self.events.push(Event::Draw(vertices.len()));
        }
        fn flush(&mut self) {
            self.events.push(Event::Flush);
        }
    }

    fn renderer(atlas: i32, side: i32) -> TextBatchRenderer<RecordingBackend> {
        let registry = FontRegistry::new_shared();
        let id = registry.borrow_mut().add_face(Rc::new(BlockFace { side }));
        let mut renderer =
            TextBatchRenderer::new(registry, atlas, atlas, RecordingBackend::default()).unwrap();
        renderer.set_font(id);
        renderer.set_size(16.0);
        renderer
    }

    #[test]
    fn test_draw_batches_one_vertex_per_glyph() {
        let mut renderer = renderer(256, 16);
        renderer.draw_text(0.0, 0.0, "abc");
        assert_eq!(renderer.pending(), 3);
        assert!(renderer.backend_mut().events.is_empty());
    }

    #[test]
    fn test_flush_uploads_then_draws_then_submits() {
        let mut renderer = renderer(256, 16);
        renderer.draw_text(0.0, 0.0, "ab");
        renderer.flush();
        assert_eq!(renderer.pending(), 0);
        let backend = renderer.backend_mut();
        assert!(matches!(backend.events[0], Event::Upload(_)));
        assert_eq!(backend.events[1], Event::Draw(2));
        // Staging backends present here; submission must follow the draw.
        assert_eq!(backend.events[2], Event::Flush);
        assert_eq!(backend.events.len(), 3);
    }

    #[test]
    fn test_flush_without_changes_is_silent() {
        let mut renderer = renderer(256, 16);
        renderer.flush();
        assert!(renderer.backend_mut().events.is_empty());
    }

    #[test]
    fn test_flush_uploads_prewarmed_glyphs_without_drawing() {
        let mut renderer = renderer(256, 16);
        let font = renderer.context().current_font().unwrap();
        let params = FontParams {
            context: renderer.context().id(),
            codepoint: 'a',
            size: 16.0,
            blur: 0,
        };
        renderer.context_mut().glyph(&font, params, true).unwrap();

        // Rasterized but never drawn: the flush uploads the dirty atlas
        // region and submits nothing.
        renderer.flush();
        let backend = renderer.backend_mut();
        assert!(matches!(backend.events.as_slice(), [Event::Upload(_)]));
    }

    #[test]
    fn test_flush_draws_cached_glyphs_without_upload() {
        let mut renderer = renderer(256, 16);
        renderer.draw_text(0.0, 0.0, "ab");
        renderer.flush();
        renderer.backend_mut().events.clear();

        // Every glyph is already in the atlas: the second flush draws
        // and submits without touching the texture.
        renderer.draw_text(0.0, 0.0, "ab");
        renderer.flush();
        let backend = renderer.backend_mut();
        assert_eq!(backend.events.as_slice(), [Event::Draw(2), Event::Flush]);
    }

    #[test]
    fn test_advance_accumulates_spacing() {
        let mut renderer = renderer(256, 16);
        renderer.set_spacing(2.0);
        let end = renderer.draw_text(0.0, 0.0, "abc");
        // Three 16px advances plus spacing between glyph pairs.
        assert_eq!(end, 3.0 * 16.0 + 2.0 * 2.0);
    }

    #[test]
    fn test_atlas_full_doubles_and_resizes() {
        // A 64x64 atlas fits sixteen 16x16 glyphs; the seventeenth
        // distinct glyph forces recovery mid-draw.
        let mut renderer = renderer(64, 16);
        let text: String = ('a'..='q').collect();
        renderer.draw_text(0.0, 0.0, &text);
        renderer.flush();
        assert_eq!(renderer.context().atlas_size(), (128, 128));
        let backend = renderer.backend_mut();
        assert!(backend.events.contains(&Event::Resize(128, 128)));
        // All seventeen glyphs were drawn, split across the recovery
        // flush and the final flush.
        let drawn: usize = backend
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Draw(n) => Some(*n),
                _ => None,
            })
            .sum();
        assert_eq!(drawn, 17);
    }

    #[test]
    fn test_reset_atlas_notifies_backend() {
        let mut renderer = renderer(256, 16);
        renderer.draw_text(0.0, 0.0, "abc");
        renderer.reset_atlas(128, 128).unwrap();
        assert_eq!(renderer.context().atlas_size(), (128, 128));
        assert!(renderer
            .backend_mut()
            .events
            .contains(&Event::Resize(128, 128)));
    }
}
