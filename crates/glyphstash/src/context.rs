//! The raster context: one atlas, one pixel bitmap, drawing state and
//! dirty-region tracking.
//!
//! A [`RasterContext`] owns everything one logical rendering pass needs:
//! the skyline [`Atlas`], the 8-bit coverage bitmap glyphs are rasterized
//! into, a save/restore stack of drawing state, and the coalesced dirty
//! rectangle the backend uploads from. Glyph resolution goes through the
//! shared [`FontRegistry`]; bitmap positions handed out by this context
//! are only meaningful inside this context's atlas.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, warn};

use crate::atlas::Atlas;
use crate::error::{RasterError, RasterResult};
use crate::font::{FontParams, Glyph};
use crate::registry::{FontHandle, FontId, RegistryHandle};
use crate::types::{Align, Bounds, Color, DirtyRect, Size};

/// Default side length of a freshly created atlas.
pub const DEFAULT_ATLAS_SIZE: i32 = 512;

/// Global context id counter.
static CONTEXT_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Identity of one raster context, used as a cache-partition key inside
/// font glyph caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u32);

impl ContextId {
    fn next() -> Self {
        Self(CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// One frame of drawing state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextState {
    /// The font glyphs are resolved through.
    pub font: Option<FontId>,
    /// Font size in pixels.
    pub size: f32,
    /// Blur radius in pixels.
    pub blur: i16,
    /// Extra advance between consecutive glyphs.
    pub spacing: f32,
    /// Anchor alignment for measurement and drawing.
    pub align: Align,
    /// Text color picked up by the batch renderer.
    pub color: Color,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 12.0,
            blur: 0,
            spacing: 0.0,
            align: Align::default(),
            color: Color::WHITE,
        }
    }
}

/// Callback invoked when the atlas cannot place a glyph.
///
/// Returning `true` means the condition was resolved (the handler grew or
/// reset the atlas) and the placement will be retried exactly once. The
/// handler may mutate the context freely but must not resolve glyphs on
/// it re-entrantly.
pub type AtlasFullHandler = Box<dyn FnMut(&mut RasterContext, RasterError) -> bool>;

/// A glyph rasterization surface with drawing state.
pub struct RasterContext {
    id: ContextId,
    registry: RegistryHandle,
    atlas: Atlas,
    /// Row-major coverage bitmap, one byte per pixel, `width * height` long.
    bitmap: Vec<u8>,
    width: i32,
    height: i32,
    /// Dirty bounds `[min_x, min_y, max_x, max_y)`; empty is encoded as
    /// the inverted sentinel `[width, height, 0, 0]`.
    dirty: [i32; 4],
    /// Saved state frames below the current one.
    states: Vec<TextState>,
    current: TextState,
    /// Fonts this context has resolved glyphs through; swept on reset
    /// and drop so no cache entry outlives its atlas region.
    used_fonts: HashSet<FontId>,
    handler: Option<AtlasFullHandler>,
}

impl RasterContext {
    /// Create a context with the given atlas dimensions.
    pub fn new(registry: RegistryHandle, width: i32, height: i32) -> RasterResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(RasterError::InvalidAtlasSize { width, height });
        }
        Ok(Self {
            id: ContextId::next(),
            registry,
            atlas: Atlas::new(width, height),
            bitmap: vec![0; (width * height) as usize],
            width,
            height,
            dirty: [width, height, 0, 0],
            states: Vec::new(),
            current: TextState::default(),
            used_fonts: HashSet::new(),
            handler: None,
        })
    }

    /// Create a context with the default atlas size.
    pub fn with_default_size(registry: RegistryHandle) -> RasterResult<Self> {
        Self::new(registry, DEFAULT_ATLAS_SIZE, DEFAULT_ATLAS_SIZE)
    }

    /// This context's identity.
    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Atlas and bitmap width in pixels.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Atlas and bitmap height in pixels.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Atlas dimensions as a pair.
    #[inline]
    pub fn atlas_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// The coverage bitmap backing the atlas.
    #[inline]
    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    /// The registry this context resolves fonts through.
    #[inline]
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    // --- state stack ------------------------------------------------------

    /// The current state frame.
    #[inline]
    pub fn state(&self) -> &TextState {
        &self.current
    }

    /// Push a copy of the current state frame.
    pub fn push_state(&mut self) {
        self.states.push(self.current);
    }

    /// Pop back to the previously pushed state frame.
    ///
    /// Pushes and pops must balance; popping with nothing saved is a
    /// caller contract violation and leaves the current state unchanged.
    pub fn pop_state(&mut self) {
        if let Some(state) = self.states.pop() {
            self.current = state;
        }
    }

    /// Reset the current state frame to defaults in place.
    pub fn clear_state(&mut self) {
        self.current = TextState::default();
    }

    /// Select the font for subsequent operations.
    pub fn set_font(&mut self, id: FontId) {
        self.current.font = Some(id);
    }

    /// Set the font size in pixels.
    pub fn set_size(&mut self, size: f32) {
        self.current.size = size;
    }

    /// Set the blur radius in pixels.
    pub fn set_blur(&mut self, blur: i16) {
        self.current.blur = blur;
    }

    /// Set the extra advance between glyphs.
    pub fn set_spacing(&mut self, spacing: f32) {
        self.current.spacing = spacing;
    }

    /// Set the anchor alignment.
    pub fn set_align(&mut self, align: Align) {
        self.current.align = align;
    }

    /// Set the text color.
    pub fn set_color(&mut self, color: Color) {
        self.current.color = color;
    }

    // --- fonts ------------------------------------------------------------

    /// Resolve the currently selected font.
    pub fn current_font(&self) -> Option<FontHandle> {
        let id = self.current.font?;
        self.registry.borrow().font(id)
    }

    /// Record that this context uses a font.
    ///
    /// Contexts learn fonts automatically while resolving glyphs; explicit
    /// registration only matters when a caller wants eviction guarantees
    /// for a font it has not drawn with yet.
    pub fn register_font(&mut self, id: FontId) {
        self.used_fonts.insert(id);
    }

    /// Forget a font for eviction purposes.
    pub fn unregister_font(&mut self, id: FontId) {
        self.used_fonts.remove(&id);
    }

    // --- glyph resolution -------------------------------------------------

    /// Resolve one glyph, rasterizing and packing it on demand.
    ///
    /// With `need_bitmap` the returned glyph is guaranteed to carry an
    /// atlas position; without it, a metrics-only entry may be returned.
    /// Returns `None` when the size is invalid or the atlas is full and
    /// unrecovered; callers treat that as "skip this glyph".
    pub fn glyph(&mut self, font: &FontHandle, params: FontParams, need_bitmap: bool) -> Option<Glyph> {
        let registry = self.registry.clone();
        let mut glyph = {
            let registry = registry.borrow();
            font.borrow_mut().prepare(&registry, params, need_bitmap)?
        };
        self.used_fonts.insert(font.borrow().id());

        if need_bitmap && glyph.position.is_none() {
            let (width, height) = (glyph.metrics.width, glyph.metrics.height);
            let position = if width > 0 && height > 0 {
                let position = match self.atlas.add_rect(width, height) {
                    Some(position) => position,
                    None => {
                        if !self.handle_atlas_full() {
                            debug!(codepoint = ?params.codepoint,
                                "atlas full with no recovery, skipping glyph");
                            return None;
                        }
                        let Some(position) = self.atlas.add_rect(width, height) else {
                            warn!(codepoint = ?params.codepoint,
                                "atlas still full after recovery, skipping glyph");
                            return None;
                        };
                        debug!("recovered from full atlas");
                        position
                    }
                };
                let (face, index) = {
                    let registry = registry.borrow();
                    font.borrow_mut().resolve_face(&registry, params.codepoint)
                };
                face.render_glyph(
                    index,
                    params.size,
                    &mut self.bitmap,
                    self.width as usize,
                    position.0,
                    position.1,
                );
                // TODO: run a blur pass over the rasterized rect when
                // params.blur > 0.
                self.mark_dirty(position.0, position.1, width, height);
                position
            } else {
                // Zero-area glyphs (spaces) need no atlas space.
                (0, 0)
            };
            font.borrow_mut().commit_position(params, glyph.metrics, position);
            glyph.position = Some(position);
        }
        Some(glyph)
    }

    // --- measurement ------------------------------------------------------

    /// Measure a run of text with the current state.
    ///
    /// Uses the exact glyph resolution and advance/kerning computation the
    /// drawing pass uses; alignment offsets derived from this size line up
    /// with drawn glyph positions by construction.
    pub fn measure_text(&mut self, text: &str) -> Size {
        let Some(font) = self.current_font() else {
            return Size::ZERO;
        };
        let state = self.current;
        let metrics = font.borrow().metrics_of(state.size);
        let mut size = Size::ZERO;
        let mut prev: Option<char> = None;

        for codepoint in text.chars() {
            let params = FontParams {
                context: self.id,
                codepoint,
                size: state.size,
                blur: state.blur,
            };
            if let Some(prev) = prev {
                size.width += font.borrow().kerning(state.size, prev, codepoint);
                size.width += state.spacing;
            }
            prev = Some(codepoint);

            let Some(glyph) = self.glyph(&font, params, false) else {
                break;
            };
            let y_offset = metrics.ascender - glyph.metrics.bitmap_top as f32;
            size.height = size.height.max(glyph.metrics.height as f32);
            size.height = size.height.max(glyph.metrics.height as f32 + y_offset);
            size.width += glyph.metrics.advance_x;
        }
        size
    }

    /// Measure a run and return its advance plus its aligned device-space
    /// bounds around the anchor `(x, y)`.
    pub fn text_bounds(&mut self, x: f32, y: f32, text: &str) -> (f32, Bounds) {
        let size = self.measure_text(text);
        let metrics = match self.current_font() {
            Some(font) => font.borrow().metrics_of(self.current.size),
            None => return (0.0, Bounds::default()),
        };
        let (dx, dy) = self.current.align.offset_for(size, metrics);
        let bounds = Bounds {
            min_x: x + dx,
            min_y: y + dy,
            max_x: x + dx + size.width,
            max_y: y + dy + size.height,
        };
        (size.width, bounds)
    }

    /// Vertical metrics of the current font at the current size.
    pub fn vert_metrics(&self) -> Option<crate::face::FaceMetrics> {
        let font = self.current_font()?;
        let metrics = font.borrow().metrics_of(self.current.size);
        Some(metrics)
    }

    /// The vertical extent `[min_y, max_y)` a line anchored at `y` covers
    /// under the current vertical alignment.
    pub fn line_bounds(&self, y: f32) -> Option<(f32, f32)> {
        let metrics = self.vert_metrics()?;
        let y = match self.current.align.vertical {
            crate::types::VAlign::Top => y,
            crate::types::VAlign::Middle => y - metrics.height / 2.0,
            crate::types::VAlign::Baseline => y - metrics.ascender,
            crate::types::VAlign::Bottom => y - metrics.height,
        };
        Some((y, y + metrics.height))
    }

    // --- dirty region -----------------------------------------------------

    /// Whether any atlas pixels changed since the last [`Self::validate`].
    #[inline]
    pub fn has_dirty(&self) -> bool {
        self.dirty[0] < self.dirty[2] && self.dirty[1] < self.dirty[3]
    }

    /// Take the dirty rectangle, resetting it to empty.
    ///
    /// All rasterizations since the previous call are coalesced into one
    /// bounding rectangle; `None` means nothing changed.
    pub fn validate(&mut self) -> Option<DirtyRect> {
        if !self.has_dirty() {
            return None;
        }
        let rect = DirtyRect {
            min_x: self.dirty[0],
            min_y: self.dirty[1],
            max_x: self.dirty[2],
            max_y: self.dirty[3],
        };
        self.clear_dirty();
        Some(rect)
    }

    pub(crate) fn mark_dirty(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.dirty[0] = self.dirty[0].min(x);
        self.dirty[1] = self.dirty[1].min(y);
        self.dirty[2] = self.dirty[2].max(x + width);
        self.dirty[3] = self.dirty[3].max(y + height);
    }

    fn clear_dirty(&mut self) {
        self.dirty = [self.width, self.height, 0, 0];
    }

    // --- atlas lifecycle --------------------------------------------------

    /// Grow the atlas, preserving all packed content.
    ///
    /// Dimensions are clamped to never shrink. Every glyph position handed
    /// out before the call stays valid; the previously used region is
    /// marked dirty so the backend can re-upload into its resized texture.
    pub fn expand_atlas(&mut self, width: i32, height: i32) {
        let width = width.max(self.width);
        let height = height.max(self.height);
        if width == self.width && height == self.height {
            return;
        }
        debug!(from = ?(self.width, self.height), to = ?(width, height), "expanding atlas");

        let mut bitmap = vec![0u8; (width * height) as usize];
        let old_width = self.width as usize;
        for row in 0..self.height as usize {
            let src = &self.bitmap[row * old_width..(row + 1) * old_width];
            bitmap[row * width as usize..row * width as usize + old_width].copy_from_slice(src);
        }

        self.atlas.expand(width, height);
        self.dirty = [0, 0, self.width, self.atlas.max_used_y()];
        self.bitmap = bitmap;
        self.width = width;
        self.height = height;
    }

    /// Throw away all atlas content and start over at the given size.
    ///
    /// Every glyph cache entry keyed to this context is evicted from every
    /// font this context has used, synchronously; otherwise cached
    /// positions would dangle into discarded content.
    pub fn reset_atlas(&mut self, width: i32, height: i32) -> RasterResult<()> {
        if width <= 0 || height <= 0 {
            return Err(RasterError::InvalidAtlasSize { width, height });
        }
        debug!(to = ?(width, height), "resetting atlas");
        self.atlas.reset(width, height);
        self.bitmap = vec![0; (width * height) as usize];
        self.width = width;
        self.height = height;
        self.clear_dirty();
        self.evict_from_used_fonts();
        Ok(())
    }

    fn evict_from_used_fonts(&self) {
        let registry = self.registry.borrow();
        for &id in &self.used_fonts {
            if let Some(font) = registry.font(id) {
                if let Ok(mut font) = font.try_borrow_mut() {
                    font.evict_context(self.id);
                }
            }
        }
    }

    // --- atlas-full recovery ----------------------------------------------

    /// Install the handler consulted when the atlas cannot place a glyph.
    pub fn set_error_handler(
        &mut self,
        handler: impl FnMut(&mut RasterContext, RasterError) -> bool + 'static,
    ) {
        self.handler = Some(Box::new(handler));
    }

    /// Remove the atlas-full handler.
    pub fn clear_error_handler(&mut self) {
        self.handler = None;
    }

    fn handle_atlas_full(&mut self) -> bool {
        let Some(mut handler) = self.handler.take() else {
            return false;
        };
        let handled = handler(self, RasterError::AtlasFull);
        if self.handler.is_none() {
            self.handler = Some(handler);
        }
        handled
    }
}

impl Drop for RasterContext {
    fn drop(&mut self) {
        if let Ok(registry) = self.registry.try_borrow() {
            for &id in &self.used_fonts {
                if let Some(font) = registry.font(id) {
                    if let Ok(mut font) = font.try_borrow_mut() {
                        font.evict_context(self.id);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for RasterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterContext")
            .field("id", &self.id)
            .field("size", &(self.width, self.height))
            .field("dirty", &self.dirty)
            .field("states", &(self.states.len() + 1))
            .field("used_fonts", &self.used_fonts.len())
            .finish_non_exhaustive()
    }
}
