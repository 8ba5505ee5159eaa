//! Logical fonts and their per-codepoint glyph caches.
//!
//! A [`Font`] pairs one [`Face`](crate::face::Face) with a multi-valued
//! glyph cache and an ordered fallback chain. Several rasterized variants
//! of the same codepoint can coexist in the cache, differentiated by size,
//! blur and owning context: a bitmap packed into one context's atlas has
//! no meaning in another context's atlas, so the context id is part of
//! the cache key.

use std::collections::HashMap;

use tracing::debug;

use crate::context::ContextId;
use crate::error::RasterError;
use crate::face::{FaceHandle, FaceMetrics, GlyphMetrics};
use crate::registry::{FontId, FontRegistry};

/// Cache ceiling: when the cache holds more entries than this, it is
/// cleared wholesale before the triggering lookup. This is a deliberate
/// coarse policy, not an LRU.
pub const MAX_CACHED_GLYPHS: usize = 4096;

/// Largest accepted font size; requests above it are rejected.
pub const MAX_FONT_SIZE: f32 = 100.0;

/// Identifies one rasterized variant of a glyph.
///
/// Two params with equal codepoint but different size, blur or context
/// address logically distinct cache entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontParams {
    /// The context whose atlas the bitmap would live in.
    pub context: ContextId,
    /// The requested codepoint.
    pub codepoint: char,
    /// Font size in pixels.
    pub size: f32,
    /// Blur radius in pixels.
    pub blur: i16,
}

/// A cached glyph: metrics plus the parameters it was created for, plus
/// its position in the owning context's atlas.
///
/// `position` is `None` while only metrics are known; it is set once, the
/// first time a bitmap is required, and never changes afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Glyph {
    pub metrics: GlyphMetrics,
    pub params: FontParams,
    pub position: Option<(i32, i32)>,
}

impl Glyph {
    fn matches_bitmap(&self, params: &FontParams) -> bool {
        self.params.size == params.size
            && self.params.blur == params.blur
            && self.params.context == params.context
    }
}

/// A logical font: one face, a glyph cache, and a fallback chain.
pub struct Font {
    id: FontId,
    name: Option<String>,
    face: FaceHandle,
    glyphs: HashMap<char, Vec<Glyph>>,
    cached: usize,
    fallbacks: Vec<FontId>,
}

impl Font {
    pub(crate) fn new(id: FontId, face: FaceHandle) -> Self {
        Self {
            id,
            name: None,
            face,
            glyphs: HashMap::new(),
            cached: 0,
            fallbacks: Vec::new(),
        }
    }

    /// The registry id of this font.
    #[inline]
    pub fn id(&self) -> FontId {
        self.id
    }

    /// The font's registered name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the font's name for lookup through the registry.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// The face this font rasterizes through.
    #[inline]
    pub fn face(&self) -> &FaceHandle {
        &self.face
    }

    /// The current fallback chain, in resolution order.
    pub fn fallbacks(&self) -> &[FontId] {
        &self.fallbacks
    }

    /// Append a font to the fallback chain. Adding a font to its own
    /// chain is ignored.
    pub fn add_fallback(&mut self, id: FontId) {
        if id != self.id {
            self.fallbacks.push(id);
        }
    }

    /// Drop the whole fallback chain.
    pub fn reset_fallbacks(&mut self) {
        self.fallbacks.clear();
    }

    /// Number of cached glyph entries across all codepoints.
    pub fn cached_glyphs(&self) -> usize {
        self.cached
    }

    /// Number of cached glyph entries keyed to one context.
    pub fn cached_for(&self, context: ContextId) -> usize {
        self.glyphs
            .values()
            .flatten()
            .filter(|g| g.params.context == context)
            .count()
    }

    /// Face-wide metrics at a size.
    pub fn metrics_of(&self, size: f32) -> FaceMetrics {
        self.face.metrics(size)
    }

    /// Kerning between two consecutive codepoints at a size.
    ///
    /// Kerning always comes from this font's own face; fallback faces do
    /// not participate.
    pub fn kerning(&self, size: f32, prev: char, cur: char) -> f32 {
        let left = self.face.glyph_index(prev);
        let right = self.face.glyph_index(cur);
        self.face.kerning(size, left, right)
    }

    /// Steps 1-3 of the glyph lookup: cache-ceiling sweep, size
    /// validation, cache scan, and metrics-only insert on miss.
    ///
    /// Returns `None` when the size is out of range. The returned glyph
    /// may still lack an atlas position; the owning context performs the
    /// allocation and rasterization.
    pub(crate) fn prepare(
        &mut self,
        registry: &FontRegistry,
        params: FontParams,
        need_bitmap: bool,
    ) -> Option<Glyph> {
        if self.cached > MAX_CACHED_GLYPHS {
            debug!(font = ?self.id, cached = self.cached, "glyph cache over capacity, clearing");
            self.glyphs.clear();
            self.cached = 0;
        }
        if params.size <= 0.0 || params.size > MAX_FONT_SIZE {
            debug!(
                error = %RasterError::InvalidFontSize { size: params.size },
                codepoint = ?params.codepoint,
                "rejecting glyph request"
            );
            return None;
        }

        if let Some(glyph) = self.lookup(&params, need_bitmap) {
            return Some(*glyph);
        }

        let (face, index) = self.resolve_face(registry, params.codepoint);
        let metrics = face.build_glyph(index, params.size);
        let glyph = Glyph {
            metrics,
            params,
            position: None,
        };
        self.glyphs.entry(params.codepoint).or_default().push(glyph);
        self.cached += 1;
        Some(glyph)
    }

    /// Scan the codepoint bucket for a reusable entry.
    ///
    /// A bitmap request must match size, blur and context; a metrics-only
    /// request can reuse any entry of the right size, because no
    /// rasterization has been tied to an atlas yet.
    fn lookup(&self, params: &FontParams, need_bitmap: bool) -> Option<&Glyph> {
        let bucket = self.glyphs.get(&params.codepoint)?;
        if need_bitmap {
            bucket.iter().find(|g| g.matches_bitmap(params))
        } else {
            bucket.iter().find(|g| g.params.size == params.size)
        }
    }

    /// Resolve which face supplies a codepoint, per the fallback protocol:
    /// own face first, then the fallback chain in order (compacting ids
    /// that no longer resolve), then the registry-level callback (whose
    /// answer is memoized into the chain), and finally the own face's
    /// missing-glyph index 0.
    pub(crate) fn resolve_face(
        &mut self,
        registry: &FontRegistry,
        codepoint: char,
    ) -> (FaceHandle, u32) {
        let index = self.face.glyph_index(codepoint);
        if index != 0 {
            return (self.face.clone(), index);
        }

        let mut i = 0;
        while i < self.fallbacks.len() {
            let id = self.fallbacks[i];
            if id == self.id {
                self.fallbacks.remove(i);
                continue;
            }
            let Some(font) = registry.font(id) else {
                self.fallbacks.remove(i);
                continue;
            };
            let face = font.borrow().face.clone();
            let index = face.glyph_index(codepoint);
            if index != 0 {
                return (face, index);
            }
            i += 1;
        }

        if let Some(id) = registry.query_fallback(codepoint) {
            if id != self.id {
                if let Some(font) = registry.font(id) {
                    let face = font.borrow().face.clone();
                    debug!(font = ?self.id, fallback = ?id, codepoint = ?codepoint,
                        "memoizing fallback font");
                    self.fallbacks.push(id);
                    let index = face.glyph_index(codepoint);
                    return (face, index);
                }
            }
        }

        // Nothing covers it; the face's notdef glyph is still a valid,
        // cacheable result.
        (self.face.clone(), 0)
    }

    /// Record a glyph's atlas position after the context placed and
    /// rasterized it.
    ///
    /// If the entry vanished meanwhile (an atlas-full handler may have
    /// reset the atlas and evicted the context's entries), it is
    /// re-inserted with the position so the cache stays consistent with
    /// the atlas contents.
    pub(crate) fn commit_position(
        &mut self,
        params: FontParams,
        metrics: GlyphMetrics,
        position: (i32, i32),
    ) {
        if let Some(bucket) = self.glyphs.get_mut(&params.codepoint) {
            if let Some(glyph) = bucket.iter_mut().find(|g| g.matches_bitmap(&params)) {
                glyph.position = Some(position);
                return;
            }
        }
        self.glyphs.entry(params.codepoint).or_default().push(Glyph {
            metrics,
            params,
            position: Some(position),
        });
        self.cached += 1;
    }

    /// Remove every cached glyph keyed to one context.
    ///
    /// Called by a context when it resets its atlas or is dropped, so no
    /// entry can outlive the atlas region it points into.
    pub(crate) fn evict_context(&mut self, context: ContextId) {
        for bucket in self.glyphs.values_mut() {
            bucket.retain(|g| g.params.context != context);
        }
        self.glyphs.retain(|_, bucket| !bucket.is_empty());
        self.cached = self.glyphs.values().map(Vec::len).sum();
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cached", &self.cached)
            .field("fallbacks", &self.fallbacks)
            .finish_non_exhaustive()
    }
}
