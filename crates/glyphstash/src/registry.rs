//! The font registry: shared ownership of fonts by id or name.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use tracing::debug;

use crate::face::FaceHandle;
use crate::font::Font;

new_key_type! {
    /// Stable, generation-stamped id of a registered font.
    pub struct FontId;
}

/// Shared handle to a registered font.
///
/// Fonts are reference counted: the registry holds one reference, and any
/// caller or context that keeps a handle extends the font's lifetime past
/// [`FontRegistry::remove_font`]. The engine is single-threaded, so
/// interior mutability is `RefCell`, not a lock.
pub type FontHandle = Rc<RefCell<Font>>;

/// Shared handle to the registry itself, held by every raster context.
pub type RegistryHandle = Rc<RefCell<FontRegistry>>;

/// Registry-level fallback: asked for a font that covers a codepoint no
/// font's own chain could supply.
pub type FallbackQuery = Box<dyn Fn(char) -> Option<FontId>>;

/// Owns reference-counted [`Font`] objects keyed by opaque ids.
#[derive(Default)]
pub struct FontRegistry {
    fonts: SlotMap<FontId, FontHandle>,
    fallback: Option<FallbackQuery>,
}

impl FontRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry behind the shared handle contexts expect.
    pub fn new_shared() -> RegistryHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Register a face as a new logical font and return its id.
    pub fn add_face(&mut self, face: FaceHandle) -> FontId {
        let id = self
            .fonts
            .insert_with_key(|id| Rc::new(RefCell::new(Font::new(id, face))));
        debug!(font = ?id, "registered font");
        id
    }

    /// Look up a font by id.
    pub fn font(&self, id: FontId) -> Option<FontHandle> {
        self.fonts.get(id).cloned()
    }

    /// Look up a font by registered name.
    pub fn font_by_name(&self, name: &str) -> Option<FontHandle> {
        self.fonts
            .values()
            .find(|font| font.borrow().name() == Some(name))
            .cloned()
    }

    /// Drop the registry's reference to a font.
    ///
    /// The font stays alive while other handles exist; its id stops
    /// resolving, which fallback chains notice and compact lazily.
    pub fn remove_font(&mut self, id: FontId) {
        self.fonts.remove(id);
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether no fonts are registered.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Install the registry-level fallback callback.
    pub fn set_fallback(&mut self, query: impl Fn(char) -> Option<FontId> + 'static) {
        self.fallback = Some(Box::new(query));
    }

    /// Remove the registry-level fallback callback.
    pub fn clear_fallback(&mut self) {
        self.fallback = None;
    }

    /// Ask the fallback callback, if any, for a font covering `codepoint`.
    pub(crate) fn query_fallback(&self, codepoint: char) -> Option<FontId> {
        self.fallback.as_ref().and_then(|query| query(codepoint))
    }
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("fonts", &self.fonts.len())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{Face, FaceMetrics, GlyphMetrics};

    struct NullFace;

    impl Face for NullFace {
        fn glyph_index(&self, _codepoint: char) -> u32 {
            0
        }
        fn metrics(&self, _size: f32) -> FaceMetrics {
            FaceMetrics::default()
        }
        fn build_glyph(&self, _index: u32, _size: f32) -> GlyphMetrics {
            GlyphMetrics::default()
        }
        fn render_glyph(
            &self,
            _index: u32,
            _size: f32,
            _buffer: &mut [u8],
            _pitch: usize,
            _pen_x: i32,
            _pen_y: i32,
        ) {
        }
    }

    #[test]
    fn test_add_and_lookup() {
        let mut registry = FontRegistry::new();
        let id = registry.add_face(Rc::new(NullFace));
        assert!(registry.font(id).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut registry = FontRegistry::new();
        let id = registry.add_face(Rc::new(NullFace));
        registry.font(id).unwrap().borrow_mut().set_name("sans");
        assert!(registry.font_by_name("sans").is_some());
        assert!(registry.font_by_name("serif").is_none());
    }

    #[test]
    fn test_removed_id_stops_resolving() {
        let mut registry = FontRegistry::new();
        let id = registry.add_face(Rc::new(NullFace));
        let handle = registry.font(id).unwrap();
        registry.remove_font(id);
        assert!(registry.font(id).is_none());
        // The font itself outlives removal while handles exist.
        assert_eq!(handle.borrow().id(), id);
    }

    #[test]
    fn test_own_id_never_added_as_fallback() {
        let mut registry = FontRegistry::new();
        let id = registry.add_face(Rc::new(NullFace));
        let font = registry.font(id).unwrap();
        font.borrow_mut().add_fallback(id);
        assert!(font.borrow().fallbacks().is_empty());
    }
}
