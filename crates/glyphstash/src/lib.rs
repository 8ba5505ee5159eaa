//! Glyph rasterization cache and atlas packing for text rendering.
//!
//! This crate turns codepoints into packed atlas bitmaps and positioned
//! quads. Fonts live in a shared [`FontRegistry`]; each [`RasterContext`]
//! owns a skyline-packed atlas, a coverage bitmap and a stack of drawing
//! state, and caches every rasterized glyph so repeated text costs a hash
//! lookup. Font file parsing and rasterization are behind the [`Face`]
//! trait; GPU submission is behind the [`TextBackend`] trait.
//!
//! # Getting Started
//!
//! Register a face, select it, and resolve glyphs through a context:
//!
//! ```no_run
//! use std::rc::Rc;
//! use glyphstash::{FontRegistry, RasterContext, FontParams};
//!
//! # fn load_face() -> glyphstash::FaceHandle { unimplemented!() }
//! let registry = FontRegistry::new_shared();
//! let font_id = registry.borrow_mut().add_face(load_face());
//!
//! let mut ctx = RasterContext::with_default_size(registry.clone()).unwrap();
//! ctx.set_font(font_id);
//! ctx.set_size(16.0);
//!
//! let font = registry.borrow().font(font_id).unwrap();
//! let params = FontParams { context: ctx.id(), codepoint: 'g', size: 16.0, blur: 0 };
//! if let Some(glyph) = ctx.glyph(&font, params, true) {
//!     println!("'g' packed at {:?}", glyph.position);
//! }
//!
//! // Upload changed atlas pixels since the last check.
//! if let Some(dirty) = ctx.validate() {
//!     let _region = (dirty.min_x, dirty.min_y, dirty.width(), dirty.height());
//! }
//! ```
//!
//! # Measuring and Layout
//!
//! Measurement uses the same glyph resolution drawing does, so alignment
//! offsets derived from it match drawn positions exactly:
//!
//! ```no_run
//! # use glyphstash::RasterContext;
//! # fn example(ctx: &mut RasterContext) {
//! let size = ctx.measure_text("hello");
//! let (advance, bounds) = ctx.text_bounds(100.0, 50.0, "hello");
//! for gq in ctx.glyph_quads(100.0, 50.0, "hello", true).unwrap() {
//!     // gq.quad carries device-space corners and atlas texture coords.
//!     let _ = (gq.quad.x0, gq.quad.s0);
//! }
//! let _ = (size, advance, bounds);
//! # }
//! ```
//!
//! # Batched Drawing
//!
//! [`TextBatchRenderer`] drives a [`TextBackend`] and installs the
//! default atlas-full recovery (flush, double the atlas, resize the
//! texture):
//!
//! ```no_run
//! use glyphstash::{FontRegistry, TextBatchRenderer, Color};
//!
//! # fn example<B: glyphstash::TextBackend + 'static>(backend: B) -> glyphstash::RasterResult<()> {
//! let registry = FontRegistry::new_shared();
//! let mut renderer = TextBatchRenderer::new(registry, 512, 512, backend)?;
//! renderer.set_size(14.0);
//! renderer.set_color(Color::WHITE);
//! renderer.draw_text(10.0, 30.0, "batched text");
//! renderer.flush();
//! # Ok(())
//! # }
//! ```

mod atlas;
mod context;
mod error;
mod face;
mod font;
mod iter;
mod registry;
mod renderer;
mod types;

// Core engine
pub use atlas::Atlas;
pub use context::{AtlasFullHandler, ContextId, RasterContext, TextState, DEFAULT_ATLAS_SIZE};
pub use error::{RasterError, RasterResult};

// Fonts and faces
pub use face::{Face, FaceHandle, FaceMetrics, GlyphMetrics};
pub use font::{Font, FontParams, Glyph, MAX_CACHED_GLYPHS, MAX_FONT_SIZE};
pub use registry::{FallbackQuery, FontHandle, FontId, FontRegistry, RegistryHandle};

// Layout and drawing
pub use iter::{GlyphQuad, Quad, TextIter};
pub use renderer::{TextBackend, TextBatchRenderer, Vertex};
pub use types::{Align, Bounds, Color, DirtyRect, HAlign, Size, VAlign};
