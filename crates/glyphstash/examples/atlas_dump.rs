//! Draws a line of text with a synthetic face and dumps the resulting
//! atlas to stdout as ASCII art.
//!
//! Run with: cargo run --example atlas_dump

use std::rc::Rc;

use glyphstash::{Face, FaceMetrics, FontRegistry, GlyphMetrics, RasterContext};

/// A toy face: every codepoint renders as a hollow box whose wall
/// thickness depends on the codepoint, so distinct glyphs are visibly
/// distinct in the dump.
struct BoxFace;

const SIDE: i32 = 12;

impl Face for BoxFace {
    fn glyph_index(&self, codepoint: char) -> u32 {
        codepoint as u32
    }

    fn metrics(&self, _size: f32) -> FaceMetrics {
        FaceMetrics {
            ascender: SIDE as f32,
            descender: 0.0,
            height: SIDE as f32,
            max_advance: SIDE as f32,
        }
    }

    fn build_glyph(&self, _index: u32, _size: f32) -> GlyphMetrics {
        GlyphMetrics {
            width: SIDE,
            height: SIDE,
            bitmap_left: 0,
            bitmap_top: SIDE,
            advance_x: SIDE as f32 + 1.0,
        }
    }

    fn render_glyph(
        &self,
        index: u32,
        _size: f32,
        buffer: &mut [u8],
        pitch: usize,
        pen_x: i32,
        pen_y: i32,
    ) {
        let wall = 1 + (index % 3) as i32;
        for row in 0..SIDE {
            for col in 0..SIDE {
                let edge = row < wall || row >= SIDE - wall || col < wall || col >= SIDE - wall;
                if edge {
                    let idx = (pen_y + row) as usize * pitch + (pen_x + col) as usize;
                    buffer[idx] = 0xFF;
                }
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let registry = FontRegistry::new_shared();
    let font_id = registry.borrow_mut().add_face(Rc::new(BoxFace));

    let mut ctx = RasterContext::new(registry, 64, 64).expect("valid atlas size");
    ctx.set_font(font_id);
    ctx.set_size(12.0);

    for gq in ctx
        .glyph_quads(0.0, 12.0, "abcdef", true)
        .expect("font is selected")
    {
        println!(
            "glyph {:?} at atlas {:?}, screen ({:.0}, {:.0})",
            gq.glyph.params.codepoint,
            gq.glyph.position,
            gq.quad.x0,
            gq.quad.y0,
        );
    }

    if let Some(dirty) = ctx.validate() {
        println!(
            "dirty region: ({}, {}) {}x{}",
            dirty.min_x,
            dirty.min_y,
            dirty.width(),
            dirty.height()
        );
    }

    let (width, height) = ctx.atlas_size();
    let bitmap = ctx.bitmap();
    for row in 0..height {
        let line: String = (0..width)
            .map(|col| {
                if bitmap[(row * width + col) as usize] > 0 {
                    '#'
                } else {
                    '.'
                }
            })
            .collect();
        println!("{line}");
    }
}
