//! Basic geometry, color and alignment types shared across the engine.

use bytemuck::{Pod, Zeroable};

use crate::face::FaceMetrics;

/// An RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color from RGBA components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
}

/// A measured text extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The zero size.
    pub const ZERO: Self = Self::new(0.0, 0.0);
}

/// Axis-aligned bounds in device space, `[min_x, min_y, max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Width of the bounds.
    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Height of the bounds.
    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// A region of the atlas bitmap that changed since the last upload,
/// `[min_x, min_y, max_x, max_y)` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl DirtyRect {
    /// Width of the dirty region.
    #[inline]
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    /// Height of the dirty region.
    #[inline]
    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }
}

/// Horizontal text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    /// Anchor at the left edge of the text.
    #[default]
    Left,
    /// Anchor at the horizontal center of the text.
    Center,
    /// Anchor at the right edge of the text.
    Right,
}

/// Vertical text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    /// Anchor at the top edge of the text.
    Top,
    /// Anchor at the vertical middle of the text.
    Middle,
    /// Anchor at the text baseline.
    #[default]
    Baseline,
    /// Anchor at the bottom edge of the text.
    Bottom,
}

/// Combined text alignment.
///
/// The anchor point passed to measurement and drawing operations is
/// translated so the text box sits on the requested side of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Align {
    pub horizontal: HAlign,
    pub vertical: VAlign,
}

impl Align {
    /// Create an alignment from its two axes.
    #[inline]
    pub const fn new(horizontal: HAlign, vertical: VAlign) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Compute the offset that moves an anchor point to the top-left
    /// corner of a text box of the given measured size.
    pub fn offset_for(&self, size: Size, metrics: FaceMetrics) -> (f32, f32) {
        let dx = match self.horizontal {
            HAlign::Left => 0.0,
            HAlign::Center => -size.width / 2.0,
            HAlign::Right => -size.width,
        };
        let dy = match self.vertical {
            VAlign::Top => 0.0,
            VAlign::Middle => -size.height / 2.0,
            VAlign::Baseline => {
                if metrics.height != 0.0 {
                    -size.height / metrics.height * metrics.ascender
                } else {
                    0.0
                }
            }
            VAlign::Bottom => -size.height,
        };
        (dx, dy)
    }
}
