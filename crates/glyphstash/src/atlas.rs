//! Skyline-based rectangle packing for the glyph atlas.
//!
//! The atlas allocates non-overlapping rectangles inside a bounded 2-D
//! region without ever relocating earlier allocations. It tracks only the
//! upper silhouette ("skyline") of the packed rectangles: an ordered run
//! of nodes, each describing a horizontal segment at some height. Placing
//! a rectangle drops it onto the skyline like a tetris piece, raises the
//! silhouette under it, and merges segments that end up level.
//!
//! The packer knows nothing about glyphs, fonts or pixels; it is pure
//! geometry. "Atlas full" is reported by returning `None` from
//! [`Atlas::add_rect`] and is handled a layer up.

/// One segment of the skyline: a run starting at `x` with the given
/// `width`, whose surface sits at height `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AtlasNode {
    x: i32,
    y: i32,
    width: i32,
}

/// A skyline bin packer over a `width x height` region.
///
/// Invariants: nodes are sorted by ascending `x` and cover `[0, width)`
/// with no gaps; rectangles returned by [`Atlas::add_rect`] never overlap.
#[derive(Debug, Clone)]
pub struct Atlas {
    nodes: Vec<AtlasNode>,
    width: i32,
    height: i32,
}

impl Atlas {
    /// Create an empty atlas with a single root node spanning the width.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            nodes: vec![AtlasNode { x: 0, y: 0, width }],
            width,
            height,
        }
    }

    /// Current atlas width.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Current atlas height.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Allocate a `rw x rh` rectangle, returning its top-left corner.
    ///
    /// Uses the bottom-left-fit heuristic: among all skyline positions
    /// that fit, pick the one with the lowest resulting top edge, breaking
    /// ties toward the narrower skyline segment. The tie-break keeps
    /// packing layouts reproducible and must not be substituted with a
    /// different heuristic.
    ///
    /// Returns `None` when no position fits ("atlas full").
    pub fn add_rect(&mut self, rw: i32, rh: i32) -> Option<(i32, i32)> {
        let mut best_h = self.height;
        let mut best_w = self.width;
        let mut best: Option<usize> = None;
        let mut best_x = 0;
        let mut best_y = 0;

        for i in 0..self.nodes.len() {
            if let Some(y) = self.rect_fits(i, rw, rh) {
                if y + rh < best_h || (y + rh == best_h && self.nodes[i].width < best_w) {
                    best = Some(i);
                    best_w = self.nodes[i].width;
                    best_h = y + rh;
                    best_x = self.nodes[i].x;
                    best_y = y;
                }
            }
        }

        let idx = best?;
        self.add_skyline(idx, best_x, best_y, rw, rh);
        Some((best_x, best_y))
    }

    /// Grow the atlas bounds. Existing placements stay valid because
    /// nothing is relocated; a new root-level node covers the widened
    /// strip, if any.
    pub fn expand(&mut self, width: i32, height: i32) {
        if width > self.width {
            self.nodes.push(AtlasNode {
                x: self.width,
                y: 0,
                width: width - self.width,
            });
        }
        self.width = width;
        self.height = height;
    }

    /// Discard all placements and reinitialize to a single root node.
    ///
    /// Every previously returned position becomes invalid; the owner is
    /// responsible for evicting anything that still references them.
    pub fn reset(&mut self, width: i32, height: i32) {
        self.nodes.clear();
        self.nodes.push(AtlasNode { x: 0, y: 0, width });
        self.width = width;
        self.height = height;
    }

    /// Highest skyline level, i.e. the bottom edge of the used region.
    pub fn max_used_y(&self) -> i32 {
        self.nodes.iter().map(|n| n.y).max().unwrap_or(0)
    }

    /// Check whether a `w x h` rectangle dropped at node `i` fits, and at
    /// what height its top-left would land.
    ///
    /// The rectangle may span several skyline segments; the landing height
    /// is the maximum height of every segment under it.
    fn rect_fits(&self, mut i: usize, w: i32, h: i32) -> Option<i32> {
        let x = self.nodes[i].x;
        let mut y = self.nodes[i].y;
        if x + w > self.width {
            return None;
        }
        let mut space_left = w;
        while space_left > 0 {
            if i == self.nodes.len() {
                return None;
            }
            y = y.max(self.nodes[i].y);
            if y + h > self.height {
                return None;
            }
            space_left -= self.nodes[i].width;
            i += 1;
        }
        Some(y)
    }

    /// Raise the skyline over a just-placed `w x h` rectangle at `(x, y)`.
    fn add_skyline(&mut self, idx: usize, x: i32, y: i32, w: i32, h: i32) {
        self.nodes.insert(
            idx,
            AtlasNode {
                x,
                y: y + h,
                width: w,
            },
        );

        // Shrink or delete segments shadowed by the new one.
        let mut i = idx + 1;
        while i < self.nodes.len() {
            if self.nodes[i].x < self.nodes[i - 1].x + self.nodes[i - 1].width {
                let shrink = self.nodes[i - 1].x + self.nodes[i - 1].width - self.nodes[i].x;
                self.nodes[i].x += shrink;
                self.nodes[i].width -= shrink;
                if self.nodes[i].width <= 0 {
                    self.nodes.remove(i);
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        // Merge neighboring segments at the same height to bound growth.
        let mut i = 0;
        while i + 1 < self.nodes.len() {
            if self.nodes[i].y == self.nodes[i + 1].y {
                self.nodes[i].width += self.nodes[i + 1].width;
                self.nodes.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }
}
