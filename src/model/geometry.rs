//! Frame geometry and object bitmaps.
//!
//! All bitmaps use the (width, height) convention: a bitmap of a `w x h`
//! region has shape `(w, h)` and is indexed as `map[[x, y]]`. The outer axis
//! (`x`) is what the ground truth files call a "row".

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Byte matrix marking object (`> 0`) vs background (`0`) pixels.
pub type Bitmap = Array2<u8>;

/// Allocate a zeroed bitmap of the given size.
pub fn empty_bitmap(width: u32, height: u32) -> Bitmap {
    Array2::zeros((width as usize, height as usize))
}

/// Build a bitmap from `rows[y][x]` nested data.
///
/// This is the natural literal layout for tests and small fixtures; rows of
/// unequal length are padded with background.
pub fn bitmap_from_rows(rows: &[&[u8]]) -> Bitmap {
    let height = rows.len();
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    Array2::from_shape_fn((width, height), |(x, y)| {
        rows[y].get(x).copied().unwrap_or(0)
    })
}

/// Width of a bitmap in pixels.
pub fn bitmap_width(map: &Bitmap) -> u32 {
    map.nrows() as u32
}

/// Height of a bitmap in pixels.
pub fn bitmap_height(map: &Bitmap) -> u32 {
    map.ncols() as u32
}

/// Number of foreground cells.
pub fn foreground_count(map: &Bitmap) -> usize {
    map.iter().filter(|&&v| v > 0).count()
}

/// Sum of all foreground values.
pub fn foreground_sum(map: &Bitmap) -> u64 {
    map.iter().map(|&v| u64::from(v)).sum()
}

/// Axis-aligned rectangle in full-frame pixel coordinates.
///
/// Rectangles are plain values: every operation returns a new `Rect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from inclusive-exclusive corner coordinates.
    ///
    /// Returns `None` when the corners do not describe a positive area.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Option<Self> {
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self::new(
            left,
            top,
            (i64::from(right) - i64::from(left)) as u32,
            (i64::from(bottom) - i64::from(top)) as u32,
        ))
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    /// True when the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(
            left,
            top,
            (i64::from(right) - i64::from(left)) as u32,
            (i64::from(bottom) - i64::from(top)) as u32,
        )
    }

    /// Check whether a world pixel lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection of two rectangles, `None` if they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        Rect::from_edges(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    /// Bounding rectangle of a vertex list, `None` for fewer than one vertex.
    pub fn enclosing(vertices: &[(i32, i32)]) -> Option<Rect> {
        let (first, rest) = vertices.split_first()?;
        let (mut min_x, mut min_y) = *first;
        let (mut max_x, mut max_y) = *first;
        for &(x, y) in rest {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Rect::from_edges(min_x, min_y, max_x.saturating_add(1), max_y.saturating_add(1))
    }
}
