//! Integer pixel geometry shared by the association stages.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixel space, top-left origin.
///
/// Construction orders the corners so `x1 <= x2` and `y1 <= y2` always hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Converts detector float coordinates, truncating toward zero.
    pub fn from_f32(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }

    pub fn x1(&self) -> i32 {
        self.x1
    }

    pub fn y1(&self) -> i32 {
        self.y1
    }

    pub fn x2(&self) -> i32 {
        self.x2
    }

    pub fn y2(&self) -> i32 {
        self.y2
    }

    pub fn top_left(&self) -> (i32, i32) {
        (self.x1, self.y1)
    }

    pub fn width(&self) -> u32 {
        self.x2.abs_diff(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.abs_diff(self.y1)
    }

    /// Intersects the box with an image of the given size.
    ///
    /// Returns `(x, y, width, height)` of the visible region, or `None` when
    /// nothing of the box lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clamp = |v: i32, max: u32| v.clamp(0, max.min(i32::MAX as u32) as i32) as u32;
        let x1 = clamp(self.x1, width);
        let y1 = clamp(self.y1, height);
        let x2 = clamp(self.x2, width);
        let y2 = clamp(self.y2, height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(c: [i32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// True iff the point lies strictly inside the box. Edges do not count.
pub fn contains(bbox: &BoundingBox, x: i32, y: i32) -> bool {
    bbox.x1 < x && x < bbox.x2 && bbox.y1 < y && y < bbox.y2
}

/// Integer midpoint, floored.
pub fn centroid(bbox: &BoundingBox) -> (i32, i32) {
    let cx = (bbox.x1 as i64 + bbox.x2 as i64).div_euclid(2);
    let cy = (bbox.y1 as i64 + bbox.y2 as i64).div_euclid(2);
    (cx as i32, cy as i32)
}

/// Euclidean distance between two points.
pub fn distance(a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = (a.0 as i64 - b.0 as i64) as f64;
    let dy = (a.1 as i64 - b.1 as i64) as f64;
    dx.hypot(dy)
}
