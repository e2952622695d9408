//! Pure geometry helpers in pixel space.
//!
//! Everything here is stateless and total: degenerate inputs (zero-length
//! vectors, zero-area rectangles) produce defined fallback values instead of
//! `NaN` or panics.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// This point moved by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// Axis-aligned rectangle with a top-left origin and non-negative size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// This rectangle grown by `pad` on every side.
    #[must_use]
    pub fn inflate(&self, pad: f64) -> Self {
        Self { x: self.x - pad, y: self.y - pad, w: self.w + pad * 2.0, h: self.h + pad * 2.0 }
    }
}

/// Distance from `p` to the segment `a-b`.
///
/// The perpendicular foot is clamped to the segment, so points beyond either
/// end measure to that endpoint. A zero-length segment measures to `a`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let foot = Point::new(a.x + t * dx, a.y + t * dy);
    p.distance(foot)
}

/// Normalize two arbitrary corners into a top-left-origin rectangle.
#[must_use]
pub fn rect_from_points(a: Point, b: Point) -> Rect {
    Rect {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        w: (a.x - b.x).abs(),
        h: (a.y - b.y).abs(),
    }
}

/// Inclusive containment test.
#[must_use]
pub fn within_rect(p: Point, rect: &Rect) -> bool {
    p.x >= rect.x && p.x <= rect.right() && p.y >= rect.y && p.y <= rect.bottom()
}

/// Unit vector along `(dx, dy)`, or `(0, 0)` for a zero-length input.
#[must_use]
pub fn normalize(dx: f64, dy: f64) -> (f64, f64) {
    let len = dx.hypot(dy);
    if len <= f64::EPSILON || !len.is_finite() {
        return (0.0, 0.0);
    }
    (dx / len, dy / len)
}

/// The unit vector `(nx, ny)` rotated 90°.
#[must_use]
pub fn perpendicular(nx: f64, ny: f64) -> (f64, f64) {
    (-ny, nx)
}
