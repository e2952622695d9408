//! Annotation data model: shapes, their geometry in data space, and style.
//!
//! A [`Shape`] is one persisted annotation. Its geometry is a tagged union
//! ([`Geometry`]) keyed on the `type` field of the JSON form, with anchor
//! points stored as `(time, price)` so annotations survive pan and zoom. The
//! fixed-size anchor arrays make the point-count invariants (two for lines and
//! rectangles, three for `channel3`) structural rather than checked.

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a shape. Immutable for the shape's lifetime.
pub type ShapeId = String;

/// Generate a fresh shape id.
#[must_use]
pub fn new_shape_id() -> ShapeId {
    Uuid::new_v4().to_string()
}

/// A point in data space: time on the x axis, price on the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DataPoint {
    pub t: f64,
    pub p: f64,
}

impl DataPoint {
    #[must_use]
    pub fn new(t: f64, p: f64) -> Self {
        Self { t, p }
    }

    /// This point moved by `(dt, dp)`.
    #[must_use]
    pub fn offset(self, dt: f64, dp: f64) -> Self {
        Self { t: self.t + dt, p: self.p + dp }
    }
}

/// Units of a channel's width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthMode {
    /// Width is a price offset; the parallel edge sits `width` above the baseline.
    #[default]
    Price,
    /// Width is a perpendicular pixel offset, constant across zoom levels.
    Pixels,
}

/// Discriminant of a [`Geometry`], for logging and tool bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Trendline,
    Ray,
    Hline,
    Vline,
    Rect,
    Fib,
    Arrow,
    Text,
    Measure,
    Channel,
    Channel3,
    Group,
}

impl ShapeKind {
    /// The `type` tag used in the persisted JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trendline => "trendline",
            Self::Ray => "ray",
            Self::Hline => "hline",
            Self::Vline => "vline",
            Self::Rect => "rect",
            Self::Fib => "fib",
            Self::Arrow => "arrow",
            Self::Text => "text",
            Self::Measure => "measure",
            Self::Channel => "channel",
            Self::Channel3 => "channel3",
            Self::Group => "group",
        }
    }
}

/// Per-kind geometry, all in data space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Geometry {
    /// Segment between two anchors.
    Trendline { points: [DataPoint; 2] },
    /// Half-line starting at the first anchor through the second.
    Ray { points: [DataPoint; 2] },
    /// Horizontal line at a price.
    Hline { y: f64 },
    /// Vertical line at a time.
    Vline { x: f64 },
    /// Rectangle spanned by two opposite corners.
    Rect { points: [DataPoint; 2] },
    /// Fibonacci retracement from the first anchor to the second.
    Fib {
        points: [DataPoint; 2],
        /// Ratios to draw; empty means "use the settings preset".
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        levels: Vec<f64>,
    },
    /// Segment with an arrowhead at the second anchor.
    Arrow { points: [DataPoint; 2] },
    /// Text label anchored at its top-left corner.
    Text { point: DataPoint, text: String },
    /// Ruler between two anchors.
    Measure { points: [DataPoint; 2] },
    /// Baseline through two anchors plus a parallel edge `width` away.
    Channel {
        points: [DataPoint; 2],
        #[serde(default)]
        width_mode: WidthMode,
        width: f64,
    },
    /// Baseline through the first two anchors; the parallel edge passes
    /// through the third.
    Channel3 {
        points: [DataPoint; 3],
        #[serde(default)]
        width_mode: WidthMode,
        #[serde(default)]
        width: f64,
    },
    /// Composite of child shapes that move and select together.
    Group { children: Vec<Shape> },
}

impl Geometry {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Trendline { .. } => ShapeKind::Trendline,
            Self::Ray { .. } => ShapeKind::Ray,
            Self::Hline { .. } => ShapeKind::Hline,
            Self::Vline { .. } => ShapeKind::Vline,
            Self::Rect { .. } => ShapeKind::Rect,
            Self::Fib { .. } => ShapeKind::Fib,
            Self::Arrow { .. } => ShapeKind::Arrow,
            Self::Text { .. } => ShapeKind::Text,
            Self::Measure { .. } => ShapeKind::Measure,
            Self::Channel { .. } => ShapeKind::Channel,
            Self::Channel3 { .. } => ShapeKind::Channel3,
            Self::Group { .. } => ShapeKind::Group,
        }
    }
}

/// Optional per-shape style. Absent fields fall back to renderer defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

impl Style {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(v: &bool) -> bool {
    !*v
}

/// One annotation on the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: ShapeId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
}

impl Shape {
    /// A new unstyled shape with a freshly generated id.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self::with_id(new_shape_id(), geometry)
    }

    /// A new unstyled shape with a caller-chosen id.
    #[must_use]
    pub fn with_id(id: impl Into<ShapeId>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            style: Style::default(),
            hidden: false,
            locked: false,
            name: None,
            layer_id: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// Anchor points in draw order.
    ///
    /// Horizontal and vertical lines carry a single coordinate, not a point,
    /// and return no anchors. Groups return the anchors of all children.
    #[must_use]
    pub fn anchors(&self) -> Vec<DataPoint> {
        match &self.geometry {
            Geometry::Trendline { points }
            | Geometry::Ray { points }
            | Geometry::Rect { points }
            | Geometry::Fib { points, .. }
            | Geometry::Arrow { points }
            | Geometry::Measure { points }
            | Geometry::Channel { points, .. } => points.to_vec(),
            Geometry::Channel3 { points, .. } => points.to_vec(),
            Geometry::Text { point, .. } => vec![*point],
            Geometry::Hline { .. } | Geometry::Vline { .. } => Vec::new(),
            Geometry::Group { children } => children.iter().flat_map(Shape::anchors).collect(),
        }
    }

    /// Shift every anchor by `(dt, dp)`.
    ///
    /// Horizontal lines only move in price and vertical lines only in time.
    pub fn translate(&mut self, dt: f64, dp: f64) {
        match &mut self.geometry {
            Geometry::Trendline { points }
            | Geometry::Ray { points }
            | Geometry::Rect { points }
            | Geometry::Fib { points, .. }
            | Geometry::Arrow { points }
            | Geometry::Measure { points }
            | Geometry::Channel { points, .. } => {
                for pt in points.iter_mut() {
                    *pt = pt.offset(dt, dp);
                }
            }
            Geometry::Channel3 { points, .. } => {
                for pt in points.iter_mut() {
                    *pt = pt.offset(dt, dp);
                }
            }
            Geometry::Text { point, .. } => *point = point.offset(dt, dp),
            Geometry::Hline { y } => *y += dp,
            Geometry::Vline { x } => *x += dt,
            Geometry::Group { children } => {
                for child in children {
                    child.translate(dt, dp);
                }
            }
        }
    }

    /// Replace the anchor at `index`. Returns `false` when the shape has no
    /// such anchor.
    ///
    /// Horizontal and vertical lines treat index 0 as their single coordinate.
    pub fn set_anchor(&mut self, index: usize, to: DataPoint) -> bool {
        match &mut self.geometry {
            Geometry::Trendline { points }
            | Geometry::Ray { points }
            | Geometry::Rect { points }
            | Geometry::Fib { points, .. }
            | Geometry::Arrow { points }
            | Geometry::Measure { points }
            | Geometry::Channel { points, .. } => match points.get_mut(index) {
                Some(slot) => {
                    *slot = to;
                    true
                }
                None => false,
            },
            Geometry::Channel3 { points, .. } => match points.get_mut(index) {
                Some(slot) => {
                    *slot = to;
                    true
                }
                None => false,
            },
            Geometry::Text { point, .. } if index == 0 => {
                *point = to;
                true
            }
            Geometry::Hline { y } if index == 0 => {
                *y = to.p;
                true
            }
            Geometry::Vline { x } if index == 0 => {
                *x = to.t;
                true
            }
            _ => false,
        }
    }

    /// Set the width of a two-point channel. Returns `false` for other kinds.
    pub fn set_channel_width(&mut self, to: f64) -> bool {
        match &mut self.geometry {
            Geometry::Channel { width, .. } => {
                *width = to;
                true
            }
            _ => false,
        }
    }
}
