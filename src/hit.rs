//! Projection of data-space shapes into pixels, and hit-testing against them.
//!
//! Shapes are stored in `(time, price)`. Every redraw and every pointer-down
//! re-projects them through the chart adapter into a [`Projected`] form that
//! both the renderer and the hit-tester read. A shape whose anchors cannot be
//! projected (off-scale, no data) is skipped rather than drawn at a bogus
//! position.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::bridge::{DataSpacePoint, data_to_pixel};
use crate::chart::ChartAdapter;
use crate::consts::{DEFAULT_FONT_SIZE_PX, GLYPH_WIDTH_RATIO, RAY_EXTENT_PX};
use crate::geom::{Point, Rect, distance_to_segment, normalize, perpendicular, rect_from_points, within_rect};
use crate::settings::Settings;
use crate::shape::{DataPoint, Geometry, Shape, ShapeId, WidthMode};

/// Visible canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect { x: 0.0, y: 0.0, w: self.width, h: self.height }
    }
}

/// One projected fibonacci guide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
    pub y: f64,
}

/// A shape in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    /// Trendline, arrow and ruler bodies.
    Segment { a: Point, b: Point },
    /// A ray from `a` through `b`, drawn out to `end`.
    Ray { a: Point, b: Point, end: Point },
    Horizontal { y: f64 },
    Vertical { x: f64 },
    /// A rectangle given by two opposite corners.
    Rect { a: Point, b: Point },
    Fib { a: Point, b: Point, levels: Vec<FibLevel> },
    Text { origin: Point, bounds: Rect },
    /// Baseline `a-b` and its parallel edge `a2-b2`. `third` is the free
    /// anchor of a three-point channel.
    Channel { a: Point, b: Point, a2: Point, b2: Point, third: Option<Point> },
    Group(Vec<Projected>),
}

impl Projected {
    /// Handle positions, indexed the way [`Shape::set_anchor`] indexes anchors.
    ///
    /// A two-point channel has a third handle on the parallel edge that
    /// adjusts its width.
    #[must_use]
    pub fn handles(&self) -> Vec<Point> {
        match self {
            Self::Segment { a, b } | Self::Ray { a, b, .. } | Self::Rect { a, b } | Self::Fib { a, b, .. } => {
                vec![*a, *b]
            }
            Self::Text { origin, .. } => vec![*origin],
            Self::Channel { a, b, third: Some(c), .. } => vec![*a, *b, *c],
            Self::Channel { a, b, a2, third: None, .. } => vec![*a, *b, *a2],
            Self::Horizontal { .. } | Self::Vertical { .. } | Self::Group(_) => Vec::new(),
        }
    }

    /// Whether `pt` lies on the body within `tol` pixels.
    #[must_use]
    pub fn body_contains(&self, pt: Point, tol: f64) -> bool {
        match self {
            Self::Segment { a, b } => distance_to_segment(pt, *a, *b) <= tol,
            Self::Ray { a, end, .. } => distance_to_segment(pt, *a, *end) <= tol,
            Self::Horizontal { y } => (pt.y - y).abs() <= tol,
            Self::Vertical { x } => (pt.x - x).abs() <= tol,
            Self::Rect { a, b } => within_rect(pt, &rect_from_points(*a, *b).inflate(tol)),
            Self::Fib { a, b, levels } => {
                let (left, right) = (a.x.min(b.x), a.x.max(b.x));
                distance_to_segment(pt, *a, *b) <= tol
                    || levels
                        .iter()
                        .any(|l| distance_to_segment(pt, Point::new(left, l.y), Point::new(right, l.y)) <= tol)
            }
            Self::Text { bounds, .. } => within_rect(pt, &bounds.inflate(tol)),
            // Channels are grabbed by their handles only.
            Self::Channel { .. } => false,
            Self::Group(children) => children.iter().any(|c| c.body_contains(pt, tol) || handle_at(c, pt, tol).is_some()),
        }
    }

    /// Whether any point of the shape falls within `rect`.
    #[must_use]
    pub fn touches(&self, rect: &Rect) -> bool {
        match self {
            Self::Horizontal { y } => *y >= rect.y && *y <= rect.bottom(),
            Self::Vertical { x } => *x >= rect.x && *x <= rect.right(),
            Self::Group(children) => children.iter().any(|c| c.touches(rect)),
            other => other.handles().into_iter().any(|p| within_rect(p, rect)),
        }
    }
}

/// Which part of a shape was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Handle(usize),
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub shape_id: ShapeId,
    pub part: HitPart,
}

/// Pixel slop for hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Distance from a line body that still counts as a hit.
    pub line_px: f64,
    /// Half side of a square handle.
    pub handle_px: f64,
}

/// Projects shapes for the current chart scale, settings and viewport.
#[derive(Clone, Copy)]
pub struct Projector<'a> {
    pub chart: &'a dyn ChartAdapter,
    pub settings: &'a Settings,
    pub viewport: Viewport,
}

impl<'a> Projector<'a> {
    #[must_use]
    pub fn new(chart: &'a dyn ChartAdapter, settings: &'a Settings, viewport: Viewport) -> Self {
        Self { chart, settings, viewport }
    }

    #[must_use]
    pub fn pixel(&self, pt: DataPoint) -> Option<Point> {
        data_to_pixel(self.chart, pt)
    }

    /// Project `shape` into pixels, or `None` if any anchor is off-scale.
    #[must_use]
    pub fn project(&self, shape: &Shape) -> Option<Projected> {
        let projected = match &shape.geometry {
            Geometry::Trendline { points } | Geometry::Arrow { points } | Geometry::Measure { points } => {
                Projected::Segment { a: self.pixel(points[0])?, b: self.pixel(points[1])? }
            }
            Geometry::Ray { points } => {
                let (a, b) = (self.pixel(points[0])?, self.pixel(points[1])?);
                let (nx, ny) = normalize(b.x - a.x, b.y - a.y);
                Projected::Ray { a, b, end: b.offset(nx * RAY_EXTENT_PX, ny * RAY_EXTENT_PX) }
            }
            Geometry::Hline { y } => Projected::Horizontal { y: self.chart.price_to_coordinate(*y)? },
            Geometry::Vline { x } => Projected::Vertical { x: self.chart.time_to_coordinate(*x)? },
            Geometry::Rect { points } => Projected::Rect { a: self.pixel(points[0])?, b: self.pixel(points[1])? },
            Geometry::Fib { points, levels } => self.project_fib(points, levels)?,
            Geometry::Text { point, text } => {
                let origin = self.pixel(*point)?;
                let font = shape.style.font_size.unwrap_or(DEFAULT_FONT_SIZE_PX);
                Projected::Text { origin, bounds: text_bounds(origin, text, font) }
            }
            Geometry::Channel { points, width_mode, width } => self.project_channel(points, *width_mode, *width)?,
            Geometry::Channel3 { points, .. } => {
                let [a, b, c] = *points;
                let offset = c.p - line_price(a, b, c.t);
                Projected::Channel {
                    a: self.pixel(a)?,
                    b: self.pixel(b)?,
                    a2: self.pixel(a.offset(0.0, offset))?,
                    b2: self.pixel(b.offset(0.0, offset))?,
                    third: Some(self.pixel(c)?),
                }
            }
            Geometry::Group { children } => {
                Projected::Group(children.iter().filter(|c| !c.hidden).filter_map(|c| self.project(c)).collect())
            }
        };
        Some(projected)
    }

    fn project_fib(&self, points: &[DataPoint; 2], levels: &[f64]) -> Option<Projected> {
        let [start, end] = *points;
        let ratios = if levels.is_empty() { self.settings.fib_levels() } else { levels.to_vec() };
        let levels = ratios
            .into_iter()
            .filter_map(|ratio| {
                let price = fib_price(start, end, ratio);
                Some(FibLevel { ratio, price, y: self.chart.price_to_coordinate(price)? })
            })
            .collect();
        Some(Projected::Fib { a: self.pixel(start)?, b: self.pixel(end)?, levels })
    }

    fn project_channel(&self, points: &[DataPoint; 2], mode: WidthMode, width: f64) -> Option<Projected> {
        let [a, b] = *points;
        let (pa, pb) = (self.pixel(a)?, self.pixel(b)?);
        let (a2, b2) = match mode {
            WidthMode::Price => (self.pixel(a.offset(0.0, width))?, self.pixel(b.offset(0.0, width))?),
            WidthMode::Pixels => {
                let (px, py) = edge_normal(pa, pb);
                (pa.offset(px * width, py * width), pb.offset(px * width, py * width))
            }
        };
        Some(Projected::Channel { a: pa, b: pb, a2, b2, third: None })
    }
}

/// Price of fibonacci `ratio` between `start` and `end`: ratio 0 sits on the
/// end anchor and ratio 1 on the start anchor.
#[must_use]
pub fn fib_price(start: DataPoint, end: DataPoint, ratio: f64) -> f64 {
    end.p - (end.p - start.p) * ratio
}

/// Price on the line through `a` and `b` at time `t`. A vertical baseline
/// yields `a.p`.
#[must_use]
pub fn line_price(a: DataPoint, b: DataPoint, t: f64) -> f64 {
    let dt = b.t - a.t;
    if dt.abs() <= f64::EPSILON {
        return a.p;
    }
    a.p + (b.p - a.p) * (t - a.t) / dt
}

/// Unit normal of the pixel segment `a-b`, pointing up for a left-to-right
/// baseline. Positive pixel widths offset along it.
fn edge_normal(a: Point, b: Point) -> (f64, f64) {
    let (nx, ny) = normalize(b.x - a.x, b.y - a.y);
    let (px, py) = perpendicular(nx, ny);
    (-px, -py)
}

#[allow(clippy::cast_precision_loss)]
fn text_bounds(origin: Point, text: &str, font: f64) -> Rect {
    let w = text.chars().count() as f64 * font * GLYPH_WIDTH_RATIO;
    Rect { x: origin.x, y: origin.y, w, h: font }
}

/// Index of the first handle of `projected` within `half` pixels of `pt`.
#[must_use]
pub fn handle_at(projected: &Projected, pt: Point, half: f64) -> Option<usize> {
    projected.handles().into_iter().position(|h| (h.x - pt.x).abs() <= half && (h.y - pt.y).abs() <= half)
}

/// The topmost visible shape under `pt`.
///
/// Shapes are tested last-drawn first. Within a shape a handle beats the
/// body, and a hit handle reports its anchor index.
#[must_use]
pub fn hit_test(pt: Point, shapes: &[Shape], projector: &Projector<'_>, tol: Tolerance) -> Option<Hit> {
    shapes.iter().rev().filter(|s| !s.hidden).find_map(|shape| {
        let projected = projector.project(shape)?;
        let part = match handle_at(&projected, pt, tol.handle_px) {
            Some(index) => HitPart::Handle(index),
            None if projected.body_contains(pt, tol.line_px) => HitPart::Body,
            None => return None,
        };
        Some(Hit { shape_id: shape.id.clone(), part })
    })
}

/// Ids of visible shapes with any point inside `rect`, in list order.
#[must_use]
pub fn marquee_select(rect: &Rect, shapes: &[Shape], projector: &Projector<'_>) -> Vec<ShapeId> {
    shapes
        .iter()
        .filter(|s| !s.hidden)
        .filter(|s| projector.project(s).is_some_and(|p| p.touches(rect)))
        .map(|s| s.id.clone())
        .collect()
}

/// New width for a two-point channel whose width handle is dragged to
/// `pointer`. `None` for any other shape.
///
/// Price-mode widths are the price distance from the baseline at the pointer
/// time; pixel-mode widths are the signed perpendicular pixel distance.
#[must_use]
pub fn channel_width_at(shape: &Shape, pointer: &DataSpacePoint, projector: &Projector<'_>) -> Option<f64> {
    let Geometry::Channel { points: [a, b], width_mode, .. } = &shape.geometry else {
        return None;
    };
    match width_mode {
        WidthMode::Price => Some(pointer.snapped.p - line_price(*a, *b, pointer.snapped.t)),
        WidthMode::Pixels => {
            let (pa, pb) = (projector.pixel(*a)?, projector.pixel(*b)?);
            let (px, py) = edge_normal(pa, pb);
            let p = pointer.pixel();
            Some((p.x - pa.x) * px + (p.y - pa.y) * py)
        }
    }
}
