//! Rendering: draws annotations, handles, ghosts and the marquee.
//!
//! The renderer reads state and produces draw calls. It never mutates the
//! stores. Every draw call goes through a [`Painter`], so the same pass drives
//! a browser canvas (see `web::CanvasPainter`) or a recorded [`DisplayList`]
//! in tests.
//!
//! Shapes are re-projected from data space on every pass. A shape whose
//! anchors the chart cannot place is skipped for that frame.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::collections::BTreeSet;
use std::convert::Infallible;

use crate::consts::{ARROW_ANGLE, DEFAULT_FONT_SIZE_PX, PREVIEW_DASH_PX};
use crate::geom::{Point, Rect, rect_from_points};
use crate::hit::{Projected, Projector};
use crate::settings::{ArrowHead, LineCap, Settings};
use crate::shape::{DataPoint, Geometry, Shape, ShapeId};
use crate::tools::Ghost;

/// Stroke color for shapes without a style override.
const DEFAULT_STROKE: &str = "#2962FF";

/// Line width for shapes without a style override.
const DEFAULT_LINE_WIDTH: f64 = 1.5;

const SELECTION_COLOR: &str = "#1E90FF";
const MARQUEE_FILL: &str = "rgba(30, 144, 255, 0.12)";
const HANDLE_FILL: &str = "#fff";

/// Ghost previews are drawn at this opacity.
const GHOST_ALPHA: f64 = 0.6;

/// Gap between a line and its label, in pixels.
const LABEL_OFFSET_PX: f64 = 4.0;

/// The drawing surface the renderer targets.
///
/// Method names follow the 2D canvas API. Only calls that can fail on a real
/// canvas return a `Result`.
pub trait Painter {
    type Error;

    fn save(&mut self);
    fn restore(&mut self);
    fn clear_rect(&mut self, rect: Rect);
    fn set_stroke_style(&mut self, color: &str);
    fn set_fill_style(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_line_cap(&mut self, cap: LineCap);
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_font(&mut self, font: &str);

    /// # Errors
    ///
    /// Returns `Err` if the backend rejects the dash pattern.
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), Self::Error>;

    fn begin_path(&mut self);
    fn move_to(&mut self, pt: Point);
    fn line_to(&mut self, pt: Point);
    fn close_path(&mut self);
    fn stroke(&mut self);
    fn fill(&mut self);
    fn stroke_rect(&mut self, rect: Rect);
    fn fill_rect(&mut self, rect: Rect);

    /// # Errors
    ///
    /// Returns `Err` if the backend fails to draw the text.
    fn fill_text(&mut self, text: &str, at: Point) -> Result<(), Self::Error>;
}

/// One recorded [`Painter`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    ClearRect(Rect),
    StrokeStyle(String),
    FillStyle(String),
    LineWidth(f64),
    LineCap(LineCap),
    GlobalAlpha(f64),
    Font(String),
    LineDash(Vec<f64>),
    BeginPath,
    MoveTo(Point),
    LineTo(Point),
    ClosePath,
    Stroke,
    Fill,
    StrokeRect(Rect),
    FillRect(Rect),
    FillText { text: String, at: Point },
}

/// A painter that records its calls instead of drawing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Every string passed to `fill_text`, in order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl Painter for DisplayList {
    type Error = Infallible;

    fn save(&mut self) {
        self.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.push(DrawCommand::Restore);
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::ClearRect(rect));
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.push(DrawCommand::StrokeStyle(color.to_owned()));
    }

    fn set_fill_style(&mut self, color: &str) {
        self.push(DrawCommand::FillStyle(color.to_owned()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawCommand::LineWidth(width));
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.push(DrawCommand::LineCap(cap));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.push(DrawCommand::GlobalAlpha(alpha));
    }

    fn set_font(&mut self, font: &str) {
        self.push(DrawCommand::Font(font.to_owned()));
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), Infallible> {
        self.push(DrawCommand::LineDash(segments.to_vec()));
        Ok(())
    }

    fn begin_path(&mut self) {
        self.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, pt: Point) {
        self.push(DrawCommand::MoveTo(pt));
    }

    fn line_to(&mut self, pt: Point) {
        self.push(DrawCommand::LineTo(pt));
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn stroke(&mut self) {
        self.push(DrawCommand::Stroke);
    }

    fn fill(&mut self) {
        self.push(DrawCommand::Fill);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::StrokeRect(rect));
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::FillRect(rect));
    }

    fn fill_text(&mut self, text: &str, at: Point) -> Result<(), Infallible> {
        self.push(DrawCommand::FillText { text: text.to_owned(), at });
        Ok(())
    }
}

/// Read-only view of everything one frame draws.
pub struct Scene<'a> {
    pub shapes: &'a [Shape],
    pub selection: &'a BTreeSet<ShapeId>,
    pub ghost: Option<&'a Ghost>,
    /// Marquee rectangle in canvas pixels, while a marquee drag is active.
    pub marquee: Option<Rect>,
    /// Half side of a square handle, in pixels.
    pub handle_size: f64,
}

/// Draw the full scene: shapes bottom-first, then handles, ghost and marquee.
///
/// # Errors
///
/// Returns `Err` if any painter call fails.
pub fn draw<P: Painter>(painter: &mut P, scene: &Scene<'_>, projector: &Projector<'_>) -> Result<(), P::Error> {
    painter.clear_rect(projector.viewport.bounds());

    for shape in scene.shapes.iter().filter(|s| !s.hidden) {
        draw_shape(painter, shape, projector, false)?;
    }

    if projector.settings.show_handles {
        for shape in scene.shapes.iter().filter(|s| !s.hidden && scene.selection.contains(&s.id)) {
            if let Some(projected) = projector.project(shape) {
                draw_handles(painter, &projected.handles(), scene.handle_size);
            }
        }
    }

    if let Some(ghost) = scene.ghost {
        draw_shape(painter, &ghost.shape, projector, true)?;
    }

    if let Some(rect) = scene.marquee {
        draw_marquee(painter, rect)?;
    }

    Ok(())
}

// =============================================================
// Shape dispatch
// =============================================================

fn draw_shape<P: Painter>(
    painter: &mut P,
    shape: &Shape,
    projector: &Projector<'_>,
    ghost: bool,
) -> Result<(), P::Error> {
    if let Geometry::Group { children } = &shape.geometry {
        for child in children.iter().filter(|c| !c.hidden) {
            draw_shape(painter, child, projector, ghost)?;
        }
        return Ok(());
    }
    let Some(projected) = projector.project(shape) else {
        return Ok(());
    };

    // Restore even when a style or draw call fails.
    painter.save();
    let result = apply_style(painter, shape, projector.settings, ghost)
        .and_then(|()| draw_projected(painter, shape, &projected, projector));
    painter.restore();
    result
}

fn draw_projected<P: Painter>(
    painter: &mut P,
    shape: &Shape,
    projected: &Projected,
    projector: &Projector<'_>,
) -> Result<(), P::Error> {
    let settings = projector.settings;
    match projected {
        Projected::Segment { a, b } => {
            stroke_line(painter, *a, *b);
            match &shape.geometry {
                Geometry::Arrow { .. } => draw_arrowhead(painter, *a, *b, settings),
                Geometry::Measure { points: [start, end] } if settings.show_line_labels => {
                    painter.fill_text(&ruler_label(*start, *end), b.offset(LABEL_OFFSET_PX, -LABEL_OFFSET_PX))?;
                }
                _ => {}
            }
        }
        Projected::Ray { a, end, .. } => stroke_line(painter, *a, *end),
        Projected::Horizontal { y } => {
            let width = projector.viewport.width;
            stroke_line(painter, Point::new(0.0, *y), Point::new(width, *y));
            if let Geometry::Hline { y: price } = shape.geometry {
                if settings.show_line_labels {
                    painter.fill_text(&format!("{price:.2}"), Point::new(LABEL_OFFSET_PX, y - LABEL_OFFSET_PX))?;
                }
            }
        }
        Projected::Vertical { x } => {
            stroke_line(painter, Point::new(*x, 0.0), Point::new(*x, projector.viewport.height));
        }
        Projected::Rect { a, b } => {
            let rect = rect_from_points(*a, *b);
            if let Some(fill) = &shape.style.fill {
                painter.set_fill_style(fill);
                painter.fill_rect(rect);
            }
            painter.stroke_rect(rect);
        }
        Projected::Fib { a, b, levels } => {
            let (left, right) = (a.x.min(b.x), a.x.max(b.x));
            painter.save();
            let dashed = painter.set_line_dash(&[PREVIEW_DASH_PX, PREVIEW_DASH_PX]);
            if dashed.is_ok() {
                stroke_line(painter, *a, *b);
            }
            painter.restore();
            dashed?;
            for level in levels {
                stroke_line(painter, Point::new(left, level.y), Point::new(right, level.y));
                if settings.show_line_labels {
                    let label = format!("{} ({:.2})", level.ratio, level.price);
                    painter.fill_text(&label, Point::new(left, level.y - LABEL_OFFSET_PX))?;
                }
            }
        }
        Projected::Text { origin, bounds } => {
            let font = shape.style.font_size.unwrap_or(DEFAULT_FONT_SIZE_PX);
            if let Geometry::Text { text, .. } = &shape.geometry {
                painter.set_font(&format!("{font:.0}px sans-serif"));
                painter.fill_text(text, Point::new(origin.x, bounds.bottom()))?;
            }
        }
        Projected::Channel { a, b, a2, b2, .. } => {
            if let Some(fill) = &shape.style.fill {
                painter.set_fill_style(fill);
                painter.begin_path();
                painter.move_to(*a);
                painter.line_to(*b);
                painter.line_to(*b2);
                painter.line_to(*a2);
                painter.close_path();
                painter.fill();
            }
            stroke_line(painter, *a, *b);
            stroke_line(painter, *a2, *b2);
        }
        Projected::Group(_) => {}
    }
    Ok(())
}

/// Stroke, width, dash, opacity and cap for one shape. Ghosts are dashed and
/// faded regardless of their own style.
fn apply_style<P: Painter>(painter: &mut P, shape: &Shape, settings: &Settings, ghost: bool) -> Result<(), P::Error> {
    let style = &shape.style;
    let stroke = style.stroke.as_deref().unwrap_or(DEFAULT_STROKE);
    painter.set_stroke_style(stroke);
    painter.set_fill_style(stroke);
    painter.set_line_width(style.width.unwrap_or(DEFAULT_LINE_WIDTH));
    painter.set_line_cap(settings.line_cap);

    let alpha = style.opacity.unwrap_or(1.0).clamp(0.0, 1.0);
    if ghost {
        painter.set_global_alpha(alpha * GHOST_ALPHA);
        painter.set_line_dash(&[PREVIEW_DASH_PX, PREVIEW_DASH_PX])?;
    } else {
        painter.set_global_alpha(alpha);
        painter.set_line_dash(style.dash.as_deref().unwrap_or(&[]))?;
    }
    Ok(())
}

fn stroke_line<P: Painter>(painter: &mut P, a: Point, b: Point) {
    painter.begin_path();
    painter.move_to(a);
    painter.line_to(b);
    painter.stroke();
}

fn draw_arrowhead<P: Painter>(painter: &mut P, tail: Point, tip: Point, settings: &Settings) {
    if settings.arrow_head == ArrowHead::None {
        return;
    }
    let size = settings.arrow_size;
    let angle = (tip.y - tail.y).atan2(tip.x - tail.x);
    let left = Point::new(tip.x - size * (angle - ARROW_ANGLE).cos(), tip.y - size * (angle - ARROW_ANGLE).sin());
    let right = Point::new(tip.x - size * (angle + ARROW_ANGLE).cos(), tip.y - size * (angle + ARROW_ANGLE).sin());

    painter.begin_path();
    match settings.arrow_head {
        ArrowHead::Filled => {
            painter.move_to(tip);
            painter.line_to(left);
            painter.line_to(right);
            painter.close_path();
            painter.fill();
        }
        ArrowHead::Open => {
            painter.move_to(left);
            painter.line_to(tip);
            painter.line_to(right);
            painter.stroke();
        }
        ArrowHead::None => {}
    }
}

/// Price change and percent change between two ruler anchors, e.g.
/// `+10.00 (+100.00%)`. The percent is omitted when the start price is zero.
#[must_use]
pub fn ruler_label(start: DataPoint, end: DataPoint) -> String {
    let delta = end.p - start.p;
    if start.p.abs() <= f64::EPSILON {
        return format!("{delta:+.2}");
    }
    let pct = delta / start.p.abs() * 100.0;
    format!("{delta:+.2} ({pct:+.2}%)")
}

// =============================================================
// Selection UI
// =============================================================

fn draw_handles<P: Painter>(painter: &mut P, handles: &[Point], half: f64) {
    if handles.is_empty() {
        return;
    }
    painter.save();
    painter.set_fill_style(HANDLE_FILL);
    painter.set_stroke_style(SELECTION_COLOR);
    painter.set_line_width(1.0);
    for pos in handles {
        let rect = Rect { x: pos.x - half, y: pos.y - half, w: half * 2.0, h: half * 2.0 };
        painter.fill_rect(rect);
        painter.stroke_rect(rect);
    }
    painter.restore();
}

fn draw_marquee<P: Painter>(painter: &mut P, rect: Rect) -> Result<(), P::Error> {
    painter.save();
    let dashed = painter.set_line_dash(&[PREVIEW_DASH_PX, PREVIEW_DASH_PX]);
    if dashed.is_ok() {
        painter.set_stroke_style(SELECTION_COLOR);
        painter.set_fill_style(MARQUEE_FILL);
        painter.set_line_width(1.0);
        painter.fill_rect(rect);
        painter.stroke_rect(rect);
    }
    painter.restore();
    dashed
}
