//! Built-in drawing tools.
//!
//! Two- and three-click tools hold their pending anchors locally and publish
//! a ghost while waiting. Single-click tools commit on pointer-down. Every
//! committed shape becomes the selection.

#[cfg(test)]
#[path = "builtin_test.rs"]
mod builtin_test;

use tracing::debug;

use super::{ToolContext, ToolPlugin, ToolRegistry};
use crate::error::ToolError;
use crate::input::PointerEvent;
use crate::shape::{DataPoint, Geometry, Shape, WidthMode};

pub const TRENDLINE: &str = "trendline-plus";
pub const RAY: &str = "ray";
pub const RECTANGLE: &str = "rectangle";
pub const HLINE: &str = "hline";
pub const VLINE: &str = "vline";
pub const ARROW: &str = "arrow";
pub const TEXT: &str = "text";
pub const FIBONACCI: &str = "fibonacci";
pub const CHANNEL: &str = "parallel-channel";
pub const CHANNEL3: &str = "parallel-channel-3";
pub const RULER: &str = "ruler";

/// Pixel span assumed for pixel-mode channel widths when the chart cannot
/// report its visible price range.
const FALLBACK_SPAN_PX: f64 = 100.0;

const DEFAULT_TEXT: &str = "Text";

type BuildTwo = fn(&ToolContext<'_>, DataPoint, DataPoint) -> Geometry;
type BuildOne = fn(DataPoint) -> Geometry;

/// Every built-in tool, in toolbar order.
#[must_use]
pub fn builtins() -> Vec<Box<dyn ToolPlugin>> {
    vec![
        Box::new(TwoPointTool::new(TRENDLINE, |_, a, b| Geometry::Trendline { points: [a, b] })),
        Box::new(TwoPointTool::new(RAY, |_, a, b| Geometry::Ray { points: [a, b] })),
        Box::new(TwoPointTool::new(RECTANGLE, |_, a, b| Geometry::Rect { points: [a, b] })),
        Box::new(OneClickTool::new(HLINE, |at| Geometry::Hline { y: at.p })),
        Box::new(OneClickTool::new(VLINE, |at| Geometry::Vline { x: at.t })),
        Box::new(TwoPointTool::new(ARROW, |_, a, b| Geometry::Arrow { points: [a, b] })),
        Box::new(TextTool::default()),
        Box::new(TwoPointTool::new(FIBONACCI, |ctx, a, b| Geometry::Fib {
            points: [a, b],
            levels: ctx.settings().fib_levels(),
        })),
        Box::new(TwoPointTool::new(CHANNEL, build_channel)),
        Box::new(ThreePointChannelTool::default()),
        Box::new(TwoPointTool::new(RULER, |_, a, b| Geometry::Measure { points: [a, b] })),
    ]
}

/// Register every built-in tool.
pub fn register_builtins(registry: &mut ToolRegistry) {
    for tool in builtins() {
        registry.register(tool);
    }
}

/// The event's snapped anchor, or an error if the chart could not map the
/// pointer at all.
fn anchor(ctx: &ToolContext<'_>) -> Result<DataPoint, ToolError> {
    let xy = ctx.xy();
    let chart = ctx.chart();
    if chart.coordinate_to_time(xy.x).is_none() || chart.coordinate_to_price(xy.y).is_none() {
        return Err(ToolError::Projection { x: xy.x, y: xy.y });
    }
    Ok(xy.snapped)
}

fn ghost_shape(tool_id: &str, geometry: Geometry) -> Shape {
    Shape::with_id(format!("ghost:{tool_id}"), geometry)
}

fn commit(ctx: &mut ToolContext<'_>, tool_id: &str, geometry: Geometry) {
    let shape = Shape::new(geometry);
    debug!(tool = %tool_id, id = %shape.id, kind = shape.kind().as_str(), "tools: committed shape");
    let mut draw = ctx.draw();
    let id = draw.add(shape);
    draw.select(&id);
    ctx.clear_ghost();
}

/// Width for a new two-point channel, as a share of the visible price span.
fn build_channel(ctx: &ToolContext<'_>, a: DataPoint, b: DataPoint) -> Geometry {
    let settings = ctx.settings();
    let mode = settings.channel_width_mode;
    let share = settings.channel_default_width_pct / 100.0;
    let chart = ctx.chart();
    let range = chart.visible_price_range();
    let width = match mode {
        WidthMode::Price => range.map_or(a.p.abs(), |(lo, hi)| (hi - lo).abs()) * share,
        WidthMode::Pixels => {
            let span = range
                .and_then(|(lo, hi)| Some((chart.price_to_coordinate(lo)? - chart.price_to_coordinate(hi)?).abs()));
            span.unwrap_or(FALLBACK_SPAN_PX) * share
        }
    };
    Geometry::Channel { points: [a, b], width_mode: mode, width }
}

// =============================================================
// Two-click tools
// =============================================================

/// First click captures an anchor, second click commits.
pub struct TwoPointTool {
    id: &'static str,
    build: BuildTwo,
    pending: Option<DataPoint>,
}

impl TwoPointTool {
    #[must_use]
    pub fn new(id: &'static str, build: BuildTwo) -> Self {
        Self { id, build, pending: None }
    }

    /// The captured first anchor, while waiting for the second click.
    #[must_use]
    pub fn pending(&self) -> Option<DataPoint> {
        self.pending
    }
}

impl ToolPlugin for TwoPointTool {
    fn id(&self) -> &str {
        self.id
    }

    fn on_pointer_down(&mut self, _event: &PointerEvent, ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        let at = anchor(ctx)?;
        match self.pending.take() {
            None => {
                self.pending = Some(at);
                let preview = (self.build)(ctx, at, at);
                ctx.set_ghost(ghost_shape(self.id, preview));
            }
            Some(start) => {
                let geometry = (self.build)(ctx, start, at);
                commit(ctx, self.id, geometry);
            }
        }
        Ok(true)
    }

    fn on_pointer_move(&mut self, _event: &PointerEvent, ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        let Some(start) = self.pending else {
            return Ok(false);
        };
        let preview = (self.build)(ctx, start, ctx.xy().snapped);
        ctx.set_ghost(ghost_shape(self.id, preview));
        Ok(true)
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        Ok(self.pending.is_some())
    }

    fn cancel(&mut self) {
        self.pending = None;
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

// =============================================================
// Three-click channel
// =============================================================

/// Two clicks set the baseline, a third places the parallel edge.
#[derive(Default)]
pub struct ThreePointChannelTool {
    pending: Vec<DataPoint>,
}

impl ThreePointChannelTool {
    #[must_use]
    pub fn pending(&self) -> &[DataPoint] {
        &self.pending
    }

    fn geometry(&self, cursor: DataPoint, mode: WidthMode) -> Geometry {
        let a = self.pending.first().copied().unwrap_or(cursor);
        let b = self.pending.get(1).copied().unwrap_or(cursor);
        Geometry::Channel3 { points: [a, b, cursor], width_mode: mode, width: 0.0 }
    }
}

impl ToolPlugin for ThreePointChannelTool {
    fn id(&self) -> &str {
        CHANNEL3
    }

    fn on_pointer_down(&mut self, _event: &PointerEvent, ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        let at = anchor(ctx)?;
        let mode = ctx.settings().channel_width_mode;
        if self.pending.len() < 2 {
            self.pending.push(at);
            ctx.set_ghost(ghost_shape(CHANNEL3, self.geometry(at, mode)));
            return Ok(true);
        }
        let geometry = self.geometry(at, mode);
        self.pending.clear();
        commit(ctx, CHANNEL3, geometry);
        Ok(true)
    }

    fn on_pointer_move(&mut self, _event: &PointerEvent, ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        if self.pending.is_empty() {
            return Ok(false);
        }
        let mode = ctx.settings().channel_width_mode;
        ctx.set_ghost(ghost_shape(CHANNEL3, self.geometry(ctx.xy().snapped, mode)));
        Ok(true)
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        Ok(!self.pending.is_empty())
    }

    fn cancel(&mut self) {
        self.pending.clear();
    }

    fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

// =============================================================
// Single-click tools
// =============================================================

/// Commits on the first click.
pub struct OneClickTool {
    id: &'static str,
    build: BuildOne,
}

impl OneClickTool {
    #[must_use]
    pub fn new(id: &'static str, build: BuildOne) -> Self {
        Self { id, build }
    }
}

impl ToolPlugin for OneClickTool {
    fn id(&self) -> &str {
        self.id
    }

    fn on_pointer_down(&mut self, _event: &PointerEvent, ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        let at = anchor(ctx)?;
        commit(ctx, self.id, (self.build)(at));
        Ok(true)
    }
}

/// Places a text label. Re-register a [`TextTool::with_label`] to change the
/// content of new labels.
pub struct TextTool {
    label: String,
}

impl Default for TextTool {
    fn default() -> Self {
        Self { label: DEFAULT_TEXT.to_owned() }
    }
}

impl TextTool {
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ToolPlugin for TextTool {
    fn id(&self) -> &str {
        TEXT
    }

    fn on_pointer_down(&mut self, _event: &PointerEvent, ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        if self.label.trim().is_empty() {
            return Err(ToolError::Rejected("text label is empty".to_owned()));
        }
        let at = anchor(ctx)?;
        commit(ctx, TEXT, Geometry::Text { point: at, text: self.label.clone() });
        Ok(true)
    }
}
