//! Tool plugin protocol and registry.
//!
//! A tool receives pointer events while it is the active tool and mutates the
//! drawing store through a [`ToolContext`]. Every handler is optional: the
//! trait supplies no-op defaults, so a tool implements only what it needs.
//!
//! Multi-click tools keep their pending anchors in their own fields until the
//! shape is complete, then commit it with a single `ctx.draw().add(..)`. While
//! pending they publish a [`Ghost`] preview, which lives on the registry and
//! is cleared on commit, on cancel, and whenever the active tool changes.
//!
//! Handler errors never reach the host: the registry logs them and reports
//! the event as unconsumed.

pub mod builtin;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use tracing::{debug, warn};

use crate::bridge::{CoordinateBridge, DataSpacePoint, data_to_pixel, pixel_to_data};
use crate::chart::ChartAdapter;
use crate::error::ToolError;
use crate::geom::Point;
use crate::input::PointerEvent;
use crate::settings::Settings;
use crate::shape::{DataPoint, Shape, ShapeId};
use crate::store::DrawingStore;

/// A provisional shape drawn while a multi-click tool awaits its next anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    /// Id of the tool that published it.
    pub plugin_id: String,
    pub shape: Shape,
}

/// A pluggable pointer handler.
///
/// Handlers return `Ok(true)` when they consumed the event, in which case the
/// host suppresses the chart's own pan/zoom for it.
pub trait ToolPlugin {
    /// Unique registry key, e.g. `"trendline-plus"`.
    fn id(&self) -> &str;

    fn on_pointer_down(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        Ok(false)
    }

    fn on_pointer_move(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        Ok(false)
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        Ok(false)
    }

    /// Called once when the registry's environment becomes available.
    fn mount(&mut self) {}

    /// Called once when the environment is torn down.
    fn unmount(&mut self) {}

    /// Drop any in-progress multi-click state.
    fn cancel(&mut self) {}

    /// Whether a multi-click draw is in progress.
    fn is_pending(&self) -> bool {
        false
    }
}

/// Everything a tool dispatch needs from the host, borrowed per event.
pub struct ToolEnv<'a> {
    pub store: &'a mut DrawingStore,
    pub settings: &'a Settings,
    pub chart: &'a dyn ChartAdapter,
    pub bridge: &'a CoordinateBridge,
}

/// Drawing-store mutators exposed to tools.
pub struct Draw<'a> {
    store: &'a mut DrawingStore,
}

impl Draw<'_> {
    /// Commit a finished shape, returning its id.
    pub fn add(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id.clone();
        self.store.add_shape(shape);
        id
    }

    pub fn update(&mut self, id: &str, updater: impl FnOnce(&Shape) -> Shape) {
        self.store.update_shape(id, updater);
    }

    /// Select exactly `id`.
    pub fn select(&mut self, id: &str) {
        self.store.select_one(Some(id));
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }
}

/// Per-event context handed to tool handlers.
pub struct ToolContext<'a> {
    point: DataSpacePoint,
    store: &'a mut DrawingStore,
    settings: &'a Settings,
    chart: &'a dyn ChartAdapter,
    ghost: &'a mut Option<Ghost>,
    tool_id: &'a str,
}

impl<'a> ToolContext<'a> {
    pub(crate) fn new(
        point: DataSpacePoint,
        store: &'a mut DrawingStore,
        settings: &'a Settings,
        chart: &'a dyn ChartAdapter,
        ghost: &'a mut Option<Ghost>,
        tool_id: &'a str,
    ) -> Self {
        Self { point, store, settings, chart, ghost, tool_id }
    }

    /// The event position in pixels, raw data space, and snapped data space.
    #[must_use]
    pub fn xy(&self) -> DataSpacePoint {
        self.point
    }

    /// Data space to canvas pixels for the current chart scale.
    #[must_use]
    pub fn to_pixel(&self, pt: DataPoint) -> Option<Point> {
        data_to_pixel(self.chart, pt)
    }

    /// Canvas pixels to data space, falling back to `0` per axis.
    #[must_use]
    pub fn to_data(&self, pixel: Point) -> DataPoint {
        pixel_to_data(self.chart, pixel)
    }

    #[must_use]
    pub fn chart(&self) -> &dyn ChartAdapter {
        self.chart
    }

    /// Effective settings for the active symbol.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.settings
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        self.store.active().symbol()
    }

    #[must_use]
    pub fn timeframe(&self) -> String {
        self.store.active().timeframe()
    }

    /// Store mutators.
    pub fn draw(&mut self) -> Draw<'_> {
        Draw { store: &mut *self.store }
    }

    /// Publish a preview tagged with this tool's id.
    pub fn set_ghost(&mut self, shape: Shape) {
        *self.ghost = Some(Ghost { plugin_id: self.tool_id.to_owned(), shape });
    }

    pub fn clear_ghost(&mut self) {
        *self.ghost = None;
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Down,
    Move,
    Up,
}

/// Registered tools, the active tool, and the current ghost.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn ToolPlugin>>,
    active: Option<String>,
    ghost: Option<Ghost>,
    mounted: bool,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A tool with the same id replaces the earlier one.
    pub fn register(&mut self, mut tool: Box<dyn ToolPlugin>) {
        if self.mounted {
            tool.mount();
        }
        let id = tool.id().to_owned();
        match self.tools.iter().position(|t| t.id() == id) {
            Some(index) => {
                debug!(tool = %id, "tools: replacing registration");
                let mut old = std::mem::replace(&mut self.tools[index], tool);
                old.cancel();
                if self.mounted {
                    old.unmount();
                }
                if self.active.as_deref() == Some(id.as_str()) {
                    self.ghost = None;
                }
            }
            None => self.tools.push(tool),
        }
    }

    /// Registered tool ids, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.id()).collect()
    }

    /// Activate a tool, or return to select mode with `None`.
    ///
    /// The outgoing tool's pending anchors and the ghost are discarded. An
    /// unknown id is rejected and leaves the active tool unchanged.
    pub fn set_active_tool(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id {
            if !self.tools.iter().any(|t| t.id() == id) {
                warn!(tool = %id, "tools: activating unknown tool");
                return false;
            }
        }
        self.cancel();
        self.active = id.map(str::to_owned);
        debug!(tool = ?self.active, "tools: active tool changed");
        true
    }

    #[must_use]
    pub fn active_tool_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    #[must_use]
    pub fn has_active_tool(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the active tool is mid-draw.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.active_index().is_some_and(|i| self.tools[i].is_pending())
    }

    #[must_use]
    pub fn ghost(&self) -> Option<&Ghost> {
        self.ghost.as_ref()
    }

    /// Abandon the active tool's in-progress draw and clear the ghost.
    pub fn cancel(&mut self) {
        if let Some(index) = self.active_index() {
            self.tools[index].cancel();
        }
        self.ghost = None;
    }

    /// Mount every tool. Tools registered later are mounted on registration.
    pub fn mount(&mut self) {
        if std::mem::replace(&mut self.mounted, true) {
            return;
        }
        for tool in &mut self.tools {
            tool.mount();
        }
    }

    pub fn unmount(&mut self) {
        if !std::mem::take(&mut self.mounted) {
            return;
        }
        self.cancel();
        for tool in &mut self.tools {
            tool.unmount();
        }
    }

    pub fn pointer_down(&mut self, event: &PointerEvent, env: &mut ToolEnv<'_>) -> bool {
        self.dispatch(Phase::Down, event, env)
    }

    pub fn pointer_move(&mut self, event: &PointerEvent, env: &mut ToolEnv<'_>) -> bool {
        self.dispatch(Phase::Move, event, env)
    }

    pub fn pointer_up(&mut self, event: &PointerEvent, env: &mut ToolEnv<'_>) -> bool {
        self.dispatch(Phase::Up, event, env)
    }

    fn active_index(&self) -> Option<usize> {
        let active = self.active.as_deref()?;
        self.tools.iter().position(|t| t.id() == active)
    }

    fn dispatch(&mut self, phase: Phase, event: &PointerEvent, env: &mut ToolEnv<'_>) -> bool {
        let Some(index) = self.active_index() else {
            return false;
        };
        let point = env.bridge.to_data_space(env.chart, env.settings, event.client_x, event.client_y);
        let tool = &mut self.tools[index];
        let tool_id = tool.id().to_owned();
        let mut ctx = ToolContext::new(point, &mut *env.store, env.settings, env.chart, &mut self.ghost, &tool_id);
        let result = match phase {
            Phase::Down => tool.on_pointer_down(event, &mut ctx),
            Phase::Move => tool.on_pointer_move(event, &mut ctx),
            Phase::Up => tool.on_pointer_up(event, &mut ctx),
        };
        result.unwrap_or_else(|err| {
            warn!(tool = %tool_id, error = %err, "tools: handler failed");
            false
        })
    }
}
