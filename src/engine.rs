//! Composition root: owns the stores, the tool registry and the chart adapter,
//! and turns host input into store mutations.
//!
//! Pointer events go to the active tool first. With no active tool the engine
//! runs select mode: hit-test, then select-and-move, handle drag, or marquee.
//! Every handler returns the [`Action`]s the host should perform. Store and
//! settings notifications are coalesced into at most one
//! [`Action::RenderNeeded`] per handler call.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, info};

use crate::bridge::{CoordinateBridge, DataSpacePoint};
use crate::chart::ChartAdapter;
use crate::config::EngineConfig;
use crate::geom::rect_from_points;
use crate::hit::{Hit, HitPart, Projector, Tolerance, Viewport, channel_width_at, hit_test, marquee_select};
use crate::input::{Button, InputState, Key, Modifiers, PointerEvent};
use crate::render::{self, Painter, Scene};
use crate::settings::{Settings, SettingsStore};
use crate::shape::{Geometry, Shape, ShapeId};
use crate::storage::Storage;
use crate::store::{ActiveChart, ChartKey, DrawingStore};
use crate::tools::builtin::register_builtins;
use crate::tools::{ToolEnv, ToolRegistry};

const CURSOR_DEFAULT: &str = "default";
const CURSOR_DRAW: &str = "crosshair";
const CURSOR_MOVE: &str = "move";
const CURSOR_GRAB: &str = "grabbing";

/// Index of the width handle on a two-point channel.
const CHANNEL_WIDTH_HANDLE: usize = 2;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Redraw the annotation layer.
    RenderNeeded,
    /// The event was consumed; do not let the chart pan or zoom on it.
    SuppressChartInteraction,
    SetCursor(String),
}

/// Core engine state. Headless: the host supplies the chart adapter, the
/// storage backend and, at render time, a [`Painter`].
pub struct EngineCore {
    pub config: EngineConfig,
    pub store: DrawingStore,
    pub settings: SettingsStore,
    pub tools: ToolRegistry,
    pub bridge: CoordinateBridge,
    pub input: InputState,
    chart: Box<dyn ChartAdapter>,
    active: ActiveChart,
    viewport: Viewport,
    dirty: Rc<Cell<bool>>,
}

impl EngineCore {
    /// Build the engine for `key`, load its drawings, and register and mount
    /// the built-in tools.
    pub fn new(config: EngineConfig, storage: Rc<dyn Storage>, chart: Box<dyn ChartAdapter>, key: ChartKey) -> Self {
        let active = ActiveChart::new(key);
        let mut store = DrawingStore::open(Rc::clone(&storage), config.storage_prefix.clone(), active.clone());
        store.set_history_limit(config.history_limit);
        let mut settings = SettingsStore::open(storage, config.settings_key.clone());

        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        store.subscribe(move |_| flag.set(true));
        let flag = Rc::clone(&dirty);
        settings.subscribe(move |_| flag.set(true));

        let mut tools = ToolRegistry::new();
        register_builtins(&mut tools);
        tools.mount();

        info!(key = %store.storage_key(), shapes = store.shapes().len(), "engine: ready");
        Self {
            bridge: CoordinateBridge::new(config.price_snap_tolerance_px),
            config,
            store,
            settings,
            tools,
            input: InputState::default(),
            chart,
            active,
            viewport: Viewport::default(),
            dirty,
        }
    }

    // --- Host inputs ---

    /// Update the canvas size in CSS pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.viewport = Viewport::new(width, height);
        vec![Action::RenderNeeded]
    }

    /// Record where the canvas sits in client coordinates.
    pub fn set_canvas_origin(&mut self, left: f64, top: f64) {
        self.bridge.set_canvas_origin(left, top);
    }

    /// Swap the chart adapter, e.g. after the host rebuilt its chart.
    pub fn set_chart(&mut self, chart: Box<dyn ChartAdapter>) -> Vec<Action> {
        self.chart = chart;
        vec![Action::RenderNeeded]
    }

    /// The chart's visible time or price range changed.
    pub fn visible_range_changed(&mut self) -> Vec<Action> {
        debug!("engine: visible range changed");
        vec![Action::RenderNeeded]
    }

    /// Switch to another `(symbol, timeframe)` and load its drawings.
    ///
    /// Any gesture or half-drawn shape on the outgoing chart is abandoned
    /// first, so nothing leaks into the new chart's list. Undo history
    /// belongs to the outgoing chart and is dropped.
    pub fn set_active_chart(&mut self, symbol: &str, timeframe: &str) -> Vec<Action> {
        let key = ChartKey::new(symbol, timeframe);
        if self.active.get() == key {
            return Vec::new();
        }
        self.tools.cancel();
        self.abandon_gesture();
        self.store.clear_selection();
        self.active.set(key);
        self.store.load_current();
        self.store.clear_history();
        self.finish(Vec::new())
    }

    /// Activate a drawing tool, or return to select mode with `None`.
    ///
    /// An unknown id changes nothing and yields no actions.
    pub fn set_active_tool(&mut self, id: Option<&str>) -> Vec<Action> {
        if !self.tools.set_active_tool(id) {
            return Vec::new();
        }
        self.abandon_gesture();
        let cursor = if id.is_some() { CURSOR_DRAW } else { CURSOR_DEFAULT };
        vec![Action::SetCursor(cursor.to_owned()), Action::RenderNeeded]
    }

    /// Detach every listener and unmount the tools.
    pub fn teardown(&mut self) {
        self.tools.unmount();
        self.store.clear_listeners();
        self.settings.clear_listeners();
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, event: &PointerEvent) -> Vec<Action> {
        let settings = self.effective_settings();
        if self.tools.has_active_tool() {
            return self.dispatch_tool(&settings, |tools, env| tools.pointer_down(event, env));
        }
        if event.button != Button::Primary {
            return Vec::new();
        }

        let point = self.to_data_space(&settings, event);
        let hit = self.hit(&settings, &point);
        let mut actions = vec![Action::SuppressChartInteraction];
        match hit {
            Some(Hit { shape_id, .. }) if event.modifiers.shift => {
                self.store.toggle(&shape_id);
            }
            Some(Hit { shape_id, part }) => {
                if !self.store.is_selected(&shape_id) {
                    self.store.select_one(Some(&shape_id));
                }
                let locked = self.store.get(&shape_id).is_some_and(|s| s.locked);
                self.store.begin_gesture();
                self.input = match part {
                    HitPart::Handle(index) if !locked => {
                        actions.push(Action::SetCursor(CURSOR_GRAB.to_owned()));
                        InputState::DraggingHandle { id: shape_id, index }
                    }
                    _ => {
                        actions.push(Action::SetCursor(CURSOR_MOVE.to_owned()));
                        InputState::MovingSelection { last: point.snapped }
                    }
                };
            }
            None => {
                if !event.modifiers.shift {
                    self.store.clear_selection();
                }
                let at = point.pixel();
                self.input = InputState::Marquee { start: at, current: at };
                actions.push(Action::RenderNeeded);
            }
        }
        self.finish(actions)
    }

    pub fn on_pointer_move(&mut self, event: &PointerEvent) -> Vec<Action> {
        let settings = self.effective_settings();
        if self.tools.has_active_tool() {
            return self.dispatch_tool(&settings, |tools, env| tools.pointer_move(event, env));
        }

        let point = self.to_data_space(&settings, event);
        if self.input.is_idle() {
            let cursor = if self.hit(&settings, &point).is_some() { CURSOR_MOVE } else { CURSOR_DEFAULT };
            return vec![Action::SetCursor(cursor.to_owned())];
        }
        let mut actions = Vec::new();
        match &mut self.input {
            InputState::Idle => {}
            InputState::MovingSelection { last } => {
                let (dt, dp) = (point.snapped.t - last.t, point.snapped.p - last.p);
                *last = point.snapped;
                if dt != 0.0 || dp != 0.0 {
                    self.store.move_selected_by(dt, dp);
                }
                actions.push(Action::SuppressChartInteraction);
            }
            InputState::DraggingHandle { id, index } => {
                let (id, index) = (id.clone(), *index);
                self.drag_handle(&settings, &id, index, &point);
                actions.push(Action::SuppressChartInteraction);
            }
            InputState::Marquee { current, .. } => {
                *current = point.pixel();
                actions.extend([Action::SuppressChartInteraction, Action::RenderNeeded]);
            }
        }
        self.finish(actions)
    }

    pub fn on_pointer_up(&mut self, event: &PointerEvent) -> Vec<Action> {
        let settings = self.effective_settings();
        if self.tools.has_active_tool() {
            return self.dispatch_tool(&settings, |tools, env| tools.pointer_up(event, env));
        }

        let mut actions = Vec::new();
        match std::mem::take(&mut self.input) {
            InputState::Idle => return actions,
            InputState::MovingSelection { .. } | InputState::DraggingHandle { .. } => {
                self.store.end_gesture();
                actions.push(Action::SetCursor(CURSOR_MOVE.to_owned()));
            }
            InputState::Marquee { start, .. } => {
                let end = self.to_data_space(&settings, event).pixel();
                let rect = rect_from_points(start, end);
                let projector = Projector::new(self.chart.as_ref(), &settings, self.viewport);
                let mut ids: BTreeSet<ShapeId> = marquee_select(&rect, self.store.shapes(), &projector).into_iter().collect();
                if event.modifiers.shift {
                    ids.extend(self.store.selection().iter().cloned());
                }
                debug!(selected = ids.len(), "engine: marquee");
                self.store.set_selection(ids);
                actions.push(Action::RenderNeeded);
            }
        }
        actions.push(Action::SuppressChartInteraction);
        self.finish(actions)
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        let command = modifiers.command();
        if key.is("Escape") {
            self.tools.cancel();
            self.abandon_gesture();
            self.store.clear_selection();
            return self.finish(vec![Action::RenderNeeded]);
        }
        if key.is("Delete") || key.is("Backspace") {
            if self.store.selection().is_empty() {
                return Vec::new();
            }
            self.abandon_gesture();
            self.store.remove_selected();
        } else if command && key.is("a") {
            self.store.select_all();
        } else if command && key.is("z") {
            self.input = InputState::Idle;
            if modifiers.shift { self.store.redo() } else { self.store.undo() }
        } else if command && key.is("y") {
            self.input = InputState::Idle;
            self.store.redo();
        } else if !command && key.is(&self.settings.get().snap_toggle_key) {
            let on = self.settings.toggle_snap();
            debug!(snap = on, "engine: grid snap toggled");
        } else {
            return Vec::new();
        }
        self.finish(Vec::new())
    }

    // --- Render ---

    /// Draw the annotation layer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any painter call fails.
    pub fn render<P: Painter>(&self, painter: &mut P) -> Result<(), P::Error> {
        let settings = self.effective_settings();
        let projector = Projector::new(self.chart.as_ref(), &settings, self.viewport);
        let scene = Scene {
            shapes: self.store.shapes(),
            selection: self.store.selection(),
            ghost: self.tools.ghost(),
            marquee: self.input.marquee_rect(),
            handle_size: self.config.handle_size_px,
        };
        render::draw(painter, &scene, &projector)
    }

    // --- Queries ---

    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        self.store.shapes()
    }

    #[must_use]
    pub fn selection(&self) -> &BTreeSet<ShapeId> {
        self.store.selection()
    }

    #[must_use]
    pub fn active_chart(&self) -> ChartKey {
        self.active.get()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn chart(&self) -> &dyn ChartAdapter {
        self.chart.as_ref()
    }

    /// Settings with the active symbol's overrides applied.
    #[must_use]
    pub fn effective_settings(&self) -> Settings {
        self.settings.effective_for(&self.active.symbol())
    }

    // --- Internals ---

    fn dispatch_tool(
        &mut self,
        settings: &Settings,
        dispatch: impl FnOnce(&mut ToolRegistry, &mut ToolEnv<'_>) -> bool,
    ) -> Vec<Action> {
        let mut env = ToolEnv { store: &mut self.store, settings, chart: self.chart.as_ref(), bridge: &self.bridge };
        let consumed = dispatch(&mut self.tools, &mut env);
        self.finish(tool_actions(consumed))
    }

    fn to_data_space(&self, settings: &Settings, event: &PointerEvent) -> DataSpacePoint {
        self.bridge.to_data_space(self.chart.as_ref(), settings, event.client_x, event.client_y)
    }

    fn hit(&self, settings: &Settings, point: &DataSpacePoint) -> Option<Hit> {
        let projector = Projector::new(self.chart.as_ref(), settings, self.viewport);
        let tol = Tolerance { line_px: self.config.hit_tolerance_px, handle_px: self.config.handle_size_px };
        hit_test(point.pixel(), self.store.shapes(), &projector, tol)
    }

    /// Move anchor `index` of `id` to the pointer. The width handle of a
    /// two-point channel sets the width instead.
    fn drag_handle(&mut self, settings: &Settings, id: &str, index: usize, point: &DataSpacePoint) {
        let Some(shape) = self.store.get(id) else {
            return;
        };
        let width = match shape.geometry {
            Geometry::Channel { .. } if index == CHANNEL_WIDTH_HANDLE => {
                let projector = Projector::new(self.chart.as_ref(), settings, self.viewport);
                channel_width_at(shape, point, &projector)
            }
            _ => None,
        };
        let to = point.snapped;
        self.store.update_shape(id, |s| {
            let mut next = s.clone();
            match width {
                Some(width) => next.set_channel_width(width),
                None => next.set_anchor(index, to),
            };
            next
        });
    }

    /// Close any select-mode gesture, restoring the shapes it touched.
    fn abandon_gesture(&mut self) {
        if !std::mem::take(&mut self.input).is_idle() {
            self.store.cancel_gesture();
        }
    }

    /// Append one `RenderNeeded` if the stores changed during this call.
    fn finish(&self, mut actions: Vec<Action>) -> Vec<Action> {
        if self.dirty.replace(false) && !actions.contains(&Action::RenderNeeded) {
            actions.push(Action::RenderNeeded);
        }
        actions
    }
}

/// Actions for a tool dispatch. A consumed event may have moved the ghost.
fn tool_actions(consumed: bool) -> Vec<Action> {
    if consumed { vec![Action::SuppressChartInteraction, Action::RenderNeeded] } else { Vec::new() }
}
