//! Drawing store: the authoritative shape list for the active chart.
//!
//! The store owns the shape list, the selection set, and the undo/redo
//! history for whichever `(symbol, timeframe)` the shared [`ActiveChart`]
//! names. Every mutation is synchronous: it snapshots history (when the
//! operation is undoable), applies the change, persists the full list under
//! `<prefix>.<symbol>.<timeframe>`, then notifies subscribers once.
//!
//! Selection is a weak relation: ids of deleted shapes are dropped from the
//! selection in the same operation that deletes them. Selection changes are
//! not undoable but do notify.
//!
//! Pointer drags wrap many small mutations in a gesture
//! ([`DrawingStore::begin_gesture`]) so the whole drag undoes as one step.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::notify::{Listeners, SubscriptionId};
use crate::shape::{Shape, ShapeId};
use crate::storage::{Storage, load_json, save_json};

/// The `(symbol, timeframe)` pair drawings are partitioned by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartKey {
    pub symbol: String,
    pub timeframe: String,
}

impl ChartKey {
    #[must_use]
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), timeframe: timeframe.into() }
    }

    /// Storage key `<prefix>.<symbol>.<timeframe>`.
    #[must_use]
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{prefix}.{}.{}", self.symbol, self.timeframe)
    }
}

/// Shared handle to the active chart key.
///
/// The host owns the value; the drawing store and tools read it when they
/// need it. Cloning shares the same cell.
#[derive(Debug, Clone)]
pub struct ActiveChart(Rc<RefCell<ChartKey>>);

impl ActiveChart {
    #[must_use]
    pub fn new(key: ChartKey) -> Self {
        Self(Rc::new(RefCell::new(key)))
    }

    #[must_use]
    pub fn get(&self) -> ChartKey {
        self.0.borrow().clone()
    }

    pub fn set(&self, key: ChartKey) {
        *self.0.borrow_mut() = key;
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        self.0.borrow().symbol.clone()
    }

    #[must_use]
    pub fn timeframe(&self) -> String {
        self.0.borrow().timeframe.clone()
    }
}

#[derive(Debug, Default)]
struct History {
    undo: Vec<Vec<Shape>>,
    redo: Vec<Vec<Shape>>,
    limit: Option<usize>,
}

impl History {
    fn record(&mut self, snapshot: Vec<Shape>) {
        self.undo.push(snapshot);
        if let Some(limit) = self.limit {
            let excess = self.undo.len().saturating_sub(limit);
            self.undo.drain(..excess);
        }
        self.redo.clear();
    }
}

/// An open pointer gesture: the list as it was when the gesture began, and
/// whether that snapshot has been pushed onto the undo stack yet.
///
/// Recording clears the redo stack; `redo` keeps what it held so a gesture
/// that leaves no entry can put it back.
#[derive(Debug)]
struct Gesture {
    start: Vec<Shape>,
    recorded: bool,
    redo: Vec<Vec<Shape>>,
}

/// Authoritative shape list, selection and history for the active chart.
pub struct DrawingStore {
    storage: Rc<dyn Storage>,
    prefix: String,
    active: ActiveChart,
    shapes: Vec<Shape>,
    selection: BTreeSet<ShapeId>,
    history: History,
    gesture: Option<Gesture>,
    listeners: Listeners<DrawingStore>,
}

impl DrawingStore {
    /// Create a store and load the shapes for the active chart.
    pub fn open(storage: Rc<dyn Storage>, prefix: impl Into<String>, active: ActiveChart) -> Self {
        let mut store = Self {
            storage,
            prefix: prefix.into(),
            active,
            shapes: Vec::new(),
            selection: BTreeSet::new(),
            history: History::default(),
            gesture: None,
            listeners: Listeners::new(),
        };
        store.shapes = store.read_persisted();
        store
    }

    /// Bound the undo stack. `None` keeps every snapshot.
    pub fn set_history_limit(&mut self, limit: Option<usize>) {
        self.history.limit = limit;
    }

    // --- Queries ---

    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn selection(&self) -> &BTreeSet<ShapeId> {
        &self.selection
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }

    #[must_use]
    pub fn active(&self) -> &ActiveChart {
        &self.active
    }

    /// Storage key for the active chart.
    #[must_use]
    pub fn storage_key(&self) -> String {
        self.active.get().storage_key(&self.prefix)
    }

    // --- Shape mutations ---

    /// Append a shape. Its id must already be assigned and unique.
    ///
    /// A shape whose id is already present is rejected and logged.
    pub fn add_shape(&mut self, shape: Shape) {
        if self.get(&shape.id).is_some() {
            warn!(id = %shape.id, "drawings: rejecting duplicate shape id");
            return;
        }
        debug!(id = %shape.id, kind = shape.kind().as_str(), "drawings: add");
        self.snapshot();
        self.shapes.push(shape);
        self.commit();
    }

    /// Replace the shape `id` with `updater(shape)`. No-op if absent.
    ///
    /// The id is immutable: whatever id the updater returns is overwritten.
    pub fn update_shape(&mut self, id: &str, updater: impl FnOnce(&Shape) -> Shape) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let mut next = updater(&self.shapes[index]);
        next.id.clone_from(&self.shapes[index].id);
        self.snapshot();
        self.shapes[index] = next;
        self.commit();
    }

    /// Translate every selected, unlocked shape by `(dt, dp)` in data space.
    /// No-op if nothing selected can move.
    pub fn move_selected_by(&mut self, dt: f64, dp: f64) {
        if !self.shapes.iter().any(|s| !s.locked && self.selection.contains(&s.id)) {
            return;
        }
        self.snapshot();
        for shape in &mut self.shapes {
            if !shape.locked && self.selection.contains(&shape.id) {
                shape.translate(dt, dp);
            }
        }
        self.commit();
    }

    /// Delete every selected shape and clear the selection.
    pub fn remove_selected(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.snapshot();
        let selection = std::mem::take(&mut self.selection);
        self.shapes.retain(|s| !selection.contains(&s.id));
        debug!(removed = selection.len(), remaining = self.shapes.len(), "drawings: remove selected");
        self.commit();
    }

    /// Delete one shape. No-op if absent.
    pub fn remove_shape(&mut self, id: &str) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        self.snapshot();
        let removed = self.shapes.remove(index);
        self.selection.remove(&removed.id);
        self.commit();
    }

    /// Replace the whole list.
    pub fn replace_all(&mut self, shapes: Vec<Shape>) {
        self.snapshot();
        self.shapes = shapes;
        self.prune_selection();
        self.commit();
    }

    /// Empty the list and the selection. Undoable.
    pub fn clear(&mut self) {
        self.snapshot();
        self.shapes.clear();
        self.selection.clear();
        self.commit();
    }

    // --- Selection ---

    /// Select exactly `ids`. Unknown ids are ignored.
    pub fn set_selection<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<ShapeId>,
    {
        self.selection = ids.into_iter().map(Into::into).collect();
        self.prune_selection();
        self.notify();
    }

    /// Add `id` to the selection, or remove it if present.
    pub fn toggle(&mut self, id: &str) {
        if !self.selection.remove(id) {
            if self.get(id).is_none() {
                return;
            }
            self.selection.insert(id.to_owned());
        }
        self.notify();
    }

    /// Select only `id`, or nothing for `None`.
    pub fn select_one(&mut self, id: Option<&str>) {
        self.selection.clear();
        if let Some(id) = id {
            if self.get(id).is_some() {
                self.selection.insert(id.to_owned());
            }
        }
        self.notify();
    }

    /// Select every visible shape.
    pub fn select_all(&mut self) {
        self.selection = self.shapes.iter().filter(|s| !s.hidden).map(|s| s.id.clone()).collect();
        self.notify();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.notify();
    }

    // --- History ---

    /// Restore the previous snapshot. No-op if there is none.
    pub fn undo(&mut self) {
        let Some(previous) = self.history.undo.pop() else {
            return;
        };
        let current = std::mem::replace(&mut self.shapes, previous);
        self.history.redo.push(current);
        self.gesture = None;
        self.prune_selection();
        debug!(undo = self.history.undo.len(), redo = self.history.redo.len(), "drawings: undo");
        self.commit();
    }

    /// Reapply the most recently undone snapshot. No-op if there is none.
    pub fn redo(&mut self) {
        let Some(next) = self.history.redo.pop() else {
            return;
        };
        let current = std::mem::replace(&mut self.shapes, next);
        self.history.undo.push(current);
        self.gesture = None;
        self.prune_selection();
        debug!(undo = self.history.undo.len(), redo = self.history.redo.len(), "drawings: redo");
        self.commit();
    }

    /// Drop both history stacks.
    pub fn clear_history(&mut self) {
        self.history.undo.clear();
        self.history.redo.clear();
        self.gesture = None;
        debug!("drawings: history cleared");
    }

    // --- Gestures ---

    /// Open a multi-step interaction. Mutations until [`Self::end_gesture`]
    /// share a single undo entry, pushed on the first change.
    pub fn begin_gesture(&mut self) {
        if self.gesture.is_none() {
            self.gesture = Some(Gesture { start: self.shapes.clone(), recorded: false, redo: Vec::new() });
        }
    }

    /// Close the gesture. A gesture that changed nothing leaves no undo entry.
    pub fn end_gesture(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        if gesture.recorded && gesture.start == self.shapes {
            self.history.undo.pop();
            self.history.redo = gesture.redo;
        }
    }

    /// Abort the gesture, restoring the shapes from its start.
    pub fn cancel_gesture(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        if gesture.recorded {
            self.history.undo.pop();
            self.history.redo = gesture.redo;
            self.shapes = gesture.start;
            self.prune_selection();
            self.commit();
        }
    }

    #[must_use]
    pub fn gesture_open(&self) -> bool {
        self.gesture.is_some()
    }

    // --- Persistence ---

    /// Reload the list for the active chart, replacing in-memory state.
    ///
    /// The load itself pushes no snapshot and leaves both history stacks as
    /// they are. Selected ids that no longer exist are dropped.
    pub fn load_current(&mut self) {
        self.shapes = self.read_persisted();
        self.prune_selection();
        self.gesture = None;
        info!(key = %self.storage_key(), count = self.shapes.len(), "drawings: loaded");
        self.notify();
    }

    // --- Subscriptions ---

    /// Register a listener called synchronously, with the updated store,
    /// after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&DrawingStore) + 'static) -> SubscriptionId {
        self.listeners.add(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    /// Drop every listener, for view teardown.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    // --- Internals ---

    fn index_of(&self, id: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s.id == id)
    }

    fn snapshot(&mut self) {
        match &mut self.gesture {
            Some(gesture) if gesture.recorded => {}
            Some(gesture) => {
                gesture.recorded = true;
                gesture.redo = std::mem::take(&mut self.history.redo);
                self.history.record(gesture.start.clone());
            }
            None => self.history.record(self.shapes.clone()),
        }
    }

    fn prune_selection(&mut self) {
        let shapes = &self.shapes;
        self.selection.retain(|id| shapes.iter().any(|s| &s.id == id));
    }

    fn read_persisted(&self) -> Vec<Shape> {
        load_json::<Vec<Shape>>(self.storage.as_ref(), &self.storage_key()).unwrap_or_default()
    }

    fn commit(&mut self) {
        save_json(self.storage.as_ref(), &self.storage_key(), &self.shapes);
        self.notify();
    }

    fn notify(&mut self) {
        let mut listeners = std::mem::take(&mut self.listeners);
        listeners.notify(self);
        self.listeners = listeners;
    }
}
