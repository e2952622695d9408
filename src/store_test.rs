#![allow(clippy::float_cmp)]

use std::cell::RefCell;

use super::*;
use crate::shape::{DataPoint, Geometry};
use crate::storage::{MemoryStorage, load_json};

const PREFIX: &str = "test.drawings";

fn open_store() -> (Rc<MemoryStorage>, DrawingStore) {
    let storage = Rc::new(MemoryStorage::new());
    let active = ActiveChart::new(ChartKey::new("BTCUSD", "1h"));
    let store = DrawingStore::open(storage.clone(), PREFIX, active);
    (storage, store)
}

fn trendline(id: &str, a: (f64, f64), b: (f64, f64)) -> Shape {
    Shape::with_id(id, Geometry::Trendline { points: [DataPoint::new(a.0, a.1), DataPoint::new(b.0, b.1)] })
}

fn hline(id: &str, y: f64) -> Shape {
    Shape::with_id(id, Geometry::Hline { y })
}

fn ids(store: &DrawingStore) -> Vec<&str> {
    store.shapes().iter().map(|s| s.id.as_str()).collect()
}

// =============================================================
// Add / update / remove
// =============================================================

#[test]
fn add_appends_in_order() {
    let (_, mut store) = open_store();
    store.add_shape(trendline("a", (0.0, 10.0), (5.0, 20.0)));
    store.add_shape(hline("b", 42.0));
    assert_eq!(ids(&store), vec!["a", "b"]);
    assert!(store.can_undo());
}

#[test]
fn add_duplicate_id_is_ignored() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.add_shape(hline("a", 2.0));
    assert_eq!(store.shapes().len(), 1);
    assert_eq!(store.get("a").unwrap().geometry, Geometry::Hline { y: 1.0 });
}

#[test]
fn update_replaces_and_keeps_id() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.update_shape("a", |s| {
        let mut next = s.clone();
        next.id = "hijacked".to_owned();
        next.geometry = Geometry::Hline { y: 9.0 };
        next
    });
    assert_eq!(ids(&store), vec!["a"]);
    assert_eq!(store.get("a").unwrap().geometry, Geometry::Hline { y: 9.0 });
}

#[test]
fn update_missing_id_is_noop() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.undo();
    store.redo();
    let calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&calls);
    store.subscribe(move |_| *sink.borrow_mut() += 1);
    store.update_shape("nope", |s| s.clone());
    assert_eq!(*calls.borrow(), 0);
    assert!(!store.can_redo());
}

#[test]
fn remove_shape_drops_it_from_selection() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.add_shape(hline("b", 2.0));
    store.set_selection(["a", "b"]);
    store.remove_shape("a");
    assert_eq!(ids(&store), vec!["b"]);
    assert_eq!(store.selection().iter().collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn replace_all_is_undoable() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.replace_all(vec![hline("x", 5.0), hline("y", 6.0)]);
    assert_eq!(ids(&store), vec!["x", "y"]);
    store.undo();
    assert_eq!(ids(&store), vec!["a"]);
}

// =============================================================
// Move selected
// =============================================================

#[test]
fn move_selected_translates_points() {
    let (_, mut store) = open_store();
    store.add_shape(trendline("a", (0.0, 10.0), (5.0, 20.0)));
    store.add_shape(trendline("b", (1.0, 1.0), (2.0, 2.0)));
    store.select_one(Some("a"));
    store.move_selected_by(2.0, -3.0);
    assert_eq!(store.get("a").unwrap().anchors(), vec![DataPoint::new(2.0, 7.0), DataPoint::new(7.0, 17.0)]);
    assert_eq!(store.get("b").unwrap().anchors(), vec![DataPoint::new(1.0, 1.0), DataPoint::new(2.0, 2.0)]);
}

#[test]
fn move_selected_hline_and_vline_shift_one_axis() {
    let (_, mut store) = open_store();
    store.add_shape(hline("h", 100.0));
    store.add_shape(Shape::with_id("v", Geometry::Vline { x: 50.0 }));
    store.select_all();
    store.move_selected_by(7.0, 3.0);
    assert_eq!(store.get("h").unwrap().geometry, Geometry::Hline { y: 103.0 });
    assert_eq!(store.get("v").unwrap().geometry, Geometry::Vline { x: 57.0 });
}

#[test]
fn move_with_empty_selection_is_noop() {
    let (_, mut store) = open_store();
    store.add_shape(hline("h", 100.0));
    store.undo();
    store.redo();
    store.move_selected_by(1.0, 1.0);
    assert_eq!(store.get("h").unwrap().geometry, Geometry::Hline { y: 100.0 });
    store.undo();
    assert!(store.shapes().is_empty());
}

#[test]
fn move_skips_locked_shapes() {
    let (_, mut store) = open_store();
    let mut locked = hline("l", 10.0);
    locked.locked = true;
    store.add_shape(locked);
    store.add_shape(hline("f", 20.0));
    store.select_all();
    store.move_selected_by(0.0, 5.0);
    assert_eq!(store.get("l").unwrap().geometry, Geometry::Hline { y: 10.0 });
    assert_eq!(store.get("f").unwrap().geometry, Geometry::Hline { y: 25.0 });
}

#[test]
fn move_with_only_locked_shapes_selected_keeps_history() {
    let (_, mut store) = open_store();
    let mut locked = hline("l", 10.0);
    locked.locked = true;
    store.add_shape(locked);
    store.add_shape(hline("x", 20.0));
    store.undo();
    store.select_one(Some("l"));
    store.move_selected_by(0.0, 5.0);
    assert!(store.can_redo());
    store.redo();
    assert_eq!(ids(&store), vec!["l", "x"]);
    store.undo();
    store.undo();
    assert!(store.shapes().is_empty());
}

// =============================================================
// Selection
// =============================================================

#[test]
fn toggle_adds_then_removes() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.toggle("a");
    assert!(store.is_selected("a"));
    store.toggle("a");
    assert!(!store.is_selected("a"));
}

#[test]
fn selection_ignores_unknown_ids() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.set_selection(["a", "ghost"]);
    assert_eq!(store.selection().len(), 1);
    store.toggle("ghost");
    assert_eq!(store.selection().len(), 1);
    store.select_one(Some("ghost"));
    assert!(store.selection().is_empty());
}

#[test]
fn select_all_skips_hidden() {
    let (_, mut store) = open_store();
    let mut hidden = hline("h", 1.0);
    hidden.hidden = true;
    store.add_shape(hidden);
    store.add_shape(hline("v", 2.0));
    store.select_all();
    assert_eq!(store.selection().iter().collect::<Vec<_>>(), vec!["v"]);
}

#[test]
fn selection_changes_are_not_undoable() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.select_one(Some("a"));
    store.clear_selection();
    store.undo();
    assert!(store.shapes().is_empty());
    assert!(!store.can_undo());
}

#[test]
fn remove_selected_deletes_exactly_the_selection() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.add_shape(hline("b", 2.0));
    store.add_shape(hline("c", 3.0));
    store.set_selection(["a", "c"]);
    store.remove_selected();
    assert_eq!(ids(&store), vec!["b"]);
    assert!(store.selection().is_empty());
}

#[test]
fn remove_selected_with_empty_selection_is_noop() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.remove_selected();
    assert_eq!(ids(&store), vec!["a"]);
    store.undo();
    assert!(!store.can_undo());
}

// =============================================================
// Undo / redo
// =============================================================

#[test]
fn undo_then_redo_trendline() {
    let (_, mut store) = open_store();
    let line = trendline("t", (0.0, 10.0), (5.0, 20.0));
    store.add_shape(line.clone());
    store.undo();
    assert!(store.shapes().is_empty());
    store.redo();
    assert_eq!(store.shapes(), &[line]);
}

#[test]
fn undo_on_empty_history_is_noop() {
    let (_, mut store) = open_store();
    store.undo();
    store.redo();
    assert!(store.shapes().is_empty());
    assert!(!store.can_undo());
    assert!(!store.can_redo());
}

#[test]
fn undo_redo_inverse_law() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.add_shape(trendline("b", (0.0, 0.0), (1.0, 1.0)));
    store.select_one(Some("a"));
    store.move_selected_by(1.0, 1.0);
    store.update_shape("b", |s| {
        let mut next = s.clone();
        next.hidden = true;
        next
    });
    store.remove_selected();
    store.clear();
    let end = store.shapes().to_vec();
    let n = 6;

    for _ in 0..n {
        store.undo();
    }
    assert!(store.shapes().is_empty());
    assert!(!store.can_undo());

    for _ in 0..n {
        store.redo();
    }
    assert_eq!(store.shapes(), end.as_slice());
}

#[test]
fn new_mutation_clears_redo() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.undo();
    assert!(store.can_redo());
    store.add_shape(hline("b", 2.0));
    assert!(!store.can_redo());
}

#[test]
fn clear_is_undoable() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.select_one(Some("a"));
    store.clear();
    assert!(store.shapes().is_empty());
    assert!(store.selection().is_empty());
    store.undo();
    assert_eq!(ids(&store), vec!["a"]);
}

#[test]
fn undo_prunes_selection_of_vanished_shapes() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.select_one(Some("a"));
    store.undo();
    assert!(store.selection().is_empty());
}

#[test]
fn history_limit_drops_oldest() {
    let (_, mut store) = open_store();
    store.set_history_limit(Some(2));
    store.add_shape(hline("a", 1.0));
    store.add_shape(hline("b", 2.0));
    store.add_shape(hline("c", 3.0));
    store.undo();
    store.undo();
    store.undo();
    assert_eq!(ids(&store), vec!["a"]);
}

// =============================================================
// Gestures
// =============================================================

#[test]
fn gesture_collapses_many_moves_into_one_undo() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 0.0));
    store.select_one(Some("a"));
    store.begin_gesture();
    for _ in 0..5 {
        store.move_selected_by(0.0, 1.0);
    }
    store.end_gesture();
    assert_eq!(store.get("a").unwrap().geometry, Geometry::Hline { y: 5.0 });
    store.undo();
    assert_eq!(store.get("a").unwrap().geometry, Geometry::Hline { y: 0.0 });
}

#[test]
fn empty_gesture_leaves_history_untouched() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 0.0));
    store.undo();
    store.begin_gesture();
    store.end_gesture();
    assert!(store.can_redo());
    assert!(!store.can_undo());
}

#[test]
fn gesture_returning_to_start_leaves_no_entry() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 0.0));
    store.select_one(Some("a"));
    store.begin_gesture();
    store.move_selected_by(0.0, 3.0);
    store.move_selected_by(0.0, -3.0);
    store.end_gesture();
    store.undo();
    assert!(store.shapes().is_empty());
}

#[test]
fn gesture_returning_to_start_keeps_redo() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 0.0));
    store.add_shape(hline("b", 1.0));
    store.undo();
    store.select_one(Some("a"));
    store.begin_gesture();
    store.move_selected_by(0.0, 3.0);
    assert!(!store.can_redo());
    store.move_selected_by(0.0, -3.0);
    store.end_gesture();
    assert!(store.can_redo());
    store.redo();
    assert_eq!(ids(&store), vec!["a", "b"]);
}

#[test]
fn cancelled_gesture_keeps_redo() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 0.0));
    store.add_shape(hline("b", 1.0));
    store.undo();
    store.select_one(Some("a"));
    store.begin_gesture();
    store.move_selected_by(0.0, 3.0);
    store.cancel_gesture();
    store.redo();
    assert_eq!(ids(&store), vec!["a", "b"]);
}

#[test]
fn clear_history_empties_both_stacks() {
    let (storage, mut store) = open_store();
    store.add_shape(hline("a", 0.0));
    store.add_shape(hline("b", 1.0));
    store.undo();
    store.clear_history();
    assert!(!store.can_undo());
    assert!(!store.can_redo());
    store.undo();
    assert_eq!(ids(&store), vec!["a"]);
    let persisted: Vec<Shape> = load_json(storage.as_ref(), "test.drawings.BTCUSD.1h").unwrap();
    assert_eq!(persisted, store.shapes());
}

#[test]
fn cancel_gesture_restores_start() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 0.0));
    store.select_one(Some("a"));
    store.begin_gesture();
    store.move_selected_by(0.0, 4.0);
    store.cancel_gesture();
    assert_eq!(store.get("a").unwrap().geometry, Geometry::Hline { y: 0.0 });
    assert!(!store.gesture_open());
    store.undo();
    assert!(store.shapes().is_empty());
}

// =============================================================
// Persistence
// =============================================================

#[test]
fn add_then_load_round_trips() {
    let (_, mut store) = open_store();
    let mut line = trendline("t", (0.0, 10.0), (5.0, 20.0));
    line.name = Some("support".to_owned());
    store.add_shape(line.clone());
    store.load_current();
    assert!(store.shapes().contains(&line));
}

#[test]
fn persists_under_symbol_and_timeframe_key() {
    let (storage, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    let raw = storage.get_item("test.drawings.BTCUSD.1h").unwrap().unwrap();
    assert!(raw.contains("\"type\":\"hline\""));
}

#[test]
fn switching_chart_loads_other_partition() {
    let (_, mut store) = open_store();
    store.add_shape(hline("btc", 1.0));
    store.active().set(ChartKey::new("ETHUSD", "1h"));
    store.load_current();
    assert!(store.shapes().is_empty());
    store.add_shape(hline("eth", 2.0));

    store.active().set(ChartKey::new("BTCUSD", "1h"));
    store.load_current();
    assert_eq!(ids(&store), vec!["btc"]);
}

#[test]
fn load_does_not_touch_history() {
    let (_, mut store) = open_store();
    store.add_shape(hline("a", 1.0));
    store.load_current();
    assert!(store.can_undo());
    assert!(!store.can_redo());
}

#[test]
fn malformed_payload_loads_empty() {
    let storage = Rc::new(MemoryStorage::new());
    storage.set_item("test.drawings.X.1d", "[{\"type\":\"bogus\"}]").unwrap();
    let store = DrawingStore::open(storage, PREFIX, ActiveChart::new(ChartKey::new("X", "1d")));
    assert!(store.shapes().is_empty());
}

#[test]
fn write_failure_is_swallowed() {
    let storage = Rc::new(MemoryStorage::with_quota(16));
    let mut store = DrawingStore::open(storage.clone(), PREFIX, ActiveChart::new(ChartKey::new("X", "1d")));
    store.add_shape(trendline("t", (0.0, 10.0), (5.0, 20.0)));
    assert_eq!(store.shapes().len(), 1);
    assert_eq!(storage.get_item("test.drawings.X.1d").unwrap(), None);
}

// =============================================================
// Subscriptions
// =============================================================

#[test]
fn listeners_run_once_per_mutation_in_order() {
    let (_, mut store) = open_store();
    let log = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&log);
    let second = Rc::clone(&log);
    store.subscribe(move |s| first.borrow_mut().push(format!("1:{}", s.shapes().len())));
    store.subscribe(move |s| second.borrow_mut().push(format!("2:{}", s.shapes().len())));
    store.add_shape(hline("a", 1.0));
    store.select_one(Some("a"));
    assert_eq!(*log.borrow(), vec!["1:1", "2:1", "1:1", "2:1"]);
}

#[test]
fn listener_sees_persisted_state() {
    let (storage, mut store) = open_store();
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    let probe = Rc::clone(&storage);
    store.subscribe(move |_| *sink.borrow_mut() = probe.get_item("test.drawings.BTCUSD.1h").unwrap());
    store.add_shape(hline("a", 1.0));
    assert!(seen.borrow().as_deref().is_some_and(|raw| raw.contains("\"id\":\"a\"")));
}

#[test]
fn unsubscribe_stops_notifications() {
    let (_, mut store) = open_store();
    let calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&calls);
    let id = store.subscribe(move |_| *sink.borrow_mut() += 1);
    store.add_shape(hline("a", 1.0));
    assert!(store.unsubscribe(id));
    store.add_shape(hline("b", 2.0));
    assert_eq!(*calls.borrow(), 1);
}
