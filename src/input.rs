//! Input model: modifier keys, mouse buttons, pointer events, and the gesture
//! state machine used in select mode.
//!
//! `PointerEvent` carries raw client coordinates; the coordinate bridge turns
//! them into canvas pixels and data space. `InputState` is the gesture being
//! tracked between pointer-down and pointer-up when no drawing tool is active.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::geom::{Point, Rect, rect_from_points};
use crate::shape::{DataPoint, ShapeId};

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key, as the browser names it (`"Delete"`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Case-insensitive comparison against a key name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// A pointer event in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    pub client_x: f64,
    pub client_y: f64,
    pub button: Button,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// A primary-button event with no modifiers.
    #[must_use]
    pub fn at(client_x: f64, client_y: f64) -> Self {
        Self { client_x, client_y, ..Self::default() }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn with_button(mut self, button: Button) -> Self {
        self.button = button;
        self
    }
}

/// Gesture state for select mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the selection. Deltas are taken against `last`.
    MovingSelection {
        /// Snapped data-space position at the previous pointer event.
        last: DataPoint,
    },
    /// Dragging one anchor handle of a shape.
    DraggingHandle {
        id: ShapeId,
        /// Anchor index as reported by hit-testing.
        index: usize,
    },
    /// Rubber-band selection in canvas pixels.
    Marquee { start: Point, current: Point },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The normalized marquee rectangle, while one is being dragged.
    #[must_use]
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self {
            Self::Marquee { start, current } => Some(rect_from_points(*start, *current)),
            _ => None,
        }
    }
}
