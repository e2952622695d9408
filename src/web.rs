//! Browser bindings: a 2D canvas painter and a `localStorage` backend.
//!
//! This is the only module that touches `web_sys`. The engine and renderer
//! stay headless; a browser host wraps its overlay canvas context in a
//! [`CanvasPainter`] and opens a [`LocalStorage`] for persistence.

use js_sys::Array;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::error::StorageError;
use crate::geom::{Point, Rect};
use crate::render::Painter;
use crate::settings::LineCap;
use crate::storage::Storage;

/// [`Painter`] over a `CanvasRenderingContext2d`.
pub struct CanvasPainter<'a> {
    ctx: &'a CanvasRenderingContext2d,
}

impl<'a> CanvasPainter<'a> {
    #[must_use]
    pub fn new(ctx: &'a CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl Painter for CanvasPainter<'_> {
    type Error = JsValue;

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.ctx.clear_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_fill_style(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.ctx.set_line_cap(cap.as_str());
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), JsValue> {
        let dash = Array::new();
        for segment in segments {
            dash.push(&JsValue::from_f64(*segment));
        }
        self.ctx.set_line_dash(&dash)
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, pt: Point) {
        self.ctx.move_to(pt.x, pt.y);
    }

    fn line_to(&mut self, pt: Point) {
        self.ctx.line_to(pt.x, pt.y);
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.ctx.stroke_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn fill_text(&mut self, text: &str, at: Point) -> Result<(), JsValue> {
        self.ctx.fill_text(text, at.x, at.y)
    }
}

/// [`Storage`] over `window.localStorage`.
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    /// Open the window's local storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when there is no window or the
    /// browser denies access to local storage.
    pub fn from_window() -> Result<Self, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Backend("no window".to_owned()))?;
        match window.local_storage() {
            Ok(Some(inner)) => Ok(Self { inner }),
            Ok(None) => Err(StorageError::Backend("localStorage unavailable".to_owned())),
            Err(e) => Err(backend(&e)),
        }
    }
}

fn backend(err: &JsValue) -> StorageError {
    StorageError::Backend(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

impl Storage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key).map_err(|e| backend(&e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_item(key, value).map_err(|e| backend(&e))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key).map_err(|e| backend(&e))
    }
}
