//! Drawing settings: snapping, handles, labels, arrowheads, channel and
//! fibonacci defaults, with per-symbol overrides.
//!
//! [`SettingsStore`] is a flat, reactive key/value view over a typed
//! [`Settings`] value. Every write is immediately effective, persisted under a
//! single storage key, and broadcast to subscribers. There is no history.

#[cfg(test)]
#[path = "settings_test.rs"]
mod settings_test;

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::consts::{DEFAULT_ARROW_SIZE_PX, DEFAULT_CHANNEL_WIDTH_PCT, DEFAULT_SNAP_STEP_PX};
use crate::error::SettingsError;
use crate::notify::{Listeners, SubscriptionId};
use crate::shape::WidthMode;
use crate::storage::{Storage, load_json, save_json};

const CLASSIC_LEVELS: &[f64] = &[0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];
const EXTENDED_LEVELS: &[f64] = &[0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0, 1.272, 1.618, 2.618];
const AGGRESSIVE_LEVELS: &[f64] = &[0.0, 0.382, 0.5, 0.618, 1.0, 1.618, 2.618, 3.618, 4.236];

/// Line cap applied to every stroked annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Butt => "butt",
            Self::Round => "round",
            Self::Square => "square",
        }
    }
}

/// How arrow annotations end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowHead {
    /// Solid triangle.
    #[default]
    Filled,
    /// Two strokes, no fill.
    Open,
    /// Plain segment.
    None,
}

/// Named fibonacci level sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FibPreset {
    #[default]
    Classic,
    Extended,
    Aggressive,
    Custom,
}

impl FibPreset {
    /// Built-in ratios, or `None` for [`FibPreset::Custom`].
    #[must_use]
    pub fn levels(self) -> Option<&'static [f64]> {
        match self {
            Self::Classic => Some(CLASSIC_LEVELS),
            Self::Extended => Some(EXTENDED_LEVELS),
            Self::Aggressive => Some(AGGRESSIVE_LEVELS),
            Self::Custom => None,
        }
    }
}

/// Per-symbol overrides. Absent fields inherit the global value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SymbolOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_to_price_levels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_width_mode: Option<WidthMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_default_width_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fib_preset: Option<FibPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fib_custom_levels: Option<Vec<f64>>,
}

/// All drawing settings. Missing fields in a persisted payload take defaults.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Round pointer pixels to the grid before conversion.
    pub snap_enabled: bool,
    /// Grid step in pixels.
    pub snap_step: f64,
    /// Pull prices onto nearby OHLC levels.
    pub snap_to_price_levels: bool,
    /// Draw anchor handles on selected shapes.
    pub show_handles: bool,
    /// Draw price and measurement labels.
    pub show_line_labels: bool,
    pub line_cap: LineCap,
    pub arrow_head: ArrowHead,
    /// Arrowhead length in pixels.
    pub arrow_size: f64,
    pub channel_width_mode: WidthMode,
    /// New channel width as a percentage of the visible price span (or of the
    /// viewport height in pixel mode).
    pub channel_default_width_pct: f64,
    pub fib_preset: FibPreset,
    pub fib_custom_levels: Vec<f64>,
    /// Key that toggles grid snapping.
    pub snap_toggle_key: String,
    pub symbol_overrides: BTreeMap<String, SymbolOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snap_enabled: false,
            snap_step: DEFAULT_SNAP_STEP_PX,
            snap_to_price_levels: false,
            show_handles: true,
            show_line_labels: false,
            line_cap: LineCap::default(),
            arrow_head: ArrowHead::default(),
            arrow_size: DEFAULT_ARROW_SIZE_PX,
            channel_width_mode: WidthMode::default(),
            channel_default_width_pct: DEFAULT_CHANNEL_WIDTH_PCT,
            fib_preset: FibPreset::default(),
            fib_custom_levels: Vec::new(),
            snap_toggle_key: "g".to_owned(),
            symbol_overrides: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Fibonacci ratios for the active preset.
    ///
    /// An empty custom list falls back to the classic levels so a fib is never
    /// drawn without guides.
    #[must_use]
    pub fn fib_levels(&self) -> Vec<f64> {
        match self.fib_preset.levels() {
            Some(levels) => levels.to_vec(),
            None if self.fib_custom_levels.is_empty() => CLASSIC_LEVELS.to_vec(),
            None => self.fib_custom_levels.clone(),
        }
    }

    /// These settings with `symbol`'s overrides applied.
    #[must_use]
    pub fn effective_for(&self, symbol: &str) -> Settings {
        let mut out = self.clone();
        let Some(o) = self.symbol_overrides.get(symbol) else {
            return out;
        };
        if let Some(v) = o.snap_enabled {
            out.snap_enabled = v;
        }
        if let Some(v) = o.snap_step {
            out.snap_step = v;
        }
        if let Some(v) = o.snap_to_price_levels {
            out.snap_to_price_levels = v;
        }
        if let Some(v) = o.channel_width_mode {
            out.channel_width_mode = v;
        }
        if let Some(v) = o.channel_default_width_pct {
            out.channel_default_width_pct = v;
        }
        if let Some(v) = o.fib_preset {
            out.fib_preset = v;
        }
        if let Some(v) = &o.fib_custom_levels {
            out.fib_custom_levels.clone_from(v);
        }
        out
    }
}

/// Reactive, persisted holder of [`Settings`].
pub struct SettingsStore {
    storage: Rc<dyn Storage>,
    key: String,
    settings: Settings,
    listeners: Listeners<Settings>,
}

impl SettingsStore {
    /// Open the store, loading any persisted settings under `key`.
    ///
    /// A missing or malformed payload yields defaults.
    pub fn open(storage: Rc<dyn Storage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let settings = load_json::<Settings>(storage.as_ref(), &key).unwrap_or_default();
        Self { storage, key, settings, listeners: Listeners::new() }
    }

    /// Current settings.
    #[must_use]
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Replace all settings.
    pub fn set(&mut self, settings: Settings) {
        self.settings = settings;
        self.commit();
    }

    /// Edit settings in place.
    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings);
        self.commit();
    }

    /// Read one setting by its camelCase key.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(&self.settings) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }

    /// Write one setting by its camelCase key.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownKey`] if `key` names no setting and
    /// [`SettingsError::InvalidValue`] if `value` has the wrong shape. The
    /// settings are unchanged in both cases.
    pub fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let invalid = |source| SettingsError::InvalidValue { key: key.to_owned(), source };
        let mut map = match serde_json::to_value(&self.settings).map_err(invalid)? {
            Value::Object(map) => map,
            _ => return Err(SettingsError::UnknownKey(key.to_owned())),
        };
        if !map.contains_key(key) {
            return Err(SettingsError::UnknownKey(key.to_owned()));
        }
        map.insert(key.to_owned(), value);
        self.settings = serde_json::from_value(Value::Object(map)).map_err(invalid)?;
        self.commit();
        Ok(())
    }

    /// Flip grid snapping, returning the new state.
    pub fn toggle_snap(&mut self) -> bool {
        self.settings.snap_enabled = !self.settings.snap_enabled;
        self.commit();
        self.settings.snap_enabled
    }

    /// Restore defaults.
    pub fn reset(&mut self) {
        self.settings = Settings::default();
        self.commit();
    }

    /// Settings with the overrides for `symbol` applied.
    #[must_use]
    pub fn effective_for(&self, symbol: &str) -> Settings {
        self.settings.effective_for(symbol)
    }

    /// Register a listener called with the new settings after every write.
    pub fn subscribe(&mut self, listener: impl FnMut(&Settings) + 'static) -> SubscriptionId {
        self.listeners.add(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    /// Drop every listener, for view teardown.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    fn commit(&mut self) {
        save_json(self.storage.as_ref(), &self.key, &self.settings);
        debug!(key = %self.key, "settings: committed");
        self.listeners.notify(&self.settings);
    }
}
