//! Engine configuration: storage keys, hit slop, and history bounds.
//!
//! These are deployment knobs, not user preferences. User-facing options
//! (snapping, handles, fibonacci presets) live in [`crate::settings`].

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{HANDLE_SIZE_PX, HIT_TOLERANCE_PX, PRICE_SNAP_TOLERANCE_PX};

const DEFAULT_STORAGE_PREFIX: &str = "chartink.drawings";
const DEFAULT_SETTINGS_KEY: &str = "chartink.settings";

/// Tuning knobs for [`crate::engine::EngineCore`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Prefix of the `<prefix>.<symbol>.<timeframe>` drawing keys.
    pub storage_prefix: String,
    /// Key holding the persisted settings object.
    pub settings_key: String,
    /// Pixel slop for line hit-testing.
    pub hit_tolerance_px: f64,
    /// Half side of a square handle, in pixels.
    pub handle_size_px: f64,
    /// Pixel distance within which prices snap to OHLC levels.
    pub price_snap_tolerance_px: f64,
    /// Maximum undo depth; `None` keeps every snapshot.
    pub history_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_owned(),
            settings_key: DEFAULT_SETTINGS_KEY.to_owned(),
            hit_tolerance_px: HIT_TOLERANCE_PX,
            handle_size_px: HANDLE_SIZE_PX,
            price_snap_tolerance_px: PRICE_SNAP_TOLERANCE_PX,
            history_limit: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `CHARTINK_*` environment variables, falling back
    /// to defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let history_limit = env_parse("CHARTINK_HISTORY_LIMIT", 0_usize);
        Self {
            storage_prefix: env_string("CHARTINK_STORAGE_PREFIX", &defaults.storage_prefix),
            settings_key: env_string("CHARTINK_SETTINGS_KEY", &defaults.settings_key),
            hit_tolerance_px: env_parse("CHARTINK_HIT_TOLERANCE_PX", defaults.hit_tolerance_px),
            handle_size_px: env_parse("CHARTINK_HANDLE_SIZE_PX", defaults.handle_size_px),
            price_snap_tolerance_px: env_parse(
                "CHARTINK_PRICE_SNAP_TOLERANCE_PX",
                defaults.price_snap_tolerance_px,
            ),
            history_limit: (history_limit > 0).then_some(history_limit),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_owned(),
        _ => default.to_owned(),
    }
}
