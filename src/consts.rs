//! Shared numeric constants for the annotation engine.

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space slop in pixels for line bodies.
pub const HIT_TOLERANCE_PX: f64 = 6.0;

/// Half the side length of a square anchor handle, in pixels.
pub const HANDLE_SIZE_PX: f64 = 6.0;

/// Ray hit-testing and drawing extend the ray this far past its second anchor.
pub const RAY_EXTENT_PX: f64 = 10_000.0;

// ── Snapping ────────────────────────────────────────────────────

/// Default grid step in pixels.
pub const DEFAULT_SNAP_STEP_PX: f64 = 10.0;

/// Pixel distance within which a price snaps to a nearby OHLC level.
pub const PRICE_SNAP_TOLERANCE_PX: f64 = 8.0;

// ── Rendering ───────────────────────────────────────────────────

/// Default arrowhead length in pixels.
pub const DEFAULT_ARROW_SIZE_PX: f64 = 10.0;

/// Arrowhead half-angle in radians (~30°).
pub const ARROW_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Dash pattern for ghosts and the marquee, in pixels.
pub const PREVIEW_DASH_PX: f64 = 4.0;

/// Default font size for text annotations and labels.
pub const DEFAULT_FONT_SIZE_PX: f64 = 12.0;

/// Average glyph advance as a fraction of the font size, used to size text boxes.
pub const GLYPH_WIDTH_RATIO: f64 = 0.6;

// ── Defaults ────────────────────────────────────────────────────

/// Default channel width as a percentage of the visible price span.
pub const DEFAULT_CHANNEL_WIDTH_PCT: f64 = 10.0;
