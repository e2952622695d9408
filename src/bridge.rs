//! Coordinate bridge between pointer pixels and chart data space.
//!
//! Pointer events arrive in client coordinates. The bridge subtracts the
//! canvas origin, converts through the [`ChartAdapter`], and applies snapping:
//! grid rounding on pixels first, then price-level snapping on the result.
//! Conversions never fail; when the chart has no answer the value falls back
//! to `0`.

#[cfg(test)]
#[path = "bridge_test.rs"]
mod bridge_test;

use crate::chart::ChartAdapter;
use crate::consts::PRICE_SNAP_TOLERANCE_PX;
use crate::geom::Point;
use crate::settings::Settings;
use crate::shape::DataPoint;

/// A pointer position resolved into both spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataSpacePoint {
    /// Canvas-relative pixel x (unsnapped).
    pub x: f64,
    /// Canvas-relative pixel y (unsnapped).
    pub y: f64,
    /// Raw time at `x`.
    pub t: f64,
    /// Raw price at `y`.
    pub p: f64,
    /// Data-space point after snap rules.
    pub snapped: DataPoint,
}

impl DataSpacePoint {
    /// The unsnapped canvas pixel.
    #[must_use]
    pub fn pixel(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Pixel/data conversion with snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateBridge {
    origin: Point,
    price_snap_tolerance_px: f64,
}

impl Default for CoordinateBridge {
    fn default() -> Self {
        Self::new(PRICE_SNAP_TOLERANCE_PX)
    }
}

impl CoordinateBridge {
    #[must_use]
    pub fn new(price_snap_tolerance_px: f64) -> Self {
        Self { origin: Point::default(), price_snap_tolerance_px }
    }

    /// Record the canvas bounding-box origin in client coordinates.
    pub fn set_canvas_origin(&mut self, left: f64, top: f64) {
        self.origin = Point::new(left, top);
    }

    #[must_use]
    pub fn canvas_origin(&self) -> Point {
        self.origin
    }

    /// Client coordinates to canvas-relative pixels.
    #[must_use]
    pub fn to_canvas(&self, client_x: f64, client_y: f64) -> Point {
        Point::new(client_x - self.origin.x, client_y - self.origin.y)
    }

    /// Resolve a client-space pointer into pixels, raw data, and snapped data.
    #[must_use]
    pub fn to_data_space(
        &self,
        chart: &dyn ChartAdapter,
        settings: &Settings,
        client_x: f64,
        client_y: f64,
    ) -> DataSpacePoint {
        let pixel = self.to_canvas(client_x, client_y);
        let raw = pixel_to_data(chart, pixel);

        let snapped_pixel = snap_to_grid(settings, pixel);
        let mut snapped = pixel_to_data(chart, snapped_pixel);
        if settings.snap_to_price_levels {
            snapped.p = self.snap_price(chart, snapped, snapped_pixel.y);
        }

        DataSpacePoint { x: pixel.x, y: pixel.y, t: raw.t, p: raw.p, snapped }
    }

    /// Pull `at.p` onto the nearest OHLC level of the bar near `at.t`, if one
    /// lies within the pixel tolerance of `pixel_y`.
    fn snap_price(&self, chart: &dyn ChartAdapter, at: DataPoint, pixel_y: f64) -> f64 {
        let Some(bar) = chart.bar_near(at.t) else {
            return at.p;
        };
        bar.levels()
            .into_iter()
            .filter_map(|level| {
                let dist = (chart.price_to_coordinate(level)? - pixel_y).abs();
                (dist <= self.price_snap_tolerance_px).then_some((level, dist))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(at.p, |(level, _)| level)
    }
}

/// Round a pixel to the grid when grid snapping is on.
#[must_use]
pub fn snap_to_grid(settings: &Settings, pixel: Point) -> Point {
    let step = settings.snap_step;
    if !settings.snap_enabled || step <= 0.0 || !step.is_finite() {
        return pixel;
    }
    Point::new((pixel.x / step).round() * step, (pixel.y / step).round() * step)
}

/// Canvas pixel to data space, falling back to `0` per axis.
#[must_use]
pub fn pixel_to_data(chart: &dyn ChartAdapter, pixel: Point) -> DataPoint {
    DataPoint::new(
        chart.coordinate_to_time(pixel.x).unwrap_or(0.0),
        chart.coordinate_to_price(pixel.y).unwrap_or(0.0),
    )
}

/// Data space to canvas pixel, or `None` if either axis is off-scale.
#[must_use]
pub fn data_to_pixel(chart: &dyn ChartAdapter, point: DataPoint) -> Option<Point> {
    Some(Point::new(chart.time_to_coordinate(point.t)?, chart.price_to_coordinate(point.p)?))
}
