//! Chart adapter: the boundary to whatever library renders the candles.
//!
//! The engine never owns the price scale. It asks the adapter to convert
//! between pixels and `(time, price)` and to report the bar under a time for
//! price-level snapping. Conversions return `None` where the chart has no
//! answer (no data, off-scale); callers fall back to best-effort values.

#[cfg(test)]
#[path = "chart_test.rs"]
mod chart_test;

use serde::{Deserialize, Serialize};

/// One OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// The four price levels a pointer can snap to.
    #[must_use]
    pub fn levels(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

/// Pixel/data conversions supplied by the host chart.
pub trait ChartAdapter {
    /// Time at canvas-relative pixel `x`.
    fn coordinate_to_time(&self, x: f64) -> Option<f64>;

    /// Canvas-relative pixel x of `time`.
    fn time_to_coordinate(&self, time: f64) -> Option<f64>;

    /// Price at canvas-relative pixel `y`.
    fn coordinate_to_price(&self, y: f64) -> Option<f64>;

    /// Canvas-relative pixel y of `price`.
    fn price_to_coordinate(&self, price: f64) -> Option<f64>;

    /// The visible bar nearest to `time`, if any.
    fn bar_near(&self, _time: f64) -> Option<Bar> {
        None
    }

    /// Visible price range as `(low, high)`, if known.
    fn visible_price_range(&self) -> Option<(f64, f64)> {
        None
    }
}

/// Linear time and price scales over a fixed pixel viewport.
///
/// Time grows to the right and price grows upward. Useful as a reference
/// adapter for hosts without a charting library, and as a test double.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearChart {
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
    /// Time at the left edge.
    pub time_min: f64,
    /// Time at the right edge.
    pub time_max: f64,
    /// Price at the bottom edge.
    pub price_min: f64,
    /// Price at the top edge.
    pub price_max: f64,
    /// Bars in ascending time order.
    pub bars: Vec<Bar>,
}

impl LinearChart {
    /// A chart mapping `width × height` pixels onto the given ranges.
    #[must_use]
    pub fn new(width: f64, height: f64, time: (f64, f64), price: (f64, f64)) -> Self {
        Self {
            width,
            height,
            time_min: time.0,
            time_max: time.1,
            price_min: price.0,
            price_max: price.1,
            bars: Vec::new(),
        }
    }

    /// A chart mapping pixels one-to-one: `t = x`, `p = height - y`.
    #[must_use]
    pub fn identity(width: f64, height: f64) -> Self {
        Self::new(width, height, (0.0, width), (0.0, height))
    }

    #[must_use]
    pub fn with_bars(mut self, bars: Vec<Bar>) -> Self {
        self.bars = bars;
        self
    }

    /// Shift both visible ranges, as a pan would.
    pub fn pan(&mut self, dt: f64, dp: f64) {
        self.time_min += dt;
        self.time_max += dt;
        self.price_min += dp;
        self.price_max += dp;
    }

    fn time_span(&self) -> Option<f64> {
        let span = self.time_max - self.time_min;
        (span.abs() > f64::EPSILON && self.width > 0.0).then_some(span)
    }

    fn price_span(&self) -> Option<f64> {
        let span = self.price_max - self.price_min;
        (span.abs() > f64::EPSILON && self.height > 0.0).then_some(span)
    }
}

impl ChartAdapter for LinearChart {
    fn coordinate_to_time(&self, x: f64) -> Option<f64> {
        let span = self.time_span()?;
        x.is_finite().then(|| self.time_min + x / self.width * span)
    }

    fn time_to_coordinate(&self, time: f64) -> Option<f64> {
        let span = self.time_span()?;
        time.is_finite().then(|| (time - self.time_min) / span * self.width)
    }

    fn coordinate_to_price(&self, y: f64) -> Option<f64> {
        let span = self.price_span()?;
        y.is_finite().then(|| self.price_max - y / self.height * span)
    }

    fn price_to_coordinate(&self, price: f64) -> Option<f64> {
        let span = self.price_span()?;
        price.is_finite().then(|| (self.price_max - price) / span * self.height)
    }

    fn bar_near(&self, time: f64) -> Option<Bar> {
        self.bars
            .iter()
            .filter(|bar| bar.time >= self.time_min && bar.time <= self.time_max)
            .min_by(|a, b| (a.time - time).abs().total_cmp(&(b.time - time).abs()))
            .copied()
    }

    fn visible_price_range(&self) -> Option<(f64, f64)> {
        self.price_span().map(|_| (self.price_min, self.price_max))
    }
}
