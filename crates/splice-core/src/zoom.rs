//! Time ↔ pixel mapping for the timeline view.
//!
//! The core never paints anything, but snapping works in a pixel deadband, so
//! the zoom ratio is needed to turn that deadband into a time distance.

use serde::{Deserialize, Serialize};

use crate::time::RationalTime;

/// Horizontal zoom expressed as pixels per second of timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zoom {
    pixels_per_second: f64,
}

impl Zoom {
    pub const MIN_PIXELS_PER_SECOND: f64 = 0.01;
    pub const MAX_PIXELS_PER_SECOND: f64 = 10_000.0;
    /// Multiplier applied by one zoom-in / zoom-out step.
    pub const STEP: f64 = 1.25;

    /// Create a zoom level, clamped to the supported range.
    pub fn new(pixels_per_second: f64) -> Self {
        Self {
            pixels_per_second: clamp_ratio(pixels_per_second),
        }
    }

    pub fn pixels_per_second(self) -> f64 {
        self.pixels_per_second
    }

    /// Pixel offset of a timeline position.
    pub fn time_to_px(self, time: RationalTime) -> f64 {
        time.to_seconds_f64() * self.pixels_per_second
    }

    /// Timeline time covered by `px` pixels.
    pub fn px_to_time(self, px: f64) -> RationalTime {
        RationalTime::from_seconds_f64(px / self.pixels_per_second)
    }

    pub fn zoom_in(self) -> Self {
        Self::new(self.pixels_per_second * Self::STEP)
    }

    pub fn zoom_out(self) -> Self {
        Self::new(self.pixels_per_second / Self::STEP)
    }

    /// Zoom so that `duration` (rounded up to whole seconds) fits in `width_px`.
    ///
    /// Returns `None` for an empty timeline or a zero-width view.
    pub fn fit(duration: RationalTime, width_px: f64) -> Option<Self> {
        if duration <= RationalTime::ZERO || width_px <= 0.0 {
            return None;
        }
        let whole_seconds = duration.to_seconds_f64().ceil().max(1.0);
        Some(Self::new(width_px / whole_seconds))
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(100.0)
    }
}

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        return Zoom::MIN_PIXELS_PER_SECOND;
    }
    ratio.clamp(Zoom::MIN_PIXELS_PER_SECOND, Zoom::MAX_PIXELS_PER_SECOND)
}
