//! Editor settings.
//!
//! Plain serde struct; every field has a default so partial JSON files load.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpliceError};
use crate::time::RationalTime;
use crate::zoom::Zoom;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Snap deadband in pixels (converted to time through the zoom).
    pub snap_deadband_px: f64,
    /// Initial zoom level.
    pub pixels_per_second: f64,
    /// Maximum number of undoable transactions kept.
    pub max_undo_depth: usize,
    /// Duration given to sources that report none (still images).
    pub default_image_duration_ms: i64,
    /// Whether layers created by the timeline get auto-transitions.
    pub auto_transition_on_new_layers: bool,
}

impl EditorSettings {
    pub fn zoom(&self) -> Zoom {
        Zoom::new(self.pixels_per_second)
    }

    /// Snapping distance for the configured deadband at `zoom`.
    pub fn snapping_distance(&self, zoom: Zoom) -> RationalTime {
        if self.snap_deadband_px <= 0.0 {
            return RationalTime::ZERO;
        }
        zoom.px_to_time(self.snap_deadband_px)
    }

    pub fn default_image_duration(&self) -> RationalTime {
        RationalTime::from_millis(self.default_image_duration_ms)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| SpliceError::Serialization(format!("Invalid settings: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SpliceError::Serialization(format!("Failed to serialize settings: {}", e)))
    }

    /// Load settings from a file path.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            snap_deadband_px: 8.0,
            pixels_per_second: 100.0,
            max_undo_depth: 200,
            default_image_duration_ms: 1000,
            auto_transition_on_new_layers: false,
        }
    }
}
