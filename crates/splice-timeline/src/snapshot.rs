//! Timeline snapshots and their versioned JSON file format.
//!
//! A snapshot is a complete, self-contained copy of a timeline's
//! arrangement. The player receives one on every commit and persistence
//! writes one to disk.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use splice_core::{RationalTime, Result, SpliceError};

use crate::clip::{Clip, ClipKind};
use crate::ids::{LinkId, ObjectId, TrackId};
use crate::layer::Layer;
use crate::object::TimelineObject;
use crate::track::Track;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Members of one link group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: LinkId,
    pub objects: BTreeSet<ObjectId>,
}

/// Complete arrangement of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    /// Layers in priority order.
    pub layers: Vec<Layer>,
    /// Tracks in display order.
    pub tracks: Vec<Track>,
    /// Objects in id order.
    pub objects: Vec<TimelineObject>,
    /// Clips in id order.
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    pub snapping_distance: RationalTime,
    pub duration: RationalTime,
}

impl TimelineSnapshot {
    pub fn empty() -> Self {
        Self {
            layers: Vec::new(),
            tracks: Vec::new(),
            objects: Vec::new(),
            clips: Vec::new(),
            links: Vec::new(),
            snapping_distance: RationalTime::ZERO,
            duration: RationalTime::ZERO,
        }
    }

    pub fn duration(&self) -> RationalTime {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.tracks.is_empty() && self.objects.is_empty()
    }

    /// Clips on `track`, by start.
    pub fn clips_on(&self, track: TrackId) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self.clips.iter().filter(|c| c.track_id() == track).collect();
        clips.sort_by_key(|c| (c.start(), c.id()));
        clips
    }

    /// Clips covering `position`, top-most layer first. Transitions sort
    /// ahead of source clips of the same layer.
    pub fn clips_at(&self, position: RationalTime) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self
            .clips
            .iter()
            .filter(|c| c.range().contains(position))
            .collect();
        clips.sort_by_key(|c| (c.priority(), c.kind() != ClipKind::Transition, c.id()));
        clips
    }
}

impl Default for TimelineSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

// ── File format ─────────────────────────────────────────────────

/// Versioned snapshot file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Schema version for migration.
    pub version: u32,
    pub timeline: TimelineSnapshot,
    /// Crate version that wrote this file.
    pub app_version: String,
}

impl SnapshotFile {
    pub fn new(timeline: TimelineSnapshot) -> Self {
        Self {
            version: CURRENT_VERSION,
            timeline,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| SpliceError::Serialization(format!("Failed to serialize timeline: {}", e)))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| SpliceError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(SpliceError::Serialization(format!(
                "Timeline file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;
        serde_json::from_value(migrated)
            .map_err(|e| SpliceError::Serialization(format!("Failed to parse timeline: {}", e)))
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 files are a bare snapshot without the wrapper.
                if data.get("version").is_none() {
                    data = serde_json::json!({
                        "version": 1,
                        "timeline": data,
                        "app_version": "0.0.0",
                    });
                }
                version = 1;
            }
            1 => {
                // v1 had no link groups.
                if let Some(timeline) = data.get_mut("timeline").and_then(|t| t.as_object_mut()) {
                    timeline
                        .entry("links")
                        .or_insert_with(|| serde_json::Value::Array(Vec::new()));
                }
                if let Some(v) = data.get_mut("version") {
                    *v = serde_json::json!(2);
                }
                version = 2;
            }
            _ => {
                return Err(SpliceError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}
