//! Clips and their placement on a track.

use serde::{Deserialize, Serialize};
use splice_core::{RationalTime, Result, SpliceError, TimeRange};

use crate::ids::{ClipId, LayerId, ObjectId, TrackId};

/// Where an object or clip sits on the timeline and which part of its
/// source it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Placement {
    /// Position on the timeline
    pub start: RationalTime,
    /// Duration on the timeline
    pub duration: RationalTime,
    /// Offset into the source media
    pub in_point: RationalTime,
}

impl Placement {
    pub fn new(start: RationalTime, duration: RationalTime, in_point: RationalTime) -> Self {
        Self {
            start,
            duration,
            in_point,
        }
    }

    #[inline]
    pub fn end(&self) -> RationalTime {
        self.start + self.duration
    }

    #[inline]
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.duration)
    }

    /// Source out point.
    #[inline]
    pub fn out_point(&self) -> RationalTime {
        self.in_point + self.duration
    }

    pub fn with_start(self, start: RationalTime) -> Self {
        Self { start, ..self }
    }

    pub fn shifted(self, delta: RationalTime) -> Self {
        self.with_start(self.start + delta)
    }

    /// Move the start edge by `delta`, keeping the end edge and the source
    /// content under it in place.
    pub fn trim_in(self, delta: RationalTime) -> Self {
        Self {
            start: self.start + delta,
            duration: self.duration - delta,
            in_point: self.in_point + delta,
        }
    }

    /// Move the end edge by `delta`.
    pub fn trim_out(self, delta: RationalTime) -> Self {
        Self {
            duration: self.duration + delta,
            ..self
        }
    }

    /// Check the non-negativity rules and the optional source length.
    pub fn validate(&self, max_duration: Option<RationalTime>) -> Result<()> {
        if self.start.is_negative() {
            return Err(SpliceError::InvalidParameter(format!(
                "start must not be negative, got {}",
                self.start
            )));
        }
        if self.duration.is_negative() {
            return Err(SpliceError::InvalidParameter(format!(
                "duration must not be negative, got {}",
                self.duration
            )));
        }
        if self.in_point.is_negative() {
            return Err(SpliceError::InvalidParameter(format!(
                "in-point must not be negative, got {}",
                self.in_point
            )));
        }
        if let Some(max) = max_duration {
            if self.out_point() > max {
                return Err(SpliceError::InvalidParameter(format!(
                    "in-point {} + duration {} exceeds source length {}",
                    self.in_point, self.duration, max
                )));
            }
        }
        Ok(())
    }
}

/// What a clip renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipKind {
    /// Media from the owning object's source.
    Source,
    /// Auto-transition covering the overlap of two source clips.
    Transition,
}

/// The per-track piece of a [`TimelineObject`](crate::TimelineObject).
///
/// While locked, a clip's placement always equals its object's placement.
/// Unlocked clips may be positioned independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub(crate) id: ClipId,
    pub(crate) object_id: ObjectId,
    pub(crate) track_id: TrackId,
    pub(crate) layer_id: LayerId,
    pub(crate) priority: u32,
    pub(crate) placement: Placement,
    pub(crate) locked: bool,
    pub(crate) kind: ClipKind,
}

impl Clip {
    pub(crate) fn new(
        object_id: ObjectId,
        track_id: TrackId,
        layer_id: LayerId,
        priority: u32,
        placement: Placement,
        kind: ClipKind,
    ) -> Self {
        Self {
            id: ClipId::new(),
            object_id,
            track_id,
            layer_id,
            priority,
            placement,
            locked: true,
            kind,
        }
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    /// Priority of the owning layer.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn start(&self) -> RationalTime {
        self.placement.start
    }

    pub fn duration(&self) -> RationalTime {
        self.placement.duration
    }

    pub fn in_point(&self) -> RationalTime {
        self.placement.in_point
    }

    pub fn end(&self) -> RationalTime {
        self.placement.end()
    }

    pub fn range(&self) -> TimeRange {
        self.placement.range()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn kind(&self) -> ClipKind {
        self.kind
    }
}
