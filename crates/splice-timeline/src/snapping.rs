//! Snapping engine for timeline edits.
//!
//! Candidates are the start and end edges of clips that are not being
//! moved. A moving edge snaps to the nearest candidate within the snapping
//! distance. Equidistant candidates resolve to the one whose clip starts
//! earliest, then by track display index, then by edge position, so the
//! result never depends on iteration order or on id generation.

use splice_core::RationalTime;
use tracing::debug;

use crate::clip::Clip;
use crate::ids::{ClipId, TrackId};

/// A clip edge that can be snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapPoint {
    pub position: RationalTime,
    pub clip_start: RationalTime,
    pub track: TrackId,
    /// Display index of `track`.
    pub track_index: usize,
    pub clip: ClipId,
}

impl SnapPoint {
    fn tie_key(&self) -> (RationalTime, usize, RationalTime) {
        (self.clip_start, self.track_index, self.position)
    }
}

/// Result of snapping a set of moving edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapMatch {
    /// Index of the moving edge that snapped.
    pub edge: usize,
    pub target: SnapPoint,
    /// Shift to add to the moving edges so that `edge` lands on the target.
    pub adjustment: RationalTime,
}

/// Change of the snap indicator, reported to timeline listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapChange {
    Indicator(RationalTime),
    Ended,
}

#[derive(Debug, Clone, Default)]
pub struct SnappingEngine {
    distance: RationalTime,
    indicator: Option<RationalTime>,
}

impl SnappingEngine {
    pub fn new(distance: RationalTime) -> Self {
        Self {
            distance,
            indicator: None,
        }
    }

    /// Zero disables snapping.
    pub fn distance(&self) -> RationalTime {
        self.distance
    }

    pub fn set_distance(&mut self, distance: RationalTime) {
        self.distance = distance.max(RationalTime::ZERO);
    }

    pub fn is_enabled(&self) -> bool {
        !self.distance.is_zero()
    }

    /// Currently indicated snap position, if any.
    pub fn indicator(&self) -> Option<RationalTime> {
        self.indicator
    }

    /// Collect both edges of every clip in `clips`, each paired with the
    /// display index of its track.
    pub fn collect_snap_points<'a>(
        clips: impl IntoIterator<Item = (&'a Clip, usize)>,
    ) -> Vec<SnapPoint> {
        let mut points = Vec::new();
        for (clip, track_index) in clips {
            for position in [clip.start(), clip.end()] {
                points.push(SnapPoint {
                    position,
                    clip_start: clip.start(),
                    track: clip.track_id(),
                    track_index,
                    clip: clip.id(),
                });
            }
        }
        points
    }

    /// Find the snap target for a single position.
    pub fn find_snap(&self, position: RationalTime, points: &[SnapPoint]) -> Option<SnapPoint> {
        if !self.is_enabled() {
            return None;
        }

        let mut best: Option<(RationalTime, SnapPoint)> = None;
        for point in points {
            let distance = point.position.distance(position);
            if distance > self.distance {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_distance, best_point)) => {
                    distance < *best_distance
                        || (distance == *best_distance && point.tie_key() < best_point.tie_key())
                }
            };
            if better {
                best = Some((distance, *point));
            }
        }
        best.map(|(_, point)| point)
    }

    /// Snap the nearest of several moving edges. On equal distance the
    /// lower edge index wins.
    pub fn snap_edges(&self, edges: &[RationalTime], points: &[SnapPoint]) -> Option<SnapMatch> {
        let mut best: Option<(RationalTime, SnapMatch)> = None;
        for (index, edge) in edges.iter().enumerate() {
            let Some(target) = self.find_snap(*edge, points) else {
                continue;
            };
            let distance = target.position.distance(*edge);
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((
                    distance,
                    SnapMatch {
                        edge: index,
                        target,
                        adjustment: target.position - *edge,
                    },
                ));
            }
        }
        best.map(|(_, m)| m)
    }

    /// Record the latest snap result. Returns a change only when the
    /// indicator moved, appeared or disappeared.
    pub fn update_indicator(&mut self, position: Option<RationalTime>) -> Option<SnapChange> {
        if self.indicator == position {
            return None;
        }
        let was_active = self.indicator.is_some();
        self.indicator = position;
        match position {
            Some(p) => {
                debug!(position = %p, "snap indicator");
                Some(SnapChange::Indicator(p))
            }
            None if was_active => Some(SnapChange::Ended),
            None => None,
        }
    }

    pub fn end(&mut self) -> Option<SnapChange> {
        self.update_indicator(None)
    }
}
