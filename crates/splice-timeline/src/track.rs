//! Track types for the timeline.

use serde::{Deserialize, Serialize};
use splice_core::RationalTime;

use crate::ids::{ClipId, TrackId};

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Prefix used for generated track names.
    pub fn prefix(self) -> &'static str {
        match self {
            TrackKind::Video => "V",
            TrackKind::Audio => "A",
        }
    }
}

/// A track: the clips placed on it, ordered by start.
///
/// Clips from every layer share the track; ties on start are broken by
/// clip id so iteration order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub(crate) id: TrackId,
    pub(crate) name: String,
    pub(crate) kind: TrackKind,
    pub(crate) entries: Vec<(RationalTime, ClipId)>,
}

impl Track {
    /// Create a new video track.
    pub fn new_video(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Video)
    }

    /// Create a new audio track.
    pub fn new_audio(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Audio)
    }

    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            kind,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Clip ids in start order.
    pub fn clip_ids(&self) -> impl Iterator<Item = ClipId> + '_ {
        self.entries.iter().map(|(_, id)| *id)
    }

    pub fn clip_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, clip: ClipId) -> bool {
        self.entries.iter().any(|(_, id)| *id == clip)
    }

    /// Indexed start of `clip`, if present.
    pub fn indexed_start(&self, clip: ClipId) -> Option<RationalTime> {
        self.entries
            .iter()
            .find(|(_, id)| *id == clip)
            .map(|(start, _)| *start)
    }

    pub(crate) fn insert(&mut self, start: RationalTime, clip: ClipId) {
        let index = self.entries.partition_point(|entry| *entry < (start, clip));
        self.entries.insert(index, (start, clip));
    }

    pub(crate) fn remove(&mut self, clip: ClipId) -> bool {
        match self.entries.iter().position(|(_, id)| *id == clip) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Re-sort `clip` after its start changed.
    pub(crate) fn reposition(&mut self, clip: ClipId, start: RationalTime) {
        if self.remove(clip) {
            self.insert(start, clip);
        }
    }

    /// A copy of this track without clips.
    pub(crate) fn emptied(&self) -> Self {
        Self {
            entries: Vec::new(),
            ..self.clone()
        }
    }

    pub(crate) fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0] <= w[1])
    }
}
