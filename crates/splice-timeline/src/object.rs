//! Timeline objects: one logical item on a layer, made of a clip per track.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use splice_core::{RationalTime, TimeRange};

use crate::clip::{ClipKind, Placement};
use crate::ids::{ClipId, LayerId, LinkId, ObjectId};
use crate::track::TrackKind;

/// Reference to a media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    /// URI or path of the media
    pub uri: String,
    pub has_video: bool,
    pub has_audio: bool,
    /// Source length; `None` for sources of unbounded length (still images).
    pub max_duration: Option<RationalTime>,
}

impl MediaSource {
    /// A source with both video and audio streams.
    pub fn new(uri: impl Into<String>, max_duration: RationalTime) -> Self {
        Self {
            uri: uri.into(),
            has_video: true,
            has_audio: true,
            max_duration: Some(max_duration),
        }
    }

    pub fn video(uri: impl Into<String>, max_duration: RationalTime) -> Self {
        Self {
            has_audio: false,
            ..Self::new(uri, max_duration)
        }
    }

    pub fn audio(uri: impl Into<String>, max_duration: RationalTime) -> Self {
        Self {
            has_video: false,
            ..Self::new(uri, max_duration)
        }
    }

    /// A still image: video only, no intrinsic length.
    pub fn image(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            has_video: true,
            has_audio: false,
            max_duration: None,
        }
    }

    /// Whether this source produces a clip on tracks of `kind`.
    pub fn provides(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Video => self.has_video,
            TrackKind::Audio => self.has_audio,
        }
    }
}

/// Parameters for a new object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub source: MediaSource,
    pub start: RationalTime,
    /// Defaults to the remaining source length, or the configured image
    /// duration for sources without one.
    pub duration: Option<RationalTime>,
    pub in_point: RationalTime,
}

impl ObjectSpec {
    pub fn new(source: MediaSource) -> Self {
        Self {
            source,
            start: RationalTime::ZERO,
            duration: None,
            in_point: RationalTime::ZERO,
        }
    }

    pub fn at(mut self, start: RationalTime) -> Self {
        self.start = start;
        self
    }

    pub fn with_duration(mut self, duration: RationalTime) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_in_point(mut self, in_point: RationalTime) -> Self {
        self.in_point = in_point;
        self
    }

    pub(crate) fn resolve_duration(&self, image_duration: RationalTime) -> RationalTime {
        match (self.duration, self.source.max_duration) {
            (Some(duration), _) => duration,
            (None, Some(max)) => max - self.in_point,
            (None, None) => image_duration,
        }
    }
}

/// A logical item on a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineObject {
    pub(crate) id: ObjectId,
    pub(crate) layer_id: LayerId,
    pub(crate) priority: u32,
    pub(crate) placement: Placement,
    /// `None` for transition objects.
    pub(crate) source: Option<MediaSource>,
    pub(crate) kind: ClipKind,
    pub(crate) clips: SmallVec<[ClipId; 2]>,
    pub(crate) link: Option<LinkId>,
}

impl TimelineObject {
    pub(crate) fn new(
        layer_id: LayerId,
        priority: u32,
        placement: Placement,
        source: Option<MediaSource>,
        kind: ClipKind,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            layer_id,
            priority,
            placement,
            source,
            kind,
            clips: SmallVec::new(),
            link: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

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

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn max_duration(&self) -> Option<RationalTime> {
        self.source.as_ref().and_then(|s| s.max_duration)
    }

    pub fn kind(&self) -> ClipKind {
        self.kind
    }

    pub fn is_transition(&self) -> bool {
        self.kind == ClipKind::Transition
    }

    pub fn clips(&self) -> &[ClipId] {
        &self.clips
    }

    pub fn link(&self) -> Option<LinkId> {
        self.link
    }
}
