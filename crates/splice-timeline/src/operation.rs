//! Reversible timeline operations.
//!
//! Every journaled mutation is an `Operation` carrying both the old and the
//! new state, so `inverse()` never needs to look at the timeline. Undo
//! replays inverses in reverse order; redo replays the originals.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use splice_core::Result;

use crate::clip::{Clip, Placement};
use crate::ids::{ClipId, LayerId, LinkId, ObjectId};
use crate::layer::Layer;
use crate::object::TimelineObject;
use crate::timeline::Timeline;
use crate::track::Track;

/// Complete state of one object and its clips, enough to recreate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub object: TimelineObject,
    pub clips: Vec<Clip>,
}

impl ObjectRecord {
    pub fn id(&self) -> ObjectId {
        self.object.id
    }
}

// ── Operations ──────────────────────────────────────────────────

/// A reversible change to a [`Timeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert `layer` at its priority, then restore `objects` into it.
    AddLayer {
        layer: Layer,
        objects: Vec<ObjectRecord>,
    },
    /// Remove a layer and everything on it. `objects` is the prior state.
    RemoveLayer {
        layer: Layer,
        objects: Vec<ObjectRecord>,
    },
    MoveLayer {
        layer: LayerId,
        from: u32,
        to: u32,
    },
    SetAutoTransition {
        layer: LayerId,
        old: bool,
        new: bool,
    },
    /// Insert `track` at `index`, then restore `objects` to their recorded
    /// state (recreating the ones that no longer exist).
    AddTrack {
        track: Track,
        index: usize,
        objects: Vec<ObjectRecord>,
    },
    /// Remove a track. `objects` holds the prior state of every object that
    /// had a clip on it.
    RemoveTrack {
        track: Track,
        index: usize,
        objects: Vec<ObjectRecord>,
    },
    AddObject {
        record: ObjectRecord,
    },
    RemoveObject {
        record: ObjectRecord,
    },
    SetObjectPlacement {
        object: ObjectId,
        old: Placement,
        new: Placement,
    },
    SetObjectLayer {
        object: ObjectId,
        old: LayerId,
        new: LayerId,
    },
    SetClipPlacement {
        clip: ClipId,
        old: Placement,
        new: Placement,
    },
    SetClipLocked {
        clip: ClipId,
        old: bool,
        new: bool,
    },
    Link {
        link: LinkId,
        objects: BTreeSet<ObjectId>,
    },
    Unlink {
        link: LinkId,
        objects: BTreeSet<ObjectId>,
    },
}

impl Operation {
    /// Apply this operation to `timeline` without journaling it.
    pub fn apply(&self, timeline: &mut Timeline) -> Result<()> {
        match self {
            Self::AddLayer { layer, objects } => {
                timeline.raw_insert_layer(layer)?;
                for record in objects {
                    timeline.raw_restore_object(record)?;
                }
                Ok(())
            }
            Self::RemoveLayer { layer, .. } => timeline.raw_remove_layer(layer.id),
            Self::MoveLayer { layer, to, .. } => timeline.raw_move_layer(*layer, *to),
            Self::SetAutoTransition { layer, new, .. } => {
                timeline.raw_set_auto_transition(*layer, *new)
            }
            Self::AddTrack {
                track,
                index,
                objects,
            } => {
                timeline.raw_insert_track(track, *index)?;
                for record in objects {
                    timeline.raw_restore_object(record)?;
                }
                Ok(())
            }
            Self::RemoveTrack { track, .. } => timeline.raw_remove_track(track.id),
            Self::AddObject { record } => timeline.raw_insert_object(record, true),
            Self::RemoveObject { record } => timeline.raw_remove_object(record.id(), true).map(drop),
            Self::SetObjectPlacement { object, new, .. } => {
                timeline.raw_set_object_placement(*object, *new)
            }
            Self::SetObjectLayer { object, new, .. } => timeline.raw_set_object_layer(*object, *new),
            Self::SetClipPlacement { clip, new, .. } => timeline.raw_set_clip_placement(*clip, *new),
            Self::SetClipLocked { clip, new, .. } => timeline.raw_set_clip_locked(*clip, *new),
            Self::Link { link, objects } => timeline.raw_link(*link, objects),
            Self::Unlink { link, .. } => timeline.raw_unlink(*link),
        }
    }

    /// Produce the inverse operation (for undo).
    pub fn inverse(&self) -> Self {
        match self {
            Self::AddLayer { layer, objects } => Self::RemoveLayer {
                layer: layer.clone(),
                objects: objects.clone(),
            },
            Self::RemoveLayer { layer, objects } => Self::AddLayer {
                layer: layer.clone(),
                objects: objects.clone(),
            },
            Self::MoveLayer { layer, from, to } => Self::MoveLayer {
                layer: *layer,
                from: *to,
                to: *from,
            },
            Self::SetAutoTransition { layer, old, new } => Self::SetAutoTransition {
                layer: *layer,
                old: *new,
                new: *old,
            },
            Self::AddTrack {
                track,
                index,
                objects,
            } => Self::RemoveTrack {
                track: track.clone(),
                index: *index,
                objects: objects.clone(),
            },
            Self::RemoveTrack {
                track,
                index,
                objects,
            } => Self::AddTrack {
                track: track.clone(),
                index: *index,
                objects: objects.clone(),
            },
            Self::AddObject { record } => Self::RemoveObject {
                record: record.clone(),
            },
            Self::RemoveObject { record } => Self::AddObject {
                record: record.clone(),
            },
            Self::SetObjectPlacement { object, old, new } => Self::SetObjectPlacement {
                object: *object,
                old: *new,
                new: *old,
            },
            Self::SetObjectLayer { object, old, new } => Self::SetObjectLayer {
                object: *object,
                old: *new,
                new: *old,
            },
            Self::SetClipPlacement { clip, old, new } => Self::SetClipPlacement {
                clip: *clip,
                old: *new,
                new: *old,
            },
            Self::SetClipLocked { clip, old, new } => Self::SetClipLocked {
                clip: *clip,
                old: *new,
                new: *old,
            },
            Self::Link { link, objects } => Self::Unlink {
                link: *link,
                objects: objects.clone(),
            },
            Self::Unlink { link, objects } => Self::Link {
                link: *link,
                objects: objects.clone(),
            },
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddLayer { .. } => "add-layer",
            Self::RemoveLayer { .. } => "remove-layer",
            Self::MoveLayer { .. } => "move-layer",
            Self::SetAutoTransition { .. } => "set-auto-transition",
            Self::AddTrack { .. } => "add-track",
            Self::RemoveTrack { .. } => "remove-track",
            Self::AddObject { .. } => "add-object",
            Self::RemoveObject { .. } => "remove-object",
            Self::SetObjectPlacement { .. } => "set-object-placement",
            Self::SetObjectLayer { .. } => "set-object-layer",
            Self::SetClipPlacement { .. } => "set-clip-placement",
            Self::SetClipLocked { .. } => "set-clip-locked",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
