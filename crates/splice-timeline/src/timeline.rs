//! The timeline: owner of layers, tracks, objects and clips.
//!
//! Entities live in id-keyed arenas and refer to each other by id. Every
//! public mutation validates its arguments, is expressed as an
//! [`Operation`], applied, and journaled while an
//! [`ActionLog`](crate::ActionLog) transaction is recording. Nothing reaches
//! the player until [`Timeline::commit`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;
use std::sync::Arc;

use splice_core::{EditorSettings, RationalTime, Result, SpliceError, TimeRange};
use tracing::{debug, info, warn};

use crate::clip::{Clip, ClipKind, Placement};
use crate::ids::{ClipId, LayerId, LinkId, ObjectId, TrackId};
use crate::layer::Layer;
use crate::object::{ObjectSpec, TimelineObject};
use crate::operation::{ObjectRecord, Operation};
use crate::player::PlayerHandle;
use crate::selection::{Selection, SelectionMode};
use crate::signal::{Signal, SubscriptionId};
use crate::snapping::{SnapChange, SnapMatch, SnappingEngine};
use crate::snapshot::{LinkRecord, TimelineSnapshot};
use crate::track::{Track, TrackKind};
use crate::transition::find_overlaps;

/// Notifications delivered to timeline listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    LayerAdded(LayerId),
    LayerRemoved(LayerId),
    TrackAdded(TrackId),
    TrackRemoved(TrackId),
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    DurationChanged(RationalTime),
    /// An edit snapped to this position.
    SnapIndicator(RationalTime),
    SnapEnded,
    SelectionChanged,
    Committed,
}

#[derive(Debug)]
pub struct Timeline {
    layers: BTreeMap<LayerId, Layer>,
    layer_order: Vec<LayerId>,
    tracks: BTreeMap<TrackId, Track>,
    track_order: Vec<TrackId>,
    objects: BTreeMap<ObjectId, TimelineObject>,
    clips: BTreeMap<ClipId, Clip>,
    links: BTreeMap<LinkId, BTreeSet<ObjectId>>,
    selection: Selection,
    snapping: SnappingEngine,
    settings: EditorSettings,
    duration: RationalTime,
    duration_stale: bool,
    update_enabled: bool,
    /// A `SnapIndicator` was emitted and its `SnapEnded` is still owed.
    snap_reported: bool,
    journal: Option<Vec<Operation>>,
    editing: bool,
    player: Option<PlayerHandle>,
    listeners: Signal<TimelineEvent>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::with_settings(&EditorSettings::default())
    }

    /// Timeline whose snapping distance and defaults come from `settings`.
    pub fn with_settings(settings: &EditorSettings) -> Self {
        Self {
            layers: BTreeMap::new(),
            layer_order: Vec::new(),
            tracks: BTreeMap::new(),
            track_order: Vec::new(),
            objects: BTreeMap::new(),
            clips: BTreeMap::new(),
            links: BTreeMap::new(),
            selection: Selection::new(),
            snapping: SnappingEngine::new(settings.snapping_distance(settings.zoom())),
            settings: settings.clone(),
            duration: RationalTime::ZERO,
            duration_stale: false,
            update_enabled: true,
            snap_reported: false,
            journal: None,
            editing: false,
            player: None,
            listeners: Signal::new(),
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    /// End of the last clip. Stale while updates are disabled.
    pub fn duration(&self) -> RationalTime {
        self.duration
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.tracks.is_empty() && self.objects.is_empty()
    }

    /// Layers in priority order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.layer_order.iter().filter_map(|id| self.layers.get(id))
    }

    pub fn layer_count(&self) -> usize {
        self.layer_order.len()
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer> {
        self.layers
            .get(&id)
            .ok_or_else(|| SpliceError::not_found("layer", id))
    }

    pub fn layer_at(&self, priority: u32) -> Option<&Layer> {
        self.layer_order
            .get(priority as usize)
            .and_then(|id| self.layers.get(id))
    }

    /// Tracks in display order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.track_order.iter().filter_map(|id| self.tracks.get(id))
    }

    pub fn track_count(&self) -> usize {
        self.track_order.len()
    }

    pub fn track(&self, id: TrackId) -> Result<&Track> {
        self.tracks
            .get(&id)
            .ok_or_else(|| SpliceError::not_found("track", id))
    }

    /// Objects in id order.
    pub fn objects(&self) -> impl Iterator<Item = &TimelineObject> + '_ {
        self.objects.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, id: ObjectId) -> Result<&TimelineObject> {
        self.objects
            .get(&id)
            .ok_or_else(|| SpliceError::not_found("object", id))
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> + '_ {
        self.clips.values()
    }

    pub fn clip(&self, id: ClipId) -> Result<&Clip> {
        self.clips
            .get(&id)
            .ok_or_else(|| SpliceError::not_found("clip", id))
    }

    /// Clips of `object`, in the object's order.
    pub fn clips_of(&self, object: ObjectId) -> Result<Vec<&Clip>> {
        self.object(object)?
            .clips
            .iter()
            .map(|id| self.clip(*id))
            .collect()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Clips of every selected object.
    pub fn selected_clips(&self) -> Vec<ClipId> {
        self.selection
            .members()
            .iter()
            .filter_map(|id| self.objects.get(id))
            .flat_map(|object| object.clips.iter().copied())
            .collect()
    }

    /// Other members of `object`'s link group.
    pub fn linked_with(&self, object: ObjectId) -> Result<Vec<ObjectId>> {
        let link = self.object(object)?.link;
        Ok(link
            .and_then(|link| self.links.get(&link))
            .map(|members| members.iter().copied().filter(|id| *id != object).collect())
            .unwrap_or_default())
    }

    pub fn link_members(&self, link: LinkId) -> Result<&BTreeSet<ObjectId>> {
        self.links
            .get(&link)
            .ok_or_else(|| SpliceError::not_found("link", link))
    }

    pub fn snapping(&self) -> &SnappingEngine {
        &self.snapping
    }

    pub fn snapping_distance(&self) -> RationalTime {
        self.snapping.distance()
    }

    pub fn is_update_enabled(&self) -> bool {
        self.update_enabled
    }

    /// Whether mutations are currently journaled.
    pub fn is_recording(&self) -> bool {
        self.journal.is_some()
    }

    /// Whether an editing context is active.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Objects whose clips intersect `range`, optionally restricted to
    /// layers with a priority in `priorities`. Sorted by start, then id.
    pub fn objects_in_range(
        &self,
        range: TimeRange,
        priorities: Option<RangeInclusive<u32>>,
    ) -> Vec<ObjectId> {
        let mut found: Vec<&TimelineObject> = self
            .objects
            .values()
            .filter(|object| {
                priorities
                    .as_ref()
                    .map_or(true, |p| p.contains(&object.priority))
            })
            .filter(|object| {
                object.clips.iter().filter_map(|id| self.clips.get(id)).any(|clip| {
                    clip.range().overlaps(range)
                        || (clip.duration().is_zero() && range.contains(clip.start()))
                })
            })
            .collect();
        found.sort_by_key(|object| (object.start(), object.id));
        found.into_iter().map(|object| object.id).collect()
    }

    // ── Layers ──────────────────────────────────────────────────

    /// Append a layer below the existing ones.
    pub fn add_layer(&mut self) -> Result<LayerId> {
        self.insert_layer(self.layer_order.len() as u32)
    }

    /// Insert a layer at `priority` (clamped to the layer count), shifting
    /// lower layers down.
    pub fn insert_layer(&mut self, priority: u32) -> Result<LayerId> {
        let priority = priority.min(self.layer_order.len() as u32);
        let layer = Layer::new(priority, self.settings.auto_transition_on_new_layers);
        let id = layer.id;
        self.perform(Operation::AddLayer {
            layer,
            objects: Vec::new(),
        })?;
        Ok(id)
    }

    /// Return the top layer, creating one with auto-transitions if the
    /// timeline has none.
    pub fn ensure_layer(&mut self) -> Result<LayerId> {
        if let Some(id) = self.layer_order.first() {
            return Ok(*id);
        }
        let layer = Layer::new(0, true);
        let id = layer.id;
        self.perform(Operation::AddLayer {
            layer,
            objects: Vec::new(),
        })?;
        Ok(id)
    }

    /// Remove a layer and every object on it. Lower layers move up.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<()> {
        let layer = self.layer(id)?;
        let record = layer.emptied();
        let objects = layer
            .objects()
            .filter(|object| {
                !self
                    .objects
                    .get(object)
                    .is_some_and(TimelineObject::is_transition)
            })
            .map(|object| self.object_record(object))
            .collect::<Result<Vec<_>>>()?;
        self.perform(Operation::RemoveLayer {
            layer: record,
            objects,
        })
    }

    pub fn move_layer(&mut self, id: LayerId, priority: u32) -> Result<()> {
        let from = self.layer(id)?.priority;
        if priority as usize >= self.layer_order.len() {
            return Err(SpliceError::InvalidParameter(format!(
                "priority {} out of range for {} layers",
                priority,
                self.layer_order.len()
            )));
        }
        if from == priority {
            return Ok(());
        }
        self.perform(Operation::MoveLayer {
            layer: id,
            from,
            to: priority,
        })
    }

    pub fn set_layer_auto_transition(&mut self, id: LayerId, enabled: bool) -> Result<()> {
        let old = self.layer(id)?.auto_transition;
        if old == enabled {
            return Ok(());
        }
        self.perform(Operation::SetAutoTransition {
            layer: id,
            old,
            new: enabled,
        })
    }

    // ── Tracks ──────────────────────────────────────────────────

    /// Append a track. Existing objects do not gain clips on it.
    pub fn add_track(&mut self, kind: TrackKind) -> Result<TrackId> {
        let number = self.tracks.values().filter(|t| t.kind == kind).count() + 1;
        let track = Track::new(format!("{}{}", kind.prefix(), number), kind);
        let id = track.id;
        self.perform(Operation::AddTrack {
            track,
            index: self.track_order.len(),
            objects: Vec::new(),
        })?;
        Ok(id)
    }

    /// Remove a track and its clips. Objects left without clips are removed.
    pub fn remove_track(&mut self, id: TrackId) -> Result<()> {
        let track = self.track(id)?;
        let record = track.emptied();
        let index = self.track_index(id)?;
        let affected: BTreeSet<ObjectId> = track
            .clip_ids()
            .filter_map(|clip| self.clips.get(&clip))
            .filter(|clip| clip.kind == ClipKind::Source)
            .map(|clip| clip.object_id)
            .collect();
        let objects = affected
            .into_iter()
            .map(|object| self.object_record(object))
            .collect::<Result<Vec<_>>>()?;
        self.perform(Operation::RemoveTrack {
            track: record,
            index,
            objects,
        })
    }

    // ── Objects ─────────────────────────────────────────────────

    /// Add an object on `layer` with one locked clip per matching track.
    pub fn add_object(&mut self, layer: LayerId, spec: ObjectSpec) -> Result<ObjectId> {
        let record = self.build_object_record(layer, &spec)?;
        let id = record.id();
        self.perform(Operation::AddObject { record })?;
        debug!(object = %id, uri = %spec.source.uri, "object added");
        Ok(id)
    }

    /// Add an object right after the current end of the timeline.
    pub fn append(&mut self, layer: LayerId, spec: ObjectSpec) -> Result<ObjectId> {
        let end = self.computed_duration();
        self.add_object(layer, spec.at(end))
    }

    /// Add an object, shifting every object on the same layer that starts
    /// at or after it by the new object's duration.
    pub fn ripple_insert(&mut self, layer: LayerId, spec: ObjectSpec) -> Result<ObjectId> {
        let record = self.build_object_record(layer, &spec)?;
        let shift = record.object.duration();
        let downstream: Vec<(ObjectId, Placement)> = self
            .layer(layer)?
            .objects()
            .filter_map(|id| self.objects.get(&id))
            .filter(|object| !object.is_transition() && object.start() >= spec.start)
            .map(|object| (object.id, object.placement))
            .collect();

        for (object, old) in downstream {
            self.perform(Operation::SetObjectPlacement {
                object,
                old,
                new: old.shifted(shift),
            })?;
        }
        let id = record.id();
        self.perform(Operation::AddObject { record })?;
        Ok(id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Result<()> {
        self.editable_object(id)?;
        let record = self.object_record(id)?;
        self.perform(Operation::RemoveObject { record })
    }

    /// Remove every object whose source has `uri`. Returns how many.
    pub fn remove_objects_by_source(&mut self, uri: &str) -> Result<usize> {
        let ids: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|object| object.source.as_ref().is_some_and(|s| s.uri == uri))
            .map(|object| object.id)
            .collect();
        for id in &ids {
            self.remove_object(*id)?;
        }
        Ok(ids.len())
    }

    /// Set start, duration and in-point together. Locked clips follow.
    pub fn set_object_placement(&mut self, id: ObjectId, placement: Placement) -> Result<()> {
        let object = self.editable_object(id)?;
        placement.validate(object.max_duration())?;
        let old = object.placement;
        if old == placement {
            return Ok(());
        }
        self.perform(Operation::SetObjectPlacement {
            object: id,
            old,
            new: placement,
        })
    }

    pub fn set_object_start(&mut self, id: ObjectId, start: RationalTime) -> Result<()> {
        let placement = self.object(id)?.placement;
        self.set_object_placement(id, placement.with_start(start))
    }

    pub fn set_object_duration(&mut self, id: ObjectId, duration: RationalTime) -> Result<()> {
        let placement = self.object(id)?.placement;
        self.set_object_placement(
            id,
            Placement {
                duration,
                ..placement
            },
        )
    }

    pub fn set_object_in_point(&mut self, id: ObjectId, in_point: RationalTime) -> Result<()> {
        let placement = self.object(id)?.placement;
        self.set_object_placement(
            id,
            Placement {
                in_point,
                ..placement
            },
        )
    }

    /// Move an object (and its clips) to another layer.
    pub fn set_object_layer(&mut self, id: ObjectId, layer: LayerId) -> Result<()> {
        let old = self.editable_object(id)?.layer_id;
        self.layer(layer)?;
        if old == layer {
            return Ok(());
        }
        self.perform(Operation::SetObjectLayer {
            object: id,
            old,
            new: layer,
        })
    }

    /// Move an object to the layer at `priority`.
    pub fn set_object_priority(&mut self, id: ObjectId, priority: u32) -> Result<()> {
        let layer = self
            .layer_at(priority)
            .map(|l| l.id)
            .ok_or_else(|| SpliceError::not_found("layer with priority", priority))?;
        self.set_object_layer(id, layer)
    }

    /// Lock or unlock every clip of an object. Locking snaps clips back to
    /// the object's placement.
    pub fn set_object_locked(&mut self, id: ObjectId, locked: bool) -> Result<()> {
        let object = self.editable_object(id)?;
        let placement = object.placement;
        let clips: Vec<(ClipId, Placement, bool)> = object
            .clips
            .iter()
            .filter_map(|clip| self.clips.get(clip))
            .map(|clip| (clip.id, clip.placement, clip.locked))
            .collect();

        for (clip, old_placement, old_locked) in clips {
            if old_locked == locked {
                continue;
            }
            if locked && old_placement != placement {
                self.perform(Operation::SetClipPlacement {
                    clip,
                    old: old_placement,
                    new: placement,
                })?;
            }
            self.perform(Operation::SetClipLocked {
                clip,
                old: old_locked,
                new: locked,
            })?;
        }
        Ok(())
    }

    // ── Clips ───────────────────────────────────────────────────

    /// Position an unlocked clip independently of its object.
    pub fn set_clip_placement(&mut self, id: ClipId, placement: Placement) -> Result<()> {
        let clip = self.clip(id)?;
        if clip.locked {
            return Err(SpliceError::InvalidState(format!(
                "clip {} is locked to its object",
                id
            )));
        }
        let max = self.object(clip.object_id)?.max_duration();
        placement.validate(max)?;
        let old = clip.placement;
        if old == placement {
            return Ok(());
        }
        self.perform(Operation::SetClipPlacement {
            clip: id,
            old,
            new: placement,
        })
    }

    pub fn set_clip_start(&mut self, id: ClipId, start: RationalTime) -> Result<()> {
        let placement = self.clip(id)?.placement;
        self.set_clip_placement(id, placement.with_start(start))
    }

    pub fn set_clip_duration(&mut self, id: ClipId, duration: RationalTime) -> Result<()> {
        let placement = self.clip(id)?.placement;
        self.set_clip_placement(
            id,
            Placement {
                duration,
                ..placement
            },
        )
    }

    pub fn set_clip_in_point(&mut self, id: ClipId, in_point: RationalTime) -> Result<()> {
        let placement = self.clip(id)?.placement;
        self.set_clip_placement(
            id,
            Placement {
                in_point,
                ..placement
            },
        )
    }

    // ── Splitting ───────────────────────────────────────────────

    /// Split an object at `position`. The original keeps the left part;
    /// the returned object holds the right part.
    pub fn split_object(&mut self, id: ObjectId, position: RationalTime) -> Result<ObjectId> {
        let object = self.editable_object(id)?.clone();
        if position <= object.start() || position >= object.end() {
            return Err(SpliceError::InvalidParameter(format!(
                "split position {} is outside object {} ({}..{})",
                position,
                id,
                object.start(),
                object.end()
            )));
        }

        let offset = position - object.start();
        let left = Placement {
            duration: offset,
            ..object.placement
        };
        let right = Placement::new(position, object.end() - position, object.in_point() + offset);

        let mut right_object = TimelineObject::new(
            object.layer_id,
            object.priority,
            right,
            object.source.clone(),
            ClipKind::Source,
        );
        let mut right_clips = Vec::new();
        let mut clip_trims = Vec::new();
        for clip_id in &object.clips {
            let clip = self.clip(*clip_id)?;
            if clip.locked {
                right_clips.push(Clip::new(
                    right_object.id,
                    clip.track_id,
                    clip.layer_id,
                    clip.priority,
                    right,
                    ClipKind::Source,
                ));
            } else if clip.start() < position && position < clip.end() {
                let clip_offset = position - clip.start();
                let mut piece = Clip::new(
                    right_object.id,
                    clip.track_id,
                    clip.layer_id,
                    clip.priority,
                    Placement::new(
                        position,
                        clip.end() - position,
                        clip.in_point() + clip_offset,
                    ),
                    ClipKind::Source,
                );
                piece.locked = false;
                right_clips.push(piece);
                clip_trims.push(Operation::SetClipPlacement {
                    clip: clip.id,
                    old: clip.placement,
                    new: Placement {
                        duration: clip_offset,
                        ..clip.placement
                    },
                });
            }
        }
        if right_clips.is_empty() {
            return Err(SpliceError::InvalidParameter(format!(
                "no clip of object {} crosses {}",
                id, position
            )));
        }
        right_object.clips = right_clips.iter().map(|c| c.id).collect();
        let right_id = right_object.id;

        self.perform(Operation::SetObjectPlacement {
            object: id,
            old: object.placement,
            new: left,
        })?;
        for trim in clip_trims {
            self.perform(trim)?;
        }
        self.perform(Operation::AddObject {
            record: ObjectRecord {
                object: right_object,
                clips: right_clips,
            },
        })?;
        debug!(object = %id, right = %right_id, position = %position, "object split");
        Ok(right_id)
    }

    /// Split every source object crossing `position`. Right halves of
    /// linked objects are linked together.
    pub fn split_at(&mut self, position: RationalTime) -> Result<Vec<ObjectId>> {
        let crossing: Vec<(ObjectId, Option<LinkId>)> = self
            .objects
            .values()
            .filter(|o| !o.is_transition() && o.start() < position && position < o.end())
            .map(|o| (o.id, o.link))
            .collect();

        let mut created = Vec::new();
        let mut by_link: BTreeMap<LinkId, Vec<ObjectId>> = BTreeMap::new();
        for (id, link) in crossing {
            let right = self.split_object(id, position)?;
            if let Some(link) = link {
                by_link.entry(link).or_default().push(right);
            }
            created.push(right);
        }
        for group in by_link.values().filter(|g| g.len() > 1) {
            self.link_objects(group)?;
        }
        Ok(created)
    }

    // ── Links ───────────────────────────────────────────────────

    /// Link objects so edits move them together. Existing groups of the
    /// given objects are merged into the new one.
    pub fn link_objects(&mut self, objects: &[ObjectId]) -> Result<LinkId> {
        let mut members = BTreeSet::new();
        let mut previous = BTreeSet::new();
        for id in objects {
            let object = self.object(*id)?;
            members.insert(*id);
            if let Some(link) = object.link {
                previous.insert(link);
            }
        }
        for link in &previous {
            members.extend(self.link_members(*link)?.iter().copied());
        }
        if members.len() < 2 {
            return Err(SpliceError::InvalidParameter(
                "linking needs at least two objects".into(),
            ));
        }

        for link in previous {
            let old_members = self.link_members(link)?.clone();
            self.perform(Operation::Unlink {
                link,
                objects: old_members,
            })?;
        }
        let link = LinkId::new();
        self.perform(Operation::Link {
            link,
            objects: members,
        })?;
        Ok(link)
    }

    pub fn unlink(&mut self, link: LinkId) -> Result<()> {
        let members = self.link_members(link)?.clone();
        self.perform(Operation::Unlink {
            link,
            objects: members,
        })
    }

    /// Dissolve the link group `object` belongs to, if any.
    pub fn unlink_object(&mut self, object: ObjectId) -> Result<()> {
        match self.object(object)?.link {
            Some(link) => self.unlink(link),
            None => Ok(()),
        }
    }

    // ── Selection ───────────────────────────────────────────────

    pub fn select(&mut self, objects: &[ObjectId], mode: SelectionMode) -> Result<()> {
        for id in objects {
            self.object(*id)?;
        }
        if self.selection.apply(objects, mode) {
            self.listeners.emit(&TimelineEvent::SelectionChanged);
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.listeners.emit(&TimelineEvent::SelectionChanged);
        }
    }

    // ── Snapping & updates ──────────────────────────────────────

    /// Zero disables snapping.
    pub fn set_snapping_distance(&mut self, distance: RationalTime) {
        self.snapping.set_distance(distance);
        debug!(distance = %self.snapping.distance(), "snapping distance changed");
    }

    /// Snap `edges` against the clips of every object not in `moving`.
    pub(crate) fn snap_edges(
        &mut self,
        edges: &[RationalTime],
        moving: &BTreeSet<ObjectId>,
    ) -> Option<SnapMatch> {
        let track_index: HashMap<TrackId, usize> = self
            .track_order
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let points = SnappingEngine::collect_snap_points(
            self.clips
                .values()
                .filter(|clip| clip.kind == ClipKind::Source && !moving.contains(&clip.object_id))
                .filter_map(|clip| track_index.get(&clip.track_id).map(|index| (clip, *index))),
        );
        let found = self.snapping.snap_edges(edges, &points);
        let change = self
            .snapping
            .update_indicator(found.map(|m| m.target.position));
        self.notify_snap(change);
        found
    }

    pub(crate) fn end_snapping(&mut self) {
        let change = self.snapping.end();
        self.notify_snap(change);
    }

    /// `SnapEnded` only follows a `SnapIndicator` listeners actually saw.
    fn notify_snap(&mut self, change: Option<SnapChange>) {
        if !self.update_enabled {
            return;
        }
        match change {
            Some(SnapChange::Indicator(position)) => {
                self.snap_reported = true;
                self.listeners.emit(&TimelineEvent::SnapIndicator(position))
            }
            Some(SnapChange::Ended) => self.report_snap_ended(),
            None => {}
        }
    }

    fn report_snap_ended(&mut self) {
        if std::mem::take(&mut self.snap_reported) {
            self.listeners.emit(&TimelineEvent::SnapEnded);
        }
    }

    /// Toggle duration tracking and snapping notifications. Re-enabling
    /// brings the duration up to date and closes a snap indicator that
    /// ended while updates were off.
    pub fn enable_update(&mut self, enabled: bool) {
        self.update_enabled = enabled;
        if !enabled {
            return;
        }
        if self.duration_stale {
            self.refresh_duration();
        }
        if self.snapping.indicator().is_none() {
            self.report_snap_ended();
        }
    }

    // ── Commit ──────────────────────────────────────────────────

    pub fn attach_player(&mut self, player: PlayerHandle) {
        self.player = Some(player);
    }

    pub fn detach_player(&mut self) -> Option<PlayerHandle> {
        self.player.take()
    }

    pub fn player(&self) -> Option<&PlayerHandle> {
        self.player.as_ref()
    }

    /// Publish the current arrangement to the player without waiting.
    pub fn commit(&mut self) -> Result<()> {
        self.commit_inner(false)
    }

    /// Publish the current arrangement and block until the player has
    /// installed it.
    pub fn commit_sync(&mut self) -> Result<()> {
        self.commit_inner(true)
    }

    fn commit_inner(&mut self, wait: bool) -> Result<()> {
        if self.editing {
            return Err(SpliceError::InvalidState(
                "cannot commit while an edit is in progress".into(),
            ));
        }
        if let Err(e) = self.check_overlaps() {
            warn!(error = %e, "commit rejected");
            return Err(e);
        }
        self.sync_transitions()?;

        let arrangement = Arc::new(self.extract_snapshot());
        let duration = arrangement.duration();
        if let Some(player) = &self.player {
            if wait {
                player.publish_sync(arrangement)?;
            } else {
                player.publish(arrangement)?;
            }
        }
        info!(duration = %duration, sync = wait, "timeline committed");
        self.listeners.emit(&TimelineEvent::Committed);
        Ok(())
    }

    /// Source clips grouped by (layer priority, track index).
    fn clip_groups(&self) -> BTreeMap<(u32, usize), Vec<&Clip>> {
        let track_index: HashMap<TrackId, usize> = self
            .track_order
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let mut groups: BTreeMap<(u32, usize), Vec<&Clip>> = BTreeMap::new();
        for clip in self.clips.values().filter(|c| c.kind == ClipKind::Source) {
            if let Some(index) = track_index.get(&clip.track_id) {
                groups.entry((clip.priority, *index)).or_default().push(clip);
            }
        }
        for clips in groups.values_mut() {
            clips.sort_by_key(|c| (c.start(), c.id));
        }
        groups
    }

    /// Give every overlap on auto-transition layers exactly one transition
    /// object and drop transitions that no longer match an overlap.
    ///
    /// Transitions are derived from the source clips, so these changes are
    /// never journaled: history only ever refers to source objects, and the
    /// next commit after an undo or redo brings transitions back in line.
    fn sync_transitions(&mut self) -> Result<()> {
        let mut wanted: BTreeSet<(LayerId, TrackId, TimeRange)> = BTreeSet::new();
        for ((priority, track_index), clips) in self.clip_groups() {
            let (Some(layer), Some(track)) = (
                self.layer_at(priority),
                self.track_order.get(track_index),
            ) else {
                continue;
            };
            if !layer.auto_transition {
                continue;
            }
            for overlap in find_overlaps(&clips) {
                wanted.insert((layer.id, *track, overlap.range));
            }
        }

        let mut existing: BTreeMap<(LayerId, TrackId, TimeRange), Vec<ObjectId>> = BTreeMap::new();
        for object in self.objects.values().filter(|o| o.is_transition()) {
            for clip in object.clips.iter().filter_map(|id| self.clips.get(id)) {
                existing
                    .entry((object.layer_id, clip.track_id, clip.range()))
                    .or_default()
                    .push(object.id);
            }
        }

        let mut stale = Vec::new();
        for (key, ids) in &existing {
            let keep = usize::from(wanted.contains(key));
            stale.extend(ids.iter().skip(keep).copied());
        }
        for id in stale {
            let record = self.object_record(id)?;
            debug!(object = %id, "transition removed");
            self.apply_unrecorded(&Operation::RemoveObject { record })?;
        }

        for (layer, track, range) in wanted {
            if existing.contains_key(&(layer, track, range)) {
                continue;
            }
            let priority = self.layer(layer)?.priority;
            let placement = Placement::new(range.start, range.duration, RationalTime::ZERO);
            let mut object =
                TimelineObject::new(layer, priority, placement, None, ClipKind::Transition);
            let clip = Clip::new(object.id, track, layer, priority, placement, ClipKind::Transition);
            object.clips.push(clip.id);
            debug!(layer = %layer, track = %track, start = %range.start, "transition added");
            self.apply_unrecorded(&Operation::AddObject {
                record: ObjectRecord {
                    object,
                    clips: vec![clip],
                },
            })?;
        }
        Ok(())
    }

    fn check_overlaps(&self) -> Result<()> {
        for ((priority, track_index), clips) in self.clip_groups() {
            if self.layer_at(priority).is_some_and(|l| l.auto_transition) {
                continue;
            }
            if let Some(overlap) = find_overlaps(&clips).first() {
                let track = self
                    .track_order
                    .get(track_index)
                    .and_then(|id| self.tracks.get(id))
                    .map(|t| t.name.clone())
                    .unwrap_or_default();
                return Err(SpliceError::Overlap {
                    track,
                    layer_priority: priority,
                    position: overlap.range.start,
                });
            }
        }
        Ok(())
    }

    // ── Listeners ───────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl FnMut(&TimelineEvent) + 'static) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // ── Snapshots ───────────────────────────────────────────────

    pub fn extract_snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            layers: self.layers().cloned().collect(),
            tracks: self.tracks().cloned().collect(),
            objects: self.objects.values().cloned().collect(),
            clips: self.clips.values().cloned().collect(),
            links: self
                .links
                .iter()
                .map(|(id, objects)| LinkRecord {
                    id: *id,
                    objects: objects.clone(),
                })
                .collect(),
            snapping_distance: self.snapping.distance(),
            duration: self.computed_duration(),
        }
    }

    /// Replace the contents of an empty timeline with `snapshot`.
    /// Inconsistent snapshots are rejected and leave the timeline empty.
    pub fn load_snapshot(&mut self, snapshot: TimelineSnapshot) -> Result<()> {
        if !self.is_empty() {
            return Err(SpliceError::InvalidState(
                "snapshots can only be loaded into an empty timeline".into(),
            ));
        }

        self.layer_order = snapshot.layers.iter().map(|l| l.id).collect();
        self.layers = snapshot.layers.into_iter().map(|l| (l.id, l)).collect();
        self.track_order = snapshot.tracks.iter().map(|t| t.id).collect();
        self.tracks = snapshot.tracks.into_iter().map(|t| (t.id, t)).collect();
        self.objects = snapshot.objects.into_iter().map(|o| (o.id, o)).collect();
        self.clips = snapshot.clips.into_iter().map(|c| (c.id, c)).collect();
        self.links = snapshot
            .links
            .into_iter()
            .map(|l| (l.id, l.objects))
            .collect();
        self.duration = self.computed_duration();
        self.duration_stale = false;

        if let Err(e) = self.verify() {
            self.clear_contents();
            return Err(SpliceError::Serialization(format!(
                "inconsistent snapshot: {}",
                e
            )));
        }
        self.snapping.set_distance(snapshot.snapping_distance);

        info!(
            layers = self.layer_order.len(),
            tracks = self.track_order.len(),
            objects = self.objects.len(),
            "snapshot loaded"
        );
        let layers = self.layer_order.clone();
        let tracks = self.track_order.clone();
        let objects: Vec<ObjectId> = self.objects.keys().copied().collect();
        for id in tracks {
            self.listeners.emit(&TimelineEvent::TrackAdded(id));
        }
        for id in layers {
            self.listeners.emit(&TimelineEvent::LayerAdded(id));
        }
        for id in objects {
            self.listeners.emit(&TimelineEvent::ObjectAdded(id));
        }
        if !self.duration.is_zero() {
            self.listeners
                .emit(&TimelineEvent::DurationChanged(self.duration));
        }
        Ok(())
    }

    /// Swap the contents for `snapshot`, keeping listeners and the
    /// attached player. On error the current contents are left in place.
    pub fn replace_contents(&mut self, snapshot: TimelineSnapshot) -> Result<()> {
        if self.editing {
            return Err(SpliceError::InvalidState(
                "cannot replace the timeline while an edit is in progress".into(),
            ));
        }
        Timeline::with_settings(&self.settings).load_snapshot(snapshot.clone())?;
        self.clear();
        self.load_snapshot(snapshot)
    }

    /// Remove every layer, track and object, notifying listeners.
    pub fn clear(&mut self) {
        let objects: Vec<ObjectId> = self.objects.keys().copied().collect();
        let layers = std::mem::take(&mut self.layer_order);
        let tracks = std::mem::take(&mut self.track_order);
        let had_selection = self.selection.clear();
        let duration = self.duration;
        self.clear_contents();

        for id in objects {
            self.listeners.emit(&TimelineEvent::ObjectRemoved(id));
        }
        for id in layers {
            self.listeners.emit(&TimelineEvent::LayerRemoved(id));
        }
        for id in tracks {
            self.listeners.emit(&TimelineEvent::TrackRemoved(id));
        }
        if had_selection {
            self.listeners.emit(&TimelineEvent::SelectionChanged);
        }
        if !duration.is_zero() {
            self.listeners
                .emit(&TimelineEvent::DurationChanged(RationalTime::ZERO));
        }
        debug!("timeline cleared");
    }

    fn clear_contents(&mut self) {
        self.layers.clear();
        self.layer_order.clear();
        self.tracks.clear();
        self.track_order.clear();
        self.objects.clear();
        self.clips.clear();
        self.links.clear();
        self.duration = RationalTime::ZERO;
    }

    // ── Invariants ──────────────────────────────────────────────

    /// Panic if the structural invariants do not hold.
    pub fn check_invariants(&self) {
        if let Err(e) = self.verify() {
            panic!("timeline invariant violated: {}", e);
        }
    }

    /// Check the structural invariants, returning the first violation.
    pub fn verify(&self) -> Result<()> {
        let fail = |msg: String| Err(SpliceError::InvalidState(msg));

        if self.layer_order.len() != self.layers.len() {
            return fail("layer order and layer arena disagree".into());
        }
        for (index, id) in self.layer_order.iter().enumerate() {
            let Some(layer) = self.layers.get(id) else {
                return fail(format!("ordered layer {} missing", id));
            };
            if layer.priority as usize != index {
                return fail(format!(
                    "layer {} has priority {} at position {}",
                    id, layer.priority, index
                ));
            }
            for object in &layer.objects {
                if self.objects.get(object).map(|o| o.layer_id) != Some(*id) {
                    return fail(format!("layer {} lists foreign object {}", id, object));
                }
            }
        }

        if self.track_order.len() != self.tracks.len() {
            return fail("track order and track arena disagree".into());
        }
        let mut indexed = 0;
        for id in &self.track_order {
            let Some(track) = self.tracks.get(id) else {
                return fail(format!("ordered track {} missing", id));
            };
            if !track.is_sorted() {
                return fail(format!("track {} index is not sorted", track.name));
            }
            for (start, clip) in &track.entries {
                match self.clips.get(clip) {
                    Some(c) if c.track_id == *id && c.start() == *start => {}
                    _ => return fail(format!("track {} has stale entry {}", track.name, clip)),
                }
            }
            indexed += track.entries.len();
        }
        if indexed != self.clips.len() {
            return fail(format!(
                "{} clips but {} track entries",
                self.clips.len(),
                indexed
            ));
        }

        let mut owned = 0;
        for object in self.objects.values() {
            let Some(layer) = self.layers.get(&object.layer_id) else {
                return fail(format!("object {} on missing layer", object.id));
            };
            if !layer.objects.contains(&object.id) {
                return fail(format!("object {} not listed by its layer", object.id));
            }
            if object.priority != layer.priority {
                return fail(format!("object {} priority out of sync", object.id));
            }
            object.placement.validate(object.max_duration())?;
            if object.clips.is_empty() {
                return fail(format!("object {} has no clips", object.id));
            }
            for clip_id in &object.clips {
                let Some(clip) = self.clips.get(clip_id) else {
                    return fail(format!("object {} lists missing clip {}", object.id, clip_id));
                };
                if clip.object_id != object.id
                    || clip.layer_id != object.layer_id
                    || clip.priority != object.priority
                {
                    return fail(format!("clip {} out of sync with object", clip.id));
                }
                if clip.locked && clip.placement != object.placement {
                    return fail(format!("locked clip {} differs from its object", clip.id));
                }
                clip.placement.validate(None)?;
            }
            owned += object.clips.len();
            if let Some(link) = object.link {
                if !self.links.get(&link).is_some_and(|m| m.contains(&object.id)) {
                    return fail(format!("object {} missing from link {}", object.id, link));
                }
            }
        }
        if owned != self.clips.len() {
            return fail(format!(
                "{} clips but {} owned by objects",
                self.clips.len(),
                owned
            ));
        }

        for (link, members) in &self.links {
            for member in members {
                if self.objects.get(member).and_then(|o| o.link) != Some(*link) {
                    return fail(format!("link {} lists unlinked object {}", link, member));
                }
            }
        }

        if self.update_enabled && !self.duration_stale && self.duration != self.computed_duration()
        {
            return fail("duration out of date".into());
        }
        Ok(())
    }

    // ── Journal ─────────────────────────────────────────────────

    /// Apply and journal an operation.
    fn perform(&mut self, op: Operation) -> Result<()> {
        op.apply(self)?;
        self.refresh_duration();
        #[cfg(debug_assertions)]
        self.check_invariants();
        if let Some(journal) = self.journal.as_mut() {
            journal.push(op);
        }
        Ok(())
    }

    /// Apply an operation without journaling it.
    pub(crate) fn apply_unrecorded(&mut self, op: &Operation) -> Result<()> {
        op.apply(self)?;
        self.refresh_duration();
        #[cfg(debug_assertions)]
        self.check_invariants();
        Ok(())
    }

    /// Journal an operation whose effect is already in place.
    pub(crate) fn record(&mut self, op: Operation) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(op);
        }
    }

    pub(crate) fn start_recording(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Stop journaling and return what was recorded.
    pub(crate) fn stop_recording(&mut self) -> Vec<Operation> {
        self.journal.take().unwrap_or_default()
    }

    /// Drain the journal, keeping it open.
    pub(crate) fn take_journal(&mut self) -> Vec<Operation> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub(crate) fn begin_edit(&mut self) -> Result<()> {
        if self.editing {
            return Err(SpliceError::InvalidState(
                "another edit is already in progress".into(),
            ));
        }
        self.editing = true;
        Ok(())
    }

    pub(crate) fn end_edit(&mut self) {
        self.editing = false;
        self.end_snapping();
    }

    fn computed_duration(&self) -> RationalTime {
        self.clips
            .values()
            .map(Clip::end)
            .max()
            .unwrap_or(RationalTime::ZERO)
    }

    fn refresh_duration(&mut self) {
        if !self.update_enabled {
            self.duration_stale = true;
            return;
        }
        self.duration_stale = false;
        let duration = self.computed_duration();
        if duration != self.duration {
            self.duration = duration;
            self.listeners.emit(&TimelineEvent::DurationChanged(duration));
        }
    }

    // ── Records ─────────────────────────────────────────────────

    /// Current state of an object and its clips.
    pub fn object_record(&self, id: ObjectId) -> Result<ObjectRecord> {
        let object = self.object(id)?.clone();
        let clips = object
            .clips
            .iter()
            .map(|clip| self.clip(*clip).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(ObjectRecord { object, clips })
    }

    pub(crate) fn build_object_record(
        &self,
        layer_id: LayerId,
        spec: &ObjectSpec,
    ) -> Result<ObjectRecord> {
        let priority = self.layer(layer_id)?.priority;
        let duration = spec.resolve_duration(self.settings.default_image_duration());
        let placement = Placement::new(spec.start, duration, spec.in_point);
        placement.validate(spec.source.max_duration)?;

        let mut object = TimelineObject::new(
            layer_id,
            priority,
            placement,
            Some(spec.source.clone()),
            ClipKind::Source,
        );
        let clips: Vec<Clip> = self
            .tracks()
            .filter(|track| spec.source.provides(track.kind))
            .map(|track| {
                Clip::new(
                    object.id,
                    track.id,
                    layer_id,
                    priority,
                    placement,
                    ClipKind::Source,
                )
            })
            .collect();
        if clips.is_empty() {
            return Err(SpliceError::InvalidParameter(format!(
                "no track accepts source {}",
                spec.source.uri
            )));
        }
        object.clips = clips.iter().map(|c| c.id).collect();
        Ok(ObjectRecord { object, clips })
    }

    fn editable_object(&self, id: ObjectId) -> Result<&TimelineObject> {
        let object = self.object(id)?;
        if object.is_transition() {
            return Err(SpliceError::InvalidState(format!(
                "object {} is a transition managed by the timeline",
                id
            )));
        }
        Ok(object)
    }

    fn track_index(&self, id: TrackId) -> Result<usize> {
        self.track_order
            .iter()
            .position(|t| *t == id)
            .ok_or_else(|| SpliceError::not_found("track", id))
    }

    // ── Raw mutations (used by Operation::apply) ────────────────

    pub(crate) fn raw_insert_layer(&mut self, layer: &Layer) -> Result<()> {
        if self.layers.contains_key(&layer.id) {
            return Err(SpliceError::InvalidState(format!(
                "layer {} already exists",
                layer.id
            )));
        }
        let index = (layer.priority as usize).min(self.layer_order.len());
        self.layer_order.insert(index, layer.id);
        self.layers.insert(layer.id, layer.emptied());
        self.renumber_layers();
        info!(layer = %layer.id, priority = index, "layer added");
        self.listeners.emit(&TimelineEvent::LayerAdded(layer.id));
        Ok(())
    }

    pub(crate) fn raw_remove_layer(&mut self, id: LayerId) -> Result<()> {
        let objects: Vec<ObjectId> = self.layer(id)?.objects().collect();
        for object in objects {
            self.raw_remove_object(object, true)?;
        }
        self.layer_order.retain(|l| *l != id);
        self.layers.remove(&id);
        self.renumber_layers();
        info!(layer = %id, "layer removed");
        self.listeners.emit(&TimelineEvent::LayerRemoved(id));
        Ok(())
    }

    pub(crate) fn raw_move_layer(&mut self, id: LayerId, to: u32) -> Result<()> {
        self.layer(id)?;
        self.layer_order.retain(|l| *l != id);
        let index = (to as usize).min(self.layer_order.len());
        self.layer_order.insert(index, id);
        self.renumber_layers();
        debug!(layer = %id, priority = index, "layer moved");
        Ok(())
    }

    pub(crate) fn raw_set_auto_transition(&mut self, id: LayerId, enabled: bool) -> Result<()> {
        let layer = self
            .layers
            .get_mut(&id)
            .ok_or_else(|| SpliceError::not_found("layer", id))?;
        layer.auto_transition = enabled;
        Ok(())
    }

    /// Re-derive layer priorities from their order and push them down to
    /// objects and clips.
    fn renumber_layers(&mut self) {
        for (index, id) in self.layer_order.iter().enumerate() {
            let Some(layer) = self.layers.get_mut(id) else {
                continue;
            };
            let priority = index as u32;
            layer.priority = priority;
            for object_id in &layer.objects {
                let Some(object) = self.objects.get_mut(object_id) else {
                    continue;
                };
                object.priority = priority;
                for clip_id in &object.clips {
                    if let Some(clip) = self.clips.get_mut(clip_id) {
                        clip.priority = priority;
                    }
                }
            }
        }
    }

    pub(crate) fn raw_insert_track(&mut self, track: &Track, index: usize) -> Result<()> {
        if self.tracks.contains_key(&track.id) {
            return Err(SpliceError::InvalidState(format!(
                "track {} already exists",
                track.id
            )));
        }
        let index = index.min(self.track_order.len());
        self.track_order.insert(index, track.id);
        self.tracks.insert(track.id, track.emptied());
        info!(track = %track.name, kind = ?track.kind, "track added");
        self.listeners.emit(&TimelineEvent::TrackAdded(track.id));
        Ok(())
    }

    pub(crate) fn raw_remove_track(&mut self, id: TrackId) -> Result<()> {
        let clip_ids: Vec<ClipId> = self.track(id)?.clip_ids().collect();
        for clip_id in clip_ids {
            let Some(clip) = self.clips.remove(&clip_id) else {
                continue;
            };
            let now_empty = match self.objects.get_mut(&clip.object_id) {
                Some(object) => {
                    object.clips.retain(|c| *c != clip_id);
                    object.clips.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.raw_remove_object(clip.object_id, true)?;
            }
        }
        self.track_order.retain(|t| *t != id);
        if let Some(track) = self.tracks.remove(&id) {
            info!(track = %track.name, "track removed");
        }
        self.listeners.emit(&TimelineEvent::TrackRemoved(id));
        Ok(())
    }

    pub(crate) fn raw_insert_object(&mut self, record: &ObjectRecord, notify: bool) -> Result<()> {
        let id = record.id();
        if self.objects.contains_key(&id) {
            return Err(SpliceError::InvalidState(format!(
                "object {} already exists",
                id
            )));
        }
        let layer_id = record.object.layer_id;
        let priority = self.layer(layer_id)?.priority;
        for clip in &record.clips {
            self.track(clip.track_id)?;
        }

        let mut object = record.object.clone();
        object.priority = priority;
        object.clips = record.clips.iter().map(|c| c.id).collect();
        for clip in &record.clips {
            let mut clip = clip.clone();
            clip.object_id = id;
            clip.layer_id = layer_id;
            clip.priority = priority;
            if let Some(track) = self.tracks.get_mut(&clip.track_id) {
                track.insert(clip.start(), clip.id);
            }
            self.clips.insert(clip.id, clip);
        }
        if let Some(layer) = self.layers.get_mut(&layer_id) {
            layer.objects.insert(id);
        }
        if let Some(link) = object.link {
            self.links.entry(link).or_default().insert(id);
        }
        self.objects.insert(id, object);
        if notify {
            self.listeners.emit(&TimelineEvent::ObjectAdded(id));
        }
        Ok(())
    }

    pub(crate) fn raw_remove_object(&mut self, id: ObjectId, notify: bool) -> Result<ObjectRecord> {
        let record = self.object_record(id)?;
        for clip in &record.clips {
            if let Some(track) = self.tracks.get_mut(&clip.track_id) {
                track.remove(clip.id);
            }
            self.clips.remove(&clip.id);
        }
        if let Some(layer) = self.layers.get_mut(&record.object.layer_id) {
            layer.objects.remove(&id);
        }
        if let Some(link) = record.object.link {
            if let Some(members) = self.links.get_mut(&link) {
                members.remove(&id);
                if members.is_empty() {
                    self.links.remove(&link);
                }
            }
        }
        self.objects.remove(&id);
        if notify {
            self.listeners.emit(&TimelineEvent::ObjectRemoved(id));
            if self.selection.remove(id) {
                self.listeners.emit(&TimelineEvent::SelectionChanged);
            }
        } else {
            self.selection.remove(id);
        }
        Ok(record)
    }

    /// Bring an object back to exactly `record`, recreating it if needed.
    pub(crate) fn raw_restore_object(&mut self, record: &ObjectRecord) -> Result<()> {
        let existed = self.objects.contains_key(&record.id());
        if existed {
            self.raw_remove_object(record.id(), false)?;
        }
        self.raw_insert_object(record, !existed)
    }

    pub(crate) fn raw_set_object_placement(
        &mut self,
        id: ObjectId,
        placement: Placement,
    ) -> Result<()> {
        let object = self
            .objects
            .get_mut(&id)
            .ok_or_else(|| SpliceError::not_found("object", id))?;
        object.placement = placement;
        for clip_id in &object.clips {
            let Some(clip) = self.clips.get_mut(clip_id) else {
                continue;
            };
            if clip.locked {
                clip.placement = placement;
                if let Some(track) = self.tracks.get_mut(&clip.track_id) {
                    track.reposition(clip.id, placement.start);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn raw_set_object_layer(&mut self, id: ObjectId, layer_id: LayerId) -> Result<()> {
        let priority = self.layer(layer_id)?.priority;
        let object = self
            .objects
            .get_mut(&id)
            .ok_or_else(|| SpliceError::not_found("object", id))?;
        let old = object.layer_id;
        object.layer_id = layer_id;
        object.priority = priority;
        for clip_id in &object.clips {
            if let Some(clip) = self.clips.get_mut(clip_id) {
                clip.layer_id = layer_id;
                clip.priority = priority;
            }
        }
        if let Some(layer) = self.layers.get_mut(&old) {
            layer.objects.remove(&id);
        }
        if let Some(layer) = self.layers.get_mut(&layer_id) {
            layer.objects.insert(id);
        }
        Ok(())
    }

    pub(crate) fn raw_set_clip_placement(&mut self, id: ClipId, placement: Placement) -> Result<()> {
        let clip = self
            .clips
            .get_mut(&id)
            .ok_or_else(|| SpliceError::not_found("clip", id))?;
        clip.placement = placement;
        if let Some(track) = self.tracks.get_mut(&clip.track_id) {
            track.reposition(id, placement.start);
        }
        Ok(())
    }

    pub(crate) fn raw_set_clip_locked(&mut self, id: ClipId, locked: bool) -> Result<()> {
        let clip = self
            .clips
            .get_mut(&id)
            .ok_or_else(|| SpliceError::not_found("clip", id))?;
        clip.locked = locked;
        Ok(())
    }

    pub(crate) fn raw_link(&mut self, link: LinkId, members: &BTreeSet<ObjectId>) -> Result<()> {
        for id in members {
            match self.object(*id)?.link {
                Some(other) if other != link => {
                    return Err(SpliceError::InvalidState(format!(
                        "object {} already belongs to link {}",
                        id, other
                    )))
                }
                _ => {}
            }
        }
        for id in members {
            if let Some(object) = self.objects.get_mut(id) {
                object.link = Some(link);
            }
        }
        self.links.insert(link, members.clone());
        Ok(())
    }

    pub(crate) fn raw_unlink(&mut self, link: LinkId) -> Result<()> {
        let members = self
            .links
            .remove(&link)
            .ok_or_else(|| SpliceError::not_found("link", link))?;
        for id in members {
            if let Some(object) = self.objects.get_mut(&id) {
                object.link = None;
            }
        }
        Ok(())
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}
