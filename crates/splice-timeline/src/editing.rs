//! Interactive edits: move, ripple and trim with snapping.
//!
//! An `EditingContext` captures the original placement of every object it
//! touches. Each `edit_to` recomputes positions from those originals (never
//! incrementally), snaps, and writes the result to the timeline without
//! journaling. `finish` records the net change as a single undoable
//! transaction; `cancel` puts everything back.

use std::collections::BTreeSet;

use splice_core::{RationalTime, Result, SpliceError};
use tracing::debug;

use crate::action_log::ActionLog;
use crate::clip::Placement;
use crate::ids::{LayerId, ObjectId};
use crate::object::ObjectSpec;
use crate::operation::Operation;
use crate::timeline::Timeline;

/// Edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// Move participants in time and across layers.
    Normal,
    /// Move participants and everything after the focus by the same delta.
    Ripple,
    /// Move one edge of the participants.
    Trim,
}

/// Which edge of an object is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Active,
    Committed,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct Original {
    id: ObjectId,
    placement: Placement,
    layer: LayerId,
    priority: u32,
    max_duration: Option<RationalTime>,
}

#[derive(Debug)]
pub struct EditingContext {
    mode: EditMode,
    edge: Edge,
    state: EditState,
    /// Focus first, then the secondary objects.
    participants: Vec<Original>,
    /// Objects shifted along in ripple mode.
    downstream: Vec<Original>,
    /// Object created for this edit, removed again on cancel.
    provisional: Option<ObjectId>,
    moving: BTreeSet<ObjectId>,
}

impl EditingContext {
    /// Start editing `focus` together with `secondary`. Objects linked to
    /// any of them join the edit.
    pub fn new(
        timeline: &mut Timeline,
        focus: ObjectId,
        secondary: &[ObjectId],
        mode: EditMode,
        edge: Edge,
    ) -> Result<Self> {
        if mode == EditMode::Trim && edge == Edge::None {
            return Err(SpliceError::InvalidParameter(
                "trim edits need a start or end edge".into(),
            ));
        }
        if timeline.is_editing() {
            return Err(SpliceError::InvalidState(
                "another edit is already in progress".into(),
            ));
        }

        let mut ids = vec![focus];
        let mut seen = BTreeSet::from([focus]);
        let mut queue: Vec<ObjectId> = secondary.to_vec();
        queue.extend(timeline.linked_with(focus)?);
        while let Some(id) = queue.pop() {
            if seen.insert(id) {
                ids.push(id);
                queue.extend(timeline.linked_with(id)?);
            }
        }
        // Keep secondary order deterministic.
        ids[1..].sort();

        let mut participants = Vec::with_capacity(ids.len());
        for id in ids {
            let object = timeline.object(id)?;
            if object.is_transition() {
                if id == focus {
                    return Err(SpliceError::InvalidState(format!(
                        "object {} is a transition managed by the timeline",
                        id
                    )));
                }
                continue;
            }
            participants.push(Original {
                id,
                placement: object.placement(),
                layer: object.layer_id(),
                priority: object.priority(),
                max_duration: object.max_duration(),
            });
        }

        let mut moving: BTreeSet<ObjectId> = participants.iter().map(|p| p.id).collect();
        let mut downstream = Vec::new();
        if mode == EditMode::Ripple {
            let focus_start = participants[0].placement.start;
            for object in timeline.objects() {
                if object.is_transition()
                    || moving.contains(&object.id())
                    || object.start() < focus_start
                {
                    continue;
                }
                downstream.push(Original {
                    id: object.id(),
                    placement: object.placement(),
                    layer: object.layer_id(),
                    priority: object.priority(),
                    max_duration: object.max_duration(),
                });
            }
            moving.extend(downstream.iter().map(|o| o.id));
        }

        timeline.begin_edit()?;
        debug!(
            focus = %focus,
            participants = participants.len(),
            downstream = downstream.len(),
            ?mode,
            ?edge,
            "edit started"
        );
        Ok(Self {
            mode,
            edge,
            state: EditState::Active,
            participants,
            downstream,
            provisional: None,
            moving,
        })
    }

    /// Start a move edit on a new object (dragged in from outside the
    /// timeline). Cancelling removes the object again.
    pub fn insert(timeline: &mut Timeline, layer: LayerId, spec: ObjectSpec) -> Result<Self> {
        if timeline.is_editing() {
            return Err(SpliceError::InvalidState(
                "another edit is already in progress".into(),
            ));
        }
        let record = timeline.build_object_record(layer, &spec)?;
        let id = record.id();
        timeline.apply_unrecorded(&Operation::AddObject { record })?;
        match Self::new(timeline, id, &[], EditMode::Normal, Edge::None) {
            Ok(mut context) => {
                context.provisional = Some(id);
                Ok(context)
            }
            Err(e) => {
                let record = timeline.object_record(id)?;
                timeline.apply_unrecorded(&Operation::RemoveObject { record })?;
                Err(e)
            }
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EditState::Active
    }

    pub fn focus(&self) -> ObjectId {
        self.participants[0].id
    }

    /// Every object moved by the edit besides the focus.
    pub fn secondary(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.participants[1..].iter().map(|p| p.id)
    }

    /// Move the edit to `delta` from the original positions, targeting the
    /// layer at `priority` for the focus (normal mode only).
    pub fn edit_to(
        &mut self,
        timeline: &mut Timeline,
        delta: RationalTime,
        priority: u32,
    ) -> Result<()> {
        self.ensure_active()?;
        match (self.mode, self.edge) {
            (EditMode::Normal, _) => self.move_to(timeline, delta, Some(priority)),
            (EditMode::Ripple, _) => self.move_to(timeline, delta, None),
            (EditMode::Trim, Edge::Start) => self.trim_start(timeline, delta),
            (EditMode::Trim, Edge::End) => self.trim_end(timeline, delta),
            (EditMode::Trim, Edge::None) => Err(SpliceError::InvalidParameter(
                "trim edits need a start or end edge".into(),
            )),
        }
    }

    fn move_to(
        &self,
        timeline: &mut Timeline,
        delta: RationalTime,
        priority: Option<u32>,
    ) -> Result<()> {
        let earliest = self
            .participants
            .iter()
            .chain(&self.downstream)
            .map(|o| o.placement.start)
            .min()
            .unwrap_or(RationalTime::ZERO);
        let floor = -earliest;
        let mut delta = delta.max(floor);

        let focus = self.participants[0];
        let edges = [
            focus.placement.start + delta,
            focus.placement.end() + delta,
        ];
        if let Some(snap) = timeline.snap_edges(&edges, &self.moving) {
            let snapped = delta + snap.adjustment;
            if snapped >= floor {
                delta = snapped;
            }
        }

        let priority_delta = priority.map(|p| i64::from(p) - i64::from(focus.priority));
        let last = timeline.layer_count().saturating_sub(1) as i64;
        for original in &self.participants {
            let layer = match priority_delta {
                Some(pd) => {
                    let target = (i64::from(original.priority) + pd).clamp(0, last.max(0));
                    timeline
                        .layer_at(target as u32)
                        .map(|l| l.id())
                        .unwrap_or(original.layer)
                }
                None => original.layer,
            };
            place(timeline, original.id, original.placement.shifted(delta), layer)?;
        }
        for original in &self.downstream {
            place(
                timeline,
                original.id,
                original.placement.shifted(delta),
                original.layer,
            )?;
        }
        debug!(delta = %delta, "edit moved");
        Ok(())
    }

    fn trim_start(&self, timeline: &mut Timeline, delta: RationalTime) -> Result<()> {
        let mut low: Option<RationalTime> = None;
        let mut high: Option<RationalTime> = None;
        for original in &self.participants {
            let p = original.placement;
            let floor = (-p.start).max(-p.in_point);
            low = Some(low.map_or(floor, |l| l.max(floor)));
            high = Some(high.map_or(p.duration, |h| h.min(p.duration)));
        }
        let low = low.unwrap_or(RationalTime::ZERO);
        let high = high.unwrap_or(RationalTime::ZERO);
        let mut delta = delta.max(low).min(high);

        let focus = self.participants[0].placement;
        if let Some(snap) = timeline.snap_edges(&[focus.start + delta], &self.moving) {
            let snapped = delta + snap.adjustment;
            if snapped >= low && snapped <= high {
                delta = snapped;
            }
        }

        for original in &self.participants {
            place(
                timeline,
                original.id,
                original.placement.trim_in(delta),
                original.layer,
            )?;
        }
        debug!(delta = %delta, "start edge trimmed");
        Ok(())
    }

    fn trim_end(&self, timeline: &mut Timeline, delta: RationalTime) -> Result<()> {
        let mut low: Option<RationalTime> = None;
        let mut high: Option<RationalTime> = None;
        for original in &self.participants {
            let p = original.placement;
            low = Some(low.map_or(-p.duration, |l| l.max(-p.duration)));
            if let Some(max) = original.max_duration {
                let room = max - p.out_point();
                high = Some(high.map_or(room, |h| h.min(room)));
            }
        }
        let low = low.unwrap_or(RationalTime::ZERO);
        let mut delta = delta.max(low);
        if let Some(high) = high {
            delta = delta.min(high);
        }

        let focus = self.participants[0].placement;
        if let Some(snap) = timeline.snap_edges(&[focus.end() + delta], &self.moving) {
            let snapped = delta + snap.adjustment;
            if snapped >= low && high.map_or(true, |h| snapped <= h) {
                delta = snapped;
            }
        }

        for original in &self.participants {
            place(
                timeline,
                original.id,
                original.placement.trim_out(delta),
                original.layer,
            )?;
        }
        debug!(delta = %delta, "end edge trimmed");
        Ok(())
    }

    /// Record the net change as one transaction in `log`.
    pub fn finish(&mut self, timeline: &mut Timeline, log: &mut ActionLog) -> Result<()> {
        self.ensure_active()?;
        self.state = EditState::Committed;
        timeline.end_edit();

        let mut operations = Vec::new();
        if let Some(id) = self.provisional {
            operations.push(Operation::AddObject {
                record: timeline.object_record(id)?,
            });
        }
        for original in self.participants.iter().chain(&self.downstream) {
            if Some(original.id) == self.provisional {
                continue;
            }
            let object = timeline.object(original.id)?;
            if object.layer_id() != original.layer {
                operations.push(Operation::SetObjectLayer {
                    object: original.id,
                    old: original.layer,
                    new: object.layer_id(),
                });
            }
            if object.placement() != original.placement {
                operations.push(Operation::SetObjectPlacement {
                    object: original.id,
                    old: original.placement,
                    new: object.placement(),
                });
            }
        }

        let name = match self.mode {
            EditMode::Normal if self.provisional.is_some() => "insert",
            EditMode::Normal => "move",
            EditMode::Ripple => "ripple",
            EditMode::Trim => "trim",
        };
        debug!(name, operations = operations.len(), "edit finished");
        log.begin(timeline, name);
        for op in operations {
            timeline.record(op);
        }
        log.commit(timeline)
    }

    /// Restore every original placement and drop provisional objects.
    pub fn cancel(&mut self, timeline: &mut Timeline) -> Result<()> {
        self.ensure_active()?;
        self.state = EditState::Cancelled;
        timeline.end_edit();

        for original in self.participants.iter().chain(&self.downstream) {
            if Some(original.id) == self.provisional {
                continue;
            }
            place(timeline, original.id, original.placement, original.layer)?;
        }
        if let Some(id) = self.provisional {
            let record = timeline.object_record(id)?;
            timeline.apply_unrecorded(&Operation::RemoveObject { record })?;
        }
        debug!("edit cancelled");
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            EditState::Active => Ok(()),
            state => Err(SpliceError::InvalidState(format!(
                "editing context is {:?}",
                state
            ))),
        }
    }
}

/// Provisionally move `id` to `placement` on `layer`.
fn place(timeline: &mut Timeline, id: ObjectId, placement: Placement, layer: LayerId) -> Result<()> {
    let object = timeline.object(id)?;
    let (old_layer, old_placement) = (object.layer_id(), object.placement());
    if old_layer != layer {
        timeline.apply_unrecorded(&Operation::SetObjectLayer {
            object: id,
            old: old_layer,
            new: layer,
        })?;
    }
    if old_placement != placement {
        timeline.apply_unrecorded(&Operation::SetObjectPlacement {
            object: id,
            old: old_placement,
            new: placement,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::MediaSource;
    use crate::timeline::TimelineEvent;
    use crate::track::TrackKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn secs(s: i64) -> RationalTime {
        RationalTime::from_secs(s)
    }

    fn video(duration: i64) -> ObjectSpec {
        ObjectSpec::new(MediaSource::video("v.mp4", secs(duration)))
    }

    fn setup() -> (Timeline, LayerId, LayerId) {
        let mut timeline = Timeline::new();
        timeline.set_snapping_distance(RationalTime::ZERO);
        let top = timeline.add_layer().unwrap();
        let bottom = timeline.add_layer().unwrap();
        timeline.add_track(TrackKind::Video).unwrap();
        (timeline, top, bottom)
    }

    #[test]
    fn test_move_clamps_at_zero() {
        let (mut timeline, top, _) = setup();
        let object = timeline.add_object(top, video(5).at(secs(2))).unwrap();
        let mut ctx =
            EditingContext::new(&mut timeline, object, &[], EditMode::Normal, Edge::None).unwrap();

        ctx.edit_to(&mut timeline, -secs(10), 0).unwrap();
        assert_eq!(timeline.object(object).unwrap().start(), RationalTime::ZERO);

        // Recomputed from the original, not from the last position.
        ctx.edit_to(&mut timeline, secs(1), 0).unwrap();
        assert_eq!(timeline.object(object).unwrap().start(), secs(3));
        ctx.cancel(&mut timeline).unwrap();
    }

    #[test]
    fn test_move_changes_layer_with_clamp() {
        let (mut timeline, top, bottom) = setup();
        let object = timeline.add_object(top, video(5)).unwrap();
        let mut ctx =
            EditingContext::new(&mut timeline, object, &[], EditMode::Normal, Edge::None).unwrap();

        ctx.edit_to(&mut timeline, RationalTime::ZERO, 7).unwrap();
        assert_eq!(timeline.object(object).unwrap().layer_id(), bottom);
        timeline.check_invariants();
        ctx.cancel(&mut timeline).unwrap();
        assert_eq!(timeline.object(object).unwrap().layer_id(), top);
    }

    #[test]
    fn test_finish_records_single_entry() {
        let (mut timeline, top, _) = setup();
        let object = timeline.add_object(top, video(5)).unwrap();
        let mut log = ActionLog::new(10);

        let mut ctx =
            EditingContext::new(&mut timeline, object, &[], EditMode::Normal, Edge::None).unwrap();
        for step in 1..=5 {
            ctx.edit_to(&mut timeline, secs(step), 0).unwrap();
        }
        ctx.finish(&mut timeline, &mut log).unwrap();
        assert_eq!(log.undo_count(), 1);
        assert_eq!(log.undo_name(), Some("move"));

        log.undo(&mut timeline).unwrap();
        assert_eq!(timeline.object(object).unwrap().start(), RationalTime::ZERO);
        log.redo(&mut timeline).unwrap();
        assert_eq!(timeline.object(object).unwrap().start(), secs(5));
    }

    #[test]
    fn test_finished_context_rejects_calls() {
        let (mut timeline, top, _) = setup();
        let object = timeline.add_object(top, video(5)).unwrap();
        let mut log = ActionLog::default();
        let mut ctx =
            EditingContext::new(&mut timeline, object, &[], EditMode::Normal, Edge::None).unwrap();
        ctx.finish(&mut timeline, &mut log).unwrap();
        assert_eq!(ctx.state(), EditState::Committed);
        // Nothing moved, nothing recorded.
        assert_eq!(log.undo_count(), 0);

        assert!(matches!(
            ctx.edit_to(&mut timeline, secs(1), 0),
            Err(SpliceError::InvalidState(_))
        ));
        assert!(matches!(ctx.cancel(&mut timeline), Err(SpliceError::InvalidState(_))));
    }

    #[test]
    fn test_single_active_context() {
        let (mut timeline, top, _) = setup();
        let object = timeline.add_object(top, video(5)).unwrap();
        let mut ctx =
            EditingContext::new(&mut timeline, object, &[], EditMode::Normal, Edge::None).unwrap();
        assert!(matches!(
            EditingContext::new(&mut timeline, object, &[], EditMode::Normal, Edge::None),
            Err(SpliceError::InvalidState(_))
        ));
        assert!(matches!(timeline.commit(), Err(SpliceError::InvalidState(_))));
        ctx.cancel(&mut timeline).unwrap();
        timeline.commit().unwrap();
    }

    #[test]
    fn test_linked_objects_move_together() {
        let mut timeline = Timeline::new();
        timeline.set_snapping_distance(RationalTime::ZERO);
        let layer = timeline.add_layer().unwrap();
        timeline.add_track(TrackKind::Video).unwrap();
        timeline.add_track(TrackKind::Audio).unwrap();
        let v = timeline.add_object(layer, video(4)).unwrap();
        let a = timeline
            .add_object(layer, ObjectSpec::new(MediaSource::audio("v.mp4", secs(4))))
            .unwrap();
        timeline.link_objects(&[v, a]).unwrap();

        let mut ctx =
            EditingContext::new(&mut timeline, v, &[], EditMode::Normal, Edge::None).unwrap();
        assert_eq!(ctx.secondary().collect::<Vec<_>>(), vec![a]);
        ctx.edit_to(&mut timeline, secs(2), 0).unwrap();
        assert_eq!(timeline.object(a).unwrap().start(), secs(2));
        ctx.cancel(&mut timeline).unwrap();
    }

    #[test]
    fn test_ripple_shifts_later_objects() {
        let (mut timeline, top, bottom) = setup();
        let before = timeline.add_object(top, video(2)).unwrap();
        let focus = timeline.add_object(top, video(2).at(secs(3))).unwrap();
        let later = timeline.add_object(bottom, video(2).at(secs(6))).unwrap();

        let mut ctx =
            EditingContext::new(&mut timeline, focus, &[], EditMode::Ripple, Edge::None).unwrap();
        ctx.edit_to(&mut timeline, secs(2), 1).unwrap();
        assert_eq!(timeline.object(before).unwrap().start(), RationalTime::ZERO);
        assert_eq!(timeline.object(focus).unwrap().start(), secs(5));
        assert_eq!(timeline.object(focus).unwrap().layer_id(), top);
        assert_eq!(timeline.object(later).unwrap().start(), secs(8));
        ctx.cancel(&mut timeline).unwrap();
        assert_eq!(timeline.object(later).unwrap().start(), secs(6));
    }

    #[test]
    fn test_trim_start_clamps() {
        let (mut timeline, top, _) = setup();
        let object = timeline
            .add_object(top, video(10).at(secs(5)).with_in_point(secs(2)).with_duration(secs(4)))
            .unwrap();
        let mut ctx =
            EditingContext::new(&mut timeline, object, &[], EditMode::Trim, Edge::Start).unwrap();

        // in-point runs out before start does.
        ctx.edit_to(&mut timeline, -secs(4), 0).unwrap();
        let p = timeline.object(object).unwrap().placement();
        assert_eq!(p, Placement::new(secs(3), secs(6), RationalTime::ZERO));

        ctx.edit_to(&mut timeline, secs(9), 0).unwrap();
        let p = timeline.object(object).unwrap().placement();
        assert_eq!(p.duration, RationalTime::ZERO);
        assert_eq!(p.start, secs(9));
        ctx.cancel(&mut timeline).unwrap();
    }

    #[test]
    fn test_trim_end_clamps_to_source() {
        let (mut timeline, top, _) = setup();
        let object = timeline
            .add_object(top, video(10).with_in_point(secs(2)).with_duration(secs(4)))
            .unwrap();
        let mut ctx =
            EditingContext::new(&mut timeline, object, &[], EditMode::Trim, Edge::End).unwrap();

        ctx.edit_to(&mut timeline, secs(20), 0).unwrap();
        assert_eq!(timeline.object(object).unwrap().duration(), secs(8));
        ctx.edit_to(&mut timeline, -secs(20), 0).unwrap();
        assert_eq!(timeline.object(object).unwrap().duration(), RationalTime::ZERO);
        ctx.cancel(&mut timeline).unwrap();
    }

    #[test]
    fn test_trim_requires_edge() {
        let (mut timeline, top, _) = setup();
        let object = timeline.add_object(top, video(5)).unwrap();
        assert!(matches!(
            EditingContext::new(&mut timeline, object, &[], EditMode::Trim, Edge::None),
            Err(SpliceError::InvalidParameter(_))
        ));
        assert!(!timeline.is_editing());
    }

    #[test]
    fn test_snapping_events_during_edit() {
        let (mut timeline, top, _) = setup();
        timeline.set_snapping_distance(secs(1));
        timeline.add_object(top, video(5)).unwrap();
        let moving = timeline.add_object(top, video(2).at(secs(10))).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        timeline.subscribe(move |e| {
            if matches!(e, TimelineEvent::SnapIndicator(_) | TimelineEvent::SnapEnded) {
                sink.borrow_mut().push(*e);
            }
        });

        let mut ctx =
            EditingContext::new(&mut timeline, moving, &[], EditMode::Normal, Edge::None).unwrap();
        // Start edge lands at 5.5, half a second from the end of the first clip.
        ctx.edit_to(&mut timeline, -RationalTime::new(9, 2), 0).unwrap();
        assert_eq!(timeline.object(moving).unwrap().start(), secs(5));
        ctx.edit_to(&mut timeline, -RationalTime::new(9, 2), 0).unwrap();
        ctx.edit_to(&mut timeline, secs(3), 0).unwrap();
        ctx.cancel(&mut timeline).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![TimelineEvent::SnapIndicator(secs(5)), TimelineEvent::SnapEnded]
        );
    }

    #[test]
    fn test_insert_then_cancel_removes_object() {
        let (mut timeline, top, _) = setup();
        let mut ctx = EditingContext::insert(&mut timeline, top, video(3)).unwrap();
        let id = ctx.focus();
        assert!(timeline.object(id).is_ok());
        ctx.edit_to(&mut timeline, secs(4), 0).unwrap();
        ctx.cancel(&mut timeline).unwrap();
        assert!(timeline.object(id).is_err());
        assert_eq!(timeline.duration(), RationalTime::ZERO);
    }

    #[test]
    fn test_insert_then_finish_is_undoable() {
        let (mut timeline, top, _) = setup();
        let mut log = ActionLog::default();
        let mut ctx = EditingContext::insert(&mut timeline, top, video(3)).unwrap();
        let id = ctx.focus();
        ctx.edit_to(&mut timeline, secs(4), 0).unwrap();
        ctx.finish(&mut timeline, &mut log).unwrap();
        assert_eq!(log.undo_name(), Some("insert"));

        log.undo(&mut timeline).unwrap();
        assert!(timeline.object(id).is_err());
        log.redo(&mut timeline).unwrap();
        assert_eq!(timeline.object(id).unwrap().start(), secs(4));
    }
}
