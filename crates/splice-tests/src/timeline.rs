//! Timeline structure scenarios: layers, commit-time transitions and
//! snapshots, driven through the session API.

use splice_core::{RationalTime, SpliceError};
use splice_timeline::{
    EditorSession, LayerId, MediaSource, ObjectSpec, SnapshotFile, Timeline, TrackKind,
};

use crate::init_tracing;

fn secs(s: i64) -> RationalTime {
    RationalTime::from_secs(s)
}

fn av(uri: &str, duration: i64) -> ObjectSpec {
    ObjectSpec::new(MediaSource::new(uri, secs(duration)))
}

fn timeline_with_tracks() -> Timeline {
    let mut timeline = Timeline::new();
    timeline.add_track(TrackKind::Video).unwrap();
    timeline.add_track(TrackKind::Audio).unwrap();
    timeline
}

// ── Layers ─────────────────────────────────────────────────────

#[test]
fn removing_middle_layer_compacts_priorities() {
    init_tracing();
    let mut timeline = timeline_with_tracks();
    let layers: Vec<LayerId> = (0..3).map(|_| timeline.add_layer().unwrap()).collect();

    timeline.remove_layer(layers[1]).unwrap();

    let remaining: Vec<(LayerId, u32)> = timeline.layers().map(|l| (l.id(), l.priority())).collect();
    assert_eq!(remaining, vec![(layers[0], 0), (layers[2], 1)]);
    timeline.check_invariants();
}

#[test]
fn removing_last_layer_empties_timeline() {
    init_tracing();
    let mut session = EditorSession::default();
    let layer = session
        .transaction("setup", |timeline| {
            timeline.add_track(TrackKind::Video)?;
            let layer = timeline.add_layer()?;
            timeline.add_object(layer, av("a.mp4", 3))?;
            Ok(layer)
        })
        .unwrap();

    session
        .transaction("remove layer", |timeline| timeline.remove_layer(layer))
        .unwrap();
    assert_eq!(session.timeline().layer_count(), 0);
    assert_eq!(session.timeline().object_count(), 0);
    assert_eq!(session.timeline().duration(), RationalTime::ZERO);

    // Undo brings the layer and its object back.
    session.undo().unwrap();
    assert_eq!(session.timeline().layer_count(), 1);
    assert_eq!(session.timeline().object_count(), 1);
    assert_eq!(session.timeline().duration(), secs(3));
}

#[test]
fn removing_layer_is_undoable_with_order() {
    init_tracing();
    let mut session = EditorSession::default();
    let layers = session
        .transaction("setup", |timeline| {
            timeline.add_track(TrackKind::Video)?;
            (0..3).map(|_| timeline.add_layer()).collect::<Result<Vec<_>, _>>()
        })
        .unwrap();
    let before = session.timeline().extract_snapshot();

    session
        .transaction("remove", |timeline| timeline.remove_layer(layers[0]))
        .unwrap();
    session.undo().unwrap();
    assert_eq!(session.timeline().extract_snapshot(), before);
}

// ── Commit-time overlap handling ───────────────────────────────

#[test]
fn overlap_without_auto_transition_fails_commit() {
    init_tracing();
    let mut timeline = timeline_with_tracks();
    let layer = timeline.add_layer().unwrap();
    timeline.add_object(layer, av("a.mp4", 4)).unwrap();
    let b = timeline.add_object(layer, av("b.mp4", 4).at(secs(2))).unwrap();

    // Transient overlap is fine until commit.
    assert!(matches!(
        timeline.commit(),
        Err(SpliceError::Overlap { layer_priority: 0, .. })
    ));

    timeline.set_object_start(b, secs(4)).unwrap();
    timeline.commit().unwrap();
}

#[test]
fn auto_transition_layer_covers_every_overlap() {
    init_tracing();
    let mut timeline = timeline_with_tracks();
    let layer = timeline.add_layer().unwrap();
    timeline.set_layer_auto_transition(layer, true).unwrap();
    timeline.add_object(layer, av("a.mp4", 4)).unwrap();
    timeline.add_object(layer, av("b.mp4", 4).at(secs(3))).unwrap();
    timeline.add_object(layer, av("c.mp4", 4).at(secs(6))).unwrap();

    timeline.commit().unwrap();

    let snapshot = timeline.extract_snapshot();
    for track in &snapshot.tracks {
        let transitions: Vec<_> = snapshot
            .clips_on(track.id())
            .into_iter()
            .filter(|c| c.kind() == splice_timeline::ClipKind::Transition)
            .map(|c| (c.start(), c.end()))
            .collect();
        assert_eq!(
            transitions,
            vec![(secs(3), secs(4)), (secs(6), secs(7))],
            "track {}",
            track.name()
        );
    }
}

// ── Snapshots ──────────────────────────────────────────────────

#[test]
fn snapshot_file_round_trip_restores_timeline() {
    init_tracing();
    let mut timeline = timeline_with_tracks();
    let top = timeline.add_layer().unwrap();
    let bottom = timeline.add_layer().unwrap();
    let a = timeline.add_object(top, av("a.mp4", 4)).unwrap();
    let b = timeline.add_object(bottom, av("b.mp4", 6).at(secs(1))).unwrap();
    timeline.link_objects(&[a, b]).unwrap();
    let clip = timeline.clips_of(b).unwrap()[0].id();
    timeline.set_object_locked(b, false).unwrap();
    timeline.set_clip_start(clip, secs(2)).unwrap();

    let snapshot = timeline.extract_snapshot();
    let json = SnapshotFile::new(snapshot.clone()).to_json().unwrap();
    let file = SnapshotFile::from_json(&json).unwrap();

    let mut restored = Timeline::new();
    restored.load_snapshot(file.timeline).unwrap();
    assert_eq!(restored.extract_snapshot(), snapshot);
    assert_eq!(restored.linked_with(a).unwrap(), vec![b]);
    assert_eq!(restored.clip(clip).unwrap().start(), secs(2));
    assert_eq!(restored.duration(), timeline.duration());
    restored.check_invariants();
}

#[test]
fn snapshot_cannot_replace_populated_timeline() {
    init_tracing();
    let mut timeline = timeline_with_tracks();
    let snapshot = timeline.extract_snapshot();
    assert!(matches!(
        timeline.load_snapshot(snapshot),
        Err(SpliceError::InvalidState(_))
    ));
}
