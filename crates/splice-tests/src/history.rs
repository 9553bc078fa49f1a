//! Undo/redo behaviour across sequences of user actions.

use proptest::prelude::*;
use splice_core::{RationalTime, SpliceError};
use splice_timeline::{
    ActionLog, Clip, ClipKind, EditorSession, LayerId, MediaSource, ObjectId, ObjectSpec, Timeline,
    TimelineObject, TrackId, TrackKind,
};

use crate::init_tracing;

fn secs(s: i64) -> RationalTime {
    RationalTime::from_secs(s)
}

#[test]
fn nested_transactions_undo_as_one() {
    init_tracing();
    let mut timeline = Timeline::new();
    let layer = timeline.add_layer().unwrap();
    timeline.add_track(TrackKind::Video).unwrap();
    let object = timeline
        .add_object(layer, ObjectSpec::new(MediaSource::video("a.mp4", secs(20))))
        .unwrap();
    let mut log = ActionLog::default();

    log.begin(&mut timeline, "outer");
    log.begin(&mut timeline, "inner");
    timeline.set_object_start(object, secs(10)).unwrap();
    log.commit(&mut timeline).unwrap();
    assert_eq!(log.undo_count(), 0);
    log.commit(&mut timeline).unwrap();
    assert_eq!(log.undo_count(), 1);
    assert_eq!(log.undo_name(), Some("outer"));

    log.undo(&mut timeline).unwrap();
    assert_eq!(timeline.object(object).unwrap().start(), RationalTime::ZERO);
}

#[test]
fn redo_inside_open_transaction_is_rejected() {
    init_tracing();
    let mut session = EditorSession::default();
    session
        .transaction("setup", |timeline| timeline.add_layer().map(drop))
        .unwrap();
    session.undo().unwrap();

    session.begin("open");
    assert!(matches!(session.redo(), Err(SpliceError::InvalidState(_))));
    session.commit().unwrap();
    assert!(session.redo().unwrap());
}

fn clip_spec(start: i64, duration: i64) -> ObjectSpec {
    ObjectSpec::new(MediaSource::new("clip.mp4", secs(10)))
        .at(secs(start))
        .with_duration(secs(duration))
}

fn transition_count(timeline: &Timeline) -> usize {
    timeline.objects().filter(|o| o.is_transition()).count()
}

#[test]
fn undo_survives_transitions_dropped_by_later_commit() {
    init_tracing();
    let mut session = fresh_session();
    let (a, b) = session
        .transaction("add", |timeline| {
            let layer = timeline.ensure_layer()?;
            let a = timeline.add_object(layer, clip_spec(0, 5))?;
            let b = timeline.add_object(layer, clip_spec(3, 5))?;
            timeline.commit()?;
            Ok((a, b))
        })
        .unwrap();
    assert_eq!(transition_count(session.timeline()), 2);

    session
        .transaction("move", |timeline| timeline.set_object_start(b, secs(10)))
        .unwrap();
    session.timeline_mut().commit().unwrap();
    assert_eq!(transition_count(session.timeline()), 0);

    assert!(session.undo().unwrap());
    assert!(session.undo().unwrap());
    assert!(session.timeline().object(a).is_err());
    assert_eq!(session.timeline().object_count(), 0);
    session.timeline().check_invariants();

    assert!(session.redo().unwrap());
    assert!(session.redo().unwrap());
    session.timeline_mut().commit().unwrap();
    assert_eq!(session.timeline().object(b).unwrap().start(), secs(10));
    assert_eq!(transition_count(session.timeline()), 0);
    session.timeline().check_invariants();
}

/// Everything in a timeline except the transitions commits derive from it.
#[derive(Debug, PartialEq)]
struct Sources {
    layers: Vec<(LayerId, u32, bool)>,
    tracks: Vec<TrackId>,
    objects: Vec<TimelineObject>,
    clips: Vec<Clip>,
}

fn sources(timeline: &Timeline) -> Sources {
    Sources {
        layers: timeline
            .layers()
            .map(|l| (l.id(), l.priority(), l.auto_transition()))
            .collect(),
        tracks: timeline.tracks().map(|t| t.id()).collect(),
        objects: timeline
            .objects()
            .filter(|o| !o.is_transition())
            .cloned()
            .collect(),
        clips: timeline
            .clips()
            .filter(|c| c.kind() == ClipKind::Source)
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone)]
enum Action {
    Add { start: i64, duration: i64 },
    Move { pick: usize, start: i64 },
    Trim { pick: usize, duration: i64 },
    Remove { pick: usize },
    AddLayer,
    Split { at: i64 },
    CommitInTransaction,
    Commit,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0i64..20, 1i64..8).prop_map(|(start, duration)| Action::Add { start, duration }),
        (any::<usize>(), 0i64..20).prop_map(|(pick, start)| Action::Move { pick, start }),
        (any::<usize>(), 1i64..8).prop_map(|(pick, duration)| Action::Trim { pick, duration }),
        any::<usize>().prop_map(|pick| Action::Remove { pick }),
        Just(Action::AddLayer),
        (1i64..20).prop_map(|at| Action::Split { at }),
        Just(Action::CommitInTransaction),
        Just(Action::Commit),
    ]
}

fn choose(timeline: &Timeline, index: usize) -> Option<ObjectId> {
    let ids: Vec<ObjectId> = timeline
        .objects()
        .filter(|o| !o.is_transition())
        .map(|o| o.id())
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

fn perform(session: &mut EditorSession, action: &Action) {
    match *action {
        Action::Add { start, duration } => {
            session
                .transaction("add", |timeline| {
                    let layer = timeline.ensure_layer()?;
                    timeline
                        .add_object(layer, clip_spec(start, duration))
                        .map(drop)
                })
                .unwrap();
        }
        Action::Move { pick, start } => {
            if let Some(id) = choose(session.timeline(), pick) {
                session
                    .transaction("move", |timeline| timeline.set_object_start(id, secs(start)))
                    .unwrap();
            }
        }
        Action::Trim { pick, duration } => {
            if let Some(id) = choose(session.timeline(), pick) {
                // Split pieces may not have enough source left.
                let result = session.transaction("trim", |timeline| {
                    timeline.set_object_duration(id, secs(duration))
                });
                match result {
                    Ok(()) | Err(SpliceError::InvalidParameter(_)) => {}
                    Err(e) => panic!("trim failed: {e}"),
                }
            }
        }
        Action::Remove { pick } => {
            if let Some(id) = choose(session.timeline(), pick) {
                session
                    .transaction("remove", |timeline| timeline.remove_object(id))
                    .unwrap();
            }
        }
        Action::AddLayer => {
            session
                .transaction("add layer", |timeline| timeline.add_layer().map(drop))
                .unwrap();
        }
        Action::Split { at } => {
            session.split_at(secs(at)).unwrap();
        }
        // Plain layers reject overlapping clips at commit.
        Action::CommitInTransaction => {
            match session.transaction("commit", |timeline| timeline.commit()) {
                Ok(()) | Err(SpliceError::Overlap { .. }) => {}
                Err(e) => panic!("commit failed: {e}"),
            }
        }
        Action::Commit => match session.timeline_mut().commit() {
            Ok(()) | Err(SpliceError::Overlap { .. }) => {}
            Err(e) => panic!("commit failed: {e}"),
        },
    }
}

fn fresh_session() -> EditorSession {
    let mut session = EditorSession::default();
    session
        .transaction("tracks", |timeline| {
            timeline.add_track(TrackKind::Video)?;
            timeline.add_track(TrackKind::Audio).map(drop)
        })
        .unwrap();
    session
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_then_redo_replays_every_state(actions in prop::collection::vec(action(), 1..24)) {
        let mut session = fresh_session();
        let mut states: Vec<Sources> = vec![sources(session.timeline())];
        for action in &actions {
            let before = session.action_log().undo_count();
            perform(&mut session, action);
            if session.action_log().undo_count() > before {
                states.push(sources(session.timeline()));
            }
        }
        session.timeline().check_invariants();

        for expected in states.iter().rev().skip(1) {
            prop_assert!(session.undo().unwrap());
            prop_assert_eq!(&sources(session.timeline()), expected);
        }
        for expected in states.iter().skip(1) {
            prop_assert!(session.redo().unwrap());
            prop_assert_eq!(&sources(session.timeline()), expected);
        }
        prop_assert!(!session.redo().unwrap());
        session.timeline().check_invariants();
    }
}
