//! Timeline to player hand-off.

use std::cell::Cell;
use std::rc::Rc;

use splice_core::RationalTime;
use splice_timeline::{
    HeadlessPipeline, MediaSource, ObjectSpec, PlaybackState, PlayerHandle, Timeline,
    TimelineEvent, TrackKind,
};

use crate::init_tracing;

fn secs(s: i64) -> RationalTime {
    RationalTime::from_secs(s)
}

#[test]
fn player_only_sees_committed_changes() {
    init_tracing();
    let mut timeline = Timeline::new();
    let layer = timeline.add_layer().unwrap();
    timeline.add_track(TrackKind::Video).unwrap();
    let object = timeline
        .add_object(
            layer,
            ObjectSpec::new(MediaSource::video("clip.mp4", secs(10))).with_duration(secs(1)),
        )
        .unwrap();

    let player = PlayerHandle::spawn(HeadlessPipeline::new()).unwrap();
    timeline.attach_player(player.clone());
    timeline.commit_sync().unwrap();
    player.prepare().unwrap();

    timeline.set_object_duration(object, secs(5)).unwrap();
    assert_eq!(timeline.duration(), secs(5));
    assert_eq!(player.duration(), secs(1));

    timeline.commit_sync().unwrap();
    assert_eq!(player.duration(), secs(5));
    assert_eq!(player.state(), PlaybackState::Paused);
}

#[test]
fn seek_is_bounded_by_committed_duration() {
    init_tracing();
    let mut timeline = Timeline::new();
    let layer = timeline.add_layer().unwrap();
    timeline.add_track(TrackKind::Audio).unwrap();
    timeline
        .add_object(layer, ObjectSpec::new(MediaSource::audio("music.wav", secs(3))))
        .unwrap();

    let player = PlayerHandle::spawn(HeadlessPipeline::new()).unwrap();
    timeline.attach_player(player.clone());
    timeline.commit().unwrap();
    player.seek(secs(60)).unwrap();
    player.play().unwrap();
    // Drains everything queued before it.
    timeline.commit_sync().unwrap();

    assert_eq!(player.position(), secs(3));
    assert_eq!(player.state(), PlaybackState::Playing);
}

#[test]
fn commit_notifies_listeners_once() {
    init_tracing();
    let mut timeline = Timeline::new();
    timeline.add_layer().unwrap();
    let commits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&commits);
    timeline.subscribe(move |event| {
        if *event == TimelineEvent::Committed {
            counter.set(counter.get() + 1);
        }
    });

    // Without a player the commit still validates and notifies.
    timeline.commit().unwrap();
    timeline.commit_sync().unwrap();
    assert_eq!(commits.get(), 2);
}

#[test]
fn detached_player_keeps_last_arrangement() {
    init_tracing();
    let mut timeline = Timeline::new();
    let layer = timeline.add_layer().unwrap();
    timeline.add_track(TrackKind::Video).unwrap();
    timeline.attach_player(PlayerHandle::spawn(HeadlessPipeline::new()).unwrap());
    timeline
        .add_object(layer, ObjectSpec::new(MediaSource::video("a.mp4", secs(2))))
        .unwrap();
    timeline.commit_sync().unwrap();

    let player = timeline.detach_player().unwrap();
    timeline.remove_layer(layer).unwrap();
    timeline.commit().unwrap();
    assert_eq!(player.duration(), secs(2));
}
