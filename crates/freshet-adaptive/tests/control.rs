//! Seeking, reset and the query/telemetry surface of the tracker.


use fixture::{drain, harness, harness_with_set, linear_rep, timing};

use freshet_adaptive::testing::{ChunkSpec, MockAdaptationSet, MockRepresentation, NullConnections};
use freshet_adaptive::{
    CodecDescription, MediaTime, Position, RepresentationId, SeekError, SegmentTiming,
    StreamFormat, StreamRole, TrackerEvent,
};

fn rep_id(id: &str) -> RepresentationId {
    RepresentationId::new(id)
}

#[test]
fn seek_by_time_commits_and_restarts_cleanly() {
    let rep = MockRepresentation::new("r1");
    rep.add_media(
        20,
        SegmentTiming {
            start: MediaTime::from_secs(4),
            duration: MediaTime::from_secs(4),
        },
        ChunkSpec::tagged("media-20"),
    );

    let mut h = harness(&rep, Some(20));

    let result = h
        .tracker
        .set_position_by_time(MediaTime::from_micros(5_000_000), true, false);
    assert_eq!(result, Ok(()));
    assert_eq!(
        h.sink.take(),
        vec![TrackerEvent::PositionChange {
            resume: MediaTime::from_secs(4),
        }],
    );

    // The pull after the seek is a fresh start: a switch from nothing,
    // never a gap.
    let chunk = h.tracker.next_chunk(true, &NullConnections).expect("chunk at 20");
    assert_eq!(drain(chunk), b"media-20");
    let events = h.sink.take();
    assert!(events.contains(&TrackerEvent::RepresentationSwitch {
        prev: None,
        next: Some(rep_id("r1")),
    }));
    assert!(!events.iter().any(|e| matches!(e, TrackerEvent::SegmentGap)));
}

#[test]
fn try_only_seek_probes_the_mapping_without_committing() {
    let rep = linear_rep("r1", 10, 3);
    let mut h = harness(&rep, Some(10));
    assert!(h.tracker.set_start_position());

    let result = h
        .tracker
        .set_position_by_time(timing(12).start, false, true);
    assert_eq!(result, Ok(()));
    assert!(h.sink.take().is_empty());

    // Still at the original start.
    let chunk = h.tracker.next_chunk(true, &NullConnections).expect("chunk");
    assert_eq!(drain(chunk), b"media-10");
}

#[test]
fn seek_fails_when_no_segment_covers_the_time() {
    let rep = linear_rep("r1", 10, 2);
    let mut h = harness(&rep, Some(10));

    let result = h
        .tracker
        .set_position_by_time(MediaTime::from_secs(10_000), false, false);
    assert_eq!(result, Err(SeekError::TimeNotMapped));
    assert!(h.sink.take().is_empty());
}

#[test]
fn seek_fails_and_stays_put_when_the_refresh_fails() {
    let rep = linear_rep("r1", 10, 3);
    let mut h = harness(&rep, Some(10));
    assert!(h.tracker.set_start_position());

    rep.set_needs_update(true);
    rep.set_update_result(false);

    let result = h
        .tracker
        .set_position_by_time(timing(12).start, false, false);
    assert_eq!(result, Err(SeekError::RefreshFailed(rep_id("r1"))));
    assert!(h.sink.take().is_empty());

    // Tracker state was not advanced by the failed seek.
    rep.set_needs_update(false);
    let chunk = h.tracker.next_chunk(true, &NullConnections).expect("chunk");
    assert_eq!(drain(chunk), b"media-10");
}

#[test]
fn seek_refresh_success_is_announced() {
    let rep = linear_rep("r1", 10, 3);
    rep.set_needs_update(true);
    rep.set_update_result(true);

    let mut h = harness(&rep, Some(10));

    let result = h
        .tracker
        .set_position_by_time(timing(11).start, false, false);
    assert_eq!(result, Ok(()));

    let events = h.sink.take();
    assert_eq!(
        events.first(),
        Some(&TrackerEvent::RepresentationUpdated {
            rep: rep_id("r1"),
        }),
    );
    assert!(
        events
            .iter()
            .any(|e| matches!(e, TrackerEvent::PositionChange { .. })),
    );
}

#[test]
fn seek_without_any_representation_fails() {
    let rep = linear_rep("r1", 10, 1);
    let mut h = harness(&rep, Some(10));
    h.adaptation.prefer_none();

    let result = h
        .tracker
        .set_position_by_time(MediaTime::ZERO, false, false);
    assert_eq!(result, Err(SeekError::NoRepresentation));
}

#[test]
fn set_position_emits_one_position_change_and_flushes() {
    let rep = linear_rep("r1", 10, 5);
    let mut h = harness(&rep, Some(10));
    assert!(h.tracker.set_start_position());
    let _ = h.tracker.next_chunk(true, &NullConnections).expect("chunk");
    let _ = h.sink.take();

    h.tracker.set_position(Position::new(rep.clone(), 13), true);
    assert_eq!(
        h.sink.take(),
        vec![TrackerEvent::PositionChange {
            resume: timing(13).start,
        }],
    );

    // Restarted: the next pull is a fresh start at 13.
    let chunk = h.tracker.next_chunk(true, &NullConnections).expect("chunk at 13");
    assert_eq!(drain(chunk), b"media-13");
    let events = h.sink.take();
    assert!(!events.iter().any(|e| matches!(e, TrackerEvent::SegmentGap)));
}

#[test]
fn reset_tears_down_and_allows_a_clean_restart() {
    let rep = linear_rep("r1", 10, 3);
    let mut h = harness(&rep, Some(10));
    assert!(h.tracker.set_start_position());
    let _ = h.tracker.next_chunk(true, &NullConnections).expect("chunk");
    let _ = h.sink.take();

    h.tracker.reset();
    assert_eq!(
        h.sink.take(),
        vec![TrackerEvent::RepresentationSwitch {
            prev: Some(rep_id("r1")),
            next: None,
        }],
    );

    // Both cursors invalid: pulls are silent no-ops until a new start.
    assert!(h.tracker.next_chunk(true, &NullConnections).is_none());
    assert!(h.sink.take().is_empty());

    // Restart re-announces the representation and the format.
    assert!(h.tracker.set_start_position());
    let chunk = h.tracker.next_chunk(true, &NullConnections).expect("chunk");
    assert_eq!(drain(chunk), b"media-10");
    let events = h.sink.take();
    assert!(events.contains(&TrackerEvent::RepresentationSwitch {
        prev: None,
        next: Some(rep_id("r1")),
    }));
    assert!(events.contains(&TrackerEvent::FormatChange {
        format: StreamFormat::Mp4,
    }));
}

#[test]
fn unsupported_format_stops_the_stream_without_events() {
    let rep = MockRepresentation::new("r1");
    let mut spec = ChunkSpec::tagged("media-10");
    spec.format = StreamFormat::Unsupported;
    rep.add_media(10, timing(10), spec);

    let mut h = harness(&rep, Some(10));
    assert!(h.tracker.set_start_position());

    assert!(h.tracker.next_chunk(true, &NullConnections).is_none());
    assert_eq!(
        h.sink.take(),
        vec![TrackerEvent::RepresentationSwitch {
            prev: None,
            next: Some(rep_id("r1")),
        }],
    );

    // Every further pull short-circuits silently.
    assert!(h.tracker.next_chunk(true, &NullConnections).is_none());
    assert!(h.tracker.next_chunk(true, &NullConnections).is_none());
    assert!(h.sink.take().is_empty());
}

#[test]
fn materialisation_failure_returns_none_and_retries_later() {
    let rep = MockRepresentation::new("r1");
    let mut spec = ChunkSpec::tagged("media-10");
    spec.fail = true;
    rep.add_media(10, timing(10), spec);

    let mut h = harness(&rep, Some(10));
    assert!(h.tracker.set_start_position());

    assert!(h.tracker.next_chunk(true, &NullConnections).is_none());
    assert!(h.sink.take().is_empty());

    // The transport recovers; the same position is prepared again.
    rep.add_media(10, timing(10), ChunkSpec::tagged("media-10"));
    let chunk = h.tracker.next_chunk(true, &NullConnections).expect("recovered chunk");
    assert_eq!(drain(chunk), b"media-10");
}

#[test]
fn start_position_refresh_is_announced_once() {
    let rep = linear_rep("r1", 10, 2);
    rep.set_needs_update(true);
    rep.set_update_result(true);

    let mut h = harness(&rep, Some(10));
    assert!(h.tracker.set_start_position());
    assert_eq!(
        h.sink.take(),
        vec![TrackerEvent::RepresentationUpdated {
            rep: rep_id("r1"),
        }],
    );
    assert_eq!(rep.scheduled_updates(), vec![(Some(10), true)]);

    // Second call is a no-op.
    assert!(h.tracker.set_start_position());
    assert!(h.sink.take().is_empty());
}

#[test]
fn buffering_availability_tracks_the_live_window() {
    // On-demand: always available.
    let vod = linear_rep("r1", 10, 2);
    let h = harness(&vod, Some(10));
    assert!(h.tracker.buffering_available());

    // Live with time ahead of the start segment.
    let live = linear_rep("r1", 10, 3);
    let set = MockAdaptationSet {
        live: true,
        ..MockAdaptationSet::default()
    };
    let h = harness_with_set(&live, Some(10), set);
    assert!(h.tracker.buffering_available());

    // Live at the edge: the start segment is the last one.
    let edge = linear_rep("r1", 10, 3);
    let set = MockAdaptationSet {
        live: true,
        ..MockAdaptationSet::default()
    };
    let h = harness_with_set(&edge, Some(12), set);
    assert!(!h.tracker.buffering_available());
}

#[test]
fn min_ahead_refresh_is_announced() {
    let rep = linear_rep("r1", 10, 3);
    rep.set_needs_update(true);
    rep.set_update_result(true);

    let h = harness(&rep, Some(10));
    assert_eq!(h.tracker.min_ahead_time(), MediaTime::from_secs(8));
    assert_eq!(
        h.sink.take(),
        vec![TrackerEvent::RepresentationUpdated {
            rep: rep_id("r1"),
        }],
    );
    assert_eq!(rep.update_calls(), 1);
}

#[test]
fn current_format_refreshes_quietly() {
    let rep = linear_rep("r1", 10, 2);
    rep.set_format(StreamFormat::MpegTs);
    rep.set_needs_update(true);
    rep.set_update_result(true);

    let h = harness(&rep, Some(10));
    assert_eq!(h.tracker.current_format(), StreamFormat::MpegTs);
    assert_eq!(rep.update_calls(), 1);
    assert!(h.sink.take().is_empty());
}

#[test]
fn codec_and_role_queries_delegate() {
    let rep = linear_rep("r1", 10, 2);
    rep.set_codecs(vec![CodecDescription {
        codec: "mp4a.40.2".into(),
        description: Some("AAC-LC".into()),
    }]);

    let set = MockAdaptationSet {
        role: StreamRole::Alternate,
        ..MockAdaptationSet::default()
    };
    let h = harness_with_set(&rep, Some(10), set);

    assert_eq!(h.tracker.stream_role(), StreamRole::Alternate);
    assert_eq!(
        h.tracker.codecs_desc(),
        vec![CodecDescription {
            codec: "mp4a.40.2".into(),
            description: Some("AAC-LC".into()),
        }],
    );
}

#[test]
fn playback_range_needs_a_selected_representation() {
    let rep = linear_rep("r1", 10, 3);
    let mut h = harness(&rep, Some(10));

    assert!(h.tracker.media_playback_range().is_none());

    assert!(h.tracker.set_start_position());
    let _ = h.tracker.next_chunk(true, &NullConnections).expect("chunk");

    let range = h.tracker.media_playback_range().expect("range");
    assert_eq!(range.start, timing(10).start);
    assert_eq!(range.length, MediaTime::from_secs(12));
}
