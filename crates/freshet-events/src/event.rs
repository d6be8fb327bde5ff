#![forbid(unsafe_code)]

use freshet_core::{MediaTime, RepresentationId, StreamFormat, TrackId};

/// Lifecycle events emitted by a segment tracker.
///
/// Events carry identifiers rather than handles: they stay meaningful for
/// the duration of the dispatch and never borrow playlist state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerEvent {
    /// The media timeline has an explicit PTS discontinuity.
    Discontinuity { sequence: u64 },
    /// The representation skipped over unavailable segment numbers.
    SegmentGap,
    /// The tracker changed representation. `next` is `None` on teardown.
    RepresentationSwitch {
        prev: Option<RepresentationId>,
        next: Option<RepresentationId>,
    },
    /// An on-demand playlist refresh changed the representation.
    RepresentationUpdated { rep: RepresentationId },
    /// A representation can no longer be refreshed.
    RepresentationUpdateFailed { rep: RepresentationId },
    /// The probed container format changed mid-stream.
    FormatChange { format: StreamFormat },
    /// A chunk was handed to the consumer.
    SegmentChange {
        track: TrackId,
        sequence: u64,
        start: Option<MediaTime>,
        duration: MediaTime,
        display: Option<MediaTime>,
    },
    /// Buffering started or stopped for the track.
    BufferingStateUpdate { track: TrackId, enabled: bool },
    /// Buffer fill level telemetry for the track.
    BufferingLevelChange {
        track: TrackId,
        min: MediaTime,
        max: MediaTime,
        current: MediaTime,
        target: MediaTime,
    },
    /// The playback cursor was moved; `resume` is the new resume time.
    PositionChange { resume: MediaTime },
}
