#![forbid(unsafe_code)]

//! Contracts the tracker consumes from its collaborators.
//!
//! Representations, segments and chunks are owned by the playlist graph and
//! the transport layer; the tracker sees them only through these traits.
//! Questions that can go unanswered return `Option`, and no "unset" segment
//! number sentinel ever crosses a signature.

use std::any::Any;
use std::sync::Arc;

use bytes::Bytes;
use freshet_core::{MediaTime, RepresentationId, StreamFormat, StreamRole, TrackId};
use freshet_events::EventSink;

#[cfg(test)]
use mockall::automock;

/// Shared-by-value handle to a representation owned by the playlist graph.
///
/// The tracker compares representations by pointer identity, never by value.
pub type RepresentationRef = Arc<dyn Representation>;

/// Shared-by-value handle to an addressable media segment.
pub type SegmentRef = Arc<dyn MediaSegment>;

/// Process-wide services shared by every track of a playback session
/// (credential stores, key stores, caches). The tracker never inspects this;
/// it only forwards the handle to representation and segment operations.
pub trait SharedResources: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Transport layer handle. The tracker performs no I/O itself; segments use
/// this to open their byte sources during materialisation.
pub trait ConnectionManager: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// One logical track: a group of interchangeable representations.
pub trait AdaptationSet: Send + Sync {
    fn id(&self) -> TrackId;

    fn role(&self) -> StreamRole;

    /// Whether representations share segment boundaries, making mid-stream
    /// switches safe.
    fn segment_aligned(&self) -> bool;

    /// Whether the owning playlist is live (sliding window) rather than
    /// on-demand.
    fn live(&self) -> bool;
}

/// Picks the representation to read next. Registered as an event listener at
/// tracker construction so it observes switches, gaps and buffering
/// telemetry.
pub trait AdaptationLogic: EventSink {
    /// Preferred representation given the current one, or `None` when the
    /// track has nothing to offer.
    fn next_representation(
        &self,
        set: &dyn AdaptationSet,
        current: Option<&RepresentationRef>,
    ) -> Option<RepresentationRef>;
}

/// Picks where playback starts within a representation.
#[cfg_attr(test, automock)]
pub trait BufferingLogic: Send + Sync {
    fn start_segment_number(&self, rep: &dyn Representation) -> Option<u64>;
}

/// Timing of one segment on the playback timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentTiming {
    pub start: MediaTime,
    pub duration: MediaTime,
}

/// Addressable range of the track on the playback timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackRange {
    pub start: MediaTime,
    pub end: MediaTime,
    pub length: MediaTime,
}

/// Codec signalling for downstream demuxer and decoder setup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecDescription {
    pub codec: String,
    pub description: Option<String>,
}

/// Result of asking a representation for the data segment at or after a
/// number.
pub struct MediaSegmentLookup {
    pub segment: SegmentRef,
    /// The number actually served; greater than the requested one when that
    /// segment is no longer addressable.
    pub number: u64,
    /// Advisory gap report. The tracker derives gaps from the number
    /// adjustment; implementations should still set this truthfully.
    pub gap: bool,
}

/// One encoding of a track. Implemented by the playlist layer; all methods
/// take `&self` because representations are shared across the session.
pub trait Representation: Send + Sync {
    fn id(&self) -> RepresentationId;

    /// Whether local playlist state is too stale to answer questions about
    /// `number` (`None` = no particular segment in mind).
    fn needs_update(&self, number: Option<u64>) -> bool;

    /// Refresh local playlist state. May block on I/O. Returns whether
    /// anything changed.
    fn run_local_updates(&self, resources: &dyn SharedResources) -> bool;

    /// Schedule the next refresh epoch after an update attempt around
    /// `number`.
    fn schedule_next_update(&self, number: Option<u64>, updated: bool);

    /// Whether refreshing can no longer succeed (e.g. the playlist is gone).
    fn can_no_longer_update(&self) -> bool;

    /// Map a segment number of `from` onto this representation's numbering.
    fn translate_segment_number(&self, number: u64, from: &dyn Representation) -> Option<u64>;

    /// Media duration addressable at or after `number`; zero when `number`
    /// has fallen off the live window.
    fn min_ahead_time(&self, number: u64) -> MediaTime;

    /// The data segment at or after `number`, or `None` when nothing is
    /// available yet.
    fn next_media_segment(&self, number: u64) -> Option<MediaSegmentLookup>;

    /// Representation-global header segment, if the format has one.
    fn init_segment(&self) -> Option<SegmentRef>;

    /// Whether an index segment must be emitted between init and media.
    fn needs_index(&self) -> bool;

    fn index_segment(&self) -> Option<SegmentRef>;

    /// Segment number whose playback interval covers `time`.
    fn segment_number_by_time(&self, time: MediaTime) -> Option<u64>;

    /// Timeline start and duration of segment `number`.
    fn playback_time_duration(&self, number: u64) -> Option<SegmentTiming>;

    /// Container format declared by the playlist, `Unknown` when it does not
    /// say.
    fn stream_format(&self) -> StreamFormat;

    fn codecs_desc(&self) -> Vec<CodecDescription>;

    fn media_playback_range(&self) -> Option<PlaybackRange>;
}

/// One addressable media unit of a representation.
pub trait MediaSegment: Send + Sync {
    /// Materialise the segment into a readable chunk. `None` when the
    /// transport cannot produce one.
    fn to_chunk(
        &self,
        resources: &dyn SharedResources,
        connections: &dyn ConnectionManager,
        number: u64,
        rep: &RepresentationRef,
    ) -> Option<Box<dyn SegmentChunk>>;

    /// Wall-clock display time, when the playlist carries one.
    fn display_time(&self) -> Option<MediaTime>;
}

/// A materialised segment: metadata plus a pull-based byte source.
pub trait SegmentChunk: Send {
    /// Explicit discontinuity marker carried over from the playlist.
    fn discontinuity(&self) -> bool;

    fn discontinuity_sequence(&self) -> u64;

    fn stream_format(&self) -> StreamFormat;

    fn set_stream_format(&mut self, format: StreamFormat);

    /// Transport-level content type, when known.
    fn content_type(&self) -> Option<&str>;

    /// Pull at most `max` bytes. `None` means the chunk is exhausted;
    /// implementations never return an empty buffer.
    fn pull(&mut self, max: usize) -> Option<Bytes>;
}
