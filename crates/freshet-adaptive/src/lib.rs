#![forbid(unsafe_code)]

//! Segment tracker core of the freshet adaptive streaming client.
//!
//! For a single track, [`SegmentTracker`] advances through the segment
//! sequence of one of several interchangeable representations, consults the
//! adaptation policy for switches, materialises segments into probed chunks
//! for the downstream demuxer, and broadcasts lifecycle events to its
//! listeners. Playlist parsing, transport, demuxing and the policies
//! themselves live behind the traits in this crate.

mod chunk;
mod error;
mod options;
mod position;
mod sync;
pub mod testing;
mod tracker;
mod traits;

pub use chunk::{ChunkEntry, ProbeChunk};
pub use error::SeekError;
pub use options::TrackerOptions;
pub use position::Position;
pub use sync::{StreamTimes, SynchronizationReference, SynchronizationReferences};
pub use tracker::SegmentTracker;
pub use traits::{
    AdaptationLogic, AdaptationSet, BufferingLogic, CodecDescription, ConnectionManager,
    MediaSegment, MediaSegmentLookup, PlaybackRange, Representation, RepresentationRef,
    SegmentChunk, SegmentRef, SegmentTiming, SharedResources,
};

pub use freshet_core::{MediaTime, RepresentationId, StreamFormat, StreamRole, TrackId};
pub use freshet_events::{EventBus, EventSink, TrackerEvent};
