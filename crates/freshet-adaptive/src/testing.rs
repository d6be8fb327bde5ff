#![forbid(unsafe_code)]

//! Manual fakes for exercising the tracker.
//!
//! ## Why manual fakes instead of mockall?
//!
//! `Representation` and `MediaSegment` return `Arc<dyn ...>` handles, and the
//! tracker compares representations by pointer identity. Generated mocks
//! would have to mint fresh trait objects per call, which breaks identity
//! comparisons and makes scripted segment windows awkward to express.
//!
//! The fakes here are plain structs with interior mutability: a
//! representation is configured once, shared via `Arc`, and reconfigured
//! mid-test to script live-window movement, refresh outcomes and
//! cross-representation translations. The thin strategy traits
//! (`BufferingLogic`) keep their generated mockall doubles.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use freshet_core::{MediaTime, RepresentationId, StreamFormat, StreamRole, TrackId};
use freshet_events::{EventSink, TrackerEvent};

use crate::traits::{
    AdaptationLogic, AdaptationSet, BufferingLogic, CodecDescription, ConnectionManager,
    MediaSegment, MediaSegmentLookup, PlaybackRange, Representation, RepresentationRef,
    SegmentChunk, SegmentRef, SegmentTiming, SharedResources,
};

/// Shared resources stand-in; the tracker only forwards the handle.
pub struct NullResources;

impl SharedResources for NullResources {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Connection manager stand-in; the fakes materialise chunks from memory.
pub struct NullConnections;

impl ConnectionManager for NullConnections {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Event listener that records everything it observes.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TrackerEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingSink::default())
    }

    #[must_use]
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events.
    #[must_use]
    pub fn take(&self) -> Vec<TrackerEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &TrackerEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Blueprint for the chunks a fake segment materialises.
#[derive(Clone)]
pub struct ChunkSpec {
    pub payload: Bytes,
    pub format: StreamFormat,
    pub content_type: Option<String>,
    pub discontinuity: bool,
    pub discontinuity_sequence: u64,
    /// Make `to_chunk` fail.
    pub fail: bool,
}

impl Default for ChunkSpec {
    fn default() -> Self {
        ChunkSpec {
            payload: Bytes::from_static(b"payload"),
            format: StreamFormat::Mp4,
            content_type: None,
            discontinuity: false,
            discontinuity_sequence: 0,
            fail: false,
        }
    }
}

impl ChunkSpec {
    /// Chunk with a declared MP4 format, bypassing the probe path.
    #[must_use]
    pub fn mp4() -> Self {
        ChunkSpec::default()
    }

    /// Chunk of unknown format carrying `payload`, forcing the probe path.
    #[must_use]
    pub fn unknown(payload: Vec<u8>) -> Self {
        ChunkSpec {
            payload: payload.into(),
            format: StreamFormat::Unknown,
            ..ChunkSpec::default()
        }
    }

    /// Chunk carrying `tag` as payload, for telling phases apart in tests.
    #[must_use]
    pub fn tagged(tag: &str) -> Self {
        ChunkSpec {
            payload: Bytes::copy_from_slice(tag.as_bytes()),
            ..ChunkSpec::default()
        }
    }
}

/// In-memory chunk driven by a [`ChunkSpec`].
pub struct MockChunk {
    remaining: Bytes,
    format: StreamFormat,
    content_type: Option<String>,
    discontinuity: bool,
    discontinuity_sequence: u64,
}

impl MockChunk {
    #[must_use]
    pub fn from_spec(spec: &ChunkSpec) -> Self {
        MockChunk {
            remaining: spec.payload.clone(),
            format: spec.format,
            content_type: spec.content_type.clone(),
            discontinuity: spec.discontinuity,
            discontinuity_sequence: spec.discontinuity_sequence,
        }
    }
}

impl SegmentChunk for MockChunk {
    fn discontinuity(&self) -> bool {
        self.discontinuity
    }

    fn discontinuity_sequence(&self) -> u64 {
        self.discontinuity_sequence
    }

    fn stream_format(&self) -> StreamFormat {
        self.format
    }

    fn set_stream_format(&mut self, format: StreamFormat) {
        self.format = format;
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn pull(&mut self, max: usize) -> Option<Bytes> {
        let take = max.min(self.remaining.len());
        if take == 0 {
            return None;
        }
        Some(self.remaining.split_to(take))
    }
}

/// Segment materialising [`MockChunk`]s from memory.
pub struct MockSegment {
    spec: ChunkSpec,
    display: Mutex<Option<MediaTime>>,
}

impl MockSegment {
    #[must_use]
    pub fn new(spec: ChunkSpec, display: Option<MediaTime>) -> Arc<Self> {
        Arc::new(MockSegment {
            spec,
            display: Mutex::new(display),
        })
    }
}

impl MediaSegment for MockSegment {
    fn to_chunk(
        &self,
        _resources: &dyn SharedResources,
        _connections: &dyn ConnectionManager,
        _number: u64,
        _rep: &RepresentationRef,
    ) -> Option<Box<dyn SegmentChunk>> {
        if self.spec.fail {
            return None;
        }
        Some(Box::new(MockChunk::from_spec(&self.spec)))
    }

    fn display_time(&self) -> Option<MediaTime> {
        *self.display.lock()
    }
}

struct MediaEntry {
    segment: Arc<MockSegment>,
    timing: SegmentTiming,
}

#[derive(Default)]
struct RepState {
    init: Option<Arc<MockSegment>>,
    index: Option<Arc<MockSegment>>,
    media: BTreeMap<u64, MediaEntry>,
    format: StreamFormat,
    codecs: Vec<CodecDescription>,
    translations: BTreeMap<u64, u64>,
    pending_translations: BTreeMap<u64, u64>,
    needs_update: bool,
    update_result: bool,
    exhausted: bool,
    update_calls: u32,
    scheduled: Vec<(Option<u64>, bool)>,
}

/// Scripted representation with an in-memory segment window.
pub struct MockRepresentation {
    id: RepresentationId,
    state: Mutex<RepState>,
}

impl MockRepresentation {
    #[must_use]
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(MockRepresentation {
            id: RepresentationId::new(id),
            state: Mutex::new(RepState::default()),
        })
    }

    pub fn set_init(&self, spec: ChunkSpec) {
        self.state.lock().init = Some(MockSegment::new(spec, None));
    }

    pub fn set_index(&self, spec: ChunkSpec) {
        self.state.lock().index = Some(MockSegment::new(spec, None));
    }

    /// Add a media segment; its display time defaults to the timeline start.
    pub fn add_media(&self, number: u64, timing: SegmentTiming, spec: ChunkSpec) {
        self.state.lock().media.insert(
            number,
            MediaEntry {
                segment: MockSegment::new(spec, Some(timing.start)),
                timing,
            },
        );
    }

    pub fn set_display(&self, number: u64, display: Option<MediaTime>) {
        if let Some(entry) = self.state.lock().media.get(&number) {
            *entry.segment.display.lock() = display;
        }
    }

    pub fn add_translation(&self, from: u64, to: u64) {
        self.state.lock().translations.insert(from, to);
    }

    /// Translation that only becomes visible after a successful local update.
    pub fn reveal_translation_on_update(&self, from: u64, to: u64) {
        self.state.lock().pending_translations.insert(from, to);
    }

    pub fn set_needs_update(&self, needs_update: bool) {
        self.state.lock().needs_update = needs_update;
    }

    pub fn set_update_result(&self, update_result: bool) {
        self.state.lock().update_result = update_result;
    }

    pub fn set_exhausted(&self, exhausted: bool) {
        self.state.lock().exhausted = exhausted;
    }

    pub fn set_format(&self, format: StreamFormat) {
        self.state.lock().format = format;
    }

    pub fn set_codecs(&self, codecs: Vec<CodecDescription>) {
        self.state.lock().codecs = codecs;
    }

    #[must_use]
    pub fn update_calls(&self) -> u32 {
        self.state.lock().update_calls
    }

    /// `(number, updated)` pairs passed to `schedule_next_update`.
    #[must_use]
    pub fn scheduled_updates(&self) -> Vec<(Option<u64>, bool)> {
        self.state.lock().scheduled.clone()
    }
}

impl Representation for MockRepresentation {
    fn id(&self) -> RepresentationId {
        self.id.clone()
    }

    fn needs_update(&self, _number: Option<u64>) -> bool {
        self.state.lock().needs_update
    }

    fn run_local_updates(&self, _resources: &dyn SharedResources) -> bool {
        let mut state = self.state.lock();
        state.update_calls += 1;
        if state.update_result {
            state.needs_update = false;
            let pending = std::mem::take(&mut state.pending_translations);
            state.translations.extend(pending);
            true
        } else {
            false
        }
    }

    fn schedule_next_update(&self, number: Option<u64>, updated: bool) {
        self.state.lock().scheduled.push((number, updated));
    }

    fn can_no_longer_update(&self) -> bool {
        self.state.lock().exhausted
    }

    fn translate_segment_number(&self, number: u64, _from: &dyn Representation) -> Option<u64> {
        self.state.lock().translations.get(&number).copied()
    }

    fn min_ahead_time(&self, number: u64) -> MediaTime {
        let state = self.state.lock();
        state
            .media
            .range(number.saturating_add(1)..)
            .fold(MediaTime::ZERO, |acc, (_, entry)| {
                acc.saturating_add(entry.timing.duration)
            })
    }

    fn next_media_segment(&self, number: u64) -> Option<MediaSegmentLookup> {
        let state = self.state.lock();
        let (found, entry) = state.media.range(number..).next()?;
        Some(MediaSegmentLookup {
            segment: entry.segment.clone(),
            number: *found,
            gap: *found != number,
        })
    }

    fn init_segment(&self) -> Option<SegmentRef> {
        let segment = self.state.lock().init.clone()?;
        Some(segment)
    }

    fn needs_index(&self) -> bool {
        self.state.lock().index.is_some()
    }

    fn index_segment(&self) -> Option<SegmentRef> {
        let segment = self.state.lock().index.clone()?;
        Some(segment)
    }

    fn segment_number_by_time(&self, time: MediaTime) -> Option<u64> {
        let state = self.state.lock();
        state
            .media
            .iter()
            .find(|(_, entry)| {
                entry.timing.start <= time && time < entry.timing.start + entry.timing.duration
            })
            .map(|(number, _)| *number)
    }

    fn playback_time_duration(&self, number: u64) -> Option<SegmentTiming> {
        self.state.lock().media.get(&number).map(|entry| entry.timing)
    }

    fn stream_format(&self) -> StreamFormat {
        self.state.lock().format
    }

    fn codecs_desc(&self) -> Vec<CodecDescription> {
        self.state.lock().codecs.clone()
    }

    fn media_playback_range(&self) -> Option<PlaybackRange> {
        let state = self.state.lock();
        let first = state.media.values().next()?;
        let last = state.media.values().next_back()?;
        let start = first.timing.start;
        let end = last.timing.start + last.timing.duration;
        Some(PlaybackRange {
            start,
            end,
            length: end - start,
        })
    }
}

/// Adaptation logic whose preference is set by the test script. Also records
/// the events it observes as the tracker's built-in listener.
pub struct ScriptedAdaptation {
    preferred: Mutex<Option<RepresentationRef>>,
    observed: Mutex<Vec<TrackerEvent>>,
}

impl ScriptedAdaptation {
    #[must_use]
    pub fn new(initial: RepresentationRef) -> Arc<Self> {
        Arc::new(ScriptedAdaptation {
            preferred: Mutex::new(Some(initial)),
            observed: Mutex::new(Vec::new()),
        })
    }

    /// Logic with no representation to offer.
    #[must_use]
    pub fn none() -> Arc<Self> {
        Arc::new(ScriptedAdaptation {
            preferred: Mutex::new(None),
            observed: Mutex::new(Vec::new()),
        })
    }

    pub fn prefer(&self, rep: RepresentationRef) {
        *self.preferred.lock() = Some(rep);
    }

    /// Stop offering any representation.
    pub fn prefer_none(&self) {
        *self.preferred.lock() = None;
    }

    #[must_use]
    pub fn observed(&self) -> Vec<TrackerEvent> {
        self.observed.lock().clone()
    }
}

impl EventSink for ScriptedAdaptation {
    fn on_event(&self, event: &TrackerEvent) {
        self.observed.lock().push(event.clone());
    }
}

impl AdaptationLogic for ScriptedAdaptation {
    fn next_representation(
        &self,
        _set: &dyn AdaptationSet,
        _current: Option<&RepresentationRef>,
    ) -> Option<RepresentationRef> {
        self.preferred.lock().clone()
    }
}

/// Buffering logic with a fixed start segment.
pub struct FixedBuffering(pub Option<u64>);

impl BufferingLogic for FixedBuffering {
    fn start_segment_number(&self, _rep: &dyn Representation) -> Option<u64> {
        self.0
    }
}

/// Adaptation set stand-in with inline knobs.
pub struct MockAdaptationSet {
    pub id: TrackId,
    pub role: StreamRole,
    pub aligned: bool,
    pub live: bool,
}

impl Default for MockAdaptationSet {
    fn default() -> Self {
        MockAdaptationSet {
            id: TrackId(1),
            role: StreamRole::Main,
            aligned: true,
            live: false,
        }
    }
}

impl AdaptationSet for MockAdaptationSet {
    fn id(&self) -> TrackId {
        self.id
    }

    fn role(&self) -> StreamRole {
        self.role
    }

    fn segment_aligned(&self) -> bool {
        self.aligned
    }

    fn live(&self) -> bool {
        self.live
    }
}
