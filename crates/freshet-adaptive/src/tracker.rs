#![forbid(unsafe_code)]

//! The segment tracker: advances through one track's segment sequence,
//! switches representations on policy boundaries, probes unknown container
//! formats and broadcasts lifecycle events to its listeners.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error};

use freshet_core::{MediaTime, StreamFormat, StreamRole};
use freshet_events::{EventBus, EventSink, TrackerEvent};

use crate::chunk::{ChunkEntry, ChunkQueue, ProbeChunk};
use crate::error::SeekError;
use crate::options::TrackerOptions;
use crate::position::Position;
use crate::sync::{StreamTimes, SynchronizationReference, SynchronizationReferences};
use crate::traits::{
    AdaptationLogic, AdaptationSet, BufferingLogic, CodecDescription, ConnectionManager,
    PlaybackRange, SegmentChunk, SharedResources,
};

/// Per-track orchestrator between the playlist graph, the adaptation and
/// buffering policies, and the downstream demuxer.
///
/// `next` is always the position of the chunk the next pull will return;
/// `current` is the position of the last chunk actually returned. A tracker
/// is driven by a single stream thread; operations are not reentrant.
pub struct SegmentTracker {
    resources: Arc<dyn SharedResources>,
    adaptation: Arc<dyn AdaptationLogic>,
    buffering: Arc<dyn BufferingLogic>,
    track: Arc<dyn AdaptationSet>,
    sync_references: Arc<Mutex<SynchronizationReferences>>,
    options: TrackerOptions,
    listeners: EventBus,
    current: Position,
    next: Position,
    initializing: bool,
    format: StreamFormat,
    queue: ChunkQueue,
}

impl SegmentTracker {
    pub fn new(
        resources: Arc<dyn SharedResources>,
        adaptation: Arc<dyn AdaptationLogic>,
        buffering: Arc<dyn BufferingLogic>,
        track: Arc<dyn AdaptationSet>,
        sync_references: Arc<Mutex<SynchronizationReferences>>,
    ) -> Self {
        Self::with_options(
            resources,
            adaptation,
            buffering,
            track,
            sync_references,
            TrackerOptions::default(),
        )
    }

    pub fn with_options(
        resources: Arc<dyn SharedResources>,
        adaptation: Arc<dyn AdaptationLogic>,
        buffering: Arc<dyn BufferingLogic>,
        track: Arc<dyn AdaptationSet>,
        sync_references: Arc<Mutex<SynchronizationReferences>>,
        options: TrackerOptions,
    ) -> Self {
        let mut listeners = EventBus::new();
        // The adaptation logic observes every tracker event.
        let adaptation_sink: Arc<dyn EventSink> = adaptation.clone();
        listeners.register(Arc::downgrade(&adaptation_sink));
        SegmentTracker {
            resources,
            adaptation,
            buffering,
            track,
            sync_references,
            options,
            listeners,
            current: Position::default(),
            next: Position::default(),
            initializing: true,
            format: StreamFormat::Unknown,
            queue: ChunkQueue::default(),
        }
    }

    /// Pull the next chunk for the downstream demuxer.
    ///
    /// Returns `None` when no progress is possible right now: no start
    /// position, no segment available, materialisation failed, or the stream
    /// format turned out unsupported. The caller retries on its next tick.
    pub fn next_chunk(
        &mut self,
        switch_allowed: bool,
        connections: &dyn ConnectionManager,
    ) -> Option<Box<dyn SegmentChunk>> {
        if !self.next.is_valid() {
            return None;
        }

        if self.queue.is_empty() {
            let entry = self.prepare_chunk(switch_allowed, self.next.clone(), connections);
            self.queue.push_back(entry);
        }

        let entry = self.queue.pop_front()?;
        if !entry.is_valid() {
            // End marker; the owned chunk (if any) is released here.
            return None;
        }

        let mut b_gap = self.next.number != entry.pos.number;
        let b_switched =
            !self.next.same_representation(&entry.pos) || !self.current.is_valid();
        let (chunk_discontinuity, sequence) = match entry.chunk.as_deref() {
            Some(chunk) => (chunk.discontinuity(), chunk.discontinuity_sequence()),
            None => (false, 0),
        };
        // An init or index phase re-serves the same data segment; its
        // discontinuity was already reported.
        let b_discontinuity = chunk_discontinuity
            && self.current.is_valid()
            && self.current.number != self.next.number;

        if b_switched {
            self.notify(&TrackerEvent::RepresentationSwitch {
                prev: self.current.rep().map(|rep| rep.id()),
                next: entry.pos.rep().map(|rep| rep.id()),
            });
            self.initializing = true;
        }

        // Advance both cursors so later pulls and events agree on the served
        // position.
        self.current = entry.pos.clone();
        self.next = entry.pos.clone();

        if self.format == StreamFormat::Unsupported {
            // No demuxer can be created; keep the entry and report end of
            // stream on every pull.
            self.queue.push_front(entry);
            return None;
        }

        let ChunkEntry {
            chunk,
            start,
            duration,
            display,
            ..
        } = entry;
        let chunk = chunk?;

        let chunk_format = chunk.stream_format();
        let (returned, resolved): (Box<dyn SegmentChunk>, StreamFormat) =
            if chunk_format == StreamFormat::Unknown {
                let mut probe = ProbeChunk::new(chunk);
                let mut resolved = StreamFormat::from_probe(probe.peek(self.options.probe_window));
                if resolved == StreamFormat::Unknown {
                    resolved = probe
                        .content_type()
                        .map(StreamFormat::from_mime)
                        .unwrap_or(StreamFormat::Unknown);
                }
                probe.set_stream_format(resolved);
                (Box::new(probe), resolved)
            } else {
                (chunk, chunk_format)
            };

        if resolved == StreamFormat::Unsupported {
            self.format = StreamFormat::Unsupported;
            return None;
        }
        if resolved != StreamFormat::Unknown && resolved != self.format {
            self.format = resolved;
            self.notify(&TrackerEvent::FormatChange { format: resolved });
        }

        if self.initializing {
            // The first chunk after a (re)start is never a gap.
            b_gap = false;
            self.initializing = false;
        }

        if b_gap {
            self.notify(&TrackerEvent::SegmentGap);
        }
        if b_discontinuity {
            self.notify(&TrackerEvent::Discontinuity { sequence });
        }
        self.notify(&TrackerEvent::SegmentChange {
            track: self.track.id(),
            sequence,
            start,
            duration,
            display,
        });

        if !b_gap {
            self.next.advance();
        }

        Some(returned)
    }

    /// Seek to the segment covering `time`. With `try_only` the mapping is
    /// verified but not committed; with `restarted` the tracker re-enters
    /// its initializing state.
    pub fn set_position_by_time(
        &mut self,
        time: MediaTime,
        restarted: bool,
        try_only: bool,
    ) -> Result<(), SeekError> {
        let mut pos = Position::from_parts(self.current.rep.clone(), self.current.segment_number());
        if !pos.is_valid() {
            pos.rep = self
                .adaptation
                .next_representation(self.track.as_ref(), None);
        }
        let Some(rep) = pos.rep().cloned() else {
            return Err(SeekError::NoRepresentation);
        };

        // The representation may not have been loaded at all, or expired.
        if rep.needs_update(pos.segment_number()) {
            if !rep.run_local_updates(self.resources.as_ref()) {
                error!(rep = %rep.id(), "failed to update representation");
                return Err(SeekError::RefreshFailed(rep.id()));
            }
            rep.schedule_next_update(pos.segment_number(), true);
            self.notify(&TrackerEvent::RepresentationUpdated { rep: rep.id() });
        }

        let Some(number) = rep.segment_number_by_time(time) else {
            return Err(SeekError::TimeNotMapped);
        };
        pos.number = number;
        if !try_only {
            self.set_position(pos, restarted);
        }
        Ok(())
    }

    /// Commit a new playback position, flushing any prepared chunks.
    pub fn set_position(&mut self, pos: Position, restarted: bool) {
        if restarted {
            self.initializing = true;
        }
        self.current = Position::default();
        self.next = pos;
        self.queue.flush();
        debug!(position = %self.next, restarted, "position set");
        self.notify(&TrackerEvent::PositionChange {
            resume: self.playback_time(true),
        });
    }

    /// Pick the initial position if none is set yet. Returns whether a valid
    /// start position is available; once set, further calls are no-ops.
    pub fn set_start_position(&mut self) -> bool {
        if self.next.is_valid() {
            return true;
        }
        let pos = self.start_position();
        if !pos.is_valid() {
            return false;
        }
        self.next = pos;
        true
    }

    /// Timeline start of the next (or current) segment, zero when unknown.
    pub fn playback_time(&self, of_next: bool) -> MediaTime {
        let rep = self.current.rep().cloned().or_else(|| {
            self.adaptation
                .next_representation(self.track.as_ref(), None)
        });
        let number = if of_next {
            self.next.segment_number()
        } else {
            self.current.segment_number()
        };
        if let (Some(rep), Some(number)) = (rep, number) {
            if let Some(timing) = rep.playback_time_duration(number) {
                return timing.start;
            }
        }
        MediaTime::ZERO
    }

    pub fn media_playback_range(&self) -> Option<PlaybackRange> {
        self.current.rep()?.media_playback_range()
    }

    /// Buffered time addressable ahead of the playing segment.
    ///
    /// Anchored at `current`'s number; before playback begins the buffering
    /// policy's start segment stands in.
    pub fn min_ahead_time(&self) -> MediaTime {
        let Some(rep) = self.current.rep().cloned().or_else(|| {
            self.adaptation
                .next_representation(self.track.as_ref(), None)
        }) else {
            return MediaTime::ZERO;
        };

        if rep.needs_update(self.next.segment_number()) {
            let updated = rep.run_local_updates(self.resources.as_ref());
            rep.schedule_next_update(self.next.segment_number(), updated);
            if updated {
                self.notify(&TrackerEvent::RepresentationUpdated { rep: rep.id() });
            }
        }

        let start = self
            .current
            .segment_number()
            .or_else(|| self.buffering.start_segment_number(rep.as_ref()));
        match start {
            Some(number) => rep.min_ahead_time(number),
            None => MediaTime::ZERO,
        }
    }

    /// Declared format of the selected representation, refreshing it first
    /// when stale.
    pub fn current_format(&self) -> StreamFormat {
        let rep = self.current.rep().cloned().or_else(|| {
            self.adaptation
                .next_representation(self.track.as_ref(), None)
        });
        match rep {
            Some(rep) => {
                if rep.needs_update(self.next.segment_number()) {
                    let updated = rep.run_local_updates(self.resources.as_ref());
                    rep.schedule_next_update(self.next.segment_number(), updated);
                }
                rep.stream_format()
            }
            None => StreamFormat::Unknown,
        }
    }

    pub fn codecs_desc(&self) -> Vec<CodecDescription> {
        let rep = self.current.rep().cloned().or_else(|| {
            self.adaptation
                .next_representation(self.track.as_ref(), None)
        });
        rep.map(|rep| rep.codecs_desc()).unwrap_or_default()
    }

    pub fn stream_role(&self) -> StreamRole {
        self.track.role()
    }

    pub fn synchronization_reference(
        &self,
        sequence: u64,
        time: MediaTime,
    ) -> Option<SynchronizationReference> {
        self.sync_references.lock().get_reference(sequence, time)
    }

    pub fn update_synchronization_reference(&self, sequence: u64, times: StreamTimes) {
        self.sync_references.lock().add_reference(sequence, times);
    }

    pub fn notify_buffering_state(&self, enabled: bool) {
        self.notify(&TrackerEvent::BufferingStateUpdate {
            track: self.track.id(),
            enabled,
        });
    }

    pub fn notify_buffering_level(
        &self,
        min: MediaTime,
        max: MediaTime,
        current: MediaTime,
        target: MediaTime,
    ) {
        self.notify(&TrackerEvent::BufferingLevelChange {
            track: self.track.id(),
            min,
            max,
            current,
            target,
        });
    }

    pub fn register_listener(&mut self, listener: Weak<dyn EventSink>) {
        self.listeners.register(listener);
    }

    /// Whether buffering ahead is currently possible. Always true for
    /// on-demand content; live content must have time left in the window.
    pub fn buffering_available(&self) -> bool {
        if self.track.live() {
            return self.min_ahead_time() > MediaTime::ZERO;
        }
        true
    }

    /// Refresh the selected representation if stale, announcing the outcome.
    pub fn update_selected(&self) {
        let Some(rep) = self.current.rep().cloned() else {
            return;
        };
        if rep.needs_update(self.next.segment_number()) {
            let updated = rep.run_local_updates(self.resources.as_ref());
            rep.schedule_next_update(self.current.segment_number(), updated);
            if updated {
                self.notify(&TrackerEvent::RepresentationUpdated { rep: rep.id() });
            }
        }
        if rep.can_no_longer_update() {
            self.notify(&TrackerEvent::RepresentationUpdateFailed { rep: rep.id() });
        }
    }

    /// Return the tracker to its post-construction state, announcing the
    /// teardown of the active representation.
    pub fn reset(&mut self) {
        self.notify(&TrackerEvent::RepresentationSwitch {
            prev: self.current.rep().map(|rep| rep.id()),
            next: None,
        });
        self.current = Position::default();
        self.next = Position::default();
        self.queue.flush();
        self.initializing = true;
        self.format = StreamFormat::Unknown;
    }

    /// Prepare the chunk for `pos`, switching representation first when the
    /// adaptation policy asks for it and the boundary permits.
    fn prepare_chunk(
        &self,
        switch_allowed: bool,
        mut pos: Position,
        connections: &dyn ConnectionManager,
    ) -> ChunkEntry {
        if !pos.is_valid() {
            pos = self.start_position();
            if !pos.is_valid() {
                return ChunkEntry::default();
            }
        } else {
            // Switching is only safe on an aligned boundary with init and
            // index already emitted.
            let switch_allowed = switch_allowed
                && self.track.segment_aligned()
                && pos.init_sent
                && pos.index_sent;
            if switch_allowed {
                pos = self.switched_position(pos);
            }
        }

        let Some(rep) = pos.rep().cloned() else {
            return ChunkEntry::default();
        };
        let Some(number) = pos.segment_number() else {
            return ChunkEntry::default();
        };

        let Some(lookup) = rep.next_media_segment(number) else {
            return ChunkEntry::default();
        };
        // The representation may have adjusted the number past a hole in the
        // live window.
        pos.number = lookup.number;
        let display = lookup.segment.display_time();

        let mut segment = None;
        if !pos.init_sent {
            segment = rep.init_segment();
            if segment.is_none() {
                pos.advance();
            }
        }
        if segment.is_none() && !pos.index_sent {
            if rep.needs_index() {
                segment = rep.index_segment();
            }
            if segment.is_none() {
                pos.advance();
            }
        }
        let segment = segment.unwrap_or(lookup.segment);

        let Some(chunk) = segment.to_chunk(self.resources.as_ref(), connections, pos.number, &rep)
        else {
            return ChunkEntry::default();
        };

        let timing = rep.playback_time_duration(pos.number);
        let start = timing.map(|t| t.start.saturating_add(MediaTime::ORIGIN));
        let duration = timing.map(|t| t.duration).unwrap_or_default();

        ChunkEntry {
            chunk: Some(chunk),
            pos,
            start,
            duration,
            display,
        }
    }

    /// Evaluate a representation switch at a boundary, returning either the
    /// adopted position in the new representation or the original position.
    fn switched_position(&self, pos: Position) -> Position {
        let Some(cur_rep) = pos.rep().cloned() else {
            return pos;
        };
        let Some(number) = pos.segment_number() else {
            return pos;
        };
        let Some(candidate) = self
            .adaptation
            .next_representation(self.track.as_ref(), Some(&cur_rep))
        else {
            return pos;
        };
        if Arc::ptr_eq(&candidate, &cur_rep) {
            return pos;
        }

        let mut translated = candidate.translate_segment_number(number, cur_rep.as_ref());

        if candidate.needs_update(translated) {
            let updated = candidate.run_local_updates(self.resources.as_ref());
            candidate.schedule_next_update(translated, updated);
        }
        if translated.is_none() {
            // The refresh may have made the mapping visible.
            translated = candidate.translate_segment_number(number, cur_rep.as_ref());
        }

        match translated {
            // A switch that would land past the live window is cancelled.
            Some(number) if candidate.min_ahead_time(number) == MediaTime::ZERO => pos,
            Some(number) => {
                debug!(
                    from = %cur_rep.id(),
                    to = %candidate.id(),
                    segment = number,
                    "switching representation"
                );
                Position::new(candidate, number)
            }
            None => pos,
        }
    }

    /// Starting position from the adaptation and buffering policies,
    /// refreshing the chosen representation when needed.
    fn start_position(&self) -> Position {
        let Some(rep) = self
            .adaptation
            .next_representation(self.track.as_ref(), None)
        else {
            return Position::default();
        };
        let updated = rep.needs_update(None) && rep.run_local_updates(self.resources.as_ref());
        let number = self.buffering.start_segment_number(rep.as_ref());
        rep.schedule_next_update(number, updated);
        if updated {
            self.notify(&TrackerEvent::RepresentationUpdated { rep: rep.id() });
        }
        Position::from_parts(Some(rep), number)
    }

    fn notify(&self, event: &TrackerEvent) {
        self.listeners.dispatch(event);
    }
}
