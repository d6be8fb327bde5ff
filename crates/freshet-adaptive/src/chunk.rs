#![forbid(unsafe_code)]

use std::collections::VecDeque;

use bytes::Bytes;
use freshet_core::{MediaTime, StreamFormat};

use crate::position::Position;
use crate::traits::SegmentChunk;

/// A prepared chunk together with the position it was prepared for and its
/// timeline metadata. Invalid entries (no chunk) mark the end of the stream.
#[derive(Default)]
pub struct ChunkEntry {
    pub chunk: Option<Box<dyn SegmentChunk>>,
    pub pos: Position,
    pub start: Option<MediaTime>,
    pub duration: MediaTime,
    pub display: Option<MediaTime>,
}

impl ChunkEntry {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.chunk.is_some() && self.pos.is_valid()
    }
}

/// Single-slot lookahead queue of prepared chunks.
///
/// The queue owns each enqueued chunk until it is handed to the consumer or
/// the queue is flushed; dropping the queue releases whatever is left.
#[derive(Default)]
pub(crate) struct ChunkQueue {
    entries: VecDeque<ChunkEntry>,
}

impl ChunkQueue {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push_back(&mut self, entry: ChunkEntry) {
        self.entries.push_back(entry);
    }

    pub(crate) fn push_front(&mut self, entry: ChunkEntry) {
        self.entries.push_front(entry);
    }

    pub(crate) fn pop_front(&mut self) -> Option<ChunkEntry> {
        self.entries.pop_front()
    }

    /// Drop every queued entry, releasing the owned chunks.
    pub(crate) fn flush(&mut self) {
        self.entries.clear();
    }
}

/// Chunk adapter that buffers a bounded peeked prefix and replays it before
/// forwarding further reads, so the probed bytes stay readable downstream.
pub struct ProbeChunk {
    inner: Box<dyn SegmentChunk>,
    prefix: Vec<u8>,
    replayed: usize,
}

impl ProbeChunk {
    #[must_use]
    pub fn new(inner: Box<dyn SegmentChunk>) -> Self {
        ProbeChunk {
            inner,
            prefix: Vec::new(),
            replayed: 0,
        }
    }

    /// Read ahead up to `limit` bytes without consuming them.
    ///
    /// Returns whatever prefix is available; a short slice means the chunk
    /// ended early.
    pub fn peek(&mut self, limit: usize) -> &[u8] {
        while self.prefix.len() < limit {
            match self.inner.pull(limit - self.prefix.len()) {
                Some(bytes) if !bytes.is_empty() => self.prefix.extend_from_slice(&bytes),
                _ => break,
            }
        }
        &self.prefix[..self.prefix.len().min(limit)]
    }
}

impl SegmentChunk for ProbeChunk {
    fn discontinuity(&self) -> bool {
        self.inner.discontinuity()
    }

    fn discontinuity_sequence(&self) -> u64 {
        self.inner.discontinuity_sequence()
    }

    fn stream_format(&self) -> StreamFormat {
        self.inner.stream_format()
    }

    fn set_stream_format(&mut self, format: StreamFormat) {
        self.inner.set_stream_format(format);
    }

    fn content_type(&self) -> Option<&str> {
        self.inner.content_type()
    }

    fn pull(&mut self, max: usize) -> Option<Bytes> {
        if self.replayed < self.prefix.len() {
            let end = (self.replayed + max.max(1)).min(self.prefix.len());
            let bytes = Bytes::copy_from_slice(&self.prefix[self.replayed..end]);
            self.replayed = end;
            return Some(bytes);
        }
        self.inner.pull(max)
    }
}
