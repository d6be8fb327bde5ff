#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use crate::traits::RepresentationRef;

/// Storage sentinel for "no segment number". Never exposed through a public
/// signature; `segment_number()` is the API edge.
pub(crate) const NUMBER_UNSET: u64 = u64::MAX;

/// Cursor over one representation's segment sequence.
///
/// A position moves through three phases per media segment: first the init
/// segment is emitted, then the index segment, then the media payload.
/// `advance` moves exactly one phase per call and, once both flags are set,
/// steps the segment number while staying in the media phase. Positions are
/// the sole authority on the current phase; they never consult the
/// representation.
#[derive(Clone)]
pub struct Position {
    pub(crate) rep: Option<RepresentationRef>,
    pub(crate) number: u64,
    pub(crate) init_sent: bool,
    pub(crate) index_sent: bool,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            rep: None,
            number: NUMBER_UNSET,
            init_sent: false,
            index_sent: false,
        }
    }
}

impl Position {
    /// Position at the start of segment `number`, with no phase emitted yet.
    #[must_use]
    pub fn new(rep: RepresentationRef, number: u64) -> Self {
        Position {
            rep: Some(rep),
            number,
            init_sent: false,
            index_sent: false,
        }
    }

    pub(crate) fn from_parts(rep: Option<RepresentationRef>, number: Option<u64>) -> Self {
        Position {
            rep,
            number: number.unwrap_or(NUMBER_UNSET),
            init_sent: false,
            index_sent: false,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rep.is_some() && self.number != NUMBER_UNSET
    }

    #[must_use]
    pub fn rep(&self) -> Option<&RepresentationRef> {
        self.rep.as_ref()
    }

    #[must_use]
    pub fn segment_number(&self) -> Option<u64> {
        (self.number != NUMBER_UNSET).then_some(self.number)
    }

    #[must_use]
    pub fn init_sent(&self) -> bool {
        self.init_sent
    }

    #[must_use]
    pub fn index_sent(&self) -> bool {
        self.index_sent
    }

    /// Advance one phase: init, then index, then media segment by segment.
    /// No-op on an invalid position.
    pub fn advance(&mut self) {
        if !self.is_valid() {
            return;
        }
        if self.index_sent {
            self.number += 1;
        } else if self.init_sent {
            self.index_sent = true;
        } else {
            self.init_sent = true;
        }
    }

    pub(crate) fn same_representation(&self, other: &Position) -> bool {
        match (&self.rep, &other.rep) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rep {
            Some(rep) if self.is_valid() => write!(
                f,
                "seg# {} {}:{} {}",
                self.number,
                u8::from(self.init_sent),
                u8::from(self.index_sent),
                rep.id()
            ),
            _ => f.write_str("invalid"),
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
