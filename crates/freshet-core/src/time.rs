#![forbid(unsafe_code)]

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// Microsecond-precision point or span on the media timeline.
///
/// Unset/unknown times are `Option<MediaTime>` at API edges; this type never
/// encodes "invalid" in-band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaTime(i64);

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime(0);

    /// Playback timeline origin. Segment start times handed to consumers are
    /// offset by this so that a valid start is never zero.
    pub const ORIGIN: MediaTime = MediaTime(1);

    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        MediaTime(micros)
    }

    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        MediaTime(millis.saturating_mul(1_000))
    }

    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        MediaTime(secs.saturating_mul(1_000_000))
    }

    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_sub(rhs.0))
    }

    /// Convert to a `Duration`, clamping negative values to zero.
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.0.max(0) as u64)
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0 + rhs.0)
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0 - rhs.0)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}
