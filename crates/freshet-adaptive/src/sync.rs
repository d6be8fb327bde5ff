#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use freshet_core::MediaTime;

/// Live streams bump the discontinuity sequence indefinitely; only a bounded
/// window of anchors is worth keeping.
const MAX_REFERENCES: usize = 16;

/// A pair of timeline points tying the continuous demux clock to the
/// playlist's segment time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamTimes {
    pub continuous: MediaTime,
    pub segment: MediaTime,
}

/// Synchronization anchor for one discontinuity sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynchronizationReference {
    pub sequence: u64,
    pub times: StreamTimes,
}

/// Per-playlist store of synchronization anchors, keyed by discontinuity
/// sequence and shared between the trackers of all tracks.
#[derive(Default)]
pub struct SynchronizationReferences {
    references: BTreeMap<u64, StreamTimes>,
}

impl SynchronizationReferences {
    #[must_use]
    pub fn new() -> Self {
        SynchronizationReferences::default()
    }

    /// Store or refresh the anchor for `sequence`, evicting the oldest
    /// sequences beyond the retention window.
    pub fn add_reference(&mut self, sequence: u64, times: StreamTimes) {
        self.references.insert(sequence, times);
        while self.references.len() > MAX_REFERENCES {
            self.references.pop_first();
        }
    }

    /// Anchor for `sequence`, if one was stored. Matching is by exact
    /// sequence; `_time` (the caller's demux clock) is accepted for interface
    /// stability.
    #[must_use]
    pub fn get_reference(
        &self,
        sequence: u64,
        _time: MediaTime,
    ) -> Option<SynchronizationReference> {
        self.references
            .get(&sequence)
            .map(|times| SynchronizationReference {
                sequence,
                times: *times,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(micros: i64) -> StreamTimes {
        StreamTimes {
            continuous: MediaTime::from_micros(micros),
            segment: MediaTime::from_micros(micros / 2),
        }
    }

    #[test]
    fn stored_reference_is_returned_by_sequence() {
        let mut refs = SynchronizationReferences::new();
        refs.add_reference(7, times(1_000));

        let found = refs.get_reference(7, MediaTime::ZERO);
        assert_eq!(
            found,
            Some(SynchronizationReference {
                sequence: 7,
                times: times(1_000),
            })
        );
        assert_eq!(refs.get_reference(8, MediaTime::ZERO), None);
    }

    #[test]
    fn re_adding_refreshes_the_anchor() {
        let mut refs = SynchronizationReferences::new();
        refs.add_reference(3, times(10));
        refs.add_reference(3, times(20));

        let found = refs.get_reference(3, MediaTime::ZERO);
        assert_eq!(found.map(|r| r.times), Some(times(20)));
    }

    #[test]
    fn oldest_sequences_are_evicted_past_the_window() {
        let mut refs = SynchronizationReferences::new();
        for seq in 0..=MAX_REFERENCES as u64 {
            refs.add_reference(seq, times(seq as i64));
        }

        assert_eq!(refs.get_reference(0, MediaTime::ZERO), None);
        assert!(refs.get_reference(MAX_REFERENCES as u64, MediaTime::ZERO).is_some());
    }
}
