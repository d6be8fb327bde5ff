#![forbid(unsafe_code)]

/// Tracker tuning knobs.
#[derive(Clone, Debug)]
pub struct TrackerOptions {
    /// Upper bound on the bytes peeked when probing a chunk of unknown
    /// container format. Needs to cover the magic bytes of every supported
    /// container, including a couple of transport-stream packets.
    pub probe_window: usize,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        TrackerOptions { probe_window: 8192 }
    }
}
