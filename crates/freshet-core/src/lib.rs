#![forbid(unsafe_code)]

//! Shared value types for the freshet adaptive streaming client.

mod format;
mod ids;
mod time;

pub use format::StreamFormat;
pub use ids::{RepresentationId, StreamRole, TrackId};
pub use time::MediaTime;
