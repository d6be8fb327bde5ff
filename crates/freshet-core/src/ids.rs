#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

/// Stable identifier of one representation within an adaptation set.
///
/// Cheap to clone; events carry these instead of borrowing the
/// representation itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepresentationId(Arc<str>);

impl RepresentationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        RepresentationId(id.into().into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepresentationId {
    fn from(id: &str) -> Self {
        RepresentationId::new(id)
    }
}

/// Identifier of one adaptation set (logical track) within a playlist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Role of a track within the presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StreamRole {
    #[default]
    Main,
    Alternate,
    Supplementary,
    Commentary,
    Dub,
    Caption,
    Subtitle,
}
