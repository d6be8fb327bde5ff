#![forbid(unsafe_code)]

use freshet_core::RepresentationId;
use thiserror::Error;

/// Why a time-based seek could not be carried out. Tracker state is left
/// untouched in every case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeekError {
    #[error("no representation available for the track")]
    NoRepresentation,

    #[error("representation {0} could not be refreshed")]
    RefreshFailed(RepresentationId),

    #[error("no segment maps to the requested time")]
    TimeNotMapped,
}
