#![forbid(unsafe_code)]

//! Tracker event taxonomy and synchronous listener fan-out.

mod bus;
mod event;

pub use bus::{EventBus, EventSink};
pub use event::TrackerEvent;
