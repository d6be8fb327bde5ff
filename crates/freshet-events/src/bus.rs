#![forbid(unsafe_code)]

use std::sync::Weak;

use crate::TrackerEvent;

/// Receiver of tracker events.
///
/// Dispatch is synchronous and inline: the event reference is valid only for
/// the duration of the call, and implementations must not call back into
/// mutating tracker operations (the borrow rules enforce this for safe code).
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &TrackerEvent);
}

/// Synchronous fan-out of tracker events to registered listeners.
///
/// Listeners are held weakly: the bus never keeps a component alive, and a
/// dropped listener is silently skipped. Delivery order is registration
/// order, which downstream components rely on for event sequencing.
#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Weak<dyn EventSink>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        EventBus::default()
    }

    /// Register a listener. There is no deregistration; dropping the strong
    /// handle is enough.
    pub fn register(&mut self, sink: Weak<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Deliver `event` to every live listener, in registration order.
    pub fn dispatch(&self, event: &TrackerEvent) {
        for sink in &self.sinks {
            if let Some(sink) = sink.upgrade() {
                sink.on_event(event);
            }
        }
    }
}
