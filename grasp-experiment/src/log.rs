use grasp_core::{Event, EventKind, Timestamp};
use tracing::{debug, warn};

/// Append-only experimental timeline.
///
/// Insertion order is the order events happened; nothing is ever reordered,
/// deduplicated or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event.
    ///
    /// A timestamp older than the previous event is raised to match it, so
    /// the log stays non-decreasing even with a misbehaving clock.
    pub fn record(&mut self, kind: EventKind, timestamp: Timestamp) -> Event {
        let timestamp = match self.last_timestamp() {
            Some(last) if timestamp < last => {
                warn!(event = %kind, %timestamp, %last, "clock went backwards, clamping");
                last
            }
            _ => timestamp,
        };
        let event = Event::new(kind, timestamp);
        self.events.push(event);
        debug!(event = %kind, %timestamp, index = self.events.len() - 1, "event recorded");
        event
    }

    /// The full ordered timeline, for persistence.
    pub fn export(&self) -> &[Event] {
        &self.events
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.events.last().map(Event::timestamp)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
