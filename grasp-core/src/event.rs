use std::fmt;

use grasp_timing::Timestamp;
use serde::Serialize;

/// Kinds of occurrence written to the experimental timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    GogglesOpaque,
    GogglesTransparent,
    Beep,
    FingerLift,
    FingerReturn,
}

impl EventKind {
    /// Name used in the `event` column of trial files.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::GogglesOpaque => "goggles_opaque",
            EventKind::GogglesTransparent => "goggles_transparent",
            EventKind::Beep => "beep",
            EventKind::FingerLift => "finger_lift",
            EventKind::FingerReturn => "finger_return",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped occurrence. Never mutated once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    timestamp: Timestamp,
}

impl Event {
    pub fn new(kind: EventKind, timestamp: Timestamp) -> Self {
        Self { kind, timestamp }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
