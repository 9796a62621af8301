pub mod stats;
pub mod timer;

pub use stats::{IntervalRecorder, IntervalStats};
pub use timer::{HighPrecisionTimer, SimulatedTimer, Timer, Timestamp};
