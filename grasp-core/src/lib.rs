pub mod error;
pub mod event;
pub mod goggles;
pub mod trial;

pub use error::{DeviceError, ErrorKind, ExperimentError, PersistenceError};
pub use event::{Event, EventKind};
pub use goggles::{GoggleState, SensorReading};
pub use grasp_timing::Timestamp;
pub use trial::{TrialOutcome, TrialState};
