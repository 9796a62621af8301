//! Hardware capabilities consumed by the trial sequencer.
//!
//! The sequencer only ever sees the [`DigitalIo`] and [`AudioDevice`] traits.
//! Driver-backed implementations live outside this workspace; the simulated
//! devices here run sessions headlessly and inject faults in tests.

pub mod audio;
pub mod io;
pub mod script;

pub use audio::{AudioDevice, SimulatedAudio, Tone};
pub use io::{DigitalIo, SimulatedIo};
pub use script::{ScriptError, SensorScript};
