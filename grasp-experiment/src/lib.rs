pub mod abort;
pub mod config;
pub mod cue;
pub mod gate;
pub mod goggles;
pub mod log;
pub mod session;
pub mod sink;
pub mod state;
pub mod trial;
pub use abort::AbortHandle;
pub use config::{ConfigError, CueTimestamp, ExperimentConfig};
pub use cue::CuePlayer;
pub use gate::SensorGate;
pub use goggles::GoggleController;
pub use log::EventLog;
pub use session::{Session, TrialFailure};
pub use sink::{CsvSink, MemorySink, PersistenceSink, validate_participant_id};
pub use state::TrialSequencer;
pub use trial::TrialRecord;
