use std::fmt;
use std::io;
use std::time::Duration;

/// Failure reported by a hardware capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device not connected")]
    NotConnected,

    #[error("channel {0} is not available")]
    InvalidChannel(u8),

    #[error("device fault: {0}")]
    Fault(String),
}

/// Failure reported by a persistence sink.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("sink rejected write: {0}")]
    Rejected(String),
}

/// Everything that can end a trial early.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("{device} unavailable: {source}")]
    DeviceUnavailable {
        device: &'static str,
        #[source]
        source: DeviceError,
    },

    #[error("failed to drive line {channel}: {source}")]
    ActuationFault {
        channel: u8,
        #[source]
        source: DeviceError,
    },

    #[error("failed to read line {channel}: {source}")]
    SensorReadFault {
        channel: u8,
        #[source]
        source: DeviceError,
    },

    #[error("failed to persist trial record: {0}")]
    PersistenceFault(#[from] PersistenceError),

    #[error("sensor did not change within {waited:?}")]
    SensorTimeout { waited: Duration },

    #[error("experiment ended by operator")]
    Aborted,
}

/// Stable category of an [`ExperimentError`], shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DeviceUnavailable,
    ActuationFault,
    SensorReadFault,
    PersistenceFault,
    SensorTimeout,
    Aborted,
}

impl ExperimentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExperimentError::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            ExperimentError::ActuationFault { .. } => ErrorKind::ActuationFault,
            ExperimentError::SensorReadFault { .. } => ErrorKind::SensorReadFault,
            ExperimentError::PersistenceFault(_) => ErrorKind::PersistenceFault,
            ExperimentError::SensorTimeout { .. } => ErrorKind::SensorTimeout,
            ExperimentError::Aborted => ErrorKind::Aborted,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::DeviceUnavailable => "DeviceUnavailable",
            ErrorKind::ActuationFault => "ActuationFault",
            ErrorKind::SensorReadFault => "SensorReadFault",
            ErrorKind::PersistenceFault => "PersistenceFault",
            ErrorKind::SensorTimeout => "SensorTimeout",
            ErrorKind::Aborted => "Aborted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let err = ExperimentError::ActuationFault {
            channel: 1,
            source: DeviceError::Fault("stuck".into()),
        };
        assert_eq!(err.kind(), ErrorKind::ActuationFault);
        assert_eq!(err.to_string(), "failed to drive line 1: device fault: stuck");

        let err: ExperimentError = PersistenceError::Rejected("disk full".into()).into();
        assert_eq!(err.kind().to_string(), "PersistenceFault");
    }
}
