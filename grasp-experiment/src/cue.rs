use std::time::Duration;

use grasp_core::{DeviceError, Event, EventKind, ExperimentError};
use grasp_devices::{AudioDevice, Tone};
use grasp_timing::Timer;
use tracing::info;

use crate::config::CueTimestamp;
use crate::log::EventLog;

/// One-shot audio go cue.
#[derive(Debug, Clone)]
pub struct CuePlayer {
    frequency_hz: f64,
    sample_rate: u32,
    stamp: CueTimestamp,
}

impl CuePlayer {
    pub fn new(frequency_hz: f64, sample_rate: u32, stamp: CueTimestamp) -> Self {
        Self {
            frequency_hz,
            sample_rate,
            stamp,
        }
    }

    /// Plays the tone for `duration` and blocks until it has finished.
    ///
    /// Device failures are fatal to the trial and are not retried.
    pub fn play_cue<A: AudioDevice, T: Timer>(
        &self,
        audio: &mut A,
        timer: &T,
        log: &mut EventLog,
        duration: Duration,
    ) -> Result<Event, ExperimentError> {
        let tone = Tone::new(self.frequency_hz, duration, self.sample_rate);
        let unavailable = |source: DeviceError| ExperimentError::DeviceUnavailable {
            device: "audio",
            source,
        };

        audio.start(&tone).map_err(unavailable)?;
        // Under Invocation the beep is logged before blocking, so a failed
        // wait keeps it.
        let event = match self.stamp {
            CueTimestamp::Invocation => {
                let event = log.record(EventKind::Beep, timer.now());
                audio.wait().map_err(unavailable)?;
                event
            }
            CueTimestamp::Completion => {
                audio.wait().map_err(unavailable)?;
                log.record(EventKind::Beep, timer.now())
            }
        };
        info!(
            frequency_hz = self.frequency_hz,
            ?duration,
            timestamp = %event.timestamp(),
            "cue played"
        );
        Ok(event)
    }
}
