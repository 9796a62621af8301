use std::time::Duration;

use grasp_core::{ExperimentError, SensorReading, Timestamp};
use grasp_devices::DigitalIo;
use grasp_timing::Timer;
use tracing::{debug, trace};

use crate::abort::AbortHandle;

/// Presence/absence view of the infrared finger sensor.
///
/// Stateless between calls: every wait samples the line afresh.
#[derive(Debug, Clone)]
pub struct SensorGate {
    channel: u8,
    present_level: bool,
    timeout: Option<Duration>,
}

impl SensorGate {
    pub fn new(channel: u8, present_level: bool) -> Self {
        Self {
            channel,
            present_level,
            timeout: None,
        }
    }

    /// Bounds every wait; without it a wait lasts until the participant acts.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn sample<D: DigitalIo>(&self, io: &mut D) -> Result<SensorReading, ExperimentError> {
        let level = io
            .read_line(self.channel)
            .map_err(|source| ExperimentError::SensorReadFault {
                channel: self.channel,
                source,
            })?;
        Ok(SensorReading::from_level(level, self.present_level))
    }

    /// Polls every `poll` until a finger is on the sensor. Returns when it
    /// was first seen.
    pub fn wait_for_present<D: DigitalIo, T: Timer>(
        &self,
        io: &mut D,
        timer: &mut T,
        abort: &AbortHandle,
        poll: Duration,
    ) -> Result<Timestamp, ExperimentError> {
        self.wait_for(SensorReading::Present, io, timer, abort, poll)
    }

    /// Polls every `poll` until the sensor is clear.
    pub fn wait_for_absent<D: DigitalIo, T: Timer>(
        &self,
        io: &mut D,
        timer: &mut T,
        abort: &AbortHandle,
        poll: Duration,
    ) -> Result<Timestamp, ExperimentError> {
        self.wait_for(SensorReading::Absent, io, timer, abort, poll)
    }

    fn wait_for<D: DigitalIo, T: Timer>(
        &self,
        wanted: SensorReading,
        io: &mut D,
        timer: &mut T,
        abort: &AbortHandle,
        poll: Duration,
    ) -> Result<Timestamp, ExperimentError> {
        let started = timer.now();
        let mut samples = 0usize;
        loop {
            if abort.is_raised() {
                return Err(ExperimentError::Aborted);
            }
            samples += 1;
            if self.sample(io)? == wanted {
                let seen = timer.now();
                debug!(channel = self.channel, ?wanted, samples, "sensor condition met");
                return Ok(seen);
            }
            if let Some(limit) = self.timeout {
                let waited = timer.elapsed(started);
                if waited >= limit {
                    return Err(ExperimentError::SensorTimeout { waited });
                }
            }
            let before = timer.now();
            timer.sleep(poll);
            let slept = timer.elapsed(before);
            timer.record_interval(slept);
            trace!(channel = self.channel, ?slept, "sensor poll");
        }
    }
}
