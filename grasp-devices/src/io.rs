use std::sync::{Arc, Mutex, MutexGuard};

use grasp_core::DeviceError;
use tracing::debug;

use crate::script::SensorScript;

/// Digital I/O lines of the acquisition device (LabJack FIO pins).
pub trait DigitalIo {
    /// Opens the device and switches the lines to digital mode.
    fn configure(&mut self) -> Result<(), DeviceError>;
    fn read_line(&mut self, channel: u8) -> Result<bool, DeviceError>;
    fn write_line(&mut self, channel: u8, level: bool) -> Result<(), DeviceError>;
    fn close(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[derive(Debug)]
struct IoState {
    script: SensorScript,
    sensor_channel: u8,
    lines: [bool; SimulatedIo::CHANNELS],
    writes: Vec<(u8, bool)>,
    reads: usize,
    configured: bool,
    closes: usize,
    fail_configure: bool,
    fail_reads_after: Option<usize>,
    fail_writes_on: Option<u8>,
}

/// In-memory digital I/O device.
///
/// The sensor channel replays a [`SensorScript`]; every other channel reads
/// back the last level written to it. Clones share one device, so a test can
/// keep a handle for inspection after moving another into a session.
#[derive(Debug, Clone)]
pub struct SimulatedIo {
    state: Arc<Mutex<IoState>>,
}

impl SimulatedIo {
    /// FIO0-FIO7 on a U3.
    pub const CHANNELS: usize = 8;

    pub fn new(sensor_channel: u8, script: SensorScript) -> Self {
        Self {
            state: Arc::new(Mutex::new(IoState {
                script,
                sensor_channel,
                lines: [false; Self::CHANNELS],
                writes: Vec::new(),
                reads: 0,
                configured: false,
                closes: 0,
                fail_configure: false,
                fail_reads_after: None,
                fail_writes_on: None,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, IoState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes `configure` report the device as missing.
    pub fn disconnected(self) -> Self {
        self.state().fail_configure = true;
        self
    }

    /// Sensor reads fail once `n` reads have succeeded.
    pub fn fail_reads_after(self, n: usize) -> Self {
        self.state().fail_reads_after = Some(n);
        self
    }

    /// Every write to `channel` fails.
    pub fn fail_writes_on(self, channel: u8) -> Self {
        self.state().fail_writes_on = Some(channel);
        self
    }

    pub fn writes(&self) -> Vec<(u8, bool)> {
        self.state().writes.clone()
    }

    pub fn line(&self, channel: u8) -> bool {
        self.state().lines.get(channel as usize).copied().unwrap_or(false)
    }

    pub fn reads(&self) -> usize {
        self.state().reads
    }

    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    fn check_channel(channel: u8) -> Result<usize, DeviceError> {
        let idx = channel as usize;
        if idx < Self::CHANNELS {
            Ok(idx)
        } else {
            Err(DeviceError::InvalidChannel(channel))
        }
    }
}

impl DigitalIo for SimulatedIo {
    fn configure(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state();
        if state.fail_configure {
            return Err(DeviceError::NotConnected);
        }
        state.configured = true;
        debug!(sensor_channel = state.sensor_channel, "simulated I/O configured");
        Ok(())
    }

    fn read_line(&mut self, channel: u8) -> Result<bool, DeviceError> {
        let idx = Self::check_channel(channel)?;
        let mut state = self.state();
        if !state.configured {
            return Err(DeviceError::NotConnected);
        }
        if state.fail_reads_after.is_some_and(|n| state.reads >= n) {
            return Err(DeviceError::Fault("sensor line read failed".into()));
        }
        state.reads += 1;
        if channel == state.sensor_channel {
            Ok(state.script.next_level())
        } else {
            Ok(state.lines[idx])
        }
    }

    fn write_line(&mut self, channel: u8, level: bool) -> Result<(), DeviceError> {
        let idx = Self::check_channel(channel)?;
        let mut state = self.state();
        if !state.configured {
            return Err(DeviceError::NotConnected);
        }
        if state.fail_writes_on == Some(channel) {
            return Err(DeviceError::Fault(format!("line {channel} stuck")));
        }
        state.lines[idx] = level;
        state.writes.push((channel, level));
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.configured = false;
        state.closes += 1;
        debug!("simulated I/O closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_channel_replays_script() {
        let script = "1*2,0".parse().unwrap();
        let mut io = SimulatedIo::new(0, script);
        io.configure().unwrap();

        assert!(io.read_line(0).unwrap());
        assert!(io.read_line(0).unwrap());
        assert!(!io.read_line(0).unwrap());
        assert_eq!(io.reads(), 3);
    }

    #[test]
    fn output_lines_read_back_written_level() {
        let mut io = SimulatedIo::new(0, SensorScript::constant(false));
        io.configure().unwrap();

        io.write_line(1, true).unwrap();
        assert!(io.read_line(1).unwrap());
        assert_eq!(io.writes(), vec![(1, true)]);
        assert_eq!(io.write_line(9, true), Err(DeviceError::InvalidChannel(9)));
    }

    #[test]
    fn unconfigured_or_closed_device_is_not_connected() {
        let mut io = SimulatedIo::new(0, SensorScript::constant(true));
        assert_eq!(io.read_line(0), Err(DeviceError::NotConnected));

        io.configure().unwrap();
        io.close().unwrap();
        assert_eq!(io.write_line(1, false), Err(DeviceError::NotConnected));
        assert_eq!(io.close_count(), 1);
    }

    #[test]
    fn injected_faults_surface() {
        let mut io = SimulatedIo::new(0, SensorScript::constant(true))
            .fail_reads_after(1)
            .fail_writes_on(2);
        io.configure().unwrap();

        assert!(io.read_line(0).is_ok());
        assert!(matches!(io.read_line(0), Err(DeviceError::Fault(_))));
        assert!(matches!(io.write_line(2, true), Err(DeviceError::Fault(_))));

        let mut missing = SimulatedIo::new(0, SensorScript::constant(true)).disconnected();
        assert_eq!(missing.configure(), Err(DeviceError::NotConnected));
    }
}
