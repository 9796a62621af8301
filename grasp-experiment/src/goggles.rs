use grasp_core::{DeviceError, Event, ExperimentError, GoggleState};
use grasp_devices::DigitalIo;
use grasp_timing::Timer;
use tracing::{info, warn};

use crate::log::EventLog;

/// Drives the PLATO goggles through one or two digital output lines.
#[derive(Debug, Clone)]
pub struct GoggleController {
    channel: u8,
    mirror: Option<u8>,
    state: GoggleState,
}

impl GoggleController {
    pub fn new(channel: u8, mirror: Option<u8>) -> Self {
        Self {
            channel,
            mirror,
            state: GoggleState::Opaque,
        }
    }

    /// Last state successfully driven.
    pub fn state(&self) -> GoggleState {
        self.state
    }

    /// Drives the lines to opaque without touching the timeline.
    pub fn park<D: DigitalIo>(&mut self, io: &mut D) -> Result<(), (u8, DeviceError)> {
        self.drive(io, GoggleState::Opaque)?;
        self.state = GoggleState::Opaque;
        Ok(())
    }

    /// Requests `target` and records it.
    ///
    /// There is no same-state guard: asking for the current state writes the
    /// lines again and appends another event. The event carries the instant of
    /// the request.
    pub fn set_state<D: DigitalIo, T: Timer>(
        &mut self,
        io: &mut D,
        timer: &T,
        log: &mut EventLog,
        target: GoggleState,
    ) -> Result<Event, ExperimentError> {
        let requested_at = timer.now();
        if let Err((channel, source)) = self.drive(io, target) {
            warn!(channel, ?target, error = %source, "goggle actuation failed");
            return Err(ExperimentError::ActuationFault { channel, source });
        }
        let previous = std::mem::replace(&mut self.state, target);
        let event = log.record(target.event_kind(), requested_at);
        info!(?previous, ?target, timestamp = %event.timestamp(), "goggles set");
        Ok(event)
    }

    fn drive<D: DigitalIo>(&self, io: &mut D, target: GoggleState) -> Result<(), (u8, DeviceError)> {
        let level = target.line_level();
        for channel in std::iter::once(self.channel).chain(self.mirror) {
            io.write_line(channel, level).map_err(|e| (channel, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use grasp_core::{ErrorKind, EventKind};
    use grasp_devices::{SensorScript, SimulatedIo};
    use grasp_timing::SimulatedTimer;

    fn device() -> SimulatedIo {
        let mut io = SimulatedIo::new(0, SensorScript::constant(false));
        io.configure().unwrap();
        io
    }

    #[test]
    fn each_call_appends_exactly_one_matching_event() {
        let mut io = device();
        let timer = SimulatedTimer::default();
        let mut log = EventLog::new();
        let mut goggles = GoggleController::new(1, Some(2));

        let targets = [
            GoggleState::Opaque,
            GoggleState::Opaque,
            GoggleState::Transparent,
            GoggleState::Transparent,
            GoggleState::Opaque,
        ];
        for (i, target) in targets.iter().enumerate() {
            let event = goggles.set_state(&mut io, &timer, &mut log, *target).unwrap();
            assert_eq!(log.len(), i + 1);
            assert_eq!(event.kind(), target.event_kind());
            assert_eq!(goggles.state(), *target);
        }
    }

    #[test]
    fn both_lines_follow_the_requested_state() {
        let mut io = device();
        let timer = SimulatedTimer::default();
        let mut log = EventLog::new();
        let mut goggles = GoggleController::new(1, Some(2));

        goggles
            .set_state(&mut io, &timer, &mut log, GoggleState::Transparent)
            .unwrap();
        assert!(io.line(1) && io.line(2));

        goggles
            .set_state(&mut io, &timer, &mut log, GoggleState::Opaque)
            .unwrap();
        assert!(!io.line(1) && !io.line(2));
        assert_eq!(
            io.writes(),
            vec![(1, true), (2, true), (1, false), (2, false)]
        );
    }

    #[test]
    fn event_is_stamped_at_request_time() {
        let mut io = device();
        let timer = SimulatedTimer::default();
        let mut log = EventLog::new();
        let start = timer.now();

        let event = GoggleController::new(1, None)
            .set_state(&mut io, &timer, &mut log, GoggleState::Opaque)
            .unwrap();
        assert_eq!(event.timestamp(), start);
        assert_eq!(event.kind(), EventKind::GogglesOpaque);
    }

    #[test]
    fn actuation_fault_propagates_without_event() {
        let mut io = SimulatedIo::new(0, SensorScript::constant(false)).fail_writes_on(2);
        io.configure().unwrap();
        let timer = SimulatedTimer::default();
        let mut log = EventLog::new();
        let mut goggles = GoggleController::new(1, Some(2));

        let err = goggles
            .set_state(&mut io, &timer, &mut log, GoggleState::Transparent)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActuationFault);
        assert!(matches!(err, ExperimentError::ActuationFault { channel: 2, .. }));
        assert!(log.is_empty());
        assert_eq!(goggles.state(), GoggleState::Opaque);
    }

    #[test]
    fn park_drives_opaque_silently() {
        let mut io = device();
        io.write_line(1, true).unwrap();
        let mut goggles = GoggleController::new(1, None);

        goggles.park(&mut io).unwrap();
        assert!(!io.line(1));
    }
}
