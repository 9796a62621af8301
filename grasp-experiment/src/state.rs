use std::time::Duration;

use grasp_core::{DeviceError, EventKind, ExperimentError, GoggleState, TrialOutcome, TrialState};
use grasp_devices::{AudioDevice, DigitalIo};
use grasp_timing::Timer;
use tracing::{debug, info, warn};

use crate::abort::AbortHandle;
use crate::config::ExperimentConfig;
use crate::cue::CuePlayer;
use crate::gate::SensorGate;
use crate::goggles::GoggleController;
use crate::log::EventLog;

/// Drives one grasping trial at a time:
/// opaque, wait for finger, beep, transparent, lift, return, opaque.
///
/// Owns the device handles so that only this flow ever touches the hardware.
pub struct TrialSequencer<D, A, T>
where
    D: DigitalIo,
    A: AudioDevice,
    T: Timer,
{
    pub io: D,
    pub audio: A,
    pub timer: T,
    gate: SensorGate,
    goggles: GoggleController,
    cue: CuePlayer,
    present_poll: Duration,
    release_poll: Duration,
    cue_duration: Duration,
    state: TrialState,
    abort: AbortHandle,
}

impl<D, A, T> TrialSequencer<D, A, T>
where
    D: DigitalIo,
    A: AudioDevice,
    T: Timer,
{
    pub fn new(config: &ExperimentConfig, io: D, audio: A, timer: T, abort: AbortHandle) -> Self {
        Self {
            io,
            audio,
            timer,
            gate: SensorGate::new(config.sensor_channel, config.present_level)
                .with_timeout(config.sensor_timeout()),
            goggles: GoggleController::new(config.goggle_channel, config.goggle_mirror_channel),
            cue: CuePlayer::new(
                config.cue_frequency_hz,
                config.cue_sample_rate,
                config.cue_timestamp,
            ),
            present_poll: config.present_poll(),
            release_poll: config.release_poll(),
            cue_duration: config.cue_duration(),
            state: TrialState::Idle,
            abort,
        }
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn goggle_state(&self) -> GoggleState {
        self.goggles.state()
    }

    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    /// Puts the goggles in their resting opaque state without logging.
    pub fn park(&mut self) -> Result<(), (u8, DeviceError)> {
        self.goggles.park(&mut self.io)
    }

    /// Runs a full trial, appending its events to `log`.
    ///
    /// An operator abort ends the trial in [`TrialState::Aborted`] and is
    /// reported as an outcome; any other failure is returned as an error and
    /// leaves the sequencer in the state it failed in.
    pub fn run_trial(&mut self, log: &mut EventLog) -> Result<TrialOutcome, ExperimentError> {
        self.state = TrialState::Idle;
        info!("trial started");

        while !self.state.is_terminal() {
            let result = if self.abort.is_raised() {
                Err(ExperimentError::Aborted)
            } else {
                self.step(log)
            };
            match result {
                Ok(next) => {
                    debug!(from = %self.state, to = %next, "trial transition");
                    self.state = next;
                }
                Err(ExperimentError::Aborted) => {
                    let at = self.state;
                    self.state = TrialState::Aborted;
                    warn!(%at, "trial aborted");
                    return Ok(TrialOutcome::Aborted { at });
                }
                Err(e) => {
                    warn!(state = %self.state, error = %e, "trial failed");
                    return Err(e);
                }
            }
        }

        info!(events = log.len(), "trial complete");
        Ok(TrialOutcome::Completed)
    }

    /// Performs the work that leaves the current state and returns the next.
    pub fn step(&mut self, log: &mut EventLog) -> Result<TrialState, ExperimentError> {
        match self.state {
            TrialState::Idle => {
                self.goggles
                    .set_state(&mut self.io, &self.timer, log, GoggleState::Opaque)?;
            }
            TrialState::GogglesOpaqueWait => {
                self.gate.wait_for_present(
                    &mut self.io,
                    &mut self.timer,
                    &self.abort,
                    self.present_poll,
                )?;
                self.cue
                    .play_cue(&mut self.audio, &self.timer, log, self.cue_duration)?;
            }
            TrialState::CueDelivery => {
                self.goggles
                    .set_state(&mut self.io, &self.timer, log, GoggleState::Transparent)?;
            }
            TrialState::GogglesTransparentWait => {
                let lifted = self.gate.wait_for_absent(
                    &mut self.io,
                    &mut self.timer,
                    &self.abort,
                    self.release_poll,
                )?;
                log.record(EventKind::FingerLift, lifted);
                info!(timestamp = %lifted, "finger lift");
            }
            TrialState::LiftWait => {
                let returned = self.gate.wait_for_present(
                    &mut self.io,
                    &mut self.timer,
                    &self.abort,
                    self.release_poll,
                )?;
                log.record(EventKind::FingerReturn, returned);
                info!(timestamp = %returned, "finger return");
            }
            TrialState::ReturnWait => {
                self.goggles
                    .set_state(&mut self.io, &self.timer, log, GoggleState::Opaque)?;
            }
            TrialState::GogglesOpaqueFinal | TrialState::Complete | TrialState::Aborted => {}
        }
        Ok(self.state.next().unwrap_or(self.state))
    }
}
