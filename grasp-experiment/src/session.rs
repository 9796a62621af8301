use grasp_core::{DeviceError, ExperimentError, GoggleState, TrialOutcome};
use grasp_devices::{AudioDevice, DigitalIo};
use grasp_timing::{IntervalStats, Timer};
use tracing::{error, info, warn};

use crate::abort::AbortHandle;
use crate::config::ExperimentConfig;
use crate::sink::PersistenceSink;
use crate::state::TrialSequencer;
use crate::trial::TrialRecord;

/// A trial that could not finish, with the participant it belonged to.
#[derive(Debug, thiserror::Error)]
#[error("participant {participant_id}: {} ({error})", .error.kind())]
pub struct TrialFailure {
    pub participant_id: String,
    #[source]
    pub error: ExperimentError,
}

/// One experiment session: the device handles, the persistence sink and the
/// record of the participant currently being run.
///
/// Devices are acquired by [`Session::open`] and released exactly once, by
/// [`Session::finalize`] or, failing that, when the session is dropped.
pub struct Session<D, A, T, S>
where
    D: DigitalIo,
    A: AudioDevice,
    T: Timer,
    S: PersistenceSink,
{
    sequencer: TrialSequencer<D, A, T>,
    sink: S,
    record: Option<TrialRecord>,
    trial_number: usize,
    released: bool,
}

impl<D, A, T, S> Session<D, A, T, S>
where
    D: DigitalIo,
    A: AudioDevice,
    T: Timer,
    S: PersistenceSink,
{
    /// Connects every device and puts the goggles in their opaque rest state.
    ///
    /// Anything unreachable is reported as `DeviceUnavailable`; an I/O device
    /// that was already opened is closed again before returning.
    pub fn open(
        config: &ExperimentConfig,
        mut io: D,
        mut audio: A,
        mut sink: S,
        timer: T,
        abort: AbortHandle,
    ) -> Result<Self, ExperimentError> {
        io.configure()
            .map_err(|source| ExperimentError::DeviceUnavailable {
                device: "digital I/O",
                source,
            })?;

        let probed = audio
            .probe()
            .map_err(|source| ExperimentError::DeviceUnavailable {
                device: "audio",
                source,
            })
            .and_then(|()| {
                sink.probe()
                    .map_err(|e| ExperimentError::DeviceUnavailable {
                        device: "persistence sink",
                        source: DeviceError::Fault(e.to_string()),
                    })
            });
        if let Err(e) = probed {
            close_quietly(&mut io);
            return Err(e);
        }

        let mut sequencer = TrialSequencer::new(config, io, audio, timer, abort);
        if let Err((channel, source)) = sequencer.park() {
            warn!(channel, error = %source, "could not initialise goggles");
            close_quietly(&mut sequencer.io);
            return Err(ExperimentError::DeviceUnavailable {
                device: "digital I/O",
                source,
            });
        }

        info!("session opened, goggles opaque");
        Ok(Self {
            sequencer,
            sink,
            record: None,
            trial_number: 0,
            released: false,
        })
    }

    /// Runs one trial for `participant_id`.
    ///
    /// A completed trial writes the participant's cumulative record. An
    /// aborted or failed trial flushes what was recorded on a best-effort
    /// basis; if that flush fails too the record is kept for
    /// [`Session::finalize`] to retry.
    pub fn run_trial(&mut self, participant_id: &str) -> Result<TrialOutcome, TrialFailure> {
        let failure = |error| TrialFailure {
            participant_id: participant_id.to_string(),
            error,
        };
        if self.released {
            return Err(failure(ExperimentError::DeviceUnavailable {
                device: "digital I/O",
                source: DeviceError::NotConnected,
            }));
        }
        self.sink
            .check_participant(participant_id)
            .map_err(|e| failure(ExperimentError::PersistenceFault(e)))?;

        if self
            .record
            .as_ref()
            .is_some_and(|r| r.participant_id != participant_id)
        {
            self.persist()?;
            self.record = None;
        }

        let trial_number = self.trial_number;
        self.trial_number += 1;
        let span = tracing::info_span!("trial", participant = participant_id, trial = trial_number);
        let _guard = span.enter();

        let record = self
            .record
            .get_or_insert_with(|| TrialRecord::new(participant_id));
        match self.sequencer.run_trial(&mut record.log) {
            Ok(TrialOutcome::Completed) => {
                record.trials_completed += 1;
                self.persist()?;
                Ok(TrialOutcome::Completed)
            }
            Ok(outcome @ TrialOutcome::Aborted { .. }) => {
                self.flush_best_effort();
                Ok(outcome)
            }
            Err(error) => {
                error!(kind = %error.kind(), %error, "trial failed");
                self.flush_best_effort();
                Err(failure(error))
            }
        }
    }

    /// Ends the session: releases the devices and writes the record.
    ///
    /// A failed write leaves the record in place, so calling `finalize` again
    /// retries it.
    pub fn finalize(&mut self) -> Result<(), TrialFailure> {
        self.release();
        self.persist()?;
        self.record = None;

        let stats = self.poll_stats();
        if stats.samples > 0 {
            info!(
                samples = stats.samples,
                mean_ms = stats.average_ns / 1_000_000.0,
                jitter_ms = stats.jitter_ns / 1_000_000.0,
                min_ms = stats.min_ns / 1_000_000.0,
                max_ms = stats.max_ns / 1_000_000.0,
                "sensor polling"
            );
        }
        info!("session finalized");
        Ok(())
    }

    pub fn record(&self) -> Option<&TrialRecord> {
        self.record.as_ref()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.sequencer.abort_handle().clone()
    }

    pub fn goggle_state(&self) -> GoggleState {
        self.sequencer.goggle_state()
    }

    pub fn timer(&self) -> &T {
        &self.sequencer.timer
    }

    pub fn poll_stats(&self) -> IntervalStats {
        self.sequencer.timer.interval_stats()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn persist(&mut self) -> Result<(), TrialFailure> {
        let Some(record) = self.record.as_ref() else {
            return Ok(());
        };
        self.sink
            .write_trial(&record.participant_id, record.log.export())
            .map_err(|e| {
                error!(participant = %record.participant_id, error = %e, "failed to save data");
                TrialFailure {
                    participant_id: record.participant_id.clone(),
                    error: ExperimentError::PersistenceFault(e),
                }
            })
    }

    fn flush_best_effort(&mut self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, "record kept for a later retry");
        }
    }

    /// Parks the goggles and closes the I/O device, once.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err((channel, e)) = self.sequencer.park() {
            warn!(channel, error = %e, "could not park goggles");
        }
        close_quietly(&mut self.sequencer.io);
        info!("devices released");
    }
}

impl<D, A, T, S> Drop for Session<D, A, T, S>
where
    D: DigitalIo,
    A: AudioDevice,
    T: Timer,
    S: PersistenceSink,
{
    fn drop(&mut self) {
        self.release();
        if let Some(record) = &self.record {
            warn!(
                participant = %record.participant_id,
                events = record.log.len(),
                "session dropped with unsaved events"
            );
        }
    }
}

fn close_quietly<D: DigitalIo>(io: &mut D) {
    if let Err(e) = io.close() {
        warn!(error = %e, "failed to close I/O device");
    }
}
