use std::io::BufRead;
use std::thread;

use anyhow::{Context, Result};
use grasp_core::TrialOutcome;
use grasp_devices::{SimulatedAudio, SimulatedIo};
use grasp_experiment::{
    AbortHandle, CsvSink, ExperimentConfig, Session, TrialFailure, validate_participant_id,
};
use grasp_timing::{HighPrecisionTimer, Timer};
use tracing::{error, info, warn};

use crate::cli::Cli;

/// Headless session driver: runs the configured trials for one participant
/// and finalizes, however the run ends.
pub struct App {
    config: ExperimentConfig,
    participant: String,
    sensor: SimulatedIo,
    audio: SimulatedAudio,
    abort: AbortHandle,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let participant = cli.participant.trim().to_string();
        anyhow::ensure!(!participant.is_empty(), "please enter a valid participant ID");
        validate_participant_id(&participant).context("invalid participant ID")?;

        let mut config = match &cli.config {
            Some(path) => ExperimentConfig::load(path)?,
            None => ExperimentConfig::default(),
        };
        if let Some(dir) = cli.output_dir {
            config.output_dir = dir;
        }
        if let Some(trials) = cli.trials {
            config.trials_per_session = trials;
        }
        config.validate()?;

        let script = cli.sensor_script.repeated(config.trials_per_session);
        let sensor = SimulatedIo::new(config.sensor_channel, script);
        let audio = if cli.realtime_audio {
            SimulatedAudio::realtime()
        } else {
            SimulatedAudio::new()
        };

        Ok(Self {
            config,
            participant,
            sensor,
            audio,
            abort: AbortHandle::new(),
        })
    }

    pub fn run(self) -> Result<()> {
        println!("=== EEG GRASPING EXPERIMENT ===");
        println!("Participant: {}", self.participant);
        println!("Trials: {}", self.config.trials_per_session);
        println!("Type 'end' and press Enter to end the experiment.\n");

        self.watch_operator();

        let mut session = Session::open(
            &self.config,
            self.sensor.clone(),
            self.audio.clone(),
            CsvSink::new(&self.config.output_dir),
            HighPrecisionTimer::new(),
            self.abort.clone(),
        )
        .context("failed to start session")?;

        let trials = self.run_trials(&mut session);
        let finalized = session.finalize();

        if let Err(failure) = &trials {
            report(failure);
        }
        if let Err(failure) = &finalized {
            report(failure);
        }
        trials?;
        finalized?;

        println!("\nExperiment completed. Data saved to {}", self.config.output_dir.display());
        Ok(())
    }

    fn run_trials<T: Timer>(
        &self,
        session: &mut Session<SimulatedIo, SimulatedAudio, T, CsvSink>,
    ) -> Result<(), TrialFailure> {
        let mut rng = rand::rng();
        let total = self.config.trials_per_session;

        for trial in 1..=total {
            if self.abort.is_raised() {
                break;
            }
            info!(trial, total, "starting trial");
            match session.run_trial(&self.participant)? {
                TrialOutcome::Completed => {
                    println!("Trial {trial}/{total} complete");
                }
                TrialOutcome::Aborted { at } => {
                    warn!(%at, "experiment ended by operator");
                    println!("Experiment ended during {at}");
                    break;
                }
            }
            if trial < total {
                let pause = self.config.inter_trial_interval(&mut rng);
                session.timer().sleep(pause);
            }
        }
        Ok(())
    }

    /// Raises the abort handle when the operator types `end` (or `q`).
    fn watch_operator(&self) {
        let abort = self.abort.clone();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if matches!(line.trim(), "end" | "q" | "quit") {
                    info!("end of experiment requested");
                    abort.raise();
                    break;
                }
            }
        });
    }
}

fn report(failure: &TrialFailure) {
    error!(
        participant = %failure.participant_id,
        kind = %failure.error.kind(),
        error = %failure.error,
        "trial aborted"
    );
    eprintln!(
        "Trial for participant {} aborted: {} ({})",
        failure.participant_id,
        failure.error.kind(),
        failure.error
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["grasp-experiment"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn blank_participant_is_rejected() {
        assert!(App::new(cli(&["-p", "  "])).is_err());
    }

    #[test]
    fn participant_ids_that_would_share_a_file_are_rejected() {
        assert!(App::new(cli(&["-p", "P/1"])).is_err());
        assert!(App::new(cli(&["-p", "../P1"])).is_err());
        assert!(App::new(cli(&["-p", "P_1"])).is_ok());
    }

    #[test]
    fn flags_override_config() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().to_str().unwrap();
        let app = App::new(cli(&["-p", "P01", "-o", out, "-n", "4"])).unwrap();
        assert_eq!(app.config.trials_per_session, 4);
        assert_eq!(app.config.output_dir, dir.path());
    }

    #[test]
    fn zero_trials_is_invalid() {
        assert!(App::new(cli(&["-p", "P01", "-n", "0"])).is_err());
    }

    #[test]
    fn session_over_simulated_devices_writes_every_trial() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().to_str().unwrap();
        let app = App::new(cli(&[
            "-p",
            "P09",
            "-o",
            out,
            "-n",
            "2",
            "--sensor-script",
            "1,0,1",
        ]))
        .unwrap();
        let mut session = Session::open(
            &app.config,
            app.sensor.clone(),
            app.audio.clone(),
            CsvSink::new(&app.config.output_dir),
            grasp_timing::SimulatedTimer::default(),
            app.abort.clone(),
        )
        .unwrap();

        app.run_trials(&mut session).unwrap();
        session.finalize().unwrap();

        let contents =
            std::fs::read_to_string(dir.path().join("participant_P09_data.csv")).unwrap();
        assert_eq!(contents.lines().count(), 1 + 12);
        assert_eq!(app.audio.played().len(), 2);
    }

    #[test]
    fn default_script_makes_every_trial_wait_for_the_finger() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().to_str().unwrap();
        let app = App::new(cli(&["-p", "P10", "-o", out, "-n", "3"])).unwrap();
        let mut session = Session::open(
            &app.config,
            app.sensor.clone(),
            app.audio.clone(),
            CsvSink::new(&app.config.output_dir),
            grasp_timing::SimulatedTimer::default(),
            app.abort.clone(),
        )
        .unwrap();

        app.run_trials(&mut session).unwrap();
        session.finalize().unwrap();

        let contents =
            std::fs::read_to_string(dir.path().join("participant_P10_data.csv")).unwrap();
        let rows: Vec<(String, f64)> = contents
            .lines()
            .skip(1)
            .map(|line| {
                let (event, ts) = line.split_once(',').unwrap();
                (event.to_string(), ts.parse().unwrap())
            })
            .collect();
        assert_eq!(rows.len(), 3 * 6);
        for trial in rows.chunks(6) {
            assert_eq!(trial[0].0, "goggles_opaque");
            assert_eq!(trial[1].0, "beep");
            // Twenty empty 100 ms polls before the finger arrives.
            assert!((trial[1].1 - trial[0].1 - 2.0).abs() < 1e-6);
        }
    }
}
