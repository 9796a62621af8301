use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// When the beep event is stamped relative to playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueTimestamp {
    /// As soon as playback has started, before blocking on it.
    #[default]
    Invocation,
    /// After playback has finished.
    Completion,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Hardware wiring and timing of the grasping experiment.
///
/// Loaded from JSON; every field is optional and falls back to the lab
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub sensor_channel: u8,
    /// Raw level that means a finger is resting on the sensor.
    pub present_level: bool,
    pub goggle_channel: u8,
    /// Second output line driven with the goggle level.
    pub goggle_mirror_channel: Option<u8>,
    pub present_poll_ms: u64,
    pub release_poll_ms: u64,
    /// `None` waits for the participant indefinitely.
    pub sensor_timeout_ms: Option<u64>,
    pub cue_frequency_hz: f64,
    pub cue_duration_s: f64,
    pub cue_sample_rate: u32,
    pub cue_timestamp: CueTimestamp,
    pub trials_per_session: usize,
    pub inter_trial_range_ms: (u64, u64),
    pub output_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            sensor_channel: 0,
            present_level: true,
            goggle_channel: 1,
            goggle_mirror_channel: Some(2),
            present_poll_ms: 100,
            release_poll_ms: 10,
            sensor_timeout_ms: None,
            cue_frequency_hz: 1000.0,
            cue_duration_s: 0.5,
            cue_sample_rate: 44100,
            cue_timestamp: CueTimestamp::Invocation,
            trials_per_session: 1,
            inter_trial_range_ms: (1000, 1000),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.goggle_channel == self.sensor_channel
            || self.goggle_mirror_channel == Some(self.sensor_channel)
        {
            return Err(ConfigError::Invalid(format!(
                "sensor channel {} is also used as a goggle output",
                self.sensor_channel
            )));
        }
        if self.present_poll_ms == 0 || self.release_poll_ms == 0 {
            return Err(ConfigError::Invalid("poll intervals must be non-zero".into()));
        }
        let cue_fits = Duration::try_from_secs_f64(self.cue_duration_s).is_ok();
        if !(self.cue_duration_s > 0.0 && cue_fits) {
            return Err(ConfigError::Invalid(format!(
                "cue duration must be a positive number of seconds, got {}",
                self.cue_duration_s
            )));
        }
        if !(self.cue_frequency_hz.is_finite() && self.cue_frequency_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cue frequency must be positive, got {}",
                self.cue_frequency_hz
            )));
        }
        if self.cue_sample_rate == 0 {
            return Err(ConfigError::Invalid("cue sample rate must be non-zero".into()));
        }
        if self.trials_per_session == 0 {
            return Err(ConfigError::Invalid("at least one trial is required".into()));
        }
        let (lo, hi) = self.inter_trial_range_ms;
        if lo > hi {
            return Err(ConfigError::Invalid(format!(
                "inter-trial range is reversed: {lo}..{hi} ms"
            )));
        }
        Ok(())
    }

    pub fn present_poll(&self) -> Duration {
        Duration::from_millis(self.present_poll_ms)
    }

    pub fn release_poll(&self) -> Duration {
        Duration::from_millis(self.release_poll_ms)
    }

    pub fn sensor_timeout(&self) -> Option<Duration> {
        self.sensor_timeout_ms.map(Duration::from_millis)
    }

    /// Cue length. Only meaningful once [`ExperimentConfig::validate`] has
    /// accepted the config.
    pub fn cue_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.cue_duration_s.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Draws the pause before the next trial.
    pub fn inter_trial_interval<R: Rng>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = self.inter_trial_range_ms;
        Duration::from_millis(rng.random_range(lo..=hi.max(lo)))
    }
}
