use std::f64::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use grasp_core::DeviceError;
use tracing::debug;

/// Fixed-frequency sine cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration: Duration,
    pub sample_rate: u32,
}

impl Tone {
    pub fn new(frequency_hz: f64, duration: Duration, sample_rate: u32) -> Self {
        Self {
            frequency_hz,
            duration,
            sample_rate,
        }
    }

    pub fn sample_count(&self) -> usize {
        (self.sample_rate as f64 * self.duration.as_secs_f64()) as usize
    }

    /// Synthesises `sin(2π·f·t)` at `t = i / sample_rate`, end point excluded.
    pub fn samples(&self) -> Vec<f32> {
        let rate = self.sample_rate as f64;
        (0..self.sample_count())
            .map(|i| (2.0 * PI * self.frequency_hz * i as f64 / rate).sin() as f32)
            .collect()
    }
}

/// Audio output used for the go cue.
pub trait AudioDevice {
    /// Checks the output is reachable before the session starts.
    fn probe(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Starts playback. Must return as soon as the tone is audible.
    fn start(&mut self, tone: &Tone) -> Result<(), DeviceError>;

    /// Blocks until the tone started last has finished.
    fn wait(&mut self) -> Result<(), DeviceError>;

    /// Plays the tone to completion.
    fn play_tone(&mut self, tone: &Tone) -> Result<(), DeviceError> {
        self.start(tone)?;
        self.wait()
    }
}

#[derive(Debug, Default)]
struct AudioState {
    played: Vec<Tone>,
    pending: Option<Tone>,
    unavailable: bool,
}

/// Audio device that renders tones into memory instead of a speaker.
///
/// With `realtime` set, `wait` blocks for the tone duration like a real
/// output stream would.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAudio {
    state: Arc<Mutex<AudioState>>,
    realtime: bool,
}

impl SimulatedAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realtime() -> Self {
        Self {
            realtime: true,
            ..Self::default()
        }
    }

    /// Makes every call report the output as unavailable.
    pub fn unavailable(self) -> Self {
        self.state().unavailable = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, AudioState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn played(&self) -> Vec<Tone> {
        self.state().played.clone()
    }
}

impl AudioDevice for SimulatedAudio {
    fn probe(&mut self) -> Result<(), DeviceError> {
        if self.state().unavailable {
            return Err(DeviceError::NotConnected);
        }
        Ok(())
    }

    fn start(&mut self, tone: &Tone) -> Result<(), DeviceError> {
        let mut state = self.state();
        if state.unavailable {
            return Err(DeviceError::NotConnected);
        }
        let samples = tone.samples();
        debug!(
            frequency_hz = tone.frequency_hz,
            samples = samples.len(),
            "simulated tone started"
        );
        state.pending = Some(*tone);
        Ok(())
    }

    fn wait(&mut self) -> Result<(), DeviceError> {
        let tone = {
            let mut state = self.state();
            let Some(tone) = state.pending.take() else {
                return Ok(());
            };
            state.played.push(tone);
            tone
        };
        if self.realtime {
            std::thread::sleep(tone.duration);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beep_has_expected_length_and_shape() {
        let tone = Tone::new(1000.0, Duration::from_millis(500), 44100);
        let samples = tone.samples();
        assert_eq!(samples.len(), 22050);
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        // Quarter period of 1 kHz at 44.1 kHz is ~11 samples; peak sits near there.
        assert!(samples[11] > 0.99);
    }

    #[test]
    fn play_tone_records_completed_playback() {
        let audio = SimulatedAudio::new();
        let mut device = audio.clone();
        let tone = Tone::new(1000.0, Duration::from_millis(10), 8000);

        device.start(&tone).unwrap();
        assert!(audio.played().is_empty());
        device.wait().unwrap();
        assert_eq!(audio.played(), vec![tone]);
    }

    #[test]
    fn unavailable_device_refuses_playback() {
        let mut audio = SimulatedAudio::new().unavailable();
        let tone = Tone::new(440.0, Duration::from_millis(1), 8000);
        assert_eq!(audio.probe(), Err(DeviceError::NotConnected));
        assert_eq!(audio.play_tone(&tone), Err(DeviceError::NotConnected));
    }
}
