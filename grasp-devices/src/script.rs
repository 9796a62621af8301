use std::collections::VecDeque;
use std::str::FromStr;

/// Scripted sequence of raw sensor levels for [`crate::SimulatedIo`].
///
/// Written as comma-separated `level*count` segments, for example
/// `0*20,1*30,0*15,1`. A segment without `*count` lasts one sample. Once the
/// script runs out, the last level is held forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorScript {
    segments: VecDeque<(bool, usize)>,
    hold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("sensor script is empty")]
    Empty,

    #[error("invalid sensor level {0:?}, expected 0 or 1")]
    InvalidLevel(String),

    #[error("invalid sample count {0:?}")]
    InvalidCount(String),
}

impl SensorScript {
    pub fn new(segments: impl IntoIterator<Item = (bool, usize)>) -> Result<Self, ScriptError> {
        let segments: VecDeque<(bool, usize)> =
            segments.into_iter().filter(|(_, n)| *n > 0).collect();
        let hold = segments.back().map(|(level, _)| *level).ok_or(ScriptError::Empty)?;
        Ok(Self { segments, hold })
    }

    /// A sensor that always reads `level`.
    pub fn constant(level: bool) -> Self {
        Self {
            segments: VecDeque::new(),
            hold: level,
        }
    }

    /// Plays the scripted segments `times` over, then holds the last level.
    pub fn repeated(self, times: usize) -> Self {
        let segments = self
            .segments
            .iter()
            .copied()
            .cycle()
            .take(self.segments.len() * times.max(1))
            .collect();
        Self {
            segments,
            hold: self.hold,
        }
    }

    /// Consumes one sample.
    pub fn next_level(&mut self) -> bool {
        let Some((level, remaining)) = self.segments.front_mut() else {
            return self.hold;
        };
        let level = *level;
        *remaining -= 1;
        if *remaining == 0 {
            self.segments.pop_front();
        }
        level
    }
}

impl FromStr for SensorScript {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (level, count) = match part.split_once('*') {
                Some((level, count)) => (level.trim(), Some(count.trim())),
                None => (part, None),
            };
            let level = match level {
                "0" => false,
                "1" => true,
                other => return Err(ScriptError::InvalidLevel(other.to_string())),
            };
            let count = match count {
                Some(c) => match c.parse::<usize>() {
                    Ok(n) if n > 0 => n,
                    _ => return Err(ScriptError::InvalidCount(c.to_string())),
                },
                None => 1,
            };
            segments.push((level, count));
        }
        Self::new(segments)
    }
}
