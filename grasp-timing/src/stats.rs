use std::time::Duration;

/// Summary of recorded polling intervals, all values in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalStats {
    pub samples: usize,
    pub average_ns: f64,
    pub jitter_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
}

/// Bounded buffer of measured sleep durations.
#[derive(Debug, Clone)]
pub struct IntervalRecorder {
    intervals: Vec<Duration>,
    max_samples: usize,
}

impl IntervalRecorder {
    pub fn new(max_samples: usize) -> Self {
        Self {
            intervals: Vec::with_capacity(max_samples.min(1000)),
            max_samples: max_samples.max(1),
        }
    }

    /// Records one interval, dropping the oldest once the buffer is full.
    pub fn record(&mut self, d: Duration) {
        if self.intervals.len() >= self.max_samples {
            self.intervals.remove(0);
        }
        self.intervals.push(d);
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn stats(&self) -> IntervalStats {
        if self.intervals.is_empty() {
            return IntervalStats::default();
        }
        let times: Vec<f64> = self
            .intervals
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();

        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        IntervalStats {
            samples: times.len(),
            average_ns: avg,
            jitter_ns: var.sqrt(),
            min_ns: min,
            max_ns: max,
        }
    }
}

impl Default for IntervalRecorder {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_recorder_reports_zeroes() {
        let recorder = IntervalRecorder::default();
        assert_eq!(recorder.stats(), IntervalStats::default());
    }

    #[test]
    fn stats_cover_mean_spread_and_bounds() {
        let mut recorder = IntervalRecorder::default();
        recorder.record(Duration::from_millis(8));
        recorder.record(Duration::from_millis(12));

        let stats = recorder.stats();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.average_ns, 10_000_000.0);
        assert_eq!(stats.jitter_ns, 2_000_000.0);
        assert_eq!(stats.min_ns, 8_000_000.0);
        assert_eq!(stats.max_ns, 12_000_000.0);
    }

    #[test]
    fn oldest_sample_is_evicted_when_full() {
        let mut recorder = IntervalRecorder::new(2);
        recorder.record(Duration::from_millis(1));
        recorder.record(Duration::from_millis(2));
        recorder.record(Duration::from_millis(3));

        let stats = recorder.stats();
        assert_eq!(recorder.len(), 2);
        assert_eq!(stats.min_ns, 2_000_000.0);
    }
}
