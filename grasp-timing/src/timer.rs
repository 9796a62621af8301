use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::stats::{IntervalRecorder, IntervalStats};

/// Instant on the experiment clock, in nanoseconds since the Unix epoch.
///
/// Produced by a [`Timer`], so successive readings never go backwards even if
/// the system wall clock is adjusted mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Floating-point epoch seconds, the format written to trial files.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    pub fn checked_add(&self, d: Duration) -> Option<Timestamp> {
        u64::try_from(d.as_nanos())
            .ok()
            .and_then(|ns| self.0.checked_add(ns))
            .map(Timestamp)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.as_secs_f64())
    }
}

/// Clock and sleeper shared by every component of a trial.
pub trait Timer: Clone + Send + Sync {
    fn now(&self) -> Timestamp;
    fn elapsed(&self, ts: Timestamp) -> Duration {
        self.now().saturating_duration_since(ts)
    }
    fn sleep(&self, d: Duration);
    fn record_interval(&mut self, d: Duration);
    fn interval_stats(&self) -> IntervalStats;
}

/// Wall-clock anchored monotonic timer with platform-specific sleeps.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    epoch_ns: u64,
    intervals: IntervalRecorder,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> Timestamp {
        let offset = u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.epoch_ns.saturating_add(offset))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_interval(&mut self, d: Duration) {
        self.intervals.record(d);
    }
    fn interval_stats(&self) -> IntervalStats {
        self.intervals.stats()
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        let epoch_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            start: Instant::now(),
            epoch_ns,
            intervals: IntervalRecorder::default(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "windows")]
        self.windows_sleep(duration);
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "windows")]
    fn windows_sleep(&self, duration: Duration) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{
            CreateWaitableTimerW, SetWaitableTimer, WaitForSingleObject, INFINITE,
        };

        // Relative due time in 100 ns units.
        let due_time = -((duration.as_nanos() / 100) as i64);

        unsafe {
            match CreateWaitableTimerW(None, true, None) {
                Ok(timer) => {
                    if SetWaitableTimer(timer, &due_time, 0, None, None, false).is_ok() {
                        WaitForSingleObject(timer, INFINITE);
                    } else {
                        std::thread::sleep(duration);
                    }
                    let _ = CloseHandle(timer);
                }
                Err(_) => std::thread::sleep(duration),
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Virtual clock that only advances when slept on.
///
/// Clones share the same clock, so a test can hold one handle while the
/// session under test owns another.
#[derive(Debug, Clone)]
pub struct SimulatedTimer {
    now_ns: Arc<AtomicU64>,
    intervals: IntervalRecorder,
}

impl SimulatedTimer {
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(start.as_nanos())),
            intervals: IntervalRecorder::default(),
        }
    }

    /// Moves the clock forward without a sleep.
    pub fn advance(&self, d: Duration) {
        let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.now_ns.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Default for SimulatedTimer {
    fn default() -> Self {
        Self::starting_at(Timestamp::from_nanos(1_700_000_000_000_000_000))
    }
}

impl Timer for SimulatedTimer {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_ns.load(Ordering::SeqCst))
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
    fn record_interval(&mut self, d: Duration) {
        self.intervals.record(d);
    }
    fn interval_stats(&self) -> IntervalStats {
        self.intervals.stats()
    }
}
