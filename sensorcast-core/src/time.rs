//! Time management for the sampling loop
//!
//! Provides a clock abstraction and the fixed-interval measurement schedule:
//! - Monotonic clock (milliseconds since start, std only)
//! - Fixed clock (for tests)
//! - [`MeasureSchedule`] deciding when the next sample is due

use crate::errors::{ConfigError, ConfigResult};

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// Monotonic time source anchored at construction
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Clock reading zero now
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.start.elapsed().as_millis() as Timestamp
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock stopped at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to `timestamp`
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms` milliseconds
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// What the loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStep {
    /// Take a sample now
    Measure,
    /// Sleep this many milliseconds, service the network, then ask again
    Wait(u64),
}

/// Fixed-interval sampling aligned to multiples of the interval.
///
/// Waits are handed out in slices no longer than `poll_ms` so the caller
/// keeps servicing its transport between samples.
#[derive(Debug, Clone)]
pub struct MeasureSchedule {
    interval_ms: u64,
    poll_ms: u64,
    next_due: Timestamp,
}

impl MeasureSchedule {
    /// First sample is due immediately
    pub fn new(interval_ms: u64, poll_ms: u64) -> ConfigResult<Self> {
        if interval_ms == 0 || poll_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Self {
            interval_ms,
            poll_ms,
            next_due: 0,
        })
    }

    /// Decide between measuring and waiting at time `now`
    pub fn step(&self, now: Timestamp) -> ScheduleStep {
        if now >= self.next_due {
            ScheduleStep::Measure
        } else {
            ScheduleStep::Wait((self.next_due - now).min(self.poll_ms))
        }
    }

    /// Record a sample taken at `now`; the next one is due at the next
    /// multiple of the interval
    pub fn mark_measured(&mut self, now: Timestamp) {
        self.next_due = (now / self.interval_ms + 1) * self.interval_ms;
    }

    /// Deadline of the next sample
    pub fn next_due(&self) -> Timestamp {
        self.next_due
    }

    /// Sampling interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}
