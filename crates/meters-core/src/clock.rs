//! Time sources consumed by the engine.
//!
//! Two clocks are involved: the battery-backed real-time clock that defines
//! second/minute/hour boundaries and is persisted with the state, and the
//! free-running millisecond counter used for debouncing, rate limiting and the
//! save cadence.

/// Broken-down wall-clock time (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTime {
    /// Seconds since the Unix epoch.
    pub unix: u32,
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
}

impl ClockTime {
    pub const fn from_unix(unix: u32) -> Self {
        Self {
            unix,
            second: (unix % 60) as u8,
            minute: ((unix / 60) % 60) as u8,
            hour: ((unix / 3600) % 24) as u8,
        }
    }

    /// Absolute distance between two instants in seconds.
    pub const fn distance_secs(&self, other: &ClockTime) -> u32 {
        self.unix.abs_diff(other.unix)
    }
}

/// Real-time clock collaborator. May jump; the engine detects large jumps.
pub trait WallClock {
    fn now(&mut self) -> ClockTime;
}

/// Monotonic millisecond counter (uptime).
pub trait MonotonicClock {
    fn now_ms(&self) -> u64;
}
