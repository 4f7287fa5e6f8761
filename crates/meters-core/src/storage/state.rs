use core::fmt::Display;

use super::ring::CursorRing;
use crate::clock::ClockTime;
use crate::wind::WindReading;

/// One rain slot per minute of the hour.
pub const MINUTES_PER_HOUR: usize = 60;

/// One wind sample per second of the two-minute window.
pub const TWO_MINUTE_SLOTS: usize = 120;

/// One gust bucket per minute of the ten-minute window.
pub const GUST_BUCKETS: usize = 10;

/// The rolling windows that survive a reset.
///
/// Single writer: [`crate::WeatherMeters`] mutates it once per effective tick
/// and periodically writes it through to flash. Everything reported upstream
/// is derived from this record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedWeatherState {
    /// Wall-clock time of the last effective tick (Unix seconds).
    pub last_event_timestamp: u32,
    /// Rain collected in each minute of the current hour, in mm.
    pub rain_per_minute: [f32; MINUTES_PER_HOUR],
    /// Total rain of the previous clock hour, in mm.
    pub previous_hour_rain_mm: f32,
    /// Instantaneous readings, one per second. Unfilled slots have no direction.
    pub wind_samples: CursorRing<WindReading, TWO_MINUTE_SLOTS>,
    /// Strongest reading seen in each minute of the last ten.
    pub gusts: CursorRing<WindReading, GUST_BUCKETS>,
    /// Strongest reading of the current clock hour.
    pub hourly_gust: WindReading,
}

impl PersistedWeatherState {
    /// The zero value used at first boot and after a drift reset.
    pub const fn new() -> Self {
        Self {
            last_event_timestamp: 0,
            rain_per_minute: [0.0; MINUTES_PER_HOUR],
            previous_hour_rain_mm: 0.0,
            wind_samples: CursorRing::filled(WindReading::ZERO),
            gusts: CursorRing::filled(WindReading::ZERO),
            hourly_gust: WindReading::ZERO,
        }
    }

    /// Re-zeroes the state in place.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub const fn last_tick_time(&self) -> ClockTime {
        ClockTime::from_unix(self.last_event_timestamp)
    }

    /// Rain of the current, possibly partial, hour.
    pub fn hourly_rain_mm(&self) -> f32 {
        self.rain_per_minute.iter().sum()
    }

    pub fn record_rain(&mut self, minute: u8, mm: f32) {
        self.rain_per_minute[minute as usize % MINUTES_PER_HOUR] += mm;
    }
}

impl Default for PersistedWeatherState {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PersistedWeatherState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[WeatherState] ts: {}, hourly rain: {:.2} mm, prev hour: {:.2} mm, 2m cursor: {}, 10m cursor: {}, hourly gust: {}",
            self.last_event_timestamp,
            self.hourly_rain_mm(),
            self.previous_hour_rain_mm,
            self.wind_samples.cursor().index(),
            self.gusts.cursor().index(),
            self.hourly_gust
        )
    }
}
