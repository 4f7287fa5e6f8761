//! Calibration and timing constants for the meters engine.
//!
//! The defaults describe the stock anemometer / rain gauge pair the module
//! ships with. Firmware can override individual values with the `with_*`
//! setters before handing the config to [`crate::WeatherMeters`].

use serde::{Deserialize, Serialize};

/// Minimum spacing between two accepted edges on the same line.
pub const DEBOUNCE_MS: u32 = 10;

/// Minimum spacing between two effective ticks.
pub const TICK_INTERVAL_MS: u32 = 500;

/// Largest tolerated distance between the persisted and live clock.
pub const DRIFT_TOLERANCE_SECS: u32 = 5 * 60;

/// Minimum spacing between two flushes of the persisted state.
pub const SAVE_INTERVAL_MS: u32 = 10_000;

/// One anemometer closure per second corresponds to this wind speed.
pub const WIND_KMH_PER_HZ: f32 = 2.4;

/// Rain collected by one tip of the gauge bucket.
pub const RAIN_MM_PER_TIP: f32 = 0.2794;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MetersConfig {
    pub debounce_ms: u32,
    pub tick_interval_ms: u32,
    pub drift_tolerance_secs: u32,
    pub save_interval_ms: u32,
    pub wind_kmh_per_hz: f32,
    pub rain_mm_per_tip: f32,
}

impl MetersConfig {
    pub const fn new() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            tick_interval_ms: TICK_INTERVAL_MS,
            drift_tolerance_secs: DRIFT_TOLERANCE_SECS,
            save_interval_ms: SAVE_INTERVAL_MS,
            wind_kmh_per_hz: WIND_KMH_PER_HZ,
            rain_mm_per_tip: RAIN_MM_PER_TIP,
        }
    }

    pub const fn with_debounce_ms(mut self, debounce_ms: u32) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub const fn with_tick_interval_ms(mut self, tick_interval_ms: u32) -> Self {
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    pub const fn with_drift_tolerance_secs(mut self, drift_tolerance_secs: u32) -> Self {
        self.drift_tolerance_secs = drift_tolerance_secs;
        self
    }

    pub const fn with_save_interval_ms(mut self, save_interval_ms: u32) -> Self {
        self.save_interval_ms = save_interval_ms;
        self
    }

    pub const fn with_wind_kmh_per_hz(mut self, wind_kmh_per_hz: f32) -> Self {
        self.wind_kmh_per_hz = wind_kmh_per_hz;
        self
    }

    pub const fn with_rain_mm_per_tip(mut self, rain_mm_per_tip: f32) -> Self {
        self.rain_mm_per_tip = rain_mm_per_tip;
        self
    }
}

impl Default for MetersConfig {
    fn default() -> Self {
        Self::new()
    }
}
