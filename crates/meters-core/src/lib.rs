//! Hardware-independent core library for the weather-meters station module
//!
//! This crate contains the aggregation engine behind the anemometer, wind
//! vane and rain gauge: debounced edge capture, the once-per-second windowing
//! routine, circular wind-direction averaging and the fixed-layout state
//! record that keeps the rolling windows alive across resets.
//!
//! It is `#![no_std]` so it compiles on both the module's microcontroller and
//! desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod capture;
pub mod clock;
pub mod config;
pub mod hardware;
pub mod meters;
pub mod report;
pub mod station;
pub mod storage;
pub mod wind;

#[cfg(test)]
pub(crate) mod testing;

pub use capture::EventCapture;
pub use clock::{ClockTime, MonotonicClock, WallClock};
pub use config::MetersConfig;
pub use hardware::{MeterHardware, SetupError};
pub use meters::WeatherMeters;
pub use report::{Reading, ReadingId, WeatherReport};
pub use station::Station;
pub use storage::{PersistedWeatherState, StateStore, StoreError};
pub use wind::{Angle, WindDirection, WindReading};
