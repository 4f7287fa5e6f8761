//! Snapshot of the values the module reports upstream.
//!
//! The module framework polls for readings in a fixed order. This module turns
//! the aggregator's queries into that list without knowing anything about the
//! bus that carries it.

use embedded_storage::Storage;
use serde::Serialize;

use crate::clock::{MonotonicClock, WallClock};
use crate::hardware::MeterHardware;
use crate::meters::WeatherMeters;
use crate::wind::WindReading;

/// Number of weather readings the module declares.
pub const REPORT_READINGS: usize = 10;

/// Reading slots in the order the module declares them.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingId {
    WindSpeed,
    WindDirection,
    HourlyWindSpeed,
    HourlyWindDirection,
    TenMinuteWindGust,
    TenMinuteWindDirection,
    TwoMinuteWindSpeed,
    TwoMinuteWindDirection,
    PreviousHourlyRain,
    HourlyRain,
}

impl ReadingId {
    pub const fn name(self) -> &'static str {
        match self {
            Self::WindSpeed => "Wind Speed",
            Self::WindDirection => "Wind Dir",
            Self::HourlyWindSpeed => "Hr Wind Speed",
            Self::HourlyWindDirection => "Hr Wind Dir",
            Self::TenMinuteWindGust => "10m Wind Gust",
            Self::TenMinuteWindDirection => "10m Wind Dir",
            Self::TwoMinuteWindSpeed => "2m Wind Speed",
            Self::TwoMinuteWindDirection => "2m Wind Dir",
            Self::PreviousHourlyRain => "Prev Hrly Rain",
            Self::HourlyRain => "Hourly Rain",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::WindSpeed
            | Self::HourlyWindSpeed
            | Self::TenMinuteWindGust
            | Self::TwoMinuteWindSpeed => "km/hr",
            Self::WindDirection
            | Self::HourlyWindDirection
            | Self::TenMinuteWindDirection
            | Self::TwoMinuteWindDirection => "",
            Self::PreviousHourlyRain | Self::HourlyRain => "mm",
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub id: ReadingId,
    pub value: f32,
}

/// All reportable values at one instant. Undefined directions and an empty
/// two-minute window are `None`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct WeatherReport {
    pub wind_speed_kmh: f32,
    pub wind_direction: Option<u16>,
    pub hourly_gust_kmh: f32,
    pub hourly_gust_direction: Option<u16>,
    pub ten_minute_gust_kmh: f32,
    pub ten_minute_gust_direction: Option<u16>,
    pub two_minute_speed_kmh: Option<f32>,
    pub two_minute_direction: Option<u16>,
    pub previous_hour_rain_mm: f32,
    pub hourly_rain_mm: f32,
}

impl WeatherReport {
    pub fn collect<H, C, M, F>(meters: &WeatherMeters<H, C, M, F>) -> Self
    where
        H: MeterHardware,
        C: WallClock,
        M: MonotonicClock,
        F: Storage,
        F::Error: core::fmt::Debug,
    {
        let current = meters.current_wind();
        let hourly = meters.hourly_gust();
        let recent = meters.largest_recent_gust();
        let average = meters.two_minute_average();

        Self {
            wind_speed_kmh: current.speed_kmh,
            wind_direction: degrees(&current),
            hourly_gust_kmh: hourly.speed_kmh,
            hourly_gust_direction: degrees(&hourly),
            ten_minute_gust_kmh: recent.speed_kmh,
            ten_minute_gust_direction: degrees(&recent),
            two_minute_speed_kmh: average.map(|a| a.speed_kmh),
            two_minute_direction: average.as_ref().and_then(degrees),
            previous_hour_rain_mm: meters.previous_hour_rain_mm(),
            hourly_rain_mm: meters.hourly_rain_mm(),
        }
    }

    /// The defined values, in declaration order. Undefined slots are left out.
    pub fn readings(&self) -> heapless::Vec<Reading, REPORT_READINGS> {
        let direction = |d: Option<u16>| d.map(f32::from);

        [
            (ReadingId::WindSpeed, Some(self.wind_speed_kmh)),
            (ReadingId::WindDirection, direction(self.wind_direction)),
            (ReadingId::HourlyWindSpeed, Some(self.hourly_gust_kmh)),
            (
                ReadingId::HourlyWindDirection,
                direction(self.hourly_gust_direction),
            ),
            (ReadingId::TenMinuteWindGust, Some(self.ten_minute_gust_kmh)),
            (
                ReadingId::TenMinuteWindDirection,
                direction(self.ten_minute_gust_direction),
            ),
            (ReadingId::TwoMinuteWindSpeed, self.two_minute_speed_kmh),
            (
                ReadingId::TwoMinuteWindDirection,
                direction(self.two_minute_direction),
            ),
            (ReadingId::PreviousHourlyRain, Some(self.previous_hour_rain_mm)),
            (ReadingId::HourlyRain, Some(self.hourly_rain_mm)),
        ]
        .into_iter()
        .filter_map(|(id, value)| value.map(|value| Reading { id, value }))
        .collect()
    }
}

fn degrees(reading: &WindReading) -> Option<u16> {
    reading.direction.angle.map(|a| a.degrees())
}
