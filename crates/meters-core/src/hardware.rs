//! Board seam for the weather meters.
//!
//! The engine never touches pins directly. Firmware implements
//! [`MeterHardware`] for its board: configuring pin modes, wiring the
//! anemometer and rain gauge interrupts to the handlers in
//! [`crate::capture`], and sampling the wind vane.

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    #[error("Failed to attach edge notification for {line}")]
    Attach { line: &'static str },
    #[error("A different event capture is already installed")]
    AlreadyInstalled,
}

pub trait MeterHardware {
    /// Configures the meter pins and attaches the edge notifications.
    ///
    /// Called once from [`crate::WeatherMeters::setup`]. A failure here is fatal
    /// to startup.
    fn attach_edges(&mut self) -> Result<(), SetupError>;

    /// Samples the wind vane's analog input.
    fn read_direction_adc(&mut self) -> i16;
}
