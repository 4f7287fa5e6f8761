//! Foreground loop driving the weather meters.
//!
//! Each pass services the module framework (through an optional poll hook),
//! runs one aggregation tick and then sleeps for a fixed interval. The edges
//! themselves arrive through [`crate::capture`] and never wait on this loop.

use embedded_hal::delay::DelayNs;
use embedded_storage::Storage;

use crate::clock::{MonotonicClock, WallClock};
use crate::hardware::{MeterHardware, SetupError};
use crate::meters::WeatherMeters;

/// Sleep between loop passes.
pub const LOOP_DELAY_MS: u32 = 10;

/// Hook type used when the station runs without a framework poll.
pub type NoPoll<H, C, M, F> = fn(&WeatherMeters<H, C, M, F>);

pub struct Station<H, C, M, F, D, P = NoPoll<H, C, M, F>>
where
    H: MeterHardware,
    C: WallClock,
    M: MonotonicClock,
    F: Storage,
    F::Error: core::fmt::Debug,
{
    meters: WeatherMeters<H, C, M, F>,
    delay: D,
    poll: Option<P>,
    passes: u64,
}

impl<H, C, M, F, D> Station<H, C, M, F, D>
where
    H: MeterHardware,
    C: WallClock,
    M: MonotonicClock,
    F: Storage,
    F::Error: core::fmt::Debug,
    D: DelayNs,
{
    pub fn new(meters: WeatherMeters<H, C, M, F>, delay: D) -> Self {
        Self {
            meters,
            delay,
            poll: None,
            passes: 0,
        }
    }
}

impl<H, C, M, F, D, P> Station<H, C, M, F, D, P>
where
    H: MeterHardware,
    C: WallClock,
    M: MonotonicClock,
    F: Storage,
    F::Error: core::fmt::Debug,
    D: DelayNs,
    P: FnMut(&WeatherMeters<H, C, M, F>),
{
    /// Station whose every pass first hands the meters to `poll`.
    pub fn with_poll(meters: WeatherMeters<H, C, M, F>, delay: D, poll: P) -> Self {
        Self {
            meters,
            delay,
            poll: Some(poll),
            passes: 0,
        }
    }

    pub fn setup(&mut self) -> Result<(), SetupError> {
        self.meters.setup()
    }

    /// One loop pass. Returns whether the tick advanced the windows.
    pub fn step(&mut self) -> bool {
        if let Some(poll) = self.poll.as_mut() {
            poll(&self.meters);
        }

        let advanced = self.meters.tick();
        self.delay.delay_ms(LOOP_DELAY_MS);
        self.passes = self.passes.wrapping_add(1);
        advanced
    }

    /// Runs `passes` loop passes and returns how many of them advanced.
    pub fn run_for(&mut self, passes: u32) -> u32 {
        (0..passes).map(|_| u32::from(self.step())).sum()
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn meters(&self) -> &WeatherMeters<H, C, M, F> {
        &self.meters
    }

    pub fn meters_mut(&mut self) -> &mut WeatherMeters<H, C, M, F> {
        &mut self.meters
    }

    pub fn into_meters(self) -> WeatherMeters<H, C, M, F> {
        self.meters
    }
}
