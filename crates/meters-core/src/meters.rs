//! The windowed aggregator.
//!
//! [`WeatherMeters`] is driven by the module's foreground loop. Each call to
//! [`WeatherMeters::tick`] is cheap when nothing is due; at most once per clock
//! second it samples the wind, folds the captured edges into the persisted
//! windows and, on a slower cadence, writes the state through to flash.

use embedded_storage::Storage;
use log::{debug, error, info, warn};

use crate::capture::{self, EventCapture};
use crate::clock::{ClockTime, MonotonicClock, WallClock};
use crate::config::MetersConfig;
use crate::hardware::{MeterHardware, SetupError};
use crate::storage::{PersistedWeatherState, StateStore, StoreError};
use crate::wind::{self, WindDirection, WindReading};

pub struct WeatherMeters<H, C, M, F>
where
    H: MeterHardware,
    C: WallClock,
    M: MonotonicClock,
    F: Storage,
    F::Error: core::fmt::Debug,
{
    config: MetersConfig,
    hardware: H,
    clock: C,
    millis: M,
    store: StateStore<F>,
    state: PersistedWeatherState,
    capture: &'static EventCapture,
    /// Reading taken on the last effective tick.
    current_wind: WindReading,
    /// Uptime of the last effective tick; `None` until the first one.
    last_advance_ms: Option<u64>,
    /// Uptime the anemometer count was last drained.
    last_speed_check_ms: u64,
    /// Uptime of the last successful flush (boot counts as one).
    last_save_ms: u64,
    attached: bool,
}

impl<H, C, M, F> WeatherMeters<H, C, M, F>
where
    H: MeterHardware,
    C: WallClock,
    M: MonotonicClock,
    F: Storage,
    F::Error: core::fmt::Debug,
{
    /// Restores the persisted windows from `store` and prepares the engine.
    ///
    /// Edges are not counted until [`Self::setup`] has run.
    pub fn new(
        config: MetersConfig,
        hardware: H,
        clock: C,
        millis: M,
        mut store: StateStore<F>,
        capture: &'static EventCapture,
    ) -> Self {
        let state = store.load();
        capture.set_debounce_ms(config.debounce_ms);
        let now_ms = millis.now_ms();

        Self {
            config,
            hardware,
            clock,
            millis,
            store,
            state,
            capture,
            current_wind: WindReading::ZERO,
            last_advance_ms: None,
            last_speed_check_ms: now_ms,
            last_save_ms: now_ms,
            attached: false,
        }
    }

    /// Installs the edge capture and attaches the meter interrupts.
    ///
    /// Idempotent. An error here means the interrupts are not attached and the
    /// module must not start.
    pub fn setup(&mut self) -> Result<(), SetupError> {
        if self.attached {
            return Ok(());
        }

        capture::install(self.capture).inspect_err(|e| {
            error!(" Weather meters setup failed: {}", e);
        })?;
        self.hardware.attach_edges().inspect_err(|e| {
            error!(" Weather meters setup failed: {}", e);
        })?;

        self.attached = true;
        info!(" Weather meters attached");
        Ok(())
    }

    /// Advances the rolling windows if a new clock second has begun.
    ///
    /// Returns whether an advance happened. Calls closer together than the
    /// configured tick interval return `false` immediately.
    pub fn tick(&mut self) -> bool {
        let now_ms = self.millis.now_ms();
        if let Some(last) = self.last_advance_ms {
            if now_ms.wrapping_sub(last) < self.config.tick_interval_ms as u64 {
                return false;
            }
        }

        let now = self.clock.now();
        let reset = self.check_drift(&now);

        let previous = self.state.last_tick_time();
        self.drain_rain(&previous, reset);

        if !reset && now.second == previous.second {
            return false;
        }

        self.last_advance_ms = Some(now_ms);
        self.current_wind = self.sample_wind(now_ms);

        self.state.wind_samples.advance();

        if now.minute != previous.minute {
            self.roll_minute(&now, &previous);
        }

        self.state.wind_samples.set_current(self.current_wind);

        if self.current_wind.is_stronger_than(self.state.gusts.current()) {
            self.state.gusts.set_current(self.current_wind);
        }
        if self.current_wind.is_stronger_than(&self.state.hourly_gust) {
            self.state.hourly_gust = self.current_wind;
        }

        self.state.last_event_timestamp = now.unix;

        if now_ms.wrapping_sub(self.last_save_ms) >= self.config.save_interval_ms as u64 {
            // A failed save is retried on the next effective tick.
            if self.flush().is_ok() {
                self.last_save_ms = now_ms;
            }
        }

        true
    }

    /// Writes the state to flash immediately.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        match self.store.save(&self.state) {
            Ok(()) => {
                debug!(
                    " Saved weather state (hourly rain: {:.2} mm) (ts = {})",
                    self.state.hourly_rain_mm(),
                    self.state.last_event_timestamp
                );
                Ok(())
            }
            Err(e) => {
                error!(" Failed to save weather state: {}", e);
                Err(e)
            }
        }
    }

    /// Resets the state if the persisted clock is too far from the live one.
    fn check_drift(&mut self, now: &ClockTime) -> bool {
        let saved = self.state.last_tick_time();
        let difference = now.distance_secs(&saved);
        if difference <= self.config.drift_tolerance_secs {
            return false;
        }

        warn!(
            " Zeroing persisted weather state! ({} - {} = {})",
            now.unix, saved.unix, difference
        );
        self.state.clear();
        true
    }

    /// Credits pending rain tips to the minute they were collected in.
    fn drain_rain(&mut self, previous: &ClockTime, reset: bool) {
        let tips = self.capture.take_rain_tips();
        if tips == 0 || reset {
            // Tips from before a reset belong to the discarded windows.
            return;
        }
        self.state
            .record_rain(previous.minute, tips as f32 * self.config.rain_mm_per_tip);
    }

    fn sample_wind(&mut self, now_ms: u64) -> WindReading {
        let ticks = self.capture.take_wind_ticks();
        let elapsed_ms = now_ms.wrapping_sub(self.last_speed_check_ms);
        self.last_speed_check_ms = now_ms;

        let speed_kmh = if elapsed_ms == 0 {
            0.0
        } else {
            ticks as f32 / (elapsed_ms as f32 / 1000.0) * self.config.wind_kmh_per_hz
        };

        let direction = WindDirection::from_adc(self.hardware.read_direction_adc());
        WindReading::new(speed_kmh, direction)
    }

    fn roll_minute(&mut self, now: &ClockTime, previous: &ClockTime) {
        debug!(
            " New minute: {:02}:{:02}:{:02}",
            now.hour, now.minute, now.second
        );

        if now.hour != previous.hour {
            self.roll_hour(now, previous);
        }

        self.state.rain_per_minute[now.minute as usize] = 0.0;

        self.state.gusts.advance();
        self.state.gusts.set_current(WindReading::ZERO);
    }

    fn roll_hour(&mut self, now: &ClockTime, previous: &ClockTime) {
        let hourly_rain = self.state.hourly_rain_mm();
        info!(" New hour (previous hour rain: {:.2} mm)", hourly_rain);

        self.state.previous_hour_rain_mm = hourly_rain;
        self.state.rain_per_minute = [0.0; crate::storage::MINUTES_PER_HOUR];
        self.state.hourly_gust = WindReading::ZERO;

        if now.hour < previous.hour {
            info!(" New day ({} {})", now.hour, previous.hour);
        }
    }

    /// Reading taken on the last effective tick.
    pub fn current_wind(&self) -> WindReading {
        self.current_wind
    }

    /// Mean speed and circular-mean direction over the two-minute window.
    ///
    /// `None` while the window has no filled slot.
    pub fn two_minute_average(&self) -> Option<WindReading> {
        wind::two_minute_average(&self.state.wind_samples)
    }

    /// Rain of the current, possibly partial, hour.
    pub fn hourly_rain_mm(&self) -> f32 {
        self.state.hourly_rain_mm()
    }

    pub fn previous_hour_rain_mm(&self) -> f32 {
        self.state.previous_hour_rain_mm
    }

    /// Strongest gust across the ten one-minute buckets.
    pub fn largest_recent_gust(&self) -> WindReading {
        self.state
            .gusts
            .iter()
            .fold(WindReading::ZERO, |strongest, gust| {
                if gust.is_stronger_than(&strongest) {
                    *gust
                } else {
                    strongest
                }
            })
    }

    pub fn hourly_gust(&self) -> WindReading {
        self.state.hourly_gust
    }

    pub fn state(&self) -> &PersistedWeatherState {
        &self.state
    }

    pub fn config(&self) -> &MetersConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Tears the engine down, handing back the store (e.g. for a final flush
    /// check or to reuse the flash driver).
    pub fn into_store(self) -> StateStore<F> {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MINUTES_PER_HOUR;
    use crate::testing::{FakeHardware, ManualClock, ManualMillis, MemFlash, SHARED_CAPTURE};
    use crate::wind::Angle;

    type TestMeters = WeatherMeters<FakeHardware, ManualClock, ManualMillis, MemFlash>;

    /// 2024-03-01 10:15:00 UTC
    const T0: u32 = 1_709_288_100;

    struct Rig {
        meters: TestMeters,
        clock: ManualClock,
        millis: ManualMillis,
        hardware: FakeHardware,
        capture: &'static EventCapture,
    }

    impl Rig {
        fn new(unix: u32, stored: Option<PersistedWeatherState>) -> Self {
            let mut store = StateStore::new(MemFlash::erased(4096), 0);
            if let Some(state) = stored {
                store.save(&state).unwrap();
            }

            let clock = ManualClock::at(unix);
            let millis = ManualMillis::at(60_000);
            let hardware = FakeHardware::with_adc(600);
            let capture: &'static EventCapture = Box::leak(Box::new(EventCapture::new()));

            let meters = WeatherMeters::new(
                MetersConfig::default(),
                hardware.clone(),
                clock.clone(),
                millis.clone(),
                store,
                capture,
            );

            Self {
                meters,
                clock,
                millis,
                hardware,
                capture,
            }
        }

        /// One clock second later, then tick.
        fn second(&mut self) -> bool {
            self.clock.advance_secs(1);
            self.millis.advance(1_000);
            self.meters.tick()
        }

        fn seconds(&mut self, n: u32) {
            for _ in 0..n {
                assert!(self.second());
            }
        }
    }

    fn stored_at(unix: u32) -> PersistedWeatherState {
        let mut state = PersistedWeatherState::new();
        state.last_event_timestamp = unix;
        state
    }

    fn filled_slots(state: &PersistedWeatherState) -> usize {
        state.wind_samples.iter().filter(|w| w.is_filled()).count()
    }

    #[test]
    fn test_first_tick_after_boot_advances() {
        let mut rig = Rig::new(T0, Some(stored_at(T0 - 1)));

        assert!(rig.meters.tick());
        assert_eq!(rig.meters.state().last_event_timestamp, T0);
        assert_eq!(rig.meters.state().wind_samples.cursor().index(), 1);
        assert_eq!(
            rig.meters.current_wind().direction.angle,
            Some(Angle::new(180))
        );
    }

    #[test]
    fn test_calls_within_interval_are_noops() {
        let mut rig = Rig::new(T0, Some(stored_at(T0 - 1)));
        assert!(rig.meters.tick());

        rig.clock.advance_secs(1);
        rig.millis.advance(499);
        assert!(!rig.meters.tick());

        rig.millis.advance(1);
        assert!(rig.meters.tick());
    }

    #[test]
    fn test_same_second_does_not_advance() {
        let mut rig = Rig::new(T0, Some(stored_at(T0 - 1)));
        assert!(rig.meters.tick());

        rig.millis.advance(600);
        assert!(!rig.meters.tick());
        assert_eq!(rig.meters.state().wind_samples.cursor().index(), 1);

        // The gate was not re-armed by the refused call.
        rig.clock.advance_secs(1);
        rig.millis.advance(10);
        assert!(rig.meters.tick());
    }

    #[test]
    fn test_wind_speed_from_ticks() {
        let mut rig = Rig::new(T0, Some(stored_at(T0)));

        let base = rig.millis.get();
        for i in 0..24 {
            rig.capture.on_wind_edge(base + 20 + i * 40);
        }
        assert!(rig.second());

        let wind = rig.meters.current_wind();
        assert!((wind.speed_kmh - 57.6).abs() < 1e-3, "got {}", wind.speed_kmh);
        assert_eq!(rig.capture.counters().wind_tick_count, 0);
    }

    #[test]
    fn test_calm_reading_with_open_vane() {
        let mut rig = Rig::new(T0, Some(stored_at(T0)));
        rig.hardware.adc.set(1020);

        assert!(rig.second());

        let wind = rig.meters.current_wind();
        assert_eq!(wind.speed_kmh, 0.0);
        assert!(!wind.direction.is_defined());
        assert_eq!(rig.meters.two_minute_average(), None);
    }

    #[test]
    fn test_drift_resets_state() {
        let mut stale = stored_at(T0 - 301);
        for minute in 0..MINUTES_PER_HOUR as u8 {
            stale.record_rain(minute, 0.2);
        }
        stale.previous_hour_rain_mm = 4.0;
        for _ in 0..30 {
            stale.wind_samples.advance();
            stale
                .wind_samples
                .set_current(WindReading::new(20.0, WindDirection::from_adc(500)));
        }
        stale.gusts.set_current(WindReading::new(30.0, WindDirection::from_adc(500)));
        stale.hourly_gust = WindReading::new(30.0, WindDirection::from_adc(500));

        let mut rig = Rig::new(T0, Some(stale));
        rig.capture.on_rain_edge(rig.millis.get());

        assert!(rig.meters.tick());

        let state = rig.meters.state();
        assert_eq!(state.hourly_rain_mm(), 0.0);
        assert_eq!(state.previous_hour_rain_mm, 0.0);
        assert_eq!(filled_slots(state), 1);
        assert_eq!(state.wind_samples.cursor().index(), 1);
        assert_eq!(state.last_event_timestamp, T0);

        // The calm reading taken on this tick does not beat a zeroed tracker.
        assert_eq!(rig.meters.current_wind().speed_kmh, 0.0);
        assert_eq!(state.hourly_gust, WindReading::ZERO);
        assert!(state.gusts.iter().all(|g| *g == WindReading::ZERO));
    }

    #[test]
    fn test_drift_within_tolerance_keeps_state() {
        let mut stored = stored_at(T0 - 300);
        stored.previous_hour_rain_mm = 4.0;

        let mut rig = Rig::new(T0, Some(stored));

        // Exactly at the tolerance: same clock second, so no advance and no reset.
        assert!(!rig.meters.tick());
        assert_eq!(rig.meters.previous_hour_rain_mm(), 4.0);
    }

    #[test]
    fn test_clock_jumping_backwards_resets() {
        let mut stored = stored_at(T0 + 3_600);
        stored.previous_hour_rain_mm = 4.0;

        let mut rig = Rig::new(T0, Some(stored));
        assert!(rig.meters.tick());
        assert_eq!(rig.meters.previous_hour_rain_mm(), 0.0);
    }

    #[test]
    fn test_rain_lands_in_minute_it_fell() {
        // 10:15:58
        let start = T0 + 58;
        let mut rig = Rig::new(start, Some(stored_at(start)));

        rig.capture.on_rain_edge(rig.millis.get() + 100);
        rig.capture.on_rain_edge(rig.millis.get() + 200);
        assert!(rig.second()); // 10:15:59

        rig.capture.on_rain_edge(rig.millis.get() + 900);
        assert!(rig.second()); // 10:16:00, drains the tip from minute 15

        let state = rig.meters.state();
        assert!((state.rain_per_minute[15] - 3.0 * 0.2794).abs() < 1e-5);
        assert_eq!(state.rain_per_minute[16], 0.0);
        assert!((rig.meters.hourly_rain_mm() - 3.0 * 0.2794).abs() < 1e-5);
    }

    #[test]
    fn test_minute_boundary_zeroes_stale_slot() {
        // Rain from an hour ago is still sitting in minute 16's slot.
        let start = T0 + 59;
        let mut stored = stored_at(start);
        stored.record_rain(16, 1.0);

        let mut rig = Rig::new(start, Some(stored));
        assert!(rig.second()); // 10:16:00

        assert_eq!(rig.meters.state().rain_per_minute[16], 0.0);
    }

    #[test]
    fn test_minute_boundary_opens_new_gust_bucket() {
        let start = T0 + 58;
        let mut stored = stored_at(start);
        stored.gusts.set_current(WindReading::new(9.0, WindDirection::from_adc(500)));

        let mut rig = Rig::new(start, Some(stored));
        assert!(rig.second());
        assert_eq!(rig.meters.state().gusts.cursor().index(), 0);

        assert!(rig.second()); // new minute
        let state = rig.meters.state();
        assert_eq!(state.gusts.cursor().index(), 1);
        assert_eq!(*state.gusts.current(), WindReading::ZERO);
        assert_eq!(rig.meters.largest_recent_gust().speed_kmh, 9.0);
    }

    #[test]
    fn test_gusts_track_strongest_reading() {
        let mut rig = Rig::new(T0, Some(stored_at(T0)));

        for (i, ticks) in [2u64, 10, 4].iter().enumerate() {
            let base = rig.millis.get();
            for t in 0..*ticks {
                rig.capture.on_wind_edge(base + 1 + t * 50);
            }
            assert!(rig.second(), "tick {}", i);
        }

        let strongest = 10.0 * 2.4;
        assert!((rig.meters.hourly_gust().speed_kmh - strongest).abs() < 1e-3);
        assert!((rig.meters.largest_recent_gust().speed_kmh - strongest).abs() < 1e-3);
        assert!((rig.meters.current_wind().speed_kmh - 4.0 * 2.4).abs() < 1e-3);
    }

    #[test]
    fn test_hour_rollover_snapshots_rain() {
        // 10:59:58
        let start = T0 + 44 * 60 + 58;
        let mut stored = stored_at(start);
        for minute in 0..31 {
            stored.record_rain(minute, 0.4);
        }
        stored.hourly_gust = WindReading::new(40.0, WindDirection::from_adc(500));

        let mut rig = Rig::new(start, Some(stored));
        assert!(rig.second()); // 10:59:59
        assert!((rig.meters.hourly_rain_mm() - 12.4).abs() < 1e-4);

        assert!(rig.second()); // 11:00:00
        let state = rig.meters.state();
        assert!((state.previous_hour_rain_mm - 12.4).abs() < 1e-4);
        assert!(state.rain_per_minute.iter().all(|&mm| mm == 0.0));
        assert_eq!(state.hourly_gust, WindReading::ZERO);
        assert_eq!(rig.meters.hourly_rain_mm(), 0.0);
    }

    #[test]
    fn test_day_rollover_is_an_hour_rollover() {
        // 23:59:59 the day before T0
        let start = T0 - 10 * 3600 - 15 * 60 - 1;
        let mut stored = stored_at(start);
        stored.record_rain(59, 2.0);

        let mut rig = Rig::new(start, Some(stored));
        assert!(rig.second());
        assert_eq!(rig.meters.previous_hour_rain_mm(), 2.0);
    }

    #[test]
    fn test_two_minute_window_wraps() {
        let mut rig = Rig::new(T0, Some(stored_at(T0)));

        rig.seconds(121);

        let state = rig.meters.state();
        assert_eq!(state.wind_samples.cursor().index(), 1);
        assert_eq!(filled_slots(state), 120);
    }

    #[test]
    fn test_two_minute_average_of_live_samples() {
        let mut rig = Rig::new(T0, Some(stored_at(T0)));

        rig.hardware.adc.set(900); // 0°
        rig.seconds(2);
        rig.hardware.adc.set(650); // 23°
        rig.seconds(1);

        let avg = rig.meters.two_minute_average().unwrap();
        // Unwrapped 0, 0, 23 -> 7
        assert_eq!(avg.direction.angle, Some(Angle::new(7)));
        assert_eq!(avg.speed_kmh, 0.0);
    }

    #[test]
    fn test_state_saved_on_cadence() {
        let mut rig = Rig::new(T0, Some(stored_at(T0)));

        rig.seconds(9);
        rig.millis.advance(999);
        rig.clock.advance_secs(1);
        assert!(rig.meters.tick());
        assert_eq!(rig.meters.last_save_ms, 60_000);

        assert!(rig.second());
        assert_eq!(rig.meters.last_save_ms, 70_999);
        let saved = *rig.meters.state();

        let mut store = rig.meters.into_store();
        assert_eq!(store.try_load(), Ok(saved));
    }

    #[test]
    fn test_failed_save_is_retried_next_tick() {
        let mut flash = MemFlash::erased(4096);
        flash.fail_writes(true);
        let store = StateStore::new(flash, 0);

        let clock = ManualClock::at(T0);
        let millis = ManualMillis::at(0);
        let capture: &'static EventCapture = Box::leak(Box::new(EventCapture::new()));
        let mut meters = WeatherMeters::new(
            MetersConfig::default().with_save_interval_ms(2_000),
            FakeHardware::with_adc(600),
            clock.clone(),
            millis.clone(),
            store,
            capture,
        );

        for _ in 0..3 {
            clock.advance_secs(1);
            millis.advance(1_000);
            assert!(meters.tick());
        }
        assert_eq!(meters.last_save_ms, 0);
    }

    #[test]
    fn test_restart_resumes_windows() {
        let mut rig = Rig::new(T0, Some(stored_at(T0)));
        rig.seconds(15);
        assert_eq!(rig.meters.flush(), Ok(()));

        let before = *rig.meters.state();
        let flash = rig.meters.into_store().release();

        let clock = ManualClock::at(T0 + 20);
        let capture: &'static EventCapture = Box::leak(Box::new(EventCapture::new()));
        let mut meters = WeatherMeters::new(
            MetersConfig::default(),
            FakeHardware::with_adc(600),
            clock,
            ManualMillis::at(0),
            StateStore::new(flash, 0),
            capture,
        );
        assert_eq!(*meters.state(), before);

        assert!(meters.tick());
        assert_eq!(filled_slots(meters.state()), 16);
    }

    #[test]
    fn test_setup_is_idempotent() {
        let hardware = FakeHardware::with_adc(600);
        let mut meters = WeatherMeters::new(
            MetersConfig::default(),
            hardware.clone(),
            ManualClock::at(T0),
            ManualMillis::at(0),
            StateStore::new(MemFlash::erased(4096), 0),
            &SHARED_CAPTURE,
        );

        assert_eq!(meters.setup(), Ok(()));
        assert_eq!(meters.setup(), Ok(()));
        assert!(meters.is_attached());
        assert_eq!(hardware.attach_calls.get(), 1);
    }

    #[test]
    fn test_setup_failure_is_reported() {
        let mut hardware = FakeHardware::with_adc(600);
        hardware.fail_attach = true;
        let mut meters = WeatherMeters::new(
            MetersConfig::default(),
            hardware,
            ManualClock::at(T0),
            ManualMillis::at(0),
            StateStore::new(MemFlash::erased(4096), 0),
            &SHARED_CAPTURE,
        );

        assert_eq!(
            meters.setup(),
            Err(SetupError::Attach { line: "wind speed" })
        );
        assert!(!meters.is_attached());
    }
}
