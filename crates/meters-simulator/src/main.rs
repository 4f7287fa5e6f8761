//! Desktop simulator for the weather-meters station module.
//!
//! Drives the meters-core engine with a synthetic anemometer, wind vane and
//! rain gauge so the aggregation can be watched without hardware. Edges are
//! delivered through the same interrupt entry points the firmware uses, the
//! state record lives in a file under the temp directory and a JSON report is
//! printed every few seconds.
//!
//! Set `RUST_LOG=debug` to see minute rollovers and state writes.

use std::cell::Cell;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use embedded_hal::delay::DelayNs;
use embedded_storage::{ReadStorage, Storage};
use log::{info, warn};

use meters_core::capture::{self, CAPTURE_CELL};
use meters_core::storage::RECORD_SIZE;
use meters_core::wind::direction::VANE_TABLE;
use meters_core::wind::shortest_delta;
use meters_core::{
    Angle, ClockTime, EventCapture, MeterHardware, MetersConfig, MonotonicClock, SetupError,
    StateStore, Station, WallClock, WeatherMeters, WeatherReport,
};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Interval between printed reports.
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// File name of the persisted state record.
const STATE_FILE: &str = "weather-meters-state.bin";

/// Average time between bucket tips while a shower is passing.
const SHOWER_TIP_INTERVAL_SECS: f64 = 6.0;

// ---------------------------------------------------------------------------
// Host clock
// ---------------------------------------------------------------------------

/// System time as the wall clock, a process-local `Instant` as the millisecond
/// counter.
#[derive(Clone)]
struct SystemClock {
    started: Instant,
}

impl SystemClock {
    fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl WallClock for SystemClock {
    fn now(&mut self) -> ClockTime {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        ClockTime::from_unix(u32::try_from(unix).unwrap_or(u32::MAX))
    }
}

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

// ---------------------------------------------------------------------------
// File-backed flash
// ---------------------------------------------------------------------------

/// Flash region emulated by a file. A missing file reads as erased flash.
struct FileFlash {
    path: PathBuf,
    capacity: usize,
}

impl FileFlash {
    fn new(path: PathBuf, capacity: usize) -> Self {
        Self { path, capacity }
    }

    fn contents(&self) -> io::Result<Vec<u8>> {
        let mut bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        bytes.resize(self.capacity, 0xFF);
        Ok(bytes)
    }

    fn range(&self, offset: u32, len: usize) -> io::Result<core::ops::Range<usize>> {
        let start = offset as usize;
        let end = start + len;
        if end > self.capacity {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}..{} outside {} byte region", start, end, self.capacity),
            ));
        }
        Ok(start..end)
    }
}

impl ReadStorage for FileFlash {
    type Error = io::Error;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        let contents = self.contents()?;
        bytes.copy_from_slice(&contents[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Storage for FileFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        let mut contents = self.contents()?;
        contents[range].copy_from_slice(bytes);

        // Write-then-rename keeps the previous record if the write fails.
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, &contents)?;
        fs::rename(&staging, &self.path)
    }
}

// ---------------------------------------------------------------------------
// Mock weather
// ---------------------------------------------------------------------------

/// Generates wind and rain that vary over time and feeds them to the
/// interrupt entry points.
struct MockWeather {
    vane_adc: Rc<Cell<i16>>,
    last_ms: u64,
    /// Fractional anemometer revolutions not yet delivered as edges.
    wind_phase: f64,
    /// Seconds since the last bucket tip.
    since_tip: f64,
    rain_line_high: bool,
}

impl MockWeather {
    fn new(vane_adc: Rc<Cell<i16>>) -> Self {
        Self {
            vane_adc,
            last_ms: 0,
            wind_phase: 0.0,
            since_tip: 0.0,
            rain_line_high: false,
        }
    }

    /// Advances the weather to `now_ms`, firing any edges that fell due.
    fn advance(&mut self, now_ms: u64, config: &MetersConfig) {
        let dt = now_ms.saturating_sub(self.last_ms) as f64 / 1000.0;
        self.last_ms = now_ms;
        let t = now_ms as f64 / 1000.0;

        // Wind: 5–25 km/h with gusty ripple, direction swinging around west.
        let speed_kmh = (15.0 + 8.0 * (t / 90.0).sin() + 3.0 * (t / 7.0).cos()).max(0.0);
        let heading = 270.0 + 60.0 * (t / 150.0).sin() + 15.0 * (t / 11.0).cos();
        self.vane_adc.set(vane_code(Angle::new(heading as i32)));

        self.wind_phase += speed_kmh / f64::from(config.wind_kmh_per_hz) * dt;
        if self.wind_phase >= 1.0 {
            self.wind_phase -= 1.0;
            capture::isr_wind_edge(now_ms);
        }

        // Rain: a shower during the first third of every 10 minutes.
        let raining = t % 600.0 < 200.0;
        if self.rain_line_high {
            self.rain_line_high = false;
            capture::isr_rain_level(now_ms, false);
        } else if raining {
            self.since_tip += dt;
            if self.since_tip >= SHOWER_TIP_INTERVAL_SECS {
                self.since_tip = 0.0;
                self.rain_line_high = true;
                capture::isr_rain_level(now_ms, true);
            }
        }
    }
}

/// ADC code in the middle of the vane band closest to `heading`.
fn vane_code(heading: Angle) -> i16 {
    let mut lower = 0;
    let mut best = (i32::MAX, 0);
    for &(upper, degrees) in VANE_TABLE.iter() {
        let distance = shortest_delta(heading.degrees() as i32, degrees as i32).abs();
        if distance < best.0 {
            best = (distance, (lower + upper) / 2);
        }
        lower = upper;
    }
    best.1 as i16
}

// ---------------------------------------------------------------------------
// Simulated hardware
// ---------------------------------------------------------------------------

struct SimHardware {
    vane_adc: Rc<Cell<i16>>,
}

impl MeterHardware for SimHardware {
    fn attach_edges(&mut self) -> Result<(), SetupError> {
        // Edges come from MockWeather through the capture entry points.
        Ok(())
    }

    fn read_direction_adc(&mut self) -> i16 {
        self.vane_adc.get()
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let config = MetersConfig::default();
    let path = std::env::temp_dir().join(STATE_FILE);

    info!("Starting weather-meters simulator");
    info!("State record: {}", path.display());

    let clock = SystemClock::new();
    let vane_adc = Rc::new(Cell::new(0));
    let mut weather = MockWeather::new(Rc::clone(&vane_adc));

    let capture: &'static EventCapture = CAPTURE_CELL.init(EventCapture::new());
    let meters = WeatherMeters::new(
        config,
        SimHardware { vane_adc },
        clock.clone(),
        clock.clone(),
        StateStore::new(FileFlash::new(path, RECORD_SIZE), 0),
        capture,
    );

    let mut last_report = Instant::now();
    let mut station = Station::with_poll(meters, ThreadDelay, move |meters: &WeatherMeters<_, _, _, _>| {
        if last_report.elapsed() < REPORT_INTERVAL {
            return;
        }
        last_report = Instant::now();

        match serde_json::to_string(&WeatherReport::collect(meters)) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to encode report: {}", e),
        }
    });

    if let Err(e) = station.setup() {
        warn!("Setup failed: {}", e);
        return;
    }

    loop {
        weather.advance(clock.now_ms(), &config);
        station.step();
    }
}
