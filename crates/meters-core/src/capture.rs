//! Debounced edge capture for the anemometer and rain gauge.
//!
//! Edge notifications arrive in interrupt context and carry no user data, so
//! they are routed through a single process-wide handle: firmware obtains a
//! `&'static EventCapture` (typically from [`CAPTURE_CELL`]), hands it to
//! [`crate::WeatherMeters`], and `setup()` installs it with [`install`]. The
//! interrupt handlers then call [`isr_wind_edge`] / [`isr_rain_level`].
//!
//! Only one capture may be installed for the lifetime of the program.
//!
//! All counters sit behind a critical section that is held for the duration of
//! a single read-modify-write. Nothing in this module blocks, logs or performs
//! I/O, so it is safe to call from an interrupt handler.

use core::cell::Cell;

use critical_section::Mutex;
use static_cell::StaticCell;

use crate::config::DEBOUNCE_MS;
use crate::hardware::SetupError;

/// Backing storage for the program's single [`EventCapture`].
///
/// ```rust,ignore
/// let capture: &'static EventCapture = CAPTURE_CELL.init(EventCapture::new());
/// ```
pub static CAPTURE_CELL: StaticCell<EventCapture> = StaticCell::new();

static ACTIVE: Mutex<Cell<Option<&'static EventCapture>>> = Mutex::new(Cell::new(None));

/// Transient counters shared between the edge path and the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventCounters {
    /// Anemometer closures accepted since the aggregator last drained them.
    pub wind_tick_count: u32,
    /// Uptime of the last accepted anemometer edge.
    pub last_wind_tick_at: Option<u64>,
    /// Uptime of the last accepted rain gauge tip.
    pub last_rain_tick_at: Option<u64>,
    /// Rain gauge tips accepted since the aggregator last drained them.
    pub pending_rain_tips: u32,
}

pub struct EventCapture {
    counters: Mutex<Cell<EventCounters>>,
    debounce_ms: Mutex<Cell<u32>>,
}

impl EventCapture {
    pub const fn new() -> Self {
        Self::with_debounce_ms(DEBOUNCE_MS)
    }

    pub const fn with_debounce_ms(debounce_ms: u32) -> Self {
        Self {
            counters: Mutex::new(Cell::new(EventCounters {
                wind_tick_count: 0,
                last_wind_tick_at: None,
                last_rain_tick_at: None,
                pending_rain_tips: 0,
            })),
            debounce_ms: Mutex::new(Cell::new(debounce_ms)),
        }
    }

    pub fn set_debounce_ms(&self, debounce_ms: u32) {
        critical_section::with(|cs| self.debounce_ms.borrow(cs).set(debounce_ms));
    }

    /// Anemometer closure. Returns whether the edge was counted.
    pub fn on_wind_edge(&self, now_ms: u64) -> bool {
        critical_section::with(|cs| {
            let debounce_ms = self.debounce_ms.borrow(cs).get();
            let cell = self.counters.borrow(cs);
            let mut counters = cell.get();

            if !debounced(counters.last_wind_tick_at, now_ms, debounce_ms) {
                return false;
            }

            counters.wind_tick_count = counters.wind_tick_count.wrapping_add(1);
            counters.last_wind_tick_at = Some(now_ms);
            cell.set(counters);
            true
        })
    }

    /// Rain gauge bucket tip. Returns whether the tip was counted.
    pub fn on_rain_edge(&self, now_ms: u64) -> bool {
        critical_section::with(|cs| {
            let debounce_ms = self.debounce_ms.borrow(cs).get();
            let cell = self.counters.borrow(cs);
            let mut counters = cell.get();

            if !debounced(counters.last_rain_tick_at, now_ms, debounce_ms) {
                return false;
            }

            counters.pending_rain_tips = counters.pending_rain_tips.wrapping_add(1);
            counters.last_rain_tick_at = Some(now_ms);
            cell.set(counters);
            true
        })
    }

    /// Rain line watched on both edges: only the rising level is a tip.
    pub fn on_rain_level(&self, now_ms: u64, high: bool) -> bool {
        high && self.on_rain_edge(now_ms)
    }

    /// Reads and resets the anemometer count.
    pub fn take_wind_ticks(&self) -> u32 {
        critical_section::with(|cs| {
            let cell = self.counters.borrow(cs);
            let mut counters = cell.get();
            let ticks = counters.wind_tick_count;
            counters.wind_tick_count = 0;
            cell.set(counters);
            ticks
        })
    }

    /// Reads and resets the pending rain tips.
    pub fn take_rain_tips(&self) -> u32 {
        critical_section::with(|cs| {
            let cell = self.counters.borrow(cs);
            let mut counters = cell.get();
            let tips = counters.pending_rain_tips;
            counters.pending_rain_tips = 0;
            cell.set(counters);
            tips
        })
    }

    pub fn counters(&self) -> EventCounters {
        critical_section::with(|cs| self.counters.borrow(cs).get())
    }
}

impl Default for EventCapture {
    fn default() -> Self {
        Self::new()
    }
}

fn debounced(last_accepted: Option<u64>, now_ms: u64, debounce_ms: u32) -> bool {
    match last_accepted {
        Some(last) => now_ms.wrapping_sub(last) >= debounce_ms as u64,
        None => true,
    }
}

/// Registers `capture` as the target of the interrupt entry points.
///
/// Installing the same instance again is a no-op.
pub fn install(capture: &'static EventCapture) -> Result<(), SetupError> {
    critical_section::with(|cs| {
        let active = ACTIVE.borrow(cs);
        match active.get() {
            Some(current) if core::ptr::eq(current, capture) => Ok(()),
            Some(_) => Err(SetupError::AlreadyInstalled),
            None => {
                active.set(Some(capture));
                Ok(())
            }
        }
    })
}

/// The installed capture, if any.
pub fn installed() -> Option<&'static EventCapture> {
    critical_section::with(|cs| ACTIVE.borrow(cs).get())
}

/// Anemometer falling-edge handler. Edges before [`install`] are dropped.
pub fn isr_wind_edge(now_ms: u64) {
    if let Some(capture) = installed() {
        capture.on_wind_edge(now_ms);
    }
}

/// Rain gauge falling-edge handler.
pub fn isr_rain_edge(now_ms: u64) {
    if let Some(capture) = installed() {
        capture.on_rain_edge(now_ms);
    }
}

/// Rain gauge change handler; `high` is the line level after the change.
pub fn isr_rain_level(now_ms: u64, high: bool) {
    if let Some(capture) = installed() {
        capture.on_rain_level(now_ms, high);
    }
}
