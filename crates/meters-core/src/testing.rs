//! Host fakes for the engine's collaborators.

use std::cell::Cell;
use std::rc::Rc;

use embedded_storage::{ReadStorage, Storage};

use crate::capture::EventCapture;
use crate::clock::{ClockTime, MonotonicClock, WallClock};
use crate::hardware::{MeterHardware, SetupError};

/// Capture shared by every test that installs into the global dispatcher.
pub static SHARED_CAPTURE: EventCapture = EventCapture::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemFlashError {
    OutOfBounds,
    Injected,
}

/// RAM-backed flash region.
#[derive(Debug, Clone)]
pub struct MemFlash {
    bytes: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemFlash {
    pub fn erased(capacity: usize) -> Self {
        Self {
            bytes: vec![0xFF; capacity],
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, MemFlashError> {
        let start = offset as usize;
        let end = start + len;
        if end > self.bytes.len() {
            return Err(MemFlashError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl ReadStorage for MemFlash {
    type Error = MemFlashError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_reads {
            return Err(MemFlashError::Injected);
        }
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for MemFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MemFlashError::Injected);
        }
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }
}

/// Wall clock whose handle stays with the test after the engine takes a clone.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    unix: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn at(unix: u32) -> Self {
        Self {
            unix: Rc::new(Cell::new(unix)),
        }
    }

    pub fn set(&self, unix: u32) {
        self.unix.set(unix);
    }

    pub fn advance_secs(&self, secs: u32) {
        self.unix.set(self.unix.get() + secs);
    }

    pub fn unix(&self) -> u32 {
        self.unix.get()
    }
}

impl WallClock for ManualClock {
    fn now(&mut self) -> ClockTime {
        ClockTime::from_unix(self.unix.get())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManualMillis {
    ms: Rc<Cell<u64>>,
}

impl ManualMillis {
    pub fn at(ms: u64) -> Self {
        Self {
            ms: Rc::new(Cell::new(ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.ms.set(self.ms.get() + ms);
    }

    pub fn get(&self) -> u64 {
        self.ms.get()
    }
}

impl MonotonicClock for ManualMillis {
    fn now_ms(&self) -> u64 {
        self.ms.get()
    }
}

/// Board stand-in with a settable vane sample.
#[derive(Debug, Clone, Default)]
pub struct FakeHardware {
    pub adc: Rc<Cell<i16>>,
    pub attach_calls: Rc<Cell<u32>>,
    pub fail_attach: bool,
}

impl FakeHardware {
    pub fn with_adc(adc: i16) -> Self {
        let hardware = Self::default();
        hardware.adc.set(adc);
        hardware
    }
}

impl MeterHardware for FakeHardware {
    fn attach_edges(&mut self) -> Result<(), SetupError> {
        self.attach_calls.set(self.attach_calls.get() + 1);
        if self.fail_attach {
            return Err(SetupError::Attach { line: "wind speed" });
        }
        Ok(())
    }

    fn read_direction_adc(&mut self) -> i16 {
        self.adc.get()
    }
}
