use embedded_storage::{ReadStorage, Storage};
use log::{debug, error, info, warn};

use super::StoreError;
use super::record::{self, RECORD_SIZE};
use super::state::PersistedWeatherState;

/// Reads and writes the state record at a fixed offset of a flash region.
///
/// The driver is assumed to fail atomically: after a failed write the previous
/// record is still what `load` sees.
pub struct StateStore<F>
where
    F: Storage,
    F::Error: core::fmt::Debug,
{
    flash: F,
    offset: u32,
}

impl<F> StateStore<F>
where
    F: Storage,
    F::Error: core::fmt::Debug,
{
    pub fn new(flash: F, offset: u32) -> Self {
        Self { flash, offset }
    }

    /// Boot-time restore. Falls back to the zero state when nothing usable is
    /// stored (first boot, erased flash, older layout, read failure).
    pub fn load(&mut self) -> PersistedWeatherState {
        match self.try_load() {
            Ok(state) => {
                info!(" Restored weather state: {}", state);
                state
            }
            Err(e) => {
                warn!(" No usable weather state ({}), starting from zero", e);
                PersistedWeatherState::new()
            }
        }
    }

    pub fn try_load(&mut self) -> Result<PersistedWeatherState, StoreError> {
        self.check_capacity()?;

        let mut bytes = [0u8; RECORD_SIZE];
        self.flash.read(self.offset, &mut bytes).map_err(|e| {
            error!(" Failed to read weather state: {:?}", e);
            StoreError::Read
        })?;

        record::decode(&bytes)
    }

    /// Writes the whole record in one call.
    pub fn save(&mut self, state: &PersistedWeatherState) -> Result<(), StoreError> {
        self.check_capacity()?;

        let bytes = record::encode(state);
        self.flash.write(self.offset, &bytes).map_err(|e| {
            error!(" Failed to write weather state: {:?}", e);
            StoreError::Write
        })?;

        debug!(" Wrote {} byte weather state at offset {}", RECORD_SIZE, self.offset);
        Ok(())
    }

    /// Gives the flash driver back.
    pub fn release(self) -> F {
        self.flash
    }

    fn check_capacity(&self) -> Result<(), StoreError> {
        let required = self.offset as usize + RECORD_SIZE;
        let capacity = self.flash.capacity();
        if required > capacity {
            return Err(StoreError::CapacityTooSmall { required, capacity });
        }
        Ok(())
    }
}
