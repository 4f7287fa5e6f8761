//! Durable home of the rolling wind and rain windows.
//!
//! - [`ring`]: fixed-capacity buffers with a wrapping cursor
//! - [`state`]: the [`PersistedWeatherState`] aggregate
//! - [`record`]: its fixed little-endian flash layout
//! - [`store`]: load/save against an `embedded-storage` region

pub mod record;
pub mod ring;
pub mod state;
pub mod store;

pub use record::{RECORD_MAGIC, RECORD_SIZE, RECORD_VERSION};
pub use ring::{Cursor, CursorRing};
pub use state::{GUST_BUCKETS, MINUTES_PER_HOUR, PersistedWeatherState, TWO_MINUTE_SLOTS};
pub use store::StateStore;

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to read state record from flash")]
    Read,
    #[error("Failed to write state record to flash")]
    Write,
    #[error("Bad record magic: {found:#010x}")]
    BadMagic { found: u32 },
    #[error("Unsupported record version: {found}")]
    UnsupportedVersion { found: u16 },
    #[error("Record length mismatch (expected {expected}, found {found})")]
    LengthMismatch { expected: u16, found: u16 },
    #[error("Flash region too small (need {required} bytes, have {capacity})")]
    CapacityTooSmall { required: usize, capacity: usize },
}
