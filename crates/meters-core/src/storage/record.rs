//! Fixed flash layout of [`PersistedWeatherState`].
//!
//! Size: 1308 bytes
//!
//! Binary format (little-endian):
//! - magic: 4 bytes (u32, `"WMS1"`)
//! - version: 2 bytes (u16)
//! - length: 2 bytes (u16, bytes following the header)
//! - last_event_timestamp: 4 bytes (u32)
//! - rain_per_minute: 240 bytes (60 × f32)
//! - previous_hour_rain_mm: 4 bytes (f32)
//! - two_minute_cursor: 2 bytes (u16)
//! - ten_minute_cursor: 2 bytes (u16)
//! - wind_samples: 960 bytes (120 × reading)
//! - gusts: 80 bytes (10 × reading)
//! - hourly_gust: 8 bytes (reading)
//!
//! A reading is `speed: f32, raw: i16, angle: i16`, where `-1` in `raw` or
//! `angle` means "absent". This is the only place that sentinel exists.

use super::StoreError;
use super::ring::{Cursor, CursorRing};
use super::state::{GUST_BUCKETS, MINUTES_PER_HOUR, PersistedWeatherState, TWO_MINUTE_SLOTS};
use crate::wind::{Angle, WindDirection, WindReading};

pub const RECORD_MAGIC: u32 = u32::from_le_bytes(*b"WMS1");
pub const RECORD_VERSION: u16 = 1;

const HEADER_SIZE: usize = 8;
const READING_SIZE: usize = 8;
const ABSENT: i16 = -1;

const PAYLOAD_SIZE: usize = 4
    + MINUTES_PER_HOUR * 4
    + 4
    + 2
    + 2
    + TWO_MINUTE_SLOTS * READING_SIZE
    + GUST_BUCKETS * READING_SIZE
    + READING_SIZE;

/// Total size of an encoded record.
pub const RECORD_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE;

/// Serialises the state. Encoding is deterministic: equal states give equal bytes.
pub fn encode(state: &PersistedWeatherState) -> [u8; RECORD_SIZE] {
    let mut bytes = [0u8; RECORD_SIZE];
    let mut offset = 0;

    put(&mut bytes, &mut offset, &RECORD_MAGIC.to_le_bytes());
    put(&mut bytes, &mut offset, &RECORD_VERSION.to_le_bytes());
    put(&mut bytes, &mut offset, &(PAYLOAD_SIZE as u16).to_le_bytes());

    put(&mut bytes, &mut offset, &state.last_event_timestamp.to_le_bytes());
    for mm in &state.rain_per_minute {
        put(&mut bytes, &mut offset, &mm.to_le_bytes());
    }
    put(&mut bytes, &mut offset, &state.previous_hour_rain_mm.to_le_bytes());

    let two_minute_cursor = state.wind_samples.cursor().index() as u16;
    let ten_minute_cursor = state.gusts.cursor().index() as u16;
    put(&mut bytes, &mut offset, &two_minute_cursor.to_le_bytes());
    put(&mut bytes, &mut offset, &ten_minute_cursor.to_le_bytes());

    for reading in &state.wind_samples {
        put_reading(&mut bytes, &mut offset, reading);
    }
    for reading in &state.gusts {
        put_reading(&mut bytes, &mut offset, reading);
    }
    put_reading(&mut bytes, &mut offset, &state.hourly_gust);

    debug_assert_eq!(offset, RECORD_SIZE);
    bytes
}

/// Parses a record, validating its header.
pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Result<PersistedWeatherState, StoreError> {
    let mut offset = 0;

    let magic = u32::from_le_bytes(take(bytes, &mut offset));
    if magic != RECORD_MAGIC {
        return Err(StoreError::BadMagic { found: magic });
    }

    let version = u16::from_le_bytes(take(bytes, &mut offset));
    if version != RECORD_VERSION {
        return Err(StoreError::UnsupportedVersion { found: version });
    }

    let length = u16::from_le_bytes(take(bytes, &mut offset));
    if length as usize != PAYLOAD_SIZE {
        return Err(StoreError::LengthMismatch {
            expected: PAYLOAD_SIZE as u16,
            found: length,
        });
    }

    let last_event_timestamp = u32::from_le_bytes(take(bytes, &mut offset));

    let mut rain_per_minute = [0.0f32; MINUTES_PER_HOUR];
    for mm in rain_per_minute.iter_mut() {
        *mm = f32::from_le_bytes(take(bytes, &mut offset));
    }
    let previous_hour_rain_mm = f32::from_le_bytes(take(bytes, &mut offset));

    let two_minute_cursor = u16::from_le_bytes(take(bytes, &mut offset));
    let ten_minute_cursor = u16::from_le_bytes(take(bytes, &mut offset));

    let mut wind_samples = [WindReading::ZERO; TWO_MINUTE_SLOTS];
    for reading in wind_samples.iter_mut() {
        *reading = take_reading(bytes, &mut offset);
    }

    let mut gusts = [WindReading::ZERO; GUST_BUCKETS];
    for reading in gusts.iter_mut() {
        *reading = take_reading(bytes, &mut offset);
    }

    let hourly_gust = take_reading(bytes, &mut offset);

    Ok(PersistedWeatherState {
        last_event_timestamp,
        rain_per_minute,
        previous_hour_rain_mm,
        wind_samples: CursorRing::from_parts(
            wind_samples,
            Cursor::new(two_minute_cursor as usize),
        ),
        gusts: CursorRing::from_parts(gusts, Cursor::new(ten_minute_cursor as usize)),
        hourly_gust,
    })
}

fn put(bytes: &mut [u8], offset: &mut usize, data: &[u8]) {
    bytes[*offset..*offset + data.len()].copy_from_slice(data);
    *offset += data.len();
}

fn take<const N: usize>(bytes: &[u8], offset: &mut usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[*offset..*offset + N]);
    *offset += N;
    out
}

fn put_reading(bytes: &mut [u8], offset: &mut usize, reading: &WindReading) {
    let raw = reading.direction.raw.unwrap_or(ABSENT);
    let angle = reading
        .direction
        .angle
        .map_or(ABSENT, |angle| angle.degrees() as i16);

    put(bytes, offset, &reading.speed_kmh.to_le_bytes());
    put(bytes, offset, &raw.to_le_bytes());
    put(bytes, offset, &angle.to_le_bytes());
}

fn take_reading(bytes: &[u8], offset: &mut usize) -> WindReading {
    let speed_kmh = f32::from_le_bytes(take(bytes, offset));
    let raw = i16::from_le_bytes(take(bytes, offset));
    let angle = i16::from_le_bytes(take(bytes, offset));

    WindReading {
        speed_kmh,
        direction: WindDirection {
            raw: (raw >= 0).then_some(raw),
            angle: Angle::checked(angle as i32),
        },
    }
}
