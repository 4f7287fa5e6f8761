//! Wind vane ADC decoding.
//!
//! The vane is a resistor ladder: each of its 16 reed-switch positions puts a
//! different divider voltage on the analog pin. The table below lists the upper
//! bound (exclusive) of every ADC band in ascending order together with the
//! compass angle it represents. Lookup is first-match-wins.

use super::Angle;

/// Number of distinct vane positions.
pub const VANE_POSITIONS: usize = 16;

/// `(upper bound exclusive, angle)` pairs, ascending by bound.
pub const VANE_TABLE: [(i32, u16); VANE_POSITIONS] = [
    (380, 113),
    (393, 68),
    (414, 90),
    (456, 158),
    (508, 135),
    (551, 203),
    (615, 180),
    (680, 23),
    (746, 45),
    (801, 248),
    (833, 225),
    (878, 338),
    (913, 0),
    (940, 293),
    (967, 315),
    (990, 270),
];

/// Maps a vane sample to a compass angle.
///
/// Samples at or above the last band (open circuit, disconnected vane) have no
/// direction.
pub fn angle_from_adc(raw: i32) -> Option<Angle> {
    VANE_TABLE
        .iter()
        .find(|(upper, _)| raw < *upper)
        .map(|&(_, degrees)| Angle::new(degrees as i32))
}
