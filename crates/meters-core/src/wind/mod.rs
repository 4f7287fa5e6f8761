//! Wind reading value types.
//!
//! A [`WindReading`] pairs a speed with a [`WindDirection`]. Directions are
//! optional at the type level: a vane sample outside the calibration table, an
//! unfilled window slot and a zeroed gust bucket all carry no angle. The `-1`
//! sentinel the stored record uses for "no direction" only exists inside
//! [`crate::storage::record`].

mod average;
pub mod direction;

pub use average::{shortest_delta, two_minute_average};
pub use direction::angle_from_adc;

use core::fmt::Display;

/// Compass angle in whole degrees, always in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Angle(u16);

impl Angle {
    pub const NORTH: Angle = Angle(0);

    /// Creates an angle, wrapping any value onto the compass circle.
    pub const fn new(degrees: i32) -> Self {
        Self(degrees.rem_euclid(360) as u16)
    }

    /// Creates an angle only if `degrees` is already in `[0, 360)`.
    pub const fn checked(degrees: i32) -> Option<Self> {
        if degrees >= 0 && degrees < 360 {
            Some(Self(degrees as u16))
        } else {
            None
        }
    }

    pub const fn degrees(self) -> u16 {
        self.0
    }
}

impl Display for Angle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Direction the wind is blowing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindDirection {
    /// ADC code the direction was decoded from (informational only).
    ///
    /// `None` for computed directions such as window averages.
    pub raw: Option<i16>,
    /// Decoded compass angle, `None` when there was no usable signal.
    pub angle: Option<Angle>,
}

impl WindDirection {
    pub const UNDEFINED: WindDirection = WindDirection {
        raw: None,
        angle: None,
    };

    /// Decodes a vane sample through the calibration table.
    pub fn from_adc(raw: i16) -> Self {
        Self {
            raw: Some(raw),
            angle: angle_from_adc(raw as i32),
        }
    }

    /// Direction derived from several samples rather than a single ADC code.
    pub const fn averaged(angle: Angle) -> Self {
        Self {
            raw: None,
            angle: Some(angle),
        }
    }

    pub const fn is_defined(&self) -> bool {
        self.angle.is_some()
    }
}

/// A single wind observation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindReading {
    /// Speed in km/h, never negative.
    pub speed_kmh: f32,
    pub direction: WindDirection,
}

impl WindReading {
    /// Calm reading with no direction; the value of every unfilled slot.
    pub const ZERO: WindReading = WindReading {
        speed_kmh: 0.0,
        direction: WindDirection::UNDEFINED,
    };

    pub const fn new(speed_kmh: f32, direction: WindDirection) -> Self {
        Self {
            speed_kmh,
            direction,
        }
    }

    /// Gust ordering: strictly faster wins, ties are never stronger.
    pub fn is_stronger_than(&self, other: &WindReading) -> bool {
        self.speed_kmh > other.speed_kmh
    }

    /// Whether this slot holds a real sample (its direction is defined).
    pub const fn is_filled(&self) -> bool {
        self.direction.is_defined()
    }
}

impl Display for WindReading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.direction.angle {
            Some(angle) => write!(f, "{:.1} km/h @ {}", self.speed_kmh, angle),
            None => write!(f, "{:.1} km/h @ --", self.speed_kmh),
        }
    }
}
