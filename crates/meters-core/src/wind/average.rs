//! Circular averaging of wind directions.
//!
//! Angles cannot be averaged arithmetically: 350° and 10° would average to
//! 180°. Instead each sample is unwrapped against the previous one by its
//! shortest angular delta, the unwrapped values are averaged, and the result is
//! folded back onto the compass.

use super::{Angle, WindDirection, WindReading};

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]`.
pub fn shortest_delta(from: i32, to: i32) -> i32 {
    let delta = (to - from).rem_euclid(360);
    if delta > 180 { delta - 360 } else { delta }
}

/// Averages every filled slot of a wind window.
///
/// Speed is the arithmetic mean of the filled slots, direction the circular
/// mean of their angles. Returns `None` when no slot is filled.
pub fn two_minute_average<'a, I>(samples: I) -> Option<WindReading>
where
    I: IntoIterator<Item = &'a WindReading>,
{
    let mut count: i32 = 0;
    let mut speed_sum = 0.0f32;
    let mut unwrapped = 0i32;
    let mut unwrapped_sum = 0i32;

    for sample in samples {
        let Some(angle) = sample.direction.angle else {
            continue;
        };
        let degrees = angle.degrees() as i32;

        if count == 0 {
            unwrapped = degrees;
        } else {
            unwrapped += shortest_delta(unwrapped, degrees);
        }

        unwrapped_sum += unwrapped;
        speed_sum += sample.speed_kmh;
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let speed = speed_sum / count as f32;
    let direction = Angle::new(unwrapped_sum / count);

    Some(WindReading::new(speed, WindDirection::averaged(direction)))
}
