// src/processing/mod.rs
pub mod detectors;
pub mod sink;
pub mod swipe_detector;
pub mod triggers;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Microseconds sound needs to travel one centimeter (343.21 m/s).
pub const MICROSECONDS_PER_CM: f64 = 1e6 / 34321.0;
/// Readings collected from the starter side before a gesture is classified.
pub const SAMPLE_SIZE: usize = 5;
pub const TRIGGER_PULSE_US: u64 = 10;
/// Hold after a falling echo edge before the reading is used.
pub const ECHO_SETTLE_US: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "Left"),
            Side::Right => write!(f, "Right"),
        }
    }
}

/// One accepted measurement, in whole centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distance {
    pub side: Side,
    pub cm: u32,
}

/// Converts an echo pulse width (round trip) into a one-way distance.
pub fn distance_from_echo(round_trip: Duration) -> u32 {
    let micros = round_trip.as_secs_f64() * 1e6;
    (micros / 2.0 / MICROSECONDS_PER_CM).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_echo_widths() {
        assert_eq!(distance_from_echo(Duration::from_micros(1165)), 20);
        assert_eq!(distance_from_echo(Duration::from_micros(2914)), 50);
        assert_eq!(distance_from_echo(Duration::from_micros(11655)), 200);
        assert_eq!(distance_from_echo(Duration::ZERO), 0);
    }

    #[test]
    fn rounds_to_nearest_centimeter() {
        // 29.137 us per cm, one way
        assert_eq!(distance_from_echo(Duration::from_micros(87)), 1);
        assert_eq!(distance_from_echo(Duration::from_micros(86)), 1);
        assert_eq!(distance_from_echo(Duration::from_micros(29)), 0);
        assert_eq!(distance_from_echo(Duration::from_micros(30)), 1);
    }
}
