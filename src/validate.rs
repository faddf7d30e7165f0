//! Sanity bounds for the analog readings.
//!
//! Replies carry no checksum we can verify, so a reading outside of what the
//! hardware can physically report is the only sign of a garbled frame.

use crate::response::{ANALOG_FIELDS, AnalogField};

/// Inclusive `[min, max]` bounds for one reading.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bounds indexed by [`AnalogField::index`].
pub const RANGES: [ValueRange; ANALOG_FIELDS] = [
    // Last input, input and output voltage.
    ValueRange::new(0.0, 270.0),
    ValueRange::new(0.0, 270.0),
    ValueRange::new(0.0, 270.0),
    // Output power, percent.
    ValueRange::new(0.0, 100.0),
    // Output frequency.
    ValueRange::new(40.0, 70.0),
    // Battery level, percent.
    ValueRange::new(0.0, 100.0),
    // Temperature, Celsius.
    ValueRange::new(-20.0, 70.0),
];

impl AnalogField {
    pub const fn range(self) -> ValueRange {
        RANGES[self.index()]
    }
}

/// Count the readings that fall outside their range. Zero means the frame can be trusted.
pub fn validate(values: &[f32; ANALOG_FIELDS]) -> usize {
    values
        .iter()
        .zip(RANGES.iter())
        .filter(|(value, range)| !range.contains(**value))
        .count()
}
