use std::ops::RangeInclusive;

use crate::config::check_duration;
use crate::error::ErrorKind;

pub const AMPLITUDE_RANGE_V: RangeInclusive<u32> = 0..=10;
pub const FREQUENCY_RANGE_HZ: RangeInclusive<u32> = 10..=400;

/// Square wave driven on the D/A output by [`crate::generation::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformSpec {
    amplitude_volts: u32,
    frequency_hz: u32,
    duration_seconds: u32,
}

impl WaveformSpec {
    pub fn new(
        amplitude_volts: u32,
        frequency_hz: u32,
        duration_seconds: u32,
    ) -> Result<Self, ErrorKind> {
        if !AMPLITUDE_RANGE_V.contains(&amplitude_volts) || !FREQUENCY_RANGE_HZ.contains(&frequency_hz)
        {
            return Err(ErrorKind::DataConfigFailure);
        }
        Ok(Self {
            amplitude_volts,
            frequency_hz,
            duration_seconds: check_duration(duration_seconds)?,
        })
    }

    pub fn amplitude_volts(&self) -> u32 {
        self.amplitude_volts
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }
}

impl Default for WaveformSpec {
    fn default() -> Self {
        Self {
            amplitude_volts: 3,
            frequency_hz: 10,
            duration_seconds: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_range_edges() {
        assert!(WaveformSpec::new(0, 10, 1).is_ok());
        assert!(WaveformSpec::new(10, 400, 1).is_ok());
        let spec = WaveformSpec::new(3, 10, 10).unwrap();
        assert_eq!(spec, WaveformSpec::default());
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(WaveformSpec::new(11, 100, 1), Err(ErrorKind::DataConfigFailure));
        assert_eq!(WaveformSpec::new(3, 9, 1), Err(ErrorKind::DataConfigFailure));
        assert_eq!(WaveformSpec::new(3, 401, 1), Err(ErrorKind::DataConfigFailure));
        assert_eq!(WaveformSpec::new(3, 100, u32::MAX), Err(ErrorKind::DataConfigFailure));
    }
}
