use std::fmt::{self, Display};

use crate::config::NUM_CHANNELS;
use crate::error::ErrorKind;

/// Fixed meaning of the four input channels. The driver reports Z, Y and X
/// in g, already scaled by the accelerometer sensitivities; Aux is in volts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Z = 0,
    Y = 1,
    X = 2,
    /// Auxiliary input, wired to the DAC read-back.
    Aux = 3,
}

impl Channel {
    pub const ALL: [Channel; NUM_CHANNELS] = [Channel::Z, Channel::Y, Channel::X, Channel::Aux];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Z => "z",
            Channel::Y => "y",
            Channel::X => "x",
            Channel::Aux => "aux",
        }
    }
}

/// Samples copied out of one capture. Owns all of its storage.
///
/// Every channel and the timestamp sequence hold exactly `num_readings()`
/// values, and `num_readings() <= max_readings()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDataset {
    max_readings: usize,
    channels: [Vec<f64>; NUM_CHANNELS],
    time_ms: Vec<f64>,
}

impl ChannelDataset {
    pub fn new(
        channels: [Vec<f64>; NUM_CHANNELS],
        time_ms: Vec<f64>,
        max_readings: usize,
    ) -> Result<Self, ErrorKind> {
        let num_readings = time_ms.len();
        if num_readings > max_readings {
            return Err(ErrorKind::InvalidBuffer(format!(
                "{} readings exceed capacity {}",
                num_readings, max_readings
            )));
        }
        if let Some((channel, values)) = Channel::ALL
            .iter()
            .zip(&channels)
            .find(|(_, values)| values.len() != num_readings)
        {
            return Err(ErrorKind::InvalidBuffer(format!(
                "channel {} has {} values, expected {}",
                channel.name(),
                values.len(),
                num_readings
            )));
        }
        Ok(Self {
            max_readings,
            channels,
            time_ms,
        })
    }

    pub fn num_readings(&self) -> usize {
        self.time_ms.len()
    }

    pub fn max_readings(&self) -> usize {
        self.max_readings
    }

    pub fn is_empty(&self) -> bool {
        self.time_ms.is_empty()
    }

    pub fn channel(&self, channel: Channel) -> &[f64] {
        &self.channels[channel.index()]
    }

    pub fn channels(&self) -> &[Vec<f64>; NUM_CHANNELS] {
        &self.channels
    }

    pub fn time_ms(&self) -> &[f64] {
        &self.time_ms
    }

    pub fn readings(&self) -> impl Iterator<Item = Reading> + '_ {
        (0..self.num_readings()).map(move |i| Reading {
            time_ms: self.time_ms[i],
            values: std::array::from_fn(|ch| self.channels[ch][i]),
        })
    }
}

/// One row of a dataset: a timestamp and the value of each channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub time_ms: f64,
    pub values: [f64; NUM_CHANNELS],
}

impl Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} ms", self.time_ms)?;
        for (channel, value) in Channel::ALL.iter().zip(self.values) {
            write!(f, "  {}={:.3}", channel.name(), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> ChannelDataset {
        ChannelDataset::new(
            [
                vec![0.123456, 1.0],
                vec![2.0, 3.0],
                vec![4.0, 5.0],
                vec![6.0, 7.0],
            ],
            vec![0.0, 1.0],
            4,
        )
        .unwrap()
    }

    #[test]
    fn lengths_are_consistent() {
        let data = dataset();
        assert_eq!(data.num_readings(), 2);
        assert_eq!(data.max_readings(), 4);
        for channel in Channel::ALL {
            assert_eq!(data.channel(channel).len(), data.num_readings());
        }
        assert_eq!(data.time_ms().len(), data.num_readings());
    }

    #[test]
    fn rejects_mismatched_channel() {
        let err = ChannelDataset::new(
            [vec![0.0], vec![0.0, 1.0], vec![0.0], vec![0.0]],
            vec![0.0],
            8,
        )
        .unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidBuffer(_)));
    }

    #[test]
    fn rejects_over_capacity() {
        let err = ChannelDataset::new(
            [vec![0.0; 3], vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]],
            vec![0.0; 3],
            2,
        )
        .unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidBuffer(_)));
    }

    #[test]
    fn clone_is_identical() {
        let data = dataset();
        let copy = data.clone();
        assert_eq!(data, copy);
        assert_eq!(copy.channel(Channel::Z)[0], 0.123456);
    }

    #[test]
    fn display_rounds_without_mutating() {
        let data = dataset();
        let first = data.readings().next().unwrap();
        let text = first.to_string();
        assert!(text.contains("z=0.123"));
        assert_eq!(data.channel(Channel::Z)[0], 0.123456);
    }

    #[test]
    fn channel_order_is_fixed() {
        let data = dataset();
        let reading = data.readings().nth(1).unwrap();
        assert_eq!(reading.values, [1.0, 3.0, 5.0, 7.0]);
        assert_eq!(Channel::Aux.index(), 3);
    }
}
