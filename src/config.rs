use crate::error::ErrorKind;

pub const NUM_CHANNELS: usize = 4;

/// Highest A/D sample clock the board accepts.
pub const MAX_INPUT_CLOCK_HZ: f32 = 52_700.0;
/// Highest D/A output clock the board accepts.
pub const MAX_OUTPUT_CLOCK_HZ: f32 = 46_875.0;

pub const DEFAULT_CLOCK_HZ: f32 = 1_000.0;

/// Amplification applied by the board before digitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    #[default]
    X1 = 1,
    X10 = 10,
}

impl Gain {
    pub fn factor(self) -> i32 {
        self as i32
    }
}

impl TryFrom<u32> for Gain {
    type Error = ErrorKind;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Gain::X1),
            10 => Ok(Gain::X10),
            _ => Err(ErrorKind::ChannelConfigFailure),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A/D acquisition (`measure`).
    Input,
    /// D/A output (`generate`).
    Output,
}

impl Direction {
    pub fn max_clock_hz(self) -> f32 {
        match self {
            Direction::Input => MAX_INPUT_CLOCK_HZ,
            Direction::Output => MAX_OUTPUT_CLOCK_HZ,
        }
    }
}

/// Raw, unvalidated acquisition settings. Turned into an [`AcquisitionConfig`]
/// by [`AcquisitionConfig::measurement`] or [`AcquisitionConfig::generation`].
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionParams {
    pub channel_count: u32,
    pub global_gain: u32,
    pub channel_gain: [u32; NUM_CHANNELS],
    pub clock_frequency_hz: f32,
    pub timer_enabled: bool,
    pub duration_seconds: u32,
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self {
            channel_count: NUM_CHANNELS as u32,
            global_gain: 1,
            channel_gain: [1; NUM_CHANNELS],
            clock_frequency_hz: DEFAULT_CLOCK_HZ,
            timer_enabled: true,
            duration_seconds: 10,
        }
    }
}

/// Validated sampling configuration. Construction is the only validation gate;
/// the controllers pass the fields through to the board unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    direction: Direction,
    use_defaults: bool,
    channel_count: u32,
    global_gain: Gain,
    channel_gain: [Gain; NUM_CHANNELS],
    clock_frequency_hz: f32,
    timer_enabled: bool,
    duration_seconds: u32,
}

impl AcquisitionConfig {
    pub fn measurement(params: AcquisitionParams) -> Result<Self, ErrorKind> {
        Self::validated(Direction::Input, params)
    }

    pub fn generation(params: AcquisitionParams) -> Result<Self, ErrorKind> {
        Self::validated(Direction::Output, params)
    }

    /// Let the board pick channel count, gains and clock. Only the timing is
    /// taken from the caller.
    pub fn device_defaults(
        direction: Direction,
        timer_enabled: bool,
        duration_seconds: u32,
    ) -> Result<Self, ErrorKind> {
        Ok(Self {
            direction,
            use_defaults: true,
            channel_count: NUM_CHANNELS as u32,
            global_gain: Gain::X1,
            channel_gain: [Gain::X1; NUM_CHANNELS],
            clock_frequency_hz: DEFAULT_CLOCK_HZ,
            timer_enabled,
            duration_seconds: check_duration(duration_seconds)?,
        })
    }

    fn validated(direction: Direction, params: AcquisitionParams) -> Result<Self, ErrorKind> {
        if !(1..=NUM_CHANNELS as u32).contains(&params.channel_count) {
            return Err(ErrorKind::ChannelConfigFailure);
        }
        let global_gain = Gain::try_from(params.global_gain)?;
        let mut channel_gain = [Gain::X1; NUM_CHANNELS];
        for (gain, raw) in channel_gain.iter_mut().zip(params.channel_gain) {
            *gain = Gain::try_from(raw)?;
        }

        let clock = params.clock_frequency_hz;
        if !clock.is_finite() || clock <= 0.0 || clock > direction.max_clock_hz() {
            return Err(ErrorKind::BoardConfigFailure);
        }

        Ok(Self {
            direction,
            use_defaults: false,
            channel_count: params.channel_count,
            global_gain,
            channel_gain,
            clock_frequency_hz: clock,
            timer_enabled: params.timer_enabled,
            duration_seconds: check_duration(params.duration_seconds)?,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn use_defaults(&self) -> bool {
        self.use_defaults
    }

    pub fn channel_count(&self) -> u32 {
        self.channel_count
    }

    pub fn global_gain(&self) -> Gain {
        self.global_gain
    }

    pub fn channel_gain(&self) -> [Gain; NUM_CHANNELS] {
        self.channel_gain
    }

    pub fn clock_frequency_hz(&self) -> f32 {
        self.clock_frequency_hz
    }

    /// When false, `measure`/`generate` block until cancelled.
    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }
}

// the board takes the duration as an int32
pub(crate) fn check_duration(seconds: u32) -> Result<u32, ErrorKind> {
    if i32::try_from(seconds).is_err() {
        return Err(ErrorKind::DataConfigFailure);
    }
    Ok(seconds)
}
