use log::{info, warn};

use crate::capture::{CancelToken, capture, run_native};
use crate::config::{AcquisitionConfig, Direction};
use crate::dataset::ChannelDataset;
use crate::driver::{Driver, GenerateArgs};
use crate::error::ErrorKind;
use crate::session::DeviceSession;
use crate::waveform::WaveformSpec;

/// Drive a square wave on the D/A output, optionally reading the inputs back.
///
/// Returns `Ok(None)` when `read_input` is false; the board buffer is not
/// touched in that case. With the timer disabled this blocks until the driver
/// returns; use [`generate_with_cancel`] to be able to stop it.
pub fn generate<D: Driver>(
    session: &DeviceSession<D>,
    waveform: WaveformSpec,
    config: AcquisitionConfig,
    read_input: bool,
) -> Result<Option<ChannelDataset>, ErrorKind> {
    generate_with_cancel(session, waveform, config, read_input, &CancelToken::new())
}

pub fn generate_with_cancel<D: Driver>(
    session: &DeviceSession<D>,
    waveform: WaveformSpec,
    config: AcquisitionConfig,
    read_input: bool,
    cancel: &CancelToken,
) -> Result<Option<ChannelDataset>, ErrorKind> {
    if config.direction() != Direction::Output {
        return Err(ErrorKind::BoardConfigFailure);
    }

    session.with_handle(|driver, _| {
        let args = GenerateArgs::new(&waveform, &config, read_input);
        info!(
            "generating {} V / {} Hz square wave{}",
            args.amplitude,
            args.frequency,
            if args.timer_enabled {
                format!(" for {}s", args.duration)
            } else {
                " until cancelled".to_string()
            }
        );

        run_native(driver, cancel, |driver| driver.generate(&args)).inspect_err(|err| {
            warn!("generation failed: {}", err);
        })?;

        if !read_input {
            return Ok(None);
        }

        let dataset = capture(driver)?;
        info!("read back {} readings", dataset.num_readings());
        Ok(Some(dataset))
    })
}
