use log::{info, warn};

use crate::capture::{CancelToken, capture, run_native};
use crate::config::{AcquisitionConfig, Direction};
use crate::dataset::ChannelDataset;
use crate::driver::{Driver, MeasureArgs};
use crate::error::ErrorKind;
use crate::session::DeviceSession;

/// Run one acquisition and copy the result out of the board buffer.
///
/// With the timer disabled this never returns on its own; use
/// [`measure_with_cancel`] to be able to stop it.
pub fn measure<D: Driver>(
    session: &DeviceSession<D>,
    config: AcquisitionConfig,
) -> Result<ChannelDataset, ErrorKind> {
    measure_with_cancel(session, config, &CancelToken::new())
}

pub fn measure_with_cancel<D: Driver>(
    session: &DeviceSession<D>,
    config: AcquisitionConfig,
    cancel: &CancelToken,
) -> Result<ChannelDataset, ErrorKind> {
    if config.direction() != Direction::Input {
        return Err(ErrorKind::BoardConfigFailure);
    }

    session.with_handle(|driver, _| {
        let args = MeasureArgs::new(&config);
        if args.timer_enabled {
            info!(
                "measuring {} channels at {} Hz for {}s",
                args.channel_count, args.clock_freq, args.duration
            );
        } else {
            info!(
                "measuring {} channels at {} Hz until cancelled",
                args.channel_count, args.clock_freq
            );
        }

        run_native(driver, cancel, |driver| driver.measure(&args)).inspect_err(|err| {
            warn!("measurement failed: {}", err);
        })?;

        let dataset = capture(driver)?;
        info!(
            "captured {} of {} readings",
            dataset.num_readings(),
            dataset.max_readings()
        );
        Ok(dataset)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcquisitionParams;
    use crate::mock::MockDriver;

    fn connected(driver: MockDriver) -> DeviceSession<MockDriver> {
        let session = DeviceSession::new(driver);
        session.connect().unwrap();
        session
    }

    #[test]
    fn measures_and_releases_once() {
        let session = connected(MockDriver::new().with_readings(100));
        let config = AcquisitionConfig::measurement(AcquisitionParams::default()).unwrap();

        let dataset = measure(&session, config).unwrap();
        assert_eq!(dataset.num_readings(), 100);
        for values in dataset.channels() {
            assert_eq!(values.len(), 100);
        }

        let counts = session.driver().counts();
        assert_eq!(counts.measure, 1);
        assert_eq!(counts.get_channel_data, 1);
        assert_eq!(counts.cleanup_data, 1);
    }

    #[test]
    fn native_failure_skips_buffer() {
        let session = connected(MockDriver::new().with_measure_status(5));
        let config = AcquisitionConfig::measurement(AcquisitionParams::default()).unwrap();

        assert_eq!(measure(&session, config), Err(ErrorKind::MeasurementFailure));
        let counts = session.driver().counts();
        assert_eq!(counts.get_channel_data, 0);
        assert_eq!(counts.cleanup_data, 0);
    }

    #[test]
    fn requires_connection() {
        let session = DeviceSession::new(MockDriver::new());
        let config = AcquisitionConfig::measurement(AcquisitionParams::default()).unwrap();
        assert_eq!(measure(&session, config), Err(ErrorKind::NotConnected));
        assert_eq!(session.driver().counts().measure, 0);
    }

    #[test]
    fn rejects_generation_config() {
        let session = connected(MockDriver::new());
        let config = AcquisitionConfig::generation(AcquisitionParams::default()).unwrap();
        assert_eq!(measure(&session, config), Err(ErrorKind::BoardConfigFailure));
        assert_eq!(session.driver().counts().measure, 0);
    }

    #[test]
    fn passes_device_defaults_flag() {
        let session = connected(MockDriver::new());
        let config = AcquisitionConfig::device_defaults(Direction::Input, true, 3).unwrap();
        measure(&session, config).unwrap();
        let args = session.driver().last_measure().unwrap();
        assert!(args.use_defaults);
        assert_eq!(args.duration, 3);
    }
}
