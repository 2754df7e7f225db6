use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use dt9837_bridge::{
    AcquisitionConfig, AcquisitionParams, CancelToken, Channel, DeviceSession, Direction,
    Driver, ErrorKind, SessionState, WaveformSpec, generate, generate_with_cancel, measure,
    measure_with_cancel, mock::MockDriver,
};

fn timed_measurement(duration_seconds: u32) -> AcquisitionConfig {
    AcquisitionConfig::measurement(AcquisitionParams {
        channel_count: 4,
        global_gain: 1,
        channel_gain: [1, 1, 1, 1],
        clock_frequency_hz: 1000.0,
        timer_enabled: true,
        duration_seconds,
    })
    .unwrap()
}

fn untimed(direction: Direction) -> AcquisitionConfig {
    let params = AcquisitionParams {
        timer_enabled: false,
        duration_seconds: 0,
        ..AcquisitionParams::default()
    };
    match direction {
        Direction::Input => AcquisitionConfig::measurement(params).unwrap(),
        Direction::Output => AcquisitionConfig::generation(params).unwrap(),
    }
}

#[test]
fn connect_measure_disconnect() {
    let session = DeviceSession::new(MockDriver::new().with_readings(500));
    session.connect().unwrap();

    let dataset = measure(&session, timed_measurement(2)).unwrap();
    assert!(dataset.num_readings() > 0);
    assert!(dataset.num_readings() <= dataset.max_readings());
    for channel in Channel::ALL {
        assert_eq!(dataset.channel(channel).len(), dataset.num_readings());
    }
    assert_eq!(dataset.time_ms().len(), dataset.num_readings());

    session.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn flattened_measure_arguments_reach_driver() {
    let session = DeviceSession::new(MockDriver::new());
    session.connect().unwrap();
    let config = AcquisitionConfig::measurement(AcquisitionParams {
        channel_count: 2,
        global_gain: 10,
        channel_gain: [10, 1, 1, 10],
        clock_frequency_hz: 4000.0,
        timer_enabled: true,
        duration_seconds: 5,
    })
    .unwrap();
    measure(&session, config).unwrap();

    let args = session.driver().last_measure().unwrap();
    assert!(!args.use_defaults);
    assert_eq!(args.channel_count, 2);
    assert_eq!(args.clock_freq, 4000.0);
    assert_eq!(args.global_gain, 10);
    assert_eq!(args.gains, [10, 1, 1, 10]);
    assert!(args.timer_enabled);
    assert_eq!(args.duration, 5);
}

#[test]
fn invalid_channel_count_never_reaches_driver() {
    let session = DeviceSession::new(MockDriver::new());
    session.connect().unwrap();

    let err = AcquisitionConfig::measurement(AcquisitionParams {
        channel_count: 5,
        ..AcquisitionParams::default()
    })
    .unwrap_err();
    assert_eq!(err, ErrorKind::ChannelConfigFailure);
    assert_eq!(session.driver().counts().measure, 0);
}

#[test]
fn generate_without_read_back() {
    let session = DeviceSession::new(MockDriver::new());
    session.connect().unwrap();
    let waveform = WaveformSpec::new(3, 10, 10).unwrap();
    let config = AcquisitionConfig::generation(AcquisitionParams::default()).unwrap();

    assert_eq!(generate(&session, waveform, config, false), Ok(None));
    let counts = session.driver().counts();
    assert_eq!(counts.get_channel_data, 0);
    assert_eq!(counts.cleanup_data, 0);

    let args = session.driver().last_generate().unwrap();
    assert_eq!(args.amplitude, 3);
    assert_eq!(args.frequency, 10);
    assert_eq!(args.duration, 10);
}

#[test]
fn measurement_status_five_yields_no_dataset() {
    let session = DeviceSession::new(MockDriver::new().with_measure_status(5));
    session.connect().unwrap();

    assert_eq!(
        measure(&session, timed_measurement(1)),
        Err(ErrorKind::MeasurementFailure)
    );
    assert_eq!(session.driver().counts().cleanup_data, 0);
    assert_eq!(session.state(), SessionState::Connected);
}

#[test]
fn failed_connect_refuses_operations() {
    let session = DeviceSession::new(MockDriver::new().with_init_status(1));
    assert_eq!(
        session.connect(),
        Err(ErrorKind::InitConfigFailure { status: 1 })
    );
    assert_eq!(
        measure(&session, timed_measurement(1)),
        Err(ErrorKind::NotConnected)
    );
    assert_eq!(session.driver().counts().measure, 0);
}

#[test]
fn repeated_captures_release_each_buffer() {
    let session = DeviceSession::new(MockDriver::new().with_readings(10));
    session.connect().unwrap();

    let first = measure(&session, timed_measurement(1)).unwrap();
    let second = measure(&session, timed_measurement(1)).unwrap();
    let config = AcquisitionConfig::generation(AcquisitionParams::default()).unwrap();
    let third = generate(&session, WaveformSpec::default(), config, true)
        .unwrap()
        .unwrap();

    let counts = session.driver().counts();
    assert_eq!(counts.get_channel_data, 3);
    assert_eq!(counts.cleanup_data, 3);
    // datasets stay valid after their buffers were released
    assert_eq!(first, second);
    assert_eq!(third.num_readings(), 10);
}

#[test]
fn untimed_measurement_stops_on_cancel() {
    let session = DeviceSession::new(MockDriver::new().with_readings(20));
    session.connect().unwrap();
    let cancel = CancelToken::new();

    let stopper = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        })
    };
    let dataset = measure_with_cancel(&session, untimed(Direction::Input), &cancel).unwrap();
    stopper.join().unwrap();

    assert_eq!(dataset.num_readings(), 20);
    let counts = session.driver().counts();
    assert_eq!(counts.abort, 1);
    assert_eq!(counts.cleanup_data, 1);
}

#[test]
fn untimed_generation_stops_on_cancel() {
    let session = DeviceSession::new(MockDriver::new());
    session.connect().unwrap();
    let cancel = CancelToken::new();

    let stopper = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        })
    };
    let result = generate_with_cancel(
        &session,
        WaveformSpec::default(),
        untimed(Direction::Output),
        false,
        &cancel,
    );
    stopper.join().unwrap();

    assert_eq!(result, Ok(None));
    assert_eq!(session.driver().counts().abort, 1);
}

#[test]
fn cancelled_token_issues_no_native_call() {
    let session = DeviceSession::new(MockDriver::new());
    session.connect().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    assert_eq!(
        measure_with_cancel(&session, timed_measurement(1), &cancel),
        Err(ErrorKind::Cancelled)
    );
    assert_eq!(session.driver().counts().measure, 0);
}

#[test]
fn driver_without_abort_runs_to_completion() {
    let session = DeviceSession::new(MockDriver::new().without_abort().with_readings(5));
    session.connect().unwrap();
    let cancel = CancelToken::new();

    let dataset = measure_with_cancel(&session, untimed(Direction::Input), &cancel).unwrap();
    assert_eq!(dataset.num_readings(), 5);
}

#[test]
fn cancel_without_abort_lets_capture_finish() {
    let session = DeviceSession::new(
        MockDriver::new()
            .without_abort()
            .with_call_time(Duration::from_millis(200))
            .with_readings(7),
    );
    session.connect().unwrap();
    let cancel = CancelToken::new();

    let stopper = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            cancel.cancel();
        })
    };
    let dataset = measure_with_cancel(&session, untimed(Direction::Input), &cancel).unwrap();
    stopper.join().unwrap();

    assert_eq!(dataset.num_readings(), 7);
    let counts = session.driver().counts();
    assert_eq!(counts.abort, 1);
    assert_eq!(counts.cleanup_data, 1);
}

#[test]
fn late_abort_does_not_end_next_capture() {
    let session = DeviceSession::new(MockDriver::new());
    session.connect().unwrap();
    // an abort that arrives between captures
    assert_eq!(session.driver().abort(), Some(0));

    let cancel = CancelToken::new();
    let stopper = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        })
    };
    let started = Instant::now();
    measure_with_cancel(&session, untimed(Direction::Input), &cancel).unwrap();
    stopper.join().unwrap();

    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(session.driver().counts().abort, 2);
}

#[test]
fn concurrent_captures_are_serialized() {
    let session = Arc::new(DeviceSession::new(MockDriver::new().with_readings(8)));
    session.connect().unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for _ in 0..5 {
                    measure(&session, timed_measurement(1)).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let counts = session.driver().counts();
    assert_eq!(counts.measure, 20);
    assert_eq!(counts.cleanup_data, 20);
    assert!(!session.driver().saw_overlap());
}
