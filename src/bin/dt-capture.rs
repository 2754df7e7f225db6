use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use dt9837_bridge::{
    AcquisitionConfig, AcquisitionParams, CancelToken, ChannelDataset, DeviceSession, Direction,
    Driver, DtLibrary, WaveformSpec,
    config::NUM_CHANNELS,
    driver::default_library_name,
    export::write_csv,
    generate_with_cancel, measure_with_cancel,
    mock::MockDriver,
};
use status_line::StatusLine;
use std::{
    error::Error,
    fmt::Display,
    path::PathBuf,
    process::exit,
    time::Instant,
};
use thread_priority::{ThreadPriority, set_current_thread_priority};

fn timing_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_parser(value_parser!(u32))
                .default_value("10")
                .help("Duration in seconds"),
        )
        .arg(
            Arg::new("untimed")
                .long("untimed")
                .action(ArgAction::SetTrue)
                .help("Run until Ctrl-C instead of for a fixed duration"),
        )
        .arg(
            Arg::new("defaults")
                .long("defaults")
                .action(ArgAction::SetTrue)
                .help("Use the board's default gains and clock"),
        )
        .arg(
            Arg::new("clock")
                .short('c')
                .long("clock")
                .value_parser(value_parser!(f32))
                .default_value("1000.0")
                .help("Sample clock in Hz"),
        )
        .arg(
            Arg::new("gain")
                .short('g')
                .long("gain")
                .value_parser(["1", "10"])
                .default_value("1")
                .help("Gain applied to all channels"),
        )
}

fn cli() -> Command {
    Command::new("dt-capture")
        .about("Measure or generate with a DT9837 signal analyzer")
        .subcommand_required(true)
        .arg(
            Arg::new("library")
                .short('l')
                .long("library")
                .env("DT_LIB_PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Path to the board driver library"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .action(ArgAction::SetTrue)
                .help("Use the in-process mock driver instead of the board"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(value_parser!(PathBuf))
                .help("Output CSV file (default: capture-<timestamp>.csv)"),
        )
        .arg(
            Arg::new("realtime")
                .long("realtime")
                .action(ArgAction::SetTrue)
                .help("Raise the priority of the capture thread"),
        )
        .subcommand(timing_args(
            Command::new("measure")
                .about("Acquire the analog inputs")
                .arg(
                    Arg::new("channels")
                        .short('n')
                        .long("channels")
                        .value_parser(value_parser!(u32))
                        .default_value("4")
                        .help("Number of channels (1-4)"),
                )
                .arg(
                    Arg::new("channel-gain")
                        .long("channel-gain")
                        .value_parser(value_parser!(u32))
                        .value_delimiter(',')
                        .default_values(["1", "1", "1", "1"])
                        .help("Per-channel gains for Z,Y,X,AUX"),
                ),
        ))
        .subcommand(timing_args(
            Command::new("generate")
                .about("Drive a square wave on the analog output")
                .arg(
                    Arg::new("amplitude")
                        .short('a')
                        .long("amplitude")
                        .value_parser(value_parser!(u32))
                        .default_value("3")
                        .help("Amplitude in volts (0-10)"),
                )
                .arg(
                    Arg::new("frequency")
                        .short('f')
                        .long("frequency")
                        .value_parser(value_parser!(u32))
                        .default_value("10")
                        .help("Waveform frequency in Hz (10-400)"),
                )
                .arg(
                    Arg::new("no-read")
                        .long("no-read")
                        .action(ArgAction::SetTrue)
                        .help("Only drive the output, do not record the inputs"),
                ),
        ))
}

fn arg<T: Clone + Send + Sync + 'static>(
    matches: &ArgMatches,
    id: &str,
) -> Result<T, Box<dyn Error>> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| format!("missing argument --{}", id).into())
}

fn config(
    matches: &ArgMatches,
    direction: Direction,
    channel_count: u32,
    channel_gain: [u32; NUM_CHANNELS],
) -> Result<AcquisitionConfig, Box<dyn Error>> {
    let timer_enabled = !matches.get_flag("untimed");
    let duration_seconds = arg::<u32>(matches, "duration")?;
    if matches.get_flag("defaults") {
        return Ok(AcquisitionConfig::device_defaults(
            direction,
            timer_enabled,
            duration_seconds,
        )?);
    }

    let params = AcquisitionParams {
        channel_count,
        global_gain: arg::<String>(matches, "gain")?.parse()?,
        channel_gain,
        clock_frequency_hz: arg::<f32>(matches, "clock")?,
        timer_enabled,
        duration_seconds,
    };
    Ok(match direction {
        Direction::Input => AcquisitionConfig::measurement(params)?,
        Direction::Output => AcquisitionConfig::generation(params)?,
    })
}

#[derive(Clone)]
struct Progress {
    started: Instant,
    duration: Option<u32>,
}

impl Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elapsed = self.started.elapsed().as_secs_f32();
        match self.duration {
            Some(duration) => write!(f, "Elapsed: {:.01}s / {}s", elapsed, duration),
            None => write!(f, "Elapsed: {:.01}s (Ctrl-C to stop)", elapsed),
        }
    }
}

fn run<D: Driver>(
    session: &DeviceSession<D>,
    matches: &ArgMatches,
    cancel: &CancelToken,
) -> Result<Option<ChannelDataset>, Box<dyn Error>> {
    match matches.subcommand() {
        Some(("measure", sub)) => {
            let gains: Vec<u32> = sub
                .get_many::<u32>("channel-gain")
                .map(|values| values.copied().collect())
                .unwrap_or_default();
            let channel_gain: [u32; NUM_CHANNELS] = gains.try_into().map_err(|_| {
                format!("--channel-gain takes exactly {} values", NUM_CHANNELS)
            })?;
            let config = config(
                sub,
                Direction::Input,
                arg::<u32>(sub, "channels")?,
                channel_gain,
            )?;

            let status = StatusLine::new(Progress {
                started: Instant::now(),
                duration: config.timer_enabled().then(|| config.duration_seconds()),
            });
            let dataset = measure_with_cancel(session, config, cancel);
            drop(status);
            Ok(Some(dataset?))
        }
        Some(("generate", sub)) => {
            let waveform = WaveformSpec::new(
                arg::<u32>(sub, "amplitude")?,
                arg::<u32>(sub, "frequency")?,
                arg::<u32>(sub, "duration")?,
            )?;
            let config = config(sub, Direction::Output, NUM_CHANNELS as u32, [1; NUM_CHANNELS])?;
            let read_input = !sub.get_flag("no-read");

            let status = StatusLine::new(Progress {
                started: Instant::now(),
                duration: config.timer_enabled().then(|| waveform.duration_seconds()),
            });
            let dataset = generate_with_cancel(session, waveform, config, read_input, cancel);
            drop(status);
            Ok(dataset?)
        }
        _ => Err("unknown subcommand".into()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let matches = cli().get_matches();

    let driver: Box<dyn Driver> = if matches.get_flag("mock") {
        Box::new(MockDriver::new().with_readings(2_000))
    } else {
        let library = matches
            .get_one::<PathBuf>("library")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(default_library_name()));
        Box::new(DtLibrary::load(&library)?)
    };
    let session = DeviceSession::new(driver);

    let cancel = CancelToken::new();
    let cancel_clone = cancel.clone();
    ctrlc::set_handler(move || {
        if cancel_clone.is_cancelled() {
            eprintln!("Killing...");
            exit(-1);
        }
        cancel_clone.cancel();
    })?;

    if matches.get_flag("realtime") {
        if let Err(err) = set_current_thread_priority(ThreadPriority::Max) {
            log::warn!("could not raise thread priority: {:?}", err);
        }
    }

    session.connect()?;
    let result = run(&session, &matches, &cancel);
    let disconnected = session.disconnect();
    let dataset = result?;
    disconnected?;

    let Some(dataset) = dataset else {
        eprintln!("Done!");
        return Ok(());
    };

    let output = matches.get_one::<PathBuf>("output").cloned().unwrap_or_else(|| {
        PathBuf::from(format!(
            "capture-{}.csv",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ))
    });
    let file = std::fs::File::create(&output)?;
    write_csv(&dataset, file)?;

    eprintln!(
        "Wrote {} of {} readings to {}",
        dataset.num_readings(),
        dataset.max_readings(),
        output.display()
    );
    eprintln!("Done!");

    Ok(())
}
