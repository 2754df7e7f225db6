use std::ffi::{OsStr, OsString};
use std::sync::Arc;

use libloading::Library;

use crate::config::{AcquisitionConfig, NUM_CHANNELS};
use crate::error::ErrorKind;
use crate::waveform::WaveformSpec;

/// Buffer descriptor handed out by `get_channel_data`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChannelDataStruct {
    pub channel: [*mut f64; NUM_CHANNELS],
    pub time_ms: *mut f64,
    pub num_readings: i32,
    pub max_readings: i32,
}

impl ChannelDataStruct {
    pub fn empty() -> Self {
        Self {
            channel: [std::ptr::null_mut(); NUM_CHANNELS],
            time_ms: std::ptr::null_mut(),
            num_readings: 0,
            max_readings: 0,
        }
    }
}

/// Flattened arguments of the native `measure` call, in call order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureArgs {
    pub use_defaults: bool,
    pub channel_count: i32,
    pub clock_freq: f32,
    pub global_gain: i32,
    pub gains: [i32; NUM_CHANNELS],
    pub timer_enabled: bool,
    pub duration: i32,
}

impl MeasureArgs {
    pub fn new(config: &AcquisitionConfig) -> Self {
        Self {
            use_defaults: config.use_defaults(),
            channel_count: config.channel_count() as i32,
            clock_freq: config.clock_frequency_hz(),
            global_gain: config.global_gain().factor(),
            gains: config.channel_gain().map(|gain| gain.factor()),
            timer_enabled: config.timer_enabled(),
            duration: config.duration_seconds() as i32,
        }
    }
}

/// Flattened arguments of the native `generate` call, in call order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateArgs {
    pub use_defaults: bool,
    pub read_input: bool,
    pub clock_freq: f32,
    pub global_gain: i32,
    pub amplitude: i32,
    pub frequency: i32,
    pub timer_enabled: bool,
    pub duration: i32,
}

impl GenerateArgs {
    pub fn new(waveform: &WaveformSpec, config: &AcquisitionConfig, read_input: bool) -> Self {
        Self {
            use_defaults: config.use_defaults(),
            read_input,
            clock_freq: config.clock_frequency_hz(),
            global_gain: config.global_gain().factor(),
            amplitude: waveform.amplitude_volts() as i32,
            frequency: waveform.frequency_hz() as i32,
            timer_enabled: config.timer_enabled(),
            duration: waveform.duration_seconds() as i32,
        }
    }
}

/// The fixed call boundary of the board driver.
///
/// # Safety
///
/// After a successful `measure` or `generate` with read-back, the descriptor
/// returned by `get_channel_data` must have every non-null pointer address at
/// least `num_readings` initialized `f64` values, and those values must stay
/// valid until `cleanup_data` is called.
pub unsafe trait Driver: Send + Sync {
    fn initialize_board(&self) -> i32;

    fn deinit_board(&self) -> i32;

    /// Blocks until the configured duration elapses, or until aborted when the
    /// timer is disabled.
    fn measure(&self, args: &MeasureArgs) -> i32;

    fn generate(&self, args: &GenerateArgs) -> i32;

    fn get_channel_data(&self) -> ChannelDataStruct;

    fn cleanup_data(&self);

    /// Ask a blocking `measure`/`generate` to return early. `None` when the
    /// driver has no abort entry point.
    fn abort(&self) -> Option<i32> {
        None
    }
}

unsafe impl<D: Driver + ?Sized> Driver for Box<D> {
    fn initialize_board(&self) -> i32 {
        (**self).initialize_board()
    }

    fn deinit_board(&self) -> i32 {
        (**self).deinit_board()
    }

    fn measure(&self, args: &MeasureArgs) -> i32 {
        (**self).measure(args)
    }

    fn generate(&self, args: &GenerateArgs) -> i32 {
        (**self).generate(args)
    }

    fn get_channel_data(&self) -> ChannelDataStruct {
        (**self).get_channel_data()
    }

    fn cleanup_data(&self) {
        (**self).cleanup_data()
    }

    fn abort(&self) -> Option<i32> {
        (**self).abort()
    }
}

unsafe impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn initialize_board(&self) -> i32 {
        (**self).initialize_board()
    }

    fn deinit_board(&self) -> i32 {
        (**self).deinit_board()
    }

    fn measure(&self, args: &MeasureArgs) -> i32 {
        (**self).measure(args)
    }

    fn generate(&self, args: &GenerateArgs) -> i32 {
        (**self).generate(args)
    }

    fn get_channel_data(&self) -> ChannelDataStruct {
        (**self).get_channel_data()
    }

    fn cleanup_data(&self) {
        (**self).cleanup_data()
    }

    fn abort(&self) -> Option<i32> {
        (**self).abort()
    }
}

type StatusFn = unsafe extern "C" fn() -> i32;
type MeasureFn = unsafe extern "C" fn(bool, i32, f32, i32, i32, i32, i32, i32, bool, i32) -> i32;
type GenerateFn = unsafe extern "C" fn(bool, bool, f32, i32, i32, i32, bool, i32) -> i32;
type ChannelDataFn = unsafe extern "C" fn() -> ChannelDataStruct;
type CleanupFn = unsafe extern "C" fn();

/// Platform file name of the board driver library.
pub fn default_library_name() -> OsString {
    libloading::library_filename("dt_lib")
}

/// Board driver loaded from a shared library at runtime.
pub struct DtLibrary {
    initialize_board: StatusFn,
    deinit_board: StatusFn,
    measure: MeasureFn,
    generate: GenerateFn,
    get_channel_data: ChannelDataFn,
    cleanup_data: CleanupFn,
    abort_operation: Option<StatusFn>,
    // keeps the function pointers above alive
    _library: Library,
}

impl DtLibrary {
    pub fn load<P: AsRef<OsStr>>(path: P) -> Result<Self, ErrorKind> {
        let path = path.as_ref();
        log::debug!("loading board driver from {:?}", path);
        let library = unsafe { Library::new(path) }
            .map_err(|err| ErrorKind::Library(format!("{:?}: {}", path, err)))?;

        unsafe {
            let driver = DtLibrary {
                initialize_board: symbol(&library, b"initialize_board\0")?,
                deinit_board: symbol(&library, b"deinit_board\0")?,
                measure: symbol(&library, b"measure\0")?,
                generate: symbol(&library, b"generate\0")?,
                get_channel_data: symbol(&library, b"get_channel_data\0")?,
                cleanup_data: symbol(&library, b"cleanup_data\0")?,
                abort_operation: symbol(&library, b"abort_operation\0").ok(),
                _library: library,
            };
            if driver.abort_operation.is_none() {
                log::debug!("board driver exports no abort_operation");
            }
            Ok(driver)
        }
    }

    pub fn supports_abort(&self) -> bool {
        self.abort_operation.is_some()
    }
}

/// # Safety
///
/// `T` must match the C signature of the exported symbol.
unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, ErrorKind> {
    let symbol = unsafe { library.get::<T>(name) }.map_err(|err| {
        let name = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name));
        ErrorKind::Library(format!("missing symbol {}: {}", name, err))
    })?;
    Ok(*symbol)
}

// The vendor library upholds the buffer contract: get_channel_data points into
// storage it owns until cleanup_data frees it.
unsafe impl Driver for DtLibrary {
    fn initialize_board(&self) -> i32 {
        unsafe { (self.initialize_board)() }
    }

    fn deinit_board(&self) -> i32 {
        unsafe { (self.deinit_board)() }
    }

    fn measure(&self, args: &MeasureArgs) -> i32 {
        let [gain0, gain1, gain2, gain3] = args.gains;
        unsafe {
            (self.measure)(
                args.use_defaults,
                args.channel_count,
                args.clock_freq,
                args.global_gain,
                gain0,
                gain1,
                gain2,
                gain3,
                args.timer_enabled,
                args.duration,
            )
        }
    }

    fn generate(&self, args: &GenerateArgs) -> i32 {
        unsafe {
            (self.generate)(
                args.use_defaults,
                args.read_input,
                args.clock_freq,
                args.global_gain,
                args.amplitude,
                args.frequency,
                args.timer_enabled,
                args.duration,
            )
        }
    }

    fn get_channel_data(&self) -> ChannelDataStruct {
        unsafe { (self.get_channel_data)() }
    }

    fn cleanup_data(&self) {
        unsafe { (self.cleanup_data)() }
    }

    fn abort(&self) -> Option<i32> {
        self.abort_operation.map(|abort| unsafe { abort() })
    }
}
