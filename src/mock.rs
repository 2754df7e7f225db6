//! In-process stand-in for the board driver.
//!
//! Used by the test suite and by `dt-capture --mock` for dry runs. Status codes
//! are scripted per entry point, captures synthesize a deterministic signal, and
//! every native call is counted.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use parking_lot::Mutex;

use crate::config::NUM_CHANNELS;
use crate::driver::{ChannelDataStruct, Driver, GenerateArgs, MeasureArgs};

const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Number of times each native entry point was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub initialize_board: usize,
    pub deinit_board: usize,
    pub measure: usize,
    pub generate: usize,
    pub get_channel_data: usize,
    pub cleanup_data: usize,
    pub abort: usize,
}

struct Buffer {
    channels: [Vec<f64>; NUM_CHANNELS],
    time_ms: Vec<f64>,
    max_readings: usize,
}

struct State {
    init_status: i32,
    deinit_status: i32,
    measure_status: i32,
    generate_status: i32,
    readings: usize,
    buffer: Option<Buffer>,
    counts: CallCounts,
    last_measure: Option<MeasureArgs>,
    last_generate: Option<GenerateArgs>,
}

pub struct MockDriver {
    state: Mutex<State>,
    aborted: AtomicBool,
    abortable: bool,
    null_time_buffer: bool,
    overreport_readings: bool,
    call_time: Duration,
    busy: AtomicBool,
    overlapped: AtomicBool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                init_status: 0,
                deinit_status: 0,
                measure_status: 0,
                generate_status: 0,
                readings: 64,
                buffer: None,
                counts: CallCounts::default(),
                last_measure: None,
                last_generate: None,
            }),
            aborted: AtomicBool::new(false),
            abortable: true,
            null_time_buffer: false,
            overreport_readings: false,
            call_time: Duration::ZERO,
            busy: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
        }
    }

    pub fn with_init_status(self, status: i32) -> Self {
        self.state.lock().init_status = status;
        self
    }

    pub fn with_deinit_status(self, status: i32) -> Self {
        self.state.lock().deinit_status = status;
        self
    }

    pub fn with_measure_status(self, status: i32) -> Self {
        self.state.lock().measure_status = status;
        self
    }

    pub fn with_generate_status(self, status: i32) -> Self {
        self.state.lock().generate_status = status;
        self
    }

    /// Readings produced by each capture, capped by the buffer capacity.
    pub fn with_readings(self, readings: usize) -> Self {
        self.state.lock().readings = readings;
        self
    }

    /// Behave like a driver without an abort entry point. Untimed operations
    /// then run for the call time instead of blocking until aborted.
    pub fn without_abort(mut self) -> Self {
        self.abortable = false;
        self
    }

    /// How long timed captures, and untimed ones without abort support, take to return.
    pub fn with_call_time(mut self, call_time: Duration) -> Self {
        self.call_time = call_time;
        self
    }

    pub fn with_null_time_buffer(mut self) -> Self {
        self.null_time_buffer = true;
        self
    }

    pub fn with_overreported_readings(mut self) -> Self {
        self.overreport_readings = true;
        self
    }

    pub fn counts(&self) -> CallCounts {
        self.state.lock().counts
    }

    pub fn last_measure(&self) -> Option<MeasureArgs> {
        self.state.lock().last_measure
    }

    pub fn last_generate(&self) -> Option<GenerateArgs> {
        self.state.lock().last_generate
    }

    /// True if two `measure`/`generate` calls were ever in flight at once.
    pub fn saw_overlap(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// Allocate the acquisition buffer the way the board does after a capture.
    pub fn fill_buffer(&self, readings: usize, max_readings: usize, clock_hz: f32) {
        let readings = readings.min(max_readings);
        let period_ms = 1000.0 / f64::from(clock_hz);
        let time_ms = (0..readings).map(|i| i as f64 * period_ms).collect();
        let channels = std::array::from_fn(|ch| {
            (0..readings)
                .map(|i| ((i as f64) * 0.1234567 + ch as f64).sin())
                .collect()
        });
        self.state.lock().buffer = Some(Buffer {
            channels,
            time_ms,
            max_readings,
        });
    }

    fn block(&self, timer_enabled: bool) {
        if timer_enabled || !self.abortable {
            thread::sleep(self.call_time);
            return;
        }
        while !self.aborted.swap(false, Ordering::SeqCst) {
            thread::sleep(ABORT_POLL_INTERVAL);
        }
    }

    fn enter(&self) {
        // an abort that landed after the previous call returned
        self.aborted.store(false, Ordering::SeqCst);
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    fn capacity(duration: i32) -> usize {
        // the board sizes its buffer at twice 1 kS/s for the requested duration
        (duration.max(1) as usize) * 2000
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

// Buffer pointers handed out by get_channel_data point into `State::buffer`,
// which is only replaced by a new capture or dropped by cleanup_data.
unsafe impl Driver for MockDriver {
    fn initialize_board(&self) -> i32 {
        let mut state = self.state.lock();
        state.counts.initialize_board += 1;
        state.init_status
    }

    fn deinit_board(&self) -> i32 {
        let mut state = self.state.lock();
        state.counts.deinit_board += 1;
        state.deinit_status
    }

    fn measure(&self, args: &MeasureArgs) -> i32 {
        self.enter();
        let (status, readings) = {
            let mut state = self.state.lock();
            state.counts.measure += 1;
            state.last_measure = Some(*args);
            (state.measure_status, state.readings)
        };
        if status == 0 {
            self.block(args.timer_enabled);
            self.fill_buffer(readings, Self::capacity(args.duration), args.clock_freq);
        }
        // keep the call open long enough for overlapping callers to collide
        thread::sleep(ABORT_POLL_INTERVAL);
        self.leave();
        status
    }

    fn generate(&self, args: &GenerateArgs) -> i32 {
        self.enter();
        let (status, readings) = {
            let mut state = self.state.lock();
            state.counts.generate += 1;
            state.last_generate = Some(*args);
            (state.generate_status, state.readings)
        };
        if status == 0 {
            self.block(args.timer_enabled);
            if args.read_input {
                self.fill_buffer(readings, Self::capacity(args.duration), args.clock_freq);
            }
        }
        self.leave();
        status
    }

    fn get_channel_data(&self) -> ChannelDataStruct {
        let mut state = self.state.lock();
        state.counts.get_channel_data += 1;
        let Some(buffer) = state.buffer.as_mut() else {
            return ChannelDataStruct::empty();
        };

        let mut raw = ChannelDataStruct {
            channel: [std::ptr::null_mut(); NUM_CHANNELS],
            time_ms: buffer.time_ms.as_mut_ptr(),
            num_readings: buffer.time_ms.len() as i32,
            max_readings: buffer.max_readings as i32,
        };
        for (ptr, values) in raw.channel.iter_mut().zip(buffer.channels.iter_mut()) {
            *ptr = values.as_mut_ptr();
        }
        if self.null_time_buffer {
            raw.time_ms = std::ptr::null_mut();
        }
        if self.overreport_readings {
            raw.num_readings = raw.max_readings + 1;
        }
        raw
    }

    fn cleanup_data(&self) {
        let mut state = self.state.lock();
        state.counts.cleanup_data += 1;
        state.buffer = None;
    }

    fn abort(&self) -> Option<i32> {
        self.state.lock().counts.abort += 1;
        if !self.abortable {
            return None;
        }
        self.aborted.store(true, Ordering::SeqCst);
        Some(0)
    }
}
