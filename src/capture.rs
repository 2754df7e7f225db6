use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crate::config::NUM_CHANNELS;
use crate::dataset::ChannelDataset;
use crate::driver::{ChannelDataStruct, Driver};
use crate::error::{ErrorKind, check_status};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cooperative stop signal for blocking captures. Clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    stop: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Issue one blocking native call while a watcher thread turns a cancellation
/// into a driver abort.
pub(crate) fn run_native<D: Driver + ?Sized>(
    driver: &D,
    cancel: &CancelToken,
    call: impl FnOnce(&D) -> i32,
) -> Result<(), ErrorKind> {
    if cancel.is_cancelled() {
        return Err(ErrorKind::Cancelled);
    }

    let done = AtomicBool::new(false);
    let status = thread::scope(|scope| {
        let watcher = scope.spawn(|| watch_cancel(driver, cancel, &done));
        let status = call(driver);
        done.store(true, Ordering::Release);
        watcher.thread().unpark();
        status
    });
    log::debug!("native call returned {}", status);
    check_status(status)
}

fn watch_cancel<D: Driver + ?Sized>(driver: &D, cancel: &CancelToken, done: &AtomicBool) {
    while !done.load(Ordering::Acquire) {
        if cancel.is_cancelled() {
            // the call may have returned while this thread was parked
            if done.load(Ordering::Acquire) {
                return;
            }
            match driver.abort() {
                Some(status) => log::info!("abort requested, driver returned {}", status),
                None => log::warn!(
                    "board driver cannot abort; waiting for the running operation to finish"
                ),
            }
            return;
        }
        thread::park_timeout(CANCEL_POLL_INTERVAL);
    }
}

/// The driver's acquisition buffer. Released exactly once, on drop.
pub(crate) struct NativeBuffer<'a, D: Driver + ?Sized> {
    driver: &'a D,
    raw: ChannelDataStruct,
}

impl<'a, D: Driver + ?Sized> NativeBuffer<'a, D> {
    pub(crate) fn retrieve(driver: &'a D) -> Self {
        let raw = driver.get_channel_data();
        log::debug!(
            "retrieved buffer: {} of {} readings",
            raw.num_readings,
            raw.max_readings
        );
        Self { driver, raw }
    }

    pub(crate) fn copy_out(&self) -> Result<ChannelDataset, ErrorKind> {
        let num_readings = usize::try_from(self.raw.num_readings).map_err(|_| {
            ErrorKind::InvalidBuffer(format!("negative reading count {}", self.raw.num_readings))
        })?;
        let max_readings = usize::try_from(self.raw.max_readings).map_err(|_| {
            ErrorKind::InvalidBuffer(format!("negative capacity {}", self.raw.max_readings))
        })?;
        if num_readings > max_readings {
            return Err(ErrorKind::InvalidBuffer(format!(
                "{} readings exceed capacity {}",
                num_readings, max_readings
            )));
        }

        let mut channels: [Vec<f64>; NUM_CHANNELS] = Default::default();
        for (values, &ptr) in channels.iter_mut().zip(&self.raw.channel) {
            *values = unsafe { copy_series(ptr, num_readings)? };
        }
        let time_ms = unsafe { copy_series(self.raw.time_ms, num_readings)? };

        ChannelDataset::new(channels, time_ms, max_readings)
    }
}

impl<D: Driver + ?Sized> Drop for NativeBuffer<'_, D> {
    fn drop(&mut self) {
        self.driver.cleanup_data();
        log::debug!("released native buffer");
    }
}

/// # Safety
///
/// A non-null `ptr` must address `len` initialized values.
unsafe fn copy_series(ptr: *const f64, len: usize) -> Result<Vec<f64>, ErrorKind> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(ErrorKind::InvalidBuffer("null sample pointer".to_string()));
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec())
}

/// Copy the driver's buffer into a dataset and release it.
pub(crate) fn capture<D: Driver + ?Sized>(driver: &D) -> Result<ChannelDataset, ErrorKind> {
    let buffer = NativeBuffer::retrieve(driver);
    let dataset = buffer.copy_out();
    drop(buffer);
    dataset
}
