use std::time::Instant;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::driver::Driver;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

/// Proof of an open board connection. Only a [`DeviceSession`] creates one.
#[derive(Debug)]
pub struct DeviceHandle {
    connected_at: Instant,
}

impl DeviceHandle {
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }
}

/// A connection to one board.
///
/// Operations hold the session lock from start to finish, so captures issued
/// from several threads against one session run one after another.
pub struct DeviceSession<D: Driver> {
    driver: D,
    handle: Mutex<Option<DeviceHandle>>,
}

impl<D: Driver> DeviceSession<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            handle: Mutex::new(None),
        }
    }

    pub fn connect(&self) -> Result<(), ErrorKind> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Err(ErrorKind::AlreadyConnected);
        }

        let status = self.driver.initialize_board();
        debug!("initialize_board returned {}", status);
        if status != 0 {
            warn!("board initialization failed with status {}", status);
            return Err(ErrorKind::InitConfigFailure { status });
        }

        *handle = Some(DeviceHandle {
            connected_at: Instant::now(),
        });
        info!("board connected");
        Ok(())
    }

    /// Close the connection. The handle is dropped even when the driver
    /// reports a failure.
    pub fn disconnect(&self) -> Result<(), ErrorKind> {
        let mut guard = self.handle.lock();
        let Some(handle) = guard.take() else {
            return Err(ErrorKind::NotConnected);
        };
        close(&self.driver, handle)
    }

    /// Blocks while an operation is running on another thread.
    pub fn state(&self) -> SessionState {
        match *self.handle.lock() {
            Some(_) => SessionState::Connected,
            None => SessionState::Disconnected,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run `f` with the session locked, failing fast when not connected.
    pub(crate) fn with_handle<T>(
        &self,
        f: impl FnOnce(&D, &DeviceHandle) -> Result<T, ErrorKind>,
    ) -> Result<T, ErrorKind> {
        let guard = self.handle.lock();
        let handle = guard.as_ref().ok_or(ErrorKind::NotConnected)?;
        f(&self.driver, handle)
    }
}

fn close<D: Driver>(driver: &D, handle: DeviceHandle) -> Result<(), ErrorKind> {
    let status = driver.deinit_board();
    debug!("deinit_board returned {}", status);
    info!(
        "board disconnected after {:.02}s",
        handle.connected_at.elapsed().as_secs_f32()
    );
    if status != 0 {
        warn!("board deinitialization failed with status {}", status);
        return Err(ErrorKind::DeinitConfigFailure { status });
    }
    Ok(())
}

impl<D: Driver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            warn!("session dropped while connected, closing board");
            let _ = close(&self.driver, handle);
        }
    }
}
