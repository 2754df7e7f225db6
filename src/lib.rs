//! Session and acquisition front end for the DT9837 four-channel signal analyzer.
//!
//! A [`DeviceSession`] owns the connection to the board driver. Captures are run
//! with [`measure`] and [`generate`], which copy the driver's sample buffer into a
//! caller-owned [`ChannelDataset`] and hand the buffer back to the driver.

pub mod capture;
pub mod config;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod export;
pub mod generation;
pub mod measurement;
pub mod mock;
pub mod session;
pub mod waveform;

pub use capture::CancelToken;
pub use config::{AcquisitionConfig, AcquisitionParams, Direction, Gain};
pub use dataset::{Channel, ChannelDataset, Reading};
pub use driver::{Driver, DtLibrary};
pub use error::ErrorKind;
pub use generation::{generate, generate_with_cancel};
pub use measurement::{measure, measure_with_cancel};
pub use session::{DeviceSession, SessionState};
pub use waveform::WaveformSpec;
