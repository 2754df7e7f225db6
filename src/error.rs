/// Failure taxonomy for the board and for this crate.
///
/// The first block of variants mirrors the status codes returned by the native
/// driver; the rest are raised on the Rust side and never cross the FFI boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("native error 0 (SUCCESS)")]
    Success,

    #[error("native error -1 (ERROR_MISC_FAILURE)")]
    MiscFailure,

    /// Carries the status the driver actually returned, which need not be 1.
    #[error("native error {status} (ERROR_INIT_CONFIG_FAILURE)")]
    InitConfigFailure { status: i32 },

    #[error("native error 2 (ERROR_BOARD_CONFIG_FAILURE)")]
    BoardConfigFailure,

    #[error("native error 3 (ERROR_CHANNEL_CONFIG_FAILURE)")]
    ChannelConfigFailure,

    #[error("native error 4 (ERROR_DATA_CONFIG_FAILURE)")]
    DataConfigFailure,

    #[error("native error 5 (ERROR_MEASUREMENT_FAILURE)")]
    MeasurementFailure,

    #[error("native error 6 (ERROR_OUTPUT_FAILURE)")]
    OutputFailure,

    #[error("native error {status} (ERROR_DEINIT_CONFIG_FAILURE)")]
    DeinitConfigFailure { status: i32 },

    #[error("native error {0} (ERROR_UNKNOWN_FAILURE)")]
    UnknownFailure(i32),

    #[error("device session is not connected")]
    NotConnected,

    #[error("device session is already connected")]
    AlreadyConnected,

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid native buffer: {0}")]
    InvalidBuffer(String),

    #[error("native library error: {0}")]
    Library(String),
}

impl ErrorKind {
    /// Map a native status code onto the taxonomy. Total: unlisted codes become
    /// `UnknownFailure`.
    pub fn from_status(code: i32) -> ErrorKind {
        match code {
            0 => ErrorKind::Success,
            -1 => ErrorKind::MiscFailure,
            1 => ErrorKind::InitConfigFailure { status: 1 },
            2 => ErrorKind::BoardConfigFailure,
            3 => ErrorKind::ChannelConfigFailure,
            4 => ErrorKind::DataConfigFailure,
            5 => ErrorKind::MeasurementFailure,
            6 => ErrorKind::OutputFailure,
            7 => ErrorKind::DeinitConfigFailure { status: 7 },
            other => ErrorKind::UnknownFailure(other),
        }
    }

    /// The native status code, or `None` for errors raised on the Rust side.
    pub fn code(&self) -> Option<i32> {
        match self {
            ErrorKind::Success => Some(0),
            ErrorKind::MiscFailure => Some(-1),
            ErrorKind::InitConfigFailure { status } => Some(*status),
            ErrorKind::BoardConfigFailure => Some(2),
            ErrorKind::ChannelConfigFailure => Some(3),
            ErrorKind::DataConfigFailure => Some(4),
            ErrorKind::MeasurementFailure => Some(5),
            ErrorKind::OutputFailure => Some(6),
            ErrorKind::DeinitConfigFailure { status } => Some(*status),
            ErrorKind::UnknownFailure(code) => Some(*code),
            ErrorKind::NotConnected
            | ErrorKind::AlreadyConnected
            | ErrorKind::Cancelled
            | ErrorKind::InvalidBuffer(_)
            | ErrorKind::Library(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Success => "SUCCESS",
            ErrorKind::MiscFailure => "ERROR_MISC_FAILURE",
            ErrorKind::InitConfigFailure { .. } => "ERROR_INIT_CONFIG_FAILURE",
            ErrorKind::BoardConfigFailure => "ERROR_BOARD_CONFIG_FAILURE",
            ErrorKind::ChannelConfigFailure => "ERROR_CHANNEL_CONFIG_FAILURE",
            ErrorKind::DataConfigFailure => "ERROR_DATA_CONFIG_FAILURE",
            ErrorKind::MeasurementFailure => "ERROR_MEASUREMENT_FAILURE",
            ErrorKind::OutputFailure => "ERROR_OUTPUT_FAILURE",
            ErrorKind::DeinitConfigFailure { .. } => "ERROR_DEINIT_CONFIG_FAILURE",
            ErrorKind::UnknownFailure(_) => "ERROR_UNKNOWN_FAILURE",
            ErrorKind::NotConnected => "ERROR_NOT_CONNECTED",
            ErrorKind::AlreadyConnected => "ERROR_ALREADY_CONNECTED",
            ErrorKind::Cancelled => "ERROR_CANCELLED",
            ErrorKind::InvalidBuffer(_) => "ERROR_INVALID_BUFFER",
            ErrorKind::Library(_) => "ERROR_LIBRARY",
        }
    }
}

/// `Ok(())` for a zero status, the translated error otherwise.
pub fn check_status(code: i32) -> Result<(), ErrorKind> {
    match ErrorKind::from_status(code) {
        ErrorKind::Success => Ok(()),
        err => Err(err),
    }
}
