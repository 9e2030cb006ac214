use thiserror::Error;

/// Errors that can occur while enumerating, negotiating, or capturing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture devices found")]
    EnumerationEmpty,

    #[error("device enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("failed to open device: {0}")]
    DeviceOpenFailure(String),

    #[error("format rejected: {0}")]
    FormatRejected(String),

    #[error("no sample available after {attempts} attempts")]
    SampleTimeout { attempts: u32 },

    #[error("write failed: {0}")]
    WriteFailure(String),

    #[error("failed to create directory: {0}")]
    DirectoryCreateFailure(String),

    #[error("finalize failed: {0}")]
    FinalizeFailure(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
