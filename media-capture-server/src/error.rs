use std::io;

use thiserror::Error;

use media_capture_core::CaptureError;

/// Errors raised by the command server outside a single command.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}
