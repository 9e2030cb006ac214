use std::path::Path;

use crate::models::error::CaptureError;
use crate::models::format::MediaFormat;
use crate::models::sample::Sample;

/// Index of a stream declared on a `MediaWriter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamIndex(pub u32);

/// A muxer that interleaves streams into one container file.
///
/// Call order: `add_stream` + `set_input_format` for every stream, then
/// `begin_writing`, then any number of `write_sample`, then `finalize`.
pub trait MediaWriter {
    /// Declare a stream with its container-side format.
    fn add_stream(&mut self, output: &MediaFormat) -> Result<StreamIndex, CaptureError>;

    /// Declare the format samples will arrive in for `stream`.
    fn set_input_format(&mut self, stream: StreamIndex, input: &MediaFormat) -> Result<(), CaptureError>;

    fn begin_writing(&mut self) -> Result<(), CaptureError>;

    /// Write a stamped sample. Takes ownership of the sample.
    fn write_sample(&mut self, stream: StreamIndex, sample: Sample) -> Result<(), CaptureError>;

    /// Flush trailing data and fix up container headers.
    ///
    /// Calling it again after success is a no-op.
    fn finalize(&mut self) -> Result<(), CaptureError>;

    fn output_path(&self) -> &Path;
}
