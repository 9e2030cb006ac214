use crate::models::device::DeviceKind;
use crate::models::error::CaptureError;
use crate::models::format::MediaFormat;
use crate::models::sample::Sample;

/// Outcome of a single read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Sample(Sample),
    /// The device answered but had nothing yet (stream tick, empty read).
    NoData,
}

/// A device-backed source of samples for one stream.
pub trait SampleReader {
    fn kind(&self) -> DeviceKind;

    /// Stream types the device advertises natively.
    fn native_formats(&mut self) -> Result<Vec<MediaFormat>, CaptureError>;

    /// Make `format` the active output type. Fails with `FormatRejected`
    /// if the device does not support it.
    fn set_format(&mut self, format: &MediaFormat) -> Result<(), CaptureError>;

    /// Read one sample. May block inside the device.
    fn read_sample(&mut self) -> Result<ReadOutcome, CaptureError>;
}
