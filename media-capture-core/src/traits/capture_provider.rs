use std::path::Path;

use crate::models::device::{CaptureDevice, DeviceKind};
use crate::models::error::CaptureError;
use crate::storage::avi_writer::AviWriter;
use crate::traits::media_writer::MediaWriter;
use crate::traits::sample_reader::SampleReader;

/// Interface for platform-specific capture backends.
///
/// Implemented by:
/// - `MediaFoundationProvider` (Windows)
/// - `testing::FakeProvider` (scripted devices for tests)
///
/// Readers and writers handed out by a provider own their platform
/// resources and release them on drop.
pub trait CaptureProvider: Send + Sync {
    /// List every device of `kind`. An empty list is not an error.
    fn enumerate(&self, kind: DeviceKind) -> Result<Vec<CaptureDevice>, CaptureError>;

    /// Open a reader on the device's first stream of its kind.
    fn open_reader(&self, device: &CaptureDevice) -> Result<Box<dyn SampleReader>, CaptureError>;

    /// Create a muxing writer for `output_path`.
    ///
    /// Defaults to the portable AVI muxer.
    fn create_writer(&self, output_path: &Path) -> Result<Box<dyn MediaWriter>, CaptureError> {
        Ok(Box::new(AviWriter::new(output_path.to_path_buf())))
    }
}
