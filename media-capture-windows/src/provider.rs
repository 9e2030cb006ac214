//! `CaptureProvider` for Windows Media Foundation.

use std::path::Path;

use media_capture_core::models::device::{CaptureDevice, DeviceKind};
use media_capture_core::models::error::CaptureError;
use media_capture_core::traits::capture_provider::CaptureProvider;
use media_capture_core::traits::media_writer::MediaWriter;
use media_capture_core::traits::sample_reader::SampleReader;

use crate::device_enumerator::DeviceEnumerator;
use crate::runtime::MfRuntime;
use crate::sink_writer::MfSinkWriter;
use crate::source_reader::MfSourceReader;

/// Media Foundation backend.
///
/// Holds no COM state: each call initializes the runtime on the calling
/// thread, so the provider can be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaFoundationProvider;

impl MediaFoundationProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureProvider for MediaFoundationProvider {
    fn enumerate(&self, kind: DeviceKind) -> Result<Vec<CaptureDevice>, CaptureError> {
        let _runtime = MfRuntime::new()?;
        DeviceEnumerator::new(kind)?.list()
    }

    fn open_reader(&self, device: &CaptureDevice) -> Result<Box<dyn SampleReader>, CaptureError> {
        Ok(Box::new(MfSourceReader::open(device)?))
    }

    fn create_writer(&self, output_path: &Path) -> Result<Box<dyn MediaWriter>, CaptureError> {
        Ok(Box::new(MfSinkWriter::create(output_path)?))
    }
}
