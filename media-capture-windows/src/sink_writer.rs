//! `MediaWriter` over an `IMFSinkWriter` writing an AVI container.

use std::path::{Path, PathBuf};
use std::ptr;

use windows::core::HSTRING;
use windows::Win32::Media::MediaFoundation::*;

use media_capture_core::models::error::CaptureError;
use media_capture_core::models::format::MediaFormat;
use media_capture_core::models::sample::Sample;
use media_capture_core::traits::media_writer::{MediaWriter, StreamIndex};

use crate::media_type;
use crate::runtime::MfRuntime;

/// Media Foundation sink writer with the AVI container type.
///
/// The sink creates the output file when it is constructed.
pub struct MfSinkWriter {
    writer: IMFSinkWriter,
    path: PathBuf,
    began: bool,
    finalized: bool,
    _runtime: MfRuntime,
}

impl MfSinkWriter {
    pub fn create(path: &Path) -> Result<Self, CaptureError> {
        let runtime = MfRuntime::new()?;
        let err = |what: &str, e: windows::core::Error| CaptureError::WriteFailure(format!("{}: {}", what, e));

        let writer = unsafe {
            let mut attributes: Option<IMFAttributes> = None;
            MFCreateAttributes(&mut attributes, 1).map_err(|e| err("MFCreateAttributes", e))?;
            let attributes =
                attributes.ok_or_else(|| CaptureError::WriteFailure("MFCreateAttributes returned nothing".into()))?;
            attributes
                .SetGUID(&MF_TRANSCODE_CONTAINERTYPE, &MFTranscodeContainerType_AVI)
                .map_err(|e| err("container type", e))?;

            let url = HSTRING::from(path.as_os_str());
            MFCreateSinkWriterFromURL(&url, None, &attributes).map_err(|e| err("MFCreateSinkWriterFromURL", e))?
        };

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            began: false,
            finalized: false,
            _runtime: runtime,
        })
    }

    fn to_mf_sample(sample: &Sample) -> windows::core::Result<IMFSample> {
        unsafe {
            let buffer = MFCreateMemoryBuffer(sample.len() as u32)?;
            if !sample.is_empty() {
                let mut data = ptr::null_mut();
                buffer.Lock(&mut data, None, None)?;
                ptr::copy_nonoverlapping(sample.data.as_ptr(), data, sample.len());
                buffer.Unlock()?;
            }
            buffer.SetCurrentLength(sample.len() as u32)?;

            let mf_sample = MFCreateSample()?;
            mf_sample.AddBuffer(&buffer)?;
            mf_sample.SetSampleTime(sample.timestamp)?;
            mf_sample.SetSampleDuration(sample.duration)?;
            Ok(mf_sample)
        }
    }
}

impl MediaWriter for MfSinkWriter {
    fn add_stream(&mut self, output: &MediaFormat) -> Result<StreamIndex, CaptureError> {
        let media_type = media_type::create_media_type(output)?;
        let index = unsafe { self.writer.AddStream(&media_type) }
            .map_err(|e| CaptureError::FormatRejected(format!("AddStream {}: {}", output, e)))?;
        Ok(StreamIndex(index))
    }

    fn set_input_format(&mut self, stream: StreamIndex, input: &MediaFormat) -> Result<(), CaptureError> {
        let media_type = media_type::create_media_type(input)?;
        unsafe { self.writer.SetInputMediaType(stream.0, &media_type, None) }
            .map_err(|e| CaptureError::FormatRejected(format!("SetInputMediaType {}: {}", input, e)))
    }

    fn begin_writing(&mut self) -> Result<(), CaptureError> {
        unsafe { self.writer.BeginWriting() }
            .map_err(|e| CaptureError::WriteFailure(format!("BeginWriting failed: {}", e)))?;
        self.began = true;
        Ok(())
    }

    fn write_sample(&mut self, stream: StreamIndex, sample: Sample) -> Result<(), CaptureError> {
        let mf_sample = Self::to_mf_sample(&sample)
            .map_err(|e| CaptureError::WriteFailure(format!("sample allocation failed: {}", e)))?;
        unsafe { self.writer.WriteSample(stream.0, &mf_sample) }
            .map_err(|e| CaptureError::WriteFailure(format!("WriteSample failed: {}", e)))
    }

    fn finalize(&mut self) -> Result<(), CaptureError> {
        if self.finalized || !self.began {
            self.finalized = true;
            return Ok(());
        }
        self.finalized = true;
        unsafe { self.writer.Finalize() }
            .map_err(|e| CaptureError::FinalizeFailure(format!("{}: {}", self.path.display(), e)))
    }

    fn output_path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MfSinkWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            log::warn!("Sink writer finalize on drop failed: {}", e);
        }
    }
}
