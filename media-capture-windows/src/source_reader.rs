//! `SampleReader` over an `IMFSourceReader`.

use std::{ptr, slice};

use windows::Win32::Media::MediaFoundation::*;

use media_capture_core::models::device::{CaptureDevice, DeviceKind};
use media_capture_core::models::error::CaptureError;
use media_capture_core::models::format::MediaFormat;
use media_capture_core::models::sample::Sample;
use media_capture_core::traits::sample_reader::{ReadOutcome, SampleReader};

use crate::device_enumerator::DeviceEnumerator;
use crate::media_type;
use crate::runtime::MfRuntime;

/// Synchronous reader on the first stream of a device's kind.
///
/// Owns the media source and shuts it down on drop. Field order is release
/// order: reader, source, runtime.
pub struct MfSourceReader {
    reader: IMFSourceReader,
    source: IMFMediaSource,
    kind: DeviceKind,
    stream: u32,
    _runtime: MfRuntime,
}

impl MfSourceReader {
    /// Resolve `device` by symbolic link and open a reader on it.
    pub fn open(device: &CaptureDevice) -> Result<Self, CaptureError> {
        let runtime = MfRuntime::new()?;
        let source = DeviceEnumerator::new(device.kind)?.activate(&device.symbolic_link)?;

        let reader = match unsafe { MFCreateSourceReaderFromMediaSource(&source, None) } {
            Ok(reader) => reader,
            Err(e) => {
                unsafe {
                    let _ = source.Shutdown();
                }
                return Err(CaptureError::DeviceOpenFailure(format!(
                    "MFCreateSourceReaderFromMediaSource failed for {}: {}",
                    device.name, e
                )));
            }
        };

        let stream = match device.kind {
            DeviceKind::Video => MF_SOURCE_READER_FIRST_VIDEO_STREAM.0 as u32,
            DeviceKind::Audio => MF_SOURCE_READER_FIRST_AUDIO_STREAM.0 as u32,
        };

        log::debug!("Opened {} reader on {}", device.kind, device.name);
        Ok(Self {
            reader,
            source,
            kind: device.kind,
            stream,
            _runtime: runtime,
        })
    }

    fn copy_sample(&self, sample: &IMFSample) -> Result<Vec<u8>, CaptureError> {
        let err = |e: windows::core::Error| CaptureError::Unknown(format!("sample buffer: {}", e));
        unsafe {
            let buffer = sample.ConvertToContiguousBuffer().map_err(err)?;
            let mut data = ptr::null_mut();
            let mut length = 0u32;
            buffer.Lock(&mut data, None, Some(&mut length)).map_err(err)?;
            let bytes = if data.is_null() {
                Vec::new()
            } else {
                slice::from_raw_parts(data, length as usize).to_vec()
            };
            buffer.Unlock().map_err(err)?;
            Ok(bytes)
        }
    }
}

impl SampleReader for MfSourceReader {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn native_formats(&mut self) -> Result<Vec<MediaFormat>, CaptureError> {
        let mut formats = Vec::new();
        let mut index = 0;
        // GetNativeMediaType fails with MF_E_NO_MORE_TYPES past the last entry.
        while let Ok(native) = unsafe { self.reader.GetNativeMediaType(self.stream, index) } {
            match media_type::to_media_format(&native) {
                Ok(format) => formats.push(format),
                Err(e) => log::debug!("Skipping native type {}: {}", index, e),
            }
            index += 1;
        }
        Ok(formats)
    }

    fn set_format(&mut self, format: &MediaFormat) -> Result<(), CaptureError> {
        if format.kind() != self.kind {
            return Err(CaptureError::FormatRejected(format!("{} format on a {} stream", format.kind(), self.kind)));
        }
        let media_type = media_type::create_media_type(format)?;
        unsafe {
            self.reader
                .SetCurrentMediaType(self.stream, None, &media_type)
                .map_err(|e| CaptureError::FormatRejected(format!("{}: {}", format, e)))
        }
    }

    fn read_sample(&mut self) -> Result<ReadOutcome, CaptureError> {
        let mut flags = 0u32;
        let mut sample: Option<IMFSample> = None;
        unsafe {
            self.reader
                .ReadSample(self.stream, 0, None, Some(&mut flags), None, Some(&mut sample))
                .map_err(|e| CaptureError::Unknown(format!("ReadSample failed: {}", e)))?;
        }

        if flags & MF_SOURCE_READERF_ENDOFSTREAM.0 as u32 != 0 {
            return Err(CaptureError::Unknown("end of stream".into()));
        }
        if flags & MF_SOURCE_READERF_STREAMTICK.0 as u32 != 0 {
            return Ok(ReadOutcome::NoData);
        }
        match sample {
            Some(sample) => Ok(ReadOutcome::Sample(Sample::new(self.kind, self.copy_sample(&sample)?))),
            None => Ok(ReadOutcome::NoData),
        }
    }
}

impl Drop for MfSourceReader {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.source.Shutdown() {
                log::warn!("Media source shutdown failed: {}", e);
            }
        }
    }
}
