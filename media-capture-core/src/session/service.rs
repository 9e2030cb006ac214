use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::catalog::pairing::{audio_devices_or_none, find_linked_audio};
use crate::catalog::report;
use crate::catalog::usb_ids::UsbIdTable;
use crate::models::config::{CaptureConfiguration, FileNaming};
use crate::models::device::{CaptureDevice, DeviceKind};
use crate::models::error::CaptureError;
use crate::models::recording_result::{Photo, RecordingResult};
use crate::session::negotiation::{self, StreamLayout};
use crate::session::pump::{self, AudioInput, PumpSettings, SamplePump};
use crate::storage::checksum;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::clock::{Clock, SystemClock};

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Which streams a batch capture records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Mux the linked microphone, if one is found.
    WithAudio,
    VideoOnly,
}

/// Output file name for camera `index`.
pub fn video_file_name(index: usize, naming: FileNaming, now: DateTime<Local>) -> String {
    match naming {
        FileNaming::Indexed => format!("video_camera_{}.avi", index),
        FileNaming::Timestamped => format!("video_camera_{}_{}.avi", index, now.format(FILE_TIMESTAMP_FORMAT)),
    }
}

/// Still-frame name for camera `index`.
pub fn photo_file_name(index: usize, now: DateTime<Local>) -> String {
    format!("photo_camera_{}_{}.jpg", index, now.format(FILE_TIMESTAMP_FORMAT))
}

/// Capture orchestrator over one backend.
///
/// Every session acquires, in order: video reader, audio reader, writer.
/// They are held as locals and released in reverse order on every exit path.
/// Sessions run one after another on the calling thread.
pub struct CaptureService<P: CaptureProvider> {
    provider: P,
    config: CaptureConfiguration,
    clock: Arc<dyn Clock>,
}

impl<P: CaptureProvider> CaptureService<P> {
    pub fn new(provider: P, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidConfiguration)?;
        Ok(Self {
            provider,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the wall clock, e.g. with a virtual one.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    /// All cameras. `EnumerationEmpty` when there are none.
    pub fn video_devices(&self) -> Result<Vec<CaptureDevice>, CaptureError> {
        let devices = self.provider.enumerate(DeviceKind::Video)?;
        if devices.is_empty() {
            return Err(CaptureError::EnumerationEmpty);
        }
        Ok(devices)
    }

    /// Text report of every camera and its linked microphone.
    pub fn describe_devices(&self, usb_ids: &UsbIdTable) -> Result<String, CaptureError> {
        report::describe_all_devices(&self.provider, usb_ids)
    }

    /// Record one camera (and optionally its microphone) into `output_path`.
    pub fn capture_one_device(
        &self,
        video: &CaptureDevice,
        audio: Option<&CaptureDevice>,
        output_path: &Path,
    ) -> Result<RecordingResult, CaptureError> {
        let config = &self.config;

        let mut video_reader = self.provider.open_reader(video)?;
        let video_format = negotiation::apply_video_format(
            video_reader.as_mut(),
            config.video_width,
            config.video_height,
            config.fps,
            config.video_codec.clone(),
        )?;

        let mut audio_reader = match audio {
            Some(device) => {
                let mut reader = self.provider.open_reader(device)?;
                let format = negotiation::apply_audio_format(
                    reader.as_mut(),
                    config.audio_sample_rate,
                    config.audio_channels,
                    config.audio_bits_per_sample,
                )?;
                Some((reader, format))
            }
            None => None,
        };

        let mut writer = self.provider.create_writer(output_path)?;
        let layout: StreamLayout = negotiation::negotiate_writer(
            writer.as_mut(),
            &video_format,
            audio_reader.as_ref().map(|(_, format)| format),
        )?;

        log::info!(
            "Recording {} ({} streams) to {}",
            video.name,
            layout.stream_count(),
            output_path.display()
        );

        let audio_input = audio_reader.as_mut().map(|(reader, format)| AudioInput {
            reader: reader.as_mut(),
            format: format.clone(),
        });
        let stats = SamplePump::new(
            PumpSettings::from_config(config),
            self.clock.as_ref(),
            video_reader.as_mut(),
            audio_input,
            writer.as_mut(),
            layout,
        )
        .run()?;

        let checksum = checksum::sha256_file(output_path)
            .map_err(|e| CaptureError::FinalizeFailure(format!("checksum failed: {}", e)))?;

        Ok(RecordingResult {
            file_path: output_path.to_path_buf(),
            device_name: video.name.clone(),
            frames_written: stats.frames_written,
            audio_buffers_written: stats.audio_buffers_written,
            audio_bytes_written: stats.audio_bytes_written,
            has_audio: layout.audio.is_some(),
            duration_secs: stats.video_duration_secs(),
            checksum,
        })
    }

    /// Record every camera in turn into `base_path`.
    ///
    /// Returns the files of the sessions that completed. No cameras gives an
    /// empty list and leaves the filesystem untouched.
    pub fn capture_all_devices(&self, base_path: &Path, mode: CaptureMode) -> Result<Vec<PathBuf>, CaptureError> {
        match self.video_devices() {
            Ok(videos) => self.capture_devices(&videos, base_path, mode),
            Err(CaptureError::EnumerationEmpty) => {
                log::warn!("No cameras found.");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Record the given cameras in turn into `base_path`.
    ///
    /// A failing camera is logged and left out of the result.
    pub fn capture_devices(
        &self,
        videos: &[CaptureDevice],
        base_path: &Path,
        mode: CaptureMode,
    ) -> Result<Vec<PathBuf>, CaptureError> {
        if videos.is_empty() {
            return Ok(Vec::new());
        }
        let audios = match mode {
            CaptureMode::WithAudio => audio_devices_or_none(&self.provider),
            CaptureMode::VideoOnly => Vec::new(),
        };

        fs::create_dir_all(base_path).map_err(|e| {
            CaptureError::DirectoryCreateFailure(format!("{}: {}", base_path.display(), e))
        })?;

        let mut paths = Vec::with_capacity(videos.len());
        for video in videos {
            let audio = find_linked_audio(video, &audios);
            if mode == CaptureMode::WithAudio && audio.is_none() {
                log::info!("No linked audio device for {}; recording video only", video.name);
            }

            let path = base_path.join(video_file_name(video.index, self.config.file_naming, Local::now()));
            match self.capture_one_device(video, audio, &path) {
                Ok(result) => {
                    log::info!(
                        "Recorded {}: {} frames, {} audio buffers, {:.2}s, sha256 {}",
                        result.file_path.display(),
                        result.frames_written,
                        result.audio_buffers_written,
                        result.duration_secs,
                        result.checksum
                    );
                    paths.push(result.file_path);
                }
                Err(e) => log::error!("Capture from camera {} ({}) failed: {}", video.index, video.name, e),
            }
        }
        Ok(paths)
    }

    /// Grab one frame from every camera.
    pub fn capture_photos(&self) -> Result<Vec<Photo>, CaptureError> {
        match self.video_devices() {
            Ok(videos) => Ok(self.capture_photos_from(&videos)),
            Err(CaptureError::EnumerationEmpty) => {
                log::warn!("No cameras found.");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Grab one frame from each of `videos`.
    ///
    /// Empty frames and failing cameras are skipped.
    pub fn capture_photos_from(&self, videos: &[CaptureDevice]) -> Vec<Photo> {
        let mut photos = Vec::with_capacity(videos.len());
        for video in videos {
            match self.capture_photo(video) {
                Ok(Some(photo)) => {
                    log::info!("Captured {} ({} bytes)", photo.file_name, photo.data.len());
                    photos.push(photo);
                }
                Ok(None) => log::warn!("Camera {} ({}) returned an empty frame", video.index, video.name),
                Err(e) => log::error!("Photo from camera {} ({}) failed: {}", video.index, video.name, e),
            }
        }
        photos
    }

    fn capture_photo(&self, video: &CaptureDevice) -> Result<Option<Photo>, CaptureError> {
        let config = &self.config;
        let mut reader = self.provider.open_reader(video)?;
        negotiation::apply_video_format(
            reader.as_mut(),
            config.video_width,
            config.video_height,
            config.fps,
            config.video_codec.clone(),
        )?;
        let sample = pump::read_with_retry(
            reader.as_mut(),
            config.max_read_attempts,
            config.retry_delay(),
            self.clock.as_ref(),
        )?;
        if sample.is_empty() {
            return Ok(None);
        }
        Ok(Some(Photo {
            file_name: photo_file_name(video.index, Local::now()),
            data: sample.data,
        }))
    }
}
