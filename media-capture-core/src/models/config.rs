use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::format::{AudioFormat, Codec, VideoFormat};

/// How the sample pump holds real-time cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Sleep `frame_budget - elapsed` after every iteration. Overruns are
    /// never paid back, so drift accumulates.
    PerFrame,
    /// Sleep until `start + (frame + 1) * frame_budget`.
    Deadline,
}

/// How output files are named inside the base directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNaming {
    /// `video_camera_<index>.avi`
    Indexed,
    /// `video_camera_<index>_<YYYY-MM-DD_hh-mm-ss>.avi`
    Timestamped,
}

/// Configuration for capture sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Capture length in seconds (default: 5).
    pub duration_secs: u32,

    /// Target frame rate (default: 30). Also the pump's tick rate.
    pub fps: u32,

    /// Requested video resolution (default: 1920x1080).
    pub video_width: u32,
    pub video_height: u32,

    /// Requested video subtype (default: MJPG).
    pub video_codec: Codec,

    /// Requested PCM audio format (default: 48 kHz, stereo, 16-bit).
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    pub audio_bits_per_sample: u16,

    /// Reads attempted per sample before giving up (default: 10).
    pub max_read_attempts: u32,

    /// Sleep between read attempts in milliseconds (default: 100).
    pub retry_delay_ms: u64,

    pub pacing: Pacing,

    pub file_naming: FileNaming,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.fps == 0 {
            return Err("fps must be positive".into());
        }
        if self.duration_secs == 0 {
            return Err("duration must be positive".into());
        }
        if self.video_width == 0 || self.video_height == 0 {
            return Err(format!(
                "invalid resolution: {}x{}",
                self.video_width, self.video_height
            ));
        }
        if self.audio_sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.audio_channels == 0 {
            return Err("channel count must be positive".into());
        }
        if ![8, 16, 24, 32].contains(&self.audio_bits_per_sample) {
            return Err(format!("unsupported bit depth: {}", self.audio_bits_per_sample));
        }
        if self.max_read_attempts == 0 {
            return Err("at least one read attempt is required".into());
        }

        let video = self.video_format();
        // 32-bit frame size at the widest pixel layout
        if video.width as u64 * video.height as u64 * 4 > u32::MAX as u64 {
            return Err(format!("resolution too large: {}x{}", video.width, video.height));
        }
        let audio = self.audio_format();
        if !audio.fits_wave_header() {
            return Err(format!(
                "audio byte rate out of range: {} Hz, {} channels, {} bits",
                audio.sample_rate, audio.channels, audio.bits_per_sample
            ));
        }
        Ok(())
    }

    pub fn video_format(&self) -> VideoFormat {
        VideoFormat::new(self.video_width, self.video_height, self.fps, self.video_codec.clone())
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::pcm(self.audio_sample_rate, self.audio_channels, self.audio_bits_per_sample)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Number of video frames a session writes: `duration_secs * fps`.
    pub fn total_frames(&self) -> u64 {
        self.duration_secs as u64 * self.fps as u64
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            duration_secs: 5,
            fps: 30,
            video_width: 1920,
            video_height: 1080,
            video_codec: Codec::Mjpg,
            audio_sample_rate: 48000,
            audio_channels: 2,
            audio_bits_per_sample: 16,
            max_read_attempts: 10,
            retry_delay_ms: 100,
            pacing: Pacing::Deadline,
            file_naming: FileNaming::Indexed,
        }
    }
}
