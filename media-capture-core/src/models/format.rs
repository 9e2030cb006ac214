use std::fmt;

use serde::{Deserialize, Serialize};

use super::device::DeviceKind;
use super::sample::TICKS_PER_SECOND;

/// Media subtype of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Mjpg,
    Nv12,
    Yuy2,
    Rgb24,
    I420,
    Pcm,
    IeeeFloat,
    /// Anything without a friendly name, e.g. a GUID string.
    Other(String),
}

impl Codec {
    /// FourCC used in AVI stream headers and `BITMAPINFOHEADER.biCompression`.
    ///
    /// Audio codecs and unnamed subtypes have none.
    pub fn fourcc(&self) -> Option<[u8; 4]> {
        match self {
            Self::Mjpg => Some(*b"MJPG"),
            Self::Nv12 => Some(*b"NV12"),
            Self::Yuy2 => Some(*b"YUY2"),
            Self::I420 => Some(*b"I420"),
            // Uncompressed RGB is BI_RGB (0) in a BITMAPINFOHEADER.
            Self::Rgb24 => Some([0, 0, 0, 0]),
            Self::Pcm | Self::IeeeFloat | Self::Other(_) => None,
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Pcm | Self::IeeeFloat)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mjpg => f.write_str("MJPG"),
            Self::Nv12 => f.write_str("NV12"),
            Self::Yuy2 => f.write_str("YUY2"),
            Self::Rgb24 => f.write_str("RGB24"),
            Self::I420 => f.write_str("I420"),
            Self::Pcm => f.write_str("PCM"),
            Self::IeeeFloat => f.write_str("IEEE Float"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Resolution and frame rate of a video stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub fps_numerator: u32,
    pub fps_denominator: u32,
    pub codec: Codec,
}

impl VideoFormat {
    /// Integer frame rate (`fps/1`).
    pub fn new(width: u32, height: u32, fps: u32, codec: Codec) -> Self {
        Self {
            width,
            height,
            fps_numerator: fps,
            fps_denominator: 1,
            codec,
        }
    }

    pub fn fps(&self) -> f64 {
        if self.fps_denominator == 0 {
            return 0.0;
        }
        self.fps_numerator as f64 / self.fps_denominator as f64
    }

    /// Duration of one frame in 100 ns ticks.
    pub fn frame_duration_ticks(&self) -> i64 {
        if self.fps_numerator == 0 {
            return 0;
        }
        TICKS_PER_SECOND * self.fps_denominator as i64 / self.fps_numerator as i64
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Codec: {}, Resolution: {}x{}, FPS: {}",
            self.codec,
            self.width,
            self.height,
            self.fps()
        )
    }
}

/// Sample rate, channel count and bit depth of an audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub codec: Codec,
}

impl AudioFormat {
    pub fn pcm(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            codec: Codec::Pcm,
        }
    }

    pub fn block_align(&self) -> u32 {
        self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.block_align() as u64
    }

    /// Whether `nBlockAlign` fits a `u16` and `nAvgBytesPerSec` a `u32`,
    /// as `WAVEFORMATEX` stores them.
    pub fn fits_wave_header(&self) -> bool {
        self.block_align() <= u16::MAX as u32 && self.bytes_per_second() <= u32::MAX as u64
    }

    /// Playback duration of `byte_len` bytes of this format, in 100 ns ticks.
    ///
    /// Derived from the observed buffer size rather than a nominal buffer
    /// length, since devices deliver variable-sized buffers.
    pub fn duration_ticks(&self, byte_len: usize) -> i64 {
        let bytes_per_second = self.bytes_per_second();
        if bytes_per_second == 0 {
            return 0;
        }
        ((byte_len as u128 * TICKS_PER_SECOND as u128) / bytes_per_second as u128) as i64
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Codec: {}, Sample Rate: {}, Channels: {}, Bits Per Sample: {}",
            self.codec, self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// A concrete stream type, used to configure one reader or one writer stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    Video(VideoFormat),
    Audio(AudioFormat),
}

impl MediaFormat {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Video(_) => DeviceKind::Video,
            Self::Audio(_) => DeviceKind::Audio,
        }
    }

    pub fn codec(&self) -> &Codec {
        match self {
            Self::Video(v) => &v.codec,
            Self::Audio(a) => &a.codec,
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video(v) => v.fmt(f),
            Self::Audio(a) => a.fmt(f),
        }
    }
}

impl From<VideoFormat> for MediaFormat {
    fn from(format: VideoFormat) -> Self {
        Self::Video(format)
    }
}

impl From<AudioFormat> for MediaFormat {
    fn from(format: AudioFormat) -> Self {
        Self::Audio(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_at_30_fps() {
        let format = VideoFormat::new(1920, 1080, 30, Codec::Mjpg);
        assert_eq!(format.frame_duration_ticks(), 333_333);
    }

    #[test]
    fn frame_duration_fractional_rate() {
        let format = VideoFormat {
            width: 640,
            height: 480,
            fps_numerator: 30000,
            fps_denominator: 1001,
            codec: Codec::Yuy2,
        };
        assert_eq!(format.frame_duration_ticks(), 333_666);
        assert_eq!(format.to_string(), format!("Codec: YUY2, Resolution: 640x480, FPS: {}", 30000.0 / 1001.0));
    }

    #[test]
    fn audio_duration_scales_with_buffer_size() {
        let format = AudioFormat::pcm(48000, 2, 16);
        // 48000 * 2 * 2 bytes per second
        assert_eq!(format.bytes_per_second(), 192_000);
        assert_eq!(format.duration_ticks(19_200), 1_000_000); // 100 ms
        assert_eq!(format.duration_ticks(3_840), 200_000); // 20 ms
        assert_eq!(format.duration_ticks(0), 0);
    }

    #[test]
    fn report_lines() {
        let video = MediaFormat::from(VideoFormat::new(1280, 720, 30, Codec::Mjpg));
        assert_eq!(video.to_string(), "Codec: MJPG, Resolution: 1280x720, FPS: 30");

        let audio = MediaFormat::from(AudioFormat::pcm(44100, 1, 16));
        assert_eq!(
            audio.to_string(),
            "Codec: PCM, Sample Rate: 44100, Channels: 1, Bits Per Sample: 16"
        );
    }

    #[test]
    fn wide_audio_formats_do_not_overflow() {
        let format = AudioFormat::pcm(48000, 60000, 32);
        assert_eq!(format.block_align(), 240_000);
        assert_eq!(format.bytes_per_second(), 11_520_000_000);
        assert!(!format.fits_wave_header());
        assert_eq!(format.duration_ticks(240_000), 208);
        assert!(AudioFormat::pcm(48000, 2, 16).fits_wave_header());
    }

    #[test]
    fn zero_rates_do_not_divide_by_zero() {
        let video = VideoFormat::new(1, 1, 0, Codec::Mjpg);
        assert_eq!(video.frame_duration_ticks(), 0);
        let audio = AudioFormat::pcm(0, 2, 16);
        assert_eq!(audio.duration_ticks(100), 0);
    }
}
