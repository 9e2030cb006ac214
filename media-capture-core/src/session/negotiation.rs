//! Format negotiation between readers and the writer.

use crate::models::device::DeviceKind;
use crate::models::error::CaptureError;
use crate::models::format::{AudioFormat, Codec, MediaFormat, VideoFormat};
use crate::traits::media_writer::{MediaWriter, StreamIndex};
use crate::traits::sample_reader::SampleReader;

/// Writer stream indices for one session, fixed once writing begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLayout {
    pub video: StreamIndex,
    pub audio: Option<StreamIndex>,
}

impl StreamLayout {
    pub fn stream_count(&self) -> usize {
        1 + usize::from(self.audio.is_some())
    }
}

/// Make `width`x`height` at `fps` in `codec` the reader's active type.
pub fn apply_video_format(
    reader: &mut dyn SampleReader,
    width: u32,
    height: u32,
    fps: u32,
    codec: Codec,
) -> Result<VideoFormat, CaptureError> {
    if reader.kind() != DeviceKind::Video {
        return Err(CaptureError::FormatRejected(format!(
            "video format requested from an {} reader",
            reader.kind()
        )));
    }
    let format = VideoFormat::new(width, height, fps, codec);
    reader.set_format(&MediaFormat::Video(format.clone()))?;
    log::debug!("Video reader set to {}", format);
    Ok(format)
}

/// Make PCM at the given rate, channel count and bit depth the reader's
/// active type.
pub fn apply_audio_format(
    reader: &mut dyn SampleReader,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> Result<AudioFormat, CaptureError> {
    if reader.kind() != DeviceKind::Audio {
        return Err(CaptureError::FormatRejected(format!(
            "audio format requested from a {} reader",
            reader.kind()
        )));
    }
    let format = AudioFormat::pcm(sample_rate, channels, bits_per_sample);
    reader.set_format(&MediaFormat::Audio(format.clone()))?;
    log::debug!("Audio reader set to {}", format);
    Ok(format)
}

/// Declare a stream on `writer` and set the type its samples arrive in.
pub fn declare_output_stream(
    writer: &mut dyn MediaWriter,
    output: &MediaFormat,
    input: &MediaFormat,
) -> Result<StreamIndex, CaptureError> {
    let index = writer.add_stream(output)?;
    writer.set_input_format(index, input)?;
    Ok(index)
}

/// Declare video, then audio if present, then begin writing.
///
/// Streams are stored as captured, so input and output types are equal.
pub fn negotiate_writer(
    writer: &mut dyn MediaWriter,
    video: &VideoFormat,
    audio: Option<&AudioFormat>,
) -> Result<StreamLayout, CaptureError> {
    let video_format = MediaFormat::Video(video.clone());
    let video_index = declare_output_stream(writer, &video_format, &video_format)?;

    let audio_index = match audio {
        Some(audio) => {
            let audio_format = MediaFormat::Audio(audio.clone());
            Some(declare_output_stream(writer, &audio_format, &audio_format)?)
        }
        None => None,
    };

    writer.begin_writing()?;
    Ok(StreamLayout {
        video: video_index,
        audio: audio_index,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;
    use crate::testing::{DeviceScript, FakeReader, RecordingWriter};

    fn reader(kind: DeviceKind, script: DeviceScript) -> FakeReader {
        FakeReader::new(kind, script, None, Arc::new(AtomicUsize::new(0)))
    }

    #[test]
    fn video_format_applied() {
        let mut video = reader(DeviceKind::Video, DeviceScript::video());
        let format = apply_video_format(&mut video, 1920, 1080, 30, Codec::Mjpg).unwrap();
        assert_eq!(format.frame_duration_ticks(), 333_333);
        assert_eq!(video.active_format(), Some(&MediaFormat::Video(format)));
    }

    #[test]
    fn rejection_propagates() {
        let mut script = DeviceScript::video();
        script.reject_format = true;
        let mut video = reader(DeviceKind::Video, script);
        assert!(matches!(
            apply_video_format(&mut video, 1920, 1080, 30, Codec::Mjpg),
            Err(CaptureError::FormatRejected(_))
        ));
    }

    #[test]
    fn wrong_reader_kind_rejected() {
        let mut audio = reader(DeviceKind::Audio, DeviceScript::audio());
        assert!(apply_video_format(&mut audio, 640, 480, 30, Codec::Mjpg).is_err());

        let mut video = reader(DeviceKind::Video, DeviceScript::video());
        assert!(apply_audio_format(&mut video, 48000, 2, 16).is_err());

        let format = apply_audio_format(&mut audio, 44100, 1, 16).unwrap();
        assert_eq!(format.block_align(), 2);
    }

    #[test]
    fn writer_declares_video_then_audio_then_begins() {
        let mut writer = RecordingWriter::new();
        let log = writer.log();
        let video = VideoFormat::new(1280, 720, 30, Codec::Mjpg);
        let audio = AudioFormat::pcm(48000, 2, 16);

        let layout = negotiate_writer(&mut writer, &video, Some(&audio)).unwrap();
        assert_eq!(layout.video, StreamIndex(0));
        assert_eq!(layout.audio, Some(StreamIndex(1)));
        assert_eq!(layout.stream_count(), 2);

        let log = log.lock();
        assert_eq!(log.streams, vec![MediaFormat::Video(video), MediaFormat::Audio(audio)]);
        assert_eq!(log.inputs.len(), 2);
        assert!(log.began);
    }

    #[test]
    fn video_only_layout() {
        let mut writer = RecordingWriter::new();
        let video = VideoFormat::new(640, 480, 15, Codec::Mjpg);
        let layout = negotiate_writer(&mut writer, &video, None).unwrap();
        assert_eq!(layout.audio, None);
        assert_eq!(layout.stream_count(), 1);
    }

    #[test]
    fn writing_never_begins_after_rejection() {
        let mut writer = RecordingWriter::new().rejecting_streams();
        let log = writer.log();
        let video = VideoFormat::new(640, 480, 30, Codec::Mjpg);
        assert!(negotiate_writer(&mut writer, &video, None).is_err());
        assert!(!log.lock().began);
    }
}
