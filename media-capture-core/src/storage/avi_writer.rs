use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::device::DeviceKind;
use crate::models::error::CaptureError;
use crate::models::format::MediaFormat;
use crate::models::sample::Sample;
use crate::processing::avi_format::{self, AviLayout, IndexEntry, AVIIF_KEYFRAME, CHUNK_HEADER_SIZE};
use crate::traits::media_writer::{MediaWriter, StreamIndex};

/// Per-stream bookkeeping.
struct StreamState {
    output: MediaFormat,
    input: Option<MediaFormat>,
    chunk_id: [u8; 4],
    samples: u64,
    bytes: u64,
    last_timestamp: Option<i64>,
}

/// Streaming AVI muxer.
///
/// Streams are declared up front; the file is created by `begin_writing`, so
/// a session that fails during negotiation leaves nothing on disk. Samples
/// are appended to `movi` as they arrive; `finalize` appends `idx1` and
/// patches the sizes and stream lengths in the header.
///
/// Samples are stored as-is. Input formats must match the declared output
/// formats.
pub struct AviWriter {
    file_path: PathBuf,
    streams: Vec<StreamState>,
    file: Option<BufWriter<File>>,
    layout: Option<AviLayout>,
    index: Vec<IndexEntry>,
    position: u64,
    finalized: bool,
}

impl AviWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            streams: Vec::new(),
            file: None,
            layout: None,
            index: Vec::new(),
            position: 0,
            finalized: false,
        }
    }

    fn is_writing(&self) -> bool {
        self.file.is_some()
    }

    fn stream_mut(&mut self, stream: StreamIndex) -> Result<&mut StreamState, CaptureError> {
        self.streams
            .get_mut(stream.0 as usize)
            .ok_or_else(|| CaptureError::WriteFailure(format!("unknown stream {}", stream.0)))
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::WriteFailure("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::WriteFailure(format!("{}: {}", self.file_path.display(), e)))?;
        self.position += data.len() as u64;
        Ok(())
    }

    fn finish_file(&mut self) -> Result<(), CaptureError> {
        let layout = self
            .layout
            .take()
            .ok_or_else(|| CaptureError::FinalizeFailure("header was never written".into()))?;

        let idx1_start = self.position;
        let idx1 = avi_format::encode_index(&self.index);
        self.write_raw(&idx1)
            .map_err(|e| CaptureError::FinalizeFailure(e.to_string()))?;

        let file_size = self.position;
        if file_size > u32::MAX as u64 {
            return Err(CaptureError::FinalizeFailure("file exceeds 4 GiB RIFF limit".into()));
        }

        let total_frames = self
            .streams
            .iter()
            .find(|s| s.output.kind() == DeviceKind::Video)
            .map(|s| s.samples)
            .unwrap_or(0);
        let stream_lengths: Vec<u64> = self
            .streams
            .iter()
            .map(|s| match &s.output {
                MediaFormat::Video(_) => s.samples,
                MediaFormat::Audio(a) => s.bytes / a.block_align().max(1) as u64,
            })
            .collect();

        let mut patches = vec![
            (4, file_size - 8),
            (layout.movi_size_offset, idx1_start - layout.movi_size_offset - 4),
            (layout.total_frames_offset, total_frames),
        ];
        patches.extend(layout.stream_length_offsets.iter().copied().zip(stream_lengths));

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::FinalizeFailure("file is not open".into()))?;
        for (offset, value) in patches {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| CaptureError::FinalizeFailure(e.to_string()))?;
            file.write_all(&(value as u32).to_le_bytes())
                .map_err(|e| CaptureError::FinalizeFailure(e.to_string()))?;
        }
        file.flush()
            .map_err(|e| CaptureError::FinalizeFailure(e.to_string()))?;
        Ok(())
    }
}

impl MediaWriter for AviWriter {
    fn add_stream(&mut self, output: &MediaFormat) -> Result<StreamIndex, CaptureError> {
        if self.is_writing() || self.finalized {
            return Err(CaptureError::FormatRejected(
                "streams must be declared before writing begins".into(),
            ));
        }
        match output {
            MediaFormat::Video(v) if v.codec.fourcc().is_none() => {
                return Err(CaptureError::FormatRejected(format!(
                    "codec {} cannot be stored in AVI",
                    v.codec
                )));
            }
            MediaFormat::Video(v) if avi_format::image_size(v) > u32::MAX as u64 => {
                return Err(CaptureError::FormatRejected(format!("frame too large for AVI: {}", v)));
            }
            MediaFormat::Audio(a) if !a.codec.is_audio() || a.block_align() == 0 || !a.fits_wave_header() => {
                return Err(CaptureError::FormatRejected(format!("unsupported audio format: {}", a)));
            }
            _ => {}
        }

        let index = self.streams.len() as u32;
        self.streams.push(StreamState {
            output: output.clone(),
            input: None,
            chunk_id: avi_format::chunk_id(index, output.kind()),
            samples: 0,
            bytes: 0,
            last_timestamp: None,
        });
        Ok(StreamIndex(index))
    }

    fn set_input_format(&mut self, stream: StreamIndex, input: &MediaFormat) -> Result<(), CaptureError> {
        let state = self
            .streams
            .get_mut(stream.0 as usize)
            .ok_or_else(|| CaptureError::FormatRejected(format!("unknown stream {}", stream.0)))?;
        if &state.output != input {
            return Err(CaptureError::FormatRejected(format!(
                "input {} does not match output {} (no transcoding)",
                input, state.output
            )));
        }
        state.input = Some(input.clone());
        Ok(())
    }

    fn begin_writing(&mut self) -> Result<(), CaptureError> {
        if self.is_writing() || self.finalized {
            return Err(CaptureError::WriteFailure("writer already started".into()));
        }
        if self.streams.is_empty() {
            return Err(CaptureError::FormatRejected("no streams declared".into()));
        }
        if let Some(i) = self.streams.iter().position(|s| s.input.is_none()) {
            return Err(CaptureError::FormatRejected(format!("stream {} has no input format", i)));
        }

        let outputs: Vec<MediaFormat> = self.streams.iter().map(|s| s.output.clone()).collect();
        let layout = avi_format::build_header(&outputs);

        let file = File::create(&self.file_path)
            .map_err(|e| CaptureError::WriteFailure(format!("failed to create file: {}", e)))?;
        self.file = Some(BufWriter::new(file));
        self.position = 0;

        let header = layout.header.clone();
        self.layout = Some(layout);
        self.write_raw(&header)?;

        log::debug!(
            "AVI writer started: {} ({} streams)",
            self.file_path.display(),
            self.streams.len()
        );
        Ok(())
    }

    fn write_sample(&mut self, stream: StreamIndex, sample: Sample) -> Result<(), CaptureError> {
        if !self.is_writing() {
            return Err(CaptureError::WriteFailure("writer has not started".into()));
        }
        let movi_start = self
            .layout
            .as_ref()
            .map(|l| l.movi_start)
            .ok_or_else(|| CaptureError::WriteFailure("header was never written".into()))?;

        let chunk_id = {
            let state = self.stream_mut(stream)?;
            if state.output.kind() != sample.kind {
                return Err(CaptureError::WriteFailure(format!(
                    "{} sample written to {} stream {}",
                    sample.kind,
                    state.output.kind(),
                    stream.0
                )));
            }
            if state.last_timestamp.is_some_and(|last| sample.timestamp < last) {
                return Err(CaptureError::WriteFailure(format!(
                    "timestamp {} goes backwards on stream {}",
                    sample.timestamp, stream.0
                )));
            }
            state.chunk_id
        };

        let size = sample.data.len();
        if self.position + CHUNK_HEADER_SIZE + size as u64 > u32::MAX as u64 {
            return Err(CaptureError::WriteFailure("file exceeds 4 GiB RIFF limit".into()));
        }

        let offset = (self.position - movi_start) as u32;
        let mut chunk_header = [0u8; CHUNK_HEADER_SIZE as usize];
        chunk_header[0..4].copy_from_slice(&chunk_id);
        chunk_header[4..8].copy_from_slice(&(size as u32).to_le_bytes());
        self.write_raw(&chunk_header)?;
        self.write_raw(&sample.data)?;
        if size % 2 == 1 {
            self.write_raw(&[0])?;
        }

        self.index.push(IndexEntry {
            chunk_id,
            flags: AVIIF_KEYFRAME,
            offset,
            size: size as u32,
        });

        let state = self.stream_mut(stream)?;
        state.samples += 1;
        state.bytes += size as u64;
        state.last_timestamp = Some(sample.timestamp);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), CaptureError> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        if !self.is_writing() {
            return Ok(());
        }

        let result = self.finish_file();
        // The handle is closed whether or not the fix-ups succeeded.
        self.file = None;
        if result.is_ok() {
            log::debug!("AVI writer finalized: {} ({} bytes)", self.file_path.display(), self.position);
        }
        result
    }

    fn output_path(&self) -> &Path {
        &self.file_path
    }
}

impl Drop for AviWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            log::warn!("Failed to finalize {} on drop: {}", self.file_path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::{AudioFormat, Codec, VideoFormat};
    use std::fs;

    fn read_u32(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
    }

    fn video_format() -> MediaFormat {
        MediaFormat::Video(VideoFormat::new(640, 480, 30, Codec::Mjpg))
    }

    fn audio_format() -> MediaFormat {
        MediaFormat::Audio(AudioFormat::pcm(48000, 2, 16))
    }

    fn stamped(kind: DeviceKind, data: Vec<u8>, timestamp: i64) -> Sample {
        let mut sample = Sample::new(kind, data);
        sample.stamp(timestamp, 333_333);
        sample
    }

    fn declare(writer: &mut AviWriter, format: &MediaFormat) -> StreamIndex {
        let index = writer.add_stream(format).unwrap();
        writer.set_input_format(index, format).unwrap();
        index
    }

    #[test]
    fn video_only_file_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.avi");

        let mut writer = AviWriter::new(path.clone());
        let video = declare(&mut writer, &video_format());
        writer.begin_writing().unwrap();
        writer.write_sample(video, stamped(DeviceKind::Video, vec![0xAB; 10], 0)).unwrap();
        writer.write_sample(video, stamped(DeviceKind::Video, vec![0xCD; 7], 333_333)).unwrap();
        writer.finalize().unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(read_u32(&data, 4) as usize, data.len() - 8);
        assert_eq!(read_u32(&data, 48), 2); // dwTotalFrames
        assert_eq!(read_u32(&data, 56), 1); // dwStreams
        assert_eq!(read_u32(&data, 140), 2); // video dwLength

        // movi: header is 224 bytes, 'movi' FourCC at 220.
        assert_eq!(&data[220..224], b"movi");
        assert_eq!(&data[224..228], b"00dc");
        assert_eq!(read_u32(&data, 228), 10);
        // second chunk: 8 + 10 later, odd payload gets one pad byte
        assert_eq!(&data[242..246], b"00dc");
        assert_eq!(read_u32(&data, 246), 7);
        let idx1 = 242 + 8 + 8;
        assert_eq!(&data[idx1..idx1 + 4], b"idx1");
        assert_eq!(read_u32(&data, idx1 + 4), 32);
        // movi LIST size runs up to idx1
        assert_eq!(read_u32(&data, 216) as usize, idx1 - 220);
        // first index entry offset is relative to the 'movi' FourCC
        assert_eq!(read_u32(&data, idx1 + 16), 4);
        assert_eq!(data.len(), idx1 + 8 + 32);
    }

    #[test]
    fn muxed_audio_stream_length_in_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muxed.avi");

        let mut writer = AviWriter::new(path.clone());
        let video = declare(&mut writer, &video_format());
        let audio = declare(&mut writer, &audio_format());
        assert_eq!((video, audio), (StreamIndex(0), StreamIndex(1)));
        writer.begin_writing().unwrap();

        writer.write_sample(video, stamped(DeviceKind::Video, vec![1; 16], 0)).unwrap();
        writer.write_sample(audio, stamped(DeviceKind::Audio, vec![0; 3840], 0)).unwrap();
        writer.write_sample(audio, stamped(DeviceKind::Audio, vec![0; 1920], 200_000)).unwrap();
        writer.finalize().unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(read_u32(&data, 56), 2); // dwStreams
        assert_eq!(read_u32(&data, 48), 1); // dwTotalFrames counts video only
        let audio_length_offset = 88 + 124 + 20 + 32;
        assert_eq!(read_u32(&data, audio_length_offset), (3840 + 1920) / 4);
    }

    #[test]
    fn nothing_on_disk_before_begin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.avi");

        let mut writer = AviWriter::new(path.clone());
        declare(&mut writer, &video_format());
        writer.finalize().unwrap();
        drop(writer);
        assert!(!path.exists());
    }

    #[test]
    fn begin_requires_input_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AviWriter::new(dir.path().join("x.avi"));
        writer.add_stream(&video_format()).unwrap();
        assert!(matches!(writer.begin_writing(), Err(CaptureError::FormatRejected(_))));

        let mut empty = AviWriter::new(dir.path().join("y.avi"));
        assert!(matches!(empty.begin_writing(), Err(CaptureError::FormatRejected(_))));
    }

    #[test]
    fn mismatched_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AviWriter::new(dir.path().join("x.avi"));
        let index = writer.add_stream(&video_format()).unwrap();
        let other = MediaFormat::Video(VideoFormat::new(1280, 720, 30, Codec::Mjpg));
        assert!(matches!(
            writer.set_input_format(index, &other),
            Err(CaptureError::FormatRejected(_))
        ));
        assert!(matches!(
            writer.set_input_format(StreamIndex(5), &other),
            Err(CaptureError::FormatRejected(_))
        ));
    }

    #[test]
    fn unstorable_codec_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AviWriter::new(dir.path().join("x.avi"));
        let format = MediaFormat::Video(VideoFormat::new(640, 480, 30, Codec::Other("H265".into())));
        assert!(matches!(writer.add_stream(&format), Err(CaptureError::FormatRejected(_))));
    }

    #[test]
    fn formats_beyond_header_fields_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AviWriter::new(dir.path().join("x.avi"));
        let wide_audio = MediaFormat::Audio(AudioFormat::pcm(48000, 60000, 32));
        assert!(matches!(writer.add_stream(&wide_audio), Err(CaptureError::FormatRejected(_))));
        let huge_frame = MediaFormat::Video(VideoFormat::new(70_000, 70_000, 30, Codec::Mjpg));
        assert!(matches!(writer.add_stream(&huge_frame), Err(CaptureError::FormatRejected(_))));
        assert!(writer.add_stream(&video_format()).is_ok());
    }

    #[test]
    fn write_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AviWriter::new(dir.path().join("x.avi"));
        let video = declare(&mut writer, &video_format());

        // before begin
        assert!(matches!(
            writer.write_sample(video, stamped(DeviceKind::Video, vec![1], 0)),
            Err(CaptureError::WriteFailure(_))
        ));

        writer.begin_writing().unwrap();
        assert!(matches!(writer.add_stream(&audio_format()), Err(CaptureError::FormatRejected(_))));

        // wrong kind
        assert!(matches!(
            writer.write_sample(video, stamped(DeviceKind::Audio, vec![1], 0)),
            Err(CaptureError::WriteFailure(_))
        ));
        // unknown stream
        assert!(matches!(
            writer.write_sample(StreamIndex(3), stamped(DeviceKind::Video, vec![1], 0)),
            Err(CaptureError::WriteFailure(_))
        ));
        // timestamps must not go backwards
        writer.write_sample(video, stamped(DeviceKind::Video, vec![1], 666_666)).unwrap();
        assert!(matches!(
            writer.write_sample(video, stamped(DeviceKind::Video, vec![1], 333_333)),
            Err(CaptureError::WriteFailure(_))
        ));
    }

    #[test]
    fn finalize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twice.avi");
        let mut writer = AviWriter::new(path.clone());
        let video = declare(&mut writer, &video_format());
        writer.begin_writing().unwrap();
        writer.write_sample(video, stamped(DeviceKind::Video, vec![9; 4], 0)).unwrap();
        writer.finalize().unwrap();
        let first = fs::read(&path).unwrap();
        writer.finalize().unwrap();
        drop(writer);
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn drop_finalizes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.avi");
        {
            let mut writer = AviWriter::new(path.clone());
            let video = declare(&mut writer, &video_format());
            writer.begin_writing().unwrap();
            writer.write_sample(video, stamped(DeviceKind::Video, vec![2; 6], 0)).unwrap();
        }
        let data = fs::read(&path).unwrap();
        assert_eq!(read_u32(&data, 4) as usize, data.len() - 8);
        assert_eq!(read_u32(&data, 48), 1);
    }
}
