/// AVI (RIFF) container layout utilities.
///
/// Builds the `hdrl` header for a fixed set of streams with placeholder
/// lengths, and records where those placeholders live so the writer can patch
/// them once the stream lengths are known.
///
/// File layout:
/// ```text
/// RIFF <size> 'AVI '
///   LIST <size> 'hdrl'
///     'avih' <56>  MainAVIHeader
///     LIST <size> 'strl'           (one per stream)
///       'strh' <56>  AVIStreamHeader
///       'strf' <40|18> BITMAPINFOHEADER | WAVEFORMATEX
///   LIST <size> 'movi'
///     '00dc' <size> frame data [pad]
///     '01wb' <size> audio data [pad]
///     ...
///   'idx1' <size> 16-byte entries
/// ```
use crate::models::device::DeviceKind;
use crate::models::format::{AudioFormat, Codec, MediaFormat, VideoFormat};

/// `avih` flag: the file carries an `idx1` index.
pub const AVIF_HASINDEX: u32 = 0x10;
/// `avih` flag: chunks are interleaved.
pub const AVIF_ISINTERLEAVED: u32 = 0x100;
/// `idx1` flag: the chunk is a key frame.
pub const AVIIF_KEYFRAME: u32 = 0x10;

const MAIN_HEADER_SIZE: u32 = 56;
const STREAM_HEADER_SIZE: u32 = 56;
const BITMAP_INFO_SIZE: u32 = 40;
const WAVE_FORMAT_SIZE: u32 = 18;

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Size of a chunk header (FourCC + length).
pub const CHUNK_HEADER_SIZE: u64 = 8;
/// Size of one `idx1` entry.
pub const INDEX_ENTRY_SIZE: usize = 16;

/// A serialized header plus the byte offsets of fields patched at finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AviLayout {
    /// Everything up to and including the `movi` list type.
    pub header: Vec<u8>,
    /// `avih.dwTotalFrames`.
    pub total_frames_offset: u64,
    /// `strh.dwLength`, one per stream in declaration order.
    pub stream_length_offsets: Vec<u64>,
    /// Size field of the `movi` LIST.
    pub movi_size_offset: u64,
    /// Offset of the `movi` FourCC; `idx1` offsets are relative to it.
    pub movi_start: u64,
}

/// One `idx1` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub chunk_id: [u8; 4],
    pub flags: u32,
    pub offset: u32,
    pub size: u32,
}

/// Chunk id for stream `index`: `NNdc` for video, `NNwb` for audio.
pub fn chunk_id(index: u32, kind: DeviceKind) -> [u8; 4] {
    let digits = format!("{:02}", index % 100);
    let digits = digits.as_bytes();
    let suffix = match kind {
        DeviceKind::Video => b"dc",
        DeviceKind::Audio => b"wb",
    };
    [digits[0], digits[1], suffix[0], suffix[1]]
}

/// Serialize the RIFF/hdrl/movi prologue for `streams`.
///
/// Lengths and sizes are zero placeholders.
pub fn build_header(streams: &[MediaFormat]) -> AviLayout {
    let video = streams.iter().find_map(|s| match s {
        MediaFormat::Video(v) => Some(v),
        MediaFormat::Audio(_) => None,
    });

    let mut buf = Vec::with_capacity(512);
    buf.extend_from_slice(b"RIFF");
    put_u32(&mut buf, 0); // patched at finalize
    buf.extend_from_slice(b"AVI ");

    let hdrl_start = begin_list(&mut buf, b"hdrl");

    // avih
    buf.extend_from_slice(b"avih");
    put_u32(&mut buf, MAIN_HEADER_SIZE);
    let micro_sec_per_frame = video
        .filter(|v| v.fps_numerator > 0)
        .map(|v| (1_000_000u64 * v.fps_denominator as u64 / v.fps_numerator as u64) as u32)
        .unwrap_or(0);
    put_u32(&mut buf, micro_sec_per_frame);
    put_u32(&mut buf, 0); // dwMaxBytesPerSec
    put_u32(&mut buf, 0); // dwPaddingGranularity
    put_u32(&mut buf, AVIF_HASINDEX | AVIF_ISINTERLEAVED);
    let total_frames_offset = buf.len() as u64;
    put_u32(&mut buf, 0); // dwTotalFrames
    put_u32(&mut buf, 0); // dwInitialFrames
    put_u32(&mut buf, streams.len() as u32);
    put_u32(&mut buf, 0); // dwSuggestedBufferSize
    put_u32(&mut buf, video.map(|v| v.width).unwrap_or(0));
    put_u32(&mut buf, video.map(|v| v.height).unwrap_or(0));
    buf.extend_from_slice(&[0u8; 16]); // dwReserved[4]

    let mut stream_length_offsets = Vec::with_capacity(streams.len());
    for stream in streams {
        let strl_start = begin_list(&mut buf, b"strl");
        let length_offset = match stream {
            MediaFormat::Video(v) => put_video_stream(&mut buf, v),
            MediaFormat::Audio(a) => put_audio_stream(&mut buf, a),
        };
        stream_length_offsets.push(length_offset);
        end_list(&mut buf, strl_start);
    }

    end_list(&mut buf, hdrl_start);

    buf.extend_from_slice(b"LIST");
    let movi_size_offset = buf.len() as u64;
    put_u32(&mut buf, 0); // patched at finalize
    let movi_start = buf.len() as u64;
    buf.extend_from_slice(b"movi");

    AviLayout {
        header: buf,
        total_frames_offset,
        stream_length_offsets,
        movi_size_offset,
        movi_start,
    }
}

/// Serialize an `idx1` chunk.
pub fn encode_index(entries: &[IndexEntry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(CHUNK_HEADER_SIZE as usize + entries.len() * INDEX_ENTRY_SIZE);
    buf.extend_from_slice(b"idx1");
    put_u32(&mut buf, (entries.len() * INDEX_ENTRY_SIZE) as u32);
    for entry in entries {
        buf.extend_from_slice(&entry.chunk_id);
        put_u32(&mut buf, entry.flags);
        put_u32(&mut buf, entry.offset);
        put_u32(&mut buf, entry.size);
    }
    buf
}

/// Bit count advertised in `BITMAPINFOHEADER` for a video codec.
pub fn bits_per_pixel(codec: &Codec) -> u16 {
    match codec {
        Codec::Yuy2 => 16,
        Codec::Nv12 | Codec::I420 => 12,
        _ => 24,
    }
}

/// `biSizeImage` of one uncompressed frame.
pub fn image_size(format: &VideoFormat) -> u64 {
    format.width as u64 * format.height as u64 * bits_per_pixel(&format.codec) as u64 / 8
}

/// Writes `strh` + `strf` for a video stream; returns the `dwLength` offset.
fn put_video_stream(buf: &mut Vec<u8>, format: &VideoFormat) -> u64 {
    let fourcc = format.codec.fourcc().unwrap_or([0; 4]);

    buf.extend_from_slice(b"strh");
    put_u32(buf, STREAM_HEADER_SIZE);
    buf.extend_from_slice(b"vids");
    buf.extend_from_slice(&fourcc);
    put_u32(buf, 0); // dwFlags
    put_u16(buf, 0); // wPriority
    put_u16(buf, 0); // wLanguage
    put_u32(buf, 0); // dwInitialFrames
    put_u32(buf, format.fps_denominator); // dwScale
    put_u32(buf, format.fps_numerator); // dwRate
    put_u32(buf, 0); // dwStart
    let length_offset = buf.len() as u64;
    put_u32(buf, 0); // dwLength
    put_u32(buf, 0); // dwSuggestedBufferSize
    put_u32(buf, u32::MAX); // dwQuality: driver default
    put_u32(buf, 0); // dwSampleSize: variable
    put_u16(buf, 0); // rcFrame.left
    put_u16(buf, 0); // rcFrame.top
    put_u16(buf, format.width.min(i16::MAX as u32) as u16);
    put_u16(buf, format.height.min(i16::MAX as u32) as u16);

    let bit_count = bits_per_pixel(&format.codec);
    buf.extend_from_slice(b"strf");
    put_u32(buf, BITMAP_INFO_SIZE);
    put_u32(buf, BITMAP_INFO_SIZE); // biSize
    put_u32(buf, format.width); // biWidth
    put_u32(buf, format.height); // biHeight
    put_u16(buf, 1); // biPlanes
    put_u16(buf, bit_count);
    buf.extend_from_slice(&fourcc); // biCompression
    put_u32(buf, u32::try_from(image_size(format)).unwrap_or(u32::MAX)); // biSizeImage
    put_u32(buf, 0); // biXPelsPerMeter
    put_u32(buf, 0); // biYPelsPerMeter
    put_u32(buf, 0); // biClrUsed
    put_u32(buf, 0); // biClrImportant

    length_offset
}

/// Writes `strh` + `strf` for an audio stream; returns the `dwLength` offset.
fn put_audio_stream(buf: &mut Vec<u8>, format: &AudioFormat) -> u64 {
    let block_align = format.block_align();

    buf.extend_from_slice(b"strh");
    put_u32(buf, STREAM_HEADER_SIZE);
    buf.extend_from_slice(b"auds");
    put_u32(buf, 0); // fccHandler
    put_u32(buf, 0); // dwFlags
    put_u16(buf, 0); // wPriority
    put_u16(buf, 0); // wLanguage
    put_u32(buf, 0); // dwInitialFrames
    let bytes_per_second = u32::try_from(format.bytes_per_second()).unwrap_or(u32::MAX);

    put_u32(buf, block_align); // dwScale
    put_u32(buf, bytes_per_second); // dwRate
    put_u32(buf, 0); // dwStart
    let length_offset = buf.len() as u64;
    put_u32(buf, 0); // dwLength, in blocks
    put_u32(buf, 0); // dwSuggestedBufferSize
    put_u32(buf, u32::MAX); // dwQuality
    put_u32(buf, block_align); // dwSampleSize
    buf.extend_from_slice(&[0u8; 8]); // rcFrame

    let format_tag = match format.codec {
        Codec::IeeeFloat => WAVE_FORMAT_IEEE_FLOAT,
        _ => WAVE_FORMAT_PCM,
    };
    buf.extend_from_slice(b"strf");
    put_u32(buf, WAVE_FORMAT_SIZE);
    put_u16(buf, format_tag);
    put_u16(buf, format.channels);
    put_u32(buf, format.sample_rate);
    put_u32(buf, bytes_per_second);
    put_u16(buf, block_align as u16);
    put_u16(buf, format.bits_per_sample);
    put_u16(buf, 0); // cbSize

    length_offset
}

/// Opens a LIST; returns the offset of its size field.
fn begin_list(buf: &mut Vec<u8>, list_type: &[u8; 4]) -> usize {
    buf.extend_from_slice(b"LIST");
    let size_offset = buf.len();
    put_u32(buf, 0);
    buf.extend_from_slice(list_type);
    size_offset
}

/// Closes a LIST opened with `begin_list`, filling in its size.
fn end_list(buf: &mut [u8], size_offset: usize) {
    let size = (buf.len() - size_offset - 4) as u32;
    buf[size_offset..size_offset + 4].copy_from_slice(&size.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
    }

    fn video() -> MediaFormat {
        MediaFormat::Video(VideoFormat::new(1920, 1080, 30, Codec::Mjpg))
    }

    fn audio() -> MediaFormat {
        MediaFormat::Audio(AudioFormat::pcm(48000, 2, 16))
    }

    #[test]
    fn riff_magic_and_lists() {
        let layout = build_header(&[video()]);
        let h = &layout.header;
        assert_eq!(&h[0..4], b"RIFF");
        assert_eq!(&h[8..12], b"AVI ");
        assert_eq!(&h[12..16], b"LIST");
        assert_eq!(&h[20..24], b"hdrl");
        assert_eq!(&h[24..28], b"avih");
        assert_eq!(read_u32(h, 28), 56);
        assert_eq!(&h[h.len() - 4..], b"movi");
        assert_eq!(layout.movi_start as usize, h.len() - 4);
    }

    #[test]
    fn main_header_fields() {
        let layout = build_header(&[video(), audio()]);
        let h = &layout.header;
        // MainAVIHeader starts at 32.
        assert_eq!(read_u32(h, 32), 33_333); // dwMicroSecPerFrame
        assert_eq!(read_u32(h, 44), AVIF_HASINDEX | AVIF_ISINTERLEAVED);
        assert_eq!(layout.total_frames_offset, 48);
        assert_eq!(read_u32(h, 56), 2); // dwStreams
        assert_eq!(read_u32(h, 64), 1920);
        assert_eq!(read_u32(h, 68), 1080);
    }

    #[test]
    fn hdrl_size_covers_stream_lists() {
        let layout = build_header(&[video(), audio()]);
        let h = &layout.header;
        // hdrl = 'hdrl' + avih (64) + video strl (124) + audio strl (102)
        assert_eq!(read_u32(h, 16), 4 + 64 + 124 + 102);
        // movi LIST follows hdrl directly.
        assert_eq!(&h[12 + 8 + 294..12 + 8 + 294 + 4], b"LIST");
    }

    #[test]
    fn video_stream_header() {
        let layout = build_header(&[video()]);
        let h = &layout.header;
        // strl LIST at 88, strh at 100, AVIStreamHeader body at 108.
        assert_eq!(&h[96..100], b"strl");
        assert_eq!(&h[100..104], b"strh");
        assert_eq!(&h[108..112], b"vids");
        assert_eq!(&h[112..116], b"MJPG");
        assert_eq!(read_u32(h, 128), 1); // dwScale
        assert_eq!(read_u32(h, 132), 30); // dwRate
        assert_eq!(layout.stream_length_offsets, vec![140]);
        // strf at 164
        assert_eq!(&h[164..168], b"strf");
        assert_eq!(read_u32(h, 168), 40);
        assert_eq!(&h[188..192], b"MJPG"); // biCompression
    }

    #[test]
    fn audio_stream_header() {
        let layout = build_header(&[video(), audio()]);
        let h = &layout.header;
        let strl = 88 + 124;
        assert_eq!(&h[strl..strl + 4], b"LIST");
        assert_eq!(read_u32(h, strl + 4), 94);
        let body = strl + 20;
        assert_eq!(&h[body..body + 4], b"auds");
        assert_eq!(read_u32(h, body + 20), 4); // dwScale = block align
        assert_eq!(read_u32(h, body + 24), 192_000); // dwRate = bytes/s
        assert_eq!(layout.stream_length_offsets[1], (body + 32) as u64);
        let strf = body + 56;
        assert_eq!(&h[strf..strf + 4], b"strf");
        assert_eq!(u16::from_le_bytes([h[strf + 8], h[strf + 9]]), 1); // PCM
        assert_eq!(u16::from_le_bytes([h[strf + 10], h[strf + 11]]), 2); // channels
        assert_eq!(read_u32(h, strf + 12), 48000);
    }

    #[test]
    fn chunk_ids() {
        assert_eq!(&chunk_id(0, DeviceKind::Video), b"00dc");
        assert_eq!(&chunk_id(1, DeviceKind::Audio), b"01wb");
        assert_eq!(&chunk_id(12, DeviceKind::Audio), b"12wb");
    }

    #[test]
    fn index_encoding() {
        let entries = [
            IndexEntry {
                chunk_id: *b"00dc",
                flags: AVIIF_KEYFRAME,
                offset: 4,
                size: 100,
            },
            IndexEntry {
                chunk_id: *b"01wb",
                flags: AVIIF_KEYFRAME,
                offset: 112,
                size: 3840,
            },
        ];
        let idx = encode_index(&entries);
        assert_eq!(&idx[0..4], b"idx1");
        assert_eq!(read_u32(&idx, 4), 32);
        assert_eq!(&idx[8..12], b"00dc");
        assert_eq!(read_u32(&idx, 16), 4);
        assert_eq!(&idx[24..28], b"01wb");
        assert_eq!(read_u32(&idx, 36), 3840);
    }

    #[test]
    fn image_size_is_computed_without_overflow() {
        let frame = VideoFormat::new(1920, 1080, 30, Codec::Yuy2);
        assert_eq!(image_size(&frame), 1920 * 1080 * 2);
        let huge = VideoFormat::new(70_000, 70_000, 30, Codec::Rgb24);
        assert_eq!(image_size(&huge), 14_700_000_000);
    }
}
