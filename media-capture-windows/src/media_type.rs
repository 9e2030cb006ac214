//! Conversions between `MediaFormat` and `IMFMediaType`.

use windows::core::GUID;
use windows::Win32::Media::MediaFoundation::*;

use media_capture_core::models::error::CaptureError;
use media_capture_core::models::format::{AudioFormat, Codec, MediaFormat, VideoFormat};

pub fn codec_from_subtype(subtype: &GUID) -> Codec {
    match *subtype {
        s if s == MFVideoFormat_MJPG => Codec::Mjpg,
        s if s == MFVideoFormat_NV12 => Codec::Nv12,
        s if s == MFVideoFormat_YUY2 => Codec::Yuy2,
        s if s == MFVideoFormat_RGB24 => Codec::Rgb24,
        s if s == MFVideoFormat_I420 => Codec::I420,
        s if s == MFAudioFormat_PCM => Codec::Pcm,
        s if s == MFAudioFormat_Float => Codec::IeeeFloat,
        s => Codec::Other(format!("{:?}", s)),
    }
}

pub fn subtype_for_codec(codec: &Codec) -> Option<GUID> {
    match codec {
        Codec::Mjpg => Some(MFVideoFormat_MJPG),
        Codec::Nv12 => Some(MFVideoFormat_NV12),
        Codec::Yuy2 => Some(MFVideoFormat_YUY2),
        Codec::Rgb24 => Some(MFVideoFormat_RGB24),
        Codec::I420 => Some(MFVideoFormat_I420),
        Codec::Pcm => Some(MFAudioFormat_PCM),
        Codec::IeeeFloat => Some(MFAudioFormat_Float),
        Codec::Other(_) => None,
    }
}

fn pack(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

fn unpack(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

/// Read a native or current media type into a `MediaFormat`.
pub fn to_media_format(media_type: &IMFMediaType) -> Result<MediaFormat, CaptureError> {
    let err = |what: &str, e: windows::core::Error| CaptureError::FormatRejected(format!("{}: {}", what, e));
    unsafe {
        let major = media_type.GetGUID(&MF_MT_MAJOR_TYPE).map_err(|e| err("major type", e))?;
        let subtype = media_type.GetGUID(&MF_MT_SUBTYPE).map_err(|e| err("subtype", e))?;
        let codec = codec_from_subtype(&subtype);

        if major == MFMediaType_Video {
            let (width, height) = unpack(media_type.GetUINT64(&MF_MT_FRAME_SIZE).unwrap_or(0));
            let (fps_numerator, fps_denominator) = unpack(media_type.GetUINT64(&MF_MT_FRAME_RATE).unwrap_or(0));
            Ok(MediaFormat::Video(VideoFormat {
                width,
                height,
                fps_numerator,
                fps_denominator,
                codec,
            }))
        } else if major == MFMediaType_Audio {
            Ok(MediaFormat::Audio(AudioFormat {
                sample_rate: media_type.GetUINT32(&MF_MT_AUDIO_SAMPLES_PER_SECOND).unwrap_or(0),
                channels: media_type.GetUINT32(&MF_MT_AUDIO_NUM_CHANNELS).unwrap_or(0) as u16,
                bits_per_sample: media_type.GetUINT32(&MF_MT_AUDIO_BITS_PER_SAMPLE).unwrap_or(0) as u16,
                codec,
            }))
        } else {
            Err(CaptureError::FormatRejected(format!("unsupported major type {:?}", major)))
        }
    }
}

/// Build an `IMFMediaType` describing `format`.
pub fn create_media_type(format: &MediaFormat) -> Result<IMFMediaType, CaptureError> {
    let subtype = subtype_for_codec(format.codec())
        .ok_or_else(|| CaptureError::FormatRejected(format!("no Media Foundation subtype for {}", format.codec())))?;
    let err = |e: windows::core::Error| CaptureError::FormatRejected(format!("{}: {}", format, e));

    unsafe {
        let media_type = MFCreateMediaType().map_err(err)?;
        media_type.SetGUID(&MF_MT_SUBTYPE, &subtype).map_err(err)?;
        match format {
            MediaFormat::Video(video) => {
                media_type.SetGUID(&MF_MT_MAJOR_TYPE, &MFMediaType_Video).map_err(err)?;
                media_type
                    .SetUINT64(&MF_MT_FRAME_SIZE, pack(video.width, video.height))
                    .map_err(err)?;
                media_type
                    .SetUINT64(&MF_MT_FRAME_RATE, pack(video.fps_numerator, video.fps_denominator))
                    .map_err(err)?;
                media_type.SetUINT64(&MF_MT_PIXEL_ASPECT_RATIO, pack(1, 1)).map_err(err)?;
            }
            MediaFormat::Audio(audio) => {
                media_type.SetGUID(&MF_MT_MAJOR_TYPE, &MFMediaType_Audio).map_err(err)?;
                media_type
                    .SetUINT32(&MF_MT_AUDIO_SAMPLES_PER_SECOND, audio.sample_rate)
                    .map_err(err)?;
                media_type
                    .SetUINT32(&MF_MT_AUDIO_NUM_CHANNELS, audio.channels as u32)
                    .map_err(err)?;
                media_type
                    .SetUINT32(&MF_MT_AUDIO_BITS_PER_SAMPLE, audio.bits_per_sample as u32)
                    .map_err(err)?;
                media_type
                    .SetUINT32(&MF_MT_AUDIO_BLOCK_ALIGNMENT, audio.block_align())
                    .map_err(err)?;
                let bytes_per_second = u32::try_from(audio.bytes_per_second())
                    .map_err(|_| CaptureError::FormatRejected(format!("byte rate out of range: {}", audio)))?;
                media_type
                    .SetUINT32(&MF_MT_AUDIO_AVG_BYTES_PER_SECOND, bytes_per_second)
                    .map_err(err)?;
            }
        }
        Ok(media_type)
    }
}
