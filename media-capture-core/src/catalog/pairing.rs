//! Video/audio pairing by symbolic identifier containment.
//!
//! A camera and its built-in microphone are usually exposed as two
//! interfaces of one USB composite device, so one symbolic identifier tends
//! to contain the other. This is a heuristic: several cameras behind one hub
//! can mis-pair, and no container-ID attribute is consulted.

use crate::models::device::{CaptureDevice, DeviceKind};
use crate::traits::capture_provider::CaptureProvider;

/// Whether `video` and `audio` appear to belong to the same physical unit.
///
/// True when either identifier contains the other, ignoring case. Devices
/// without an identifier never link.
pub fn are_linked(video: &CaptureDevice, audio: &CaptureDevice) -> bool {
    if video.symbolic_link.is_empty() || audio.symbolic_link.is_empty() {
        return false;
    }
    let video_link = video.symbolic_link.to_lowercase();
    let audio_link = audio.symbolic_link.to_lowercase();
    video_link.contains(&audio_link) || audio_link.contains(&video_link)
}

/// First audio device in list order that is linked to `video`.
///
/// The same audio device may be returned for several video devices.
pub fn find_linked_audio<'a>(video: &CaptureDevice, audio_devices: &'a [CaptureDevice]) -> Option<&'a CaptureDevice> {
    audio_devices.iter().find(|audio| are_linked(video, audio))
}

/// Every microphone, or none if audio enumeration fails.
pub fn audio_devices_or_none<P: CaptureProvider + ?Sized>(provider: &P) -> Vec<CaptureDevice> {
    provider.enumerate(DeviceKind::Audio).unwrap_or_else(|e| {
        log::warn!("Audio device enumeration failed, continuing without audio: {}", e);
        Vec::new()
    })
}
