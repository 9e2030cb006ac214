//! Human-readable device report.

use std::fmt::Write;

use crate::catalog::pairing::{audio_devices_or_none, find_linked_audio};
use crate::catalog::usb_ids::UsbIdTable;
use crate::models::device::{CaptureDevice, DeviceKind};
use crate::models::error::CaptureError;
use crate::traits::capture_provider::CaptureProvider;

/// Report text when no camera is attached.
pub const NO_CAMERAS: &str = "No cameras found.\n";

/// Describe every camera, its identity and formats, and its linked microphone.
///
/// ```text
/// Camera 0:
///   Name: HD Pro Webcam C920
///   Vendor name: Logitech, Inc.
///   Device name: HD Pro Webcam C920
///   Vendor ID: 046d
///   Device ID: 082d
///   Available video codecs:
///     Codec: MJPG, Resolution: 1920x1080, FPS: 30
///   Associated audio device found.
///   Available audio codecs:
///     Codec: PCM, Sample Rate: 48000, Channels: 2, Bits Per Sample: 16
///
/// ```
///
/// Formats are read through readers that are closed before the next device
/// is visited. No writer is opened.
pub fn describe_all_devices<P: CaptureProvider + ?Sized>(
    provider: &P,
    usb_ids: &UsbIdTable,
) -> Result<String, CaptureError> {
    let videos = provider.enumerate(DeviceKind::Video)?;
    if videos.is_empty() {
        return Ok(NO_CAMERAS.to_string());
    }
    let audios = audio_devices_or_none(provider);

    let mut report = String::new();
    for video in &videos {
        let identity = video.identity();
        let vendor_name = usb_ids.vendor_name(&identity.vendor_id).unwrap_or("Unknown");
        let product_name = usb_ids
            .product_name(&identity.vendor_id, &identity.product_id)
            .unwrap_or("Unknown");

        let _ = writeln!(report, "Camera {}:", video.index);
        let _ = writeln!(report, "  Name: {}", video.name);
        let _ = writeln!(report, "  Vendor name: {}", vendor_name);
        let _ = writeln!(report, "  Device name: {}", product_name);
        let _ = writeln!(report, "  Vendor ID: {}", identity.vendor_id);
        let _ = writeln!(report, "  Device ID: {}", identity.product_id);
        report.push_str("  Available video codecs:\n");
        for line in native_format_lines(provider, video) {
            let _ = writeln!(report, "    {}", line);
        }

        match find_linked_audio(video, &audios) {
            Some(audio) => {
                report.push_str("  Associated audio device found.\n");
                report.push_str("  Available audio codecs:\n");
                for line in native_format_lines(provider, audio) {
                    let _ = writeln!(report, "    {}", line);
                }
            }
            None => report.push_str("  The associated audio device was not found\n"),
        }
        report.push('\n');
    }
    Ok(report)
}

/// Native formats of `device`, one display line each. A device that cannot
/// be opened lists nothing.
fn native_format_lines<P: CaptureProvider + ?Sized>(provider: &P, device: &CaptureDevice) -> Vec<String> {
    let formats = provider
        .open_reader(device)
        .and_then(|mut reader| reader.native_formats());
    match formats {
        Ok(formats) => formats.iter().map(|f| f.to_string()).collect(),
        Err(e) => {
            log::warn!("Could not list formats of {} ({}): {}", device.name, device.kind, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeviceScript, FakeProvider};

    const USB_IDS: &str = "046d  Logitech, Inc.\n\t082d  HD Pro Webcam C920\n";

    #[test]
    fn no_cameras() {
        let provider = FakeProvider::new().with_audio("Mic", "usb#vid_046d");
        let report = describe_all_devices(&provider, &UsbIdTable::default()).unwrap();
        assert_eq!(report, "No cameras found.\n");
        assert!(provider.opened().is_empty());
    }

    #[test]
    fn camera_with_linked_microphone() {
        let provider = FakeProvider::new()
            .with_video("HD Pro Webcam C920", r"\\?\usb#vid_046d&pid_082d&mi_00#7&2a3b")
            .with_audio("Microphone (C920)", "usb#vid_046d&pid_082d&mi_00");
        let table = UsbIdTable::parse(USB_IDS);

        let report = describe_all_devices(&provider, &table).unwrap();
        let expected = "Camera 0:\n\
            \x20 Name: HD Pro Webcam C920\n\
            \x20 Vendor name: Logitech, Inc.\n\
            \x20 Device name: HD Pro Webcam C920\n\
            \x20 Vendor ID: 046d\n\
            \x20 Device ID: 082d\n\
            \x20 Available video codecs:\n\
            \x20   Codec: MJPG, Resolution: 1920x1080, FPS: 30\n\
            \x20   Codec: YUY2, Resolution: 640x480, FPS: 30\n\
            \x20 Associated audio device found.\n\
            \x20 Available audio codecs:\n\
            \x20   Codec: PCM, Sample Rate: 48000, Channels: 2, Bits Per Sample: 16\n\
            \n";
        assert_eq!(report, expected);
        assert_eq!(provider.live_readers(), 0);
    }

    #[test]
    fn unknown_identity_and_missing_microphone() {
        let provider = FakeProvider::new()
            .with_video("Virtual Cam", "root#image#0000")
            .with_audio("Line In", "hdaudio#func_01");

        let report = describe_all_devices(&provider, &UsbIdTable::default()).unwrap();
        assert!(report.contains("  Vendor name: Unknown\n"));
        assert!(report.contains("  Device name: Unknown\n"));
        assert!(report.contains("  Vendor ID: \n"));
        assert!(report.contains("  The associated audio device was not found\n"));
        assert!(!report.contains("Available audio codecs"));
    }

    #[test]
    fn unopenable_camera_lists_no_formats() {
        let mut script = DeviceScript::video();
        script.fail_open = true;
        let provider = FakeProvider::new()
            .with_device(DeviceKind::Video, "Busy Cam", "usb#vid_1234&pid_5678", script)
            .with_video("Free Cam", "usb#vid_1234&pid_9999");

        let report = describe_all_devices(&provider, &UsbIdTable::default()).unwrap();
        assert!(report.starts_with("Camera 0:\n  Name: Busy Cam\n"));
        assert!(report.contains("  Available video codecs:\n  The associated"));
        assert!(report.contains("Camera 1:\n  Name: Free Cam\n"));
    }

    #[test]
    fn enumeration_failure_propagates() {
        let provider =
            FakeProvider::new().with_enumerate_error(CaptureError::EnumerationFailed("MFEnumDeviceSources".into()));
        assert!(matches!(
            describe_all_devices(&provider, &UsbIdTable::default()),
            Err(CaptureError::EnumerationFailed(_))
        ));
    }

    #[test]
    fn audio_enumeration_failure_reports_cameras_without_audio() {
        let provider = FakeProvider::new()
            .with_video("Cam", "usb#vid_046d&pid_082d&mi_00#6&1")
            .with_audio("Mic", "usb#vid_046d&pid_082d&mi_00")
            .with_kind_enumerate_error(DeviceKind::Audio, CaptureError::EnumerationFailed("audio".into()));

        let report = describe_all_devices(&provider, &UsbIdTable::default()).unwrap();
        assert!(report.starts_with("Camera 0:\n  Name: Cam\n"));
        assert!(report.contains("  The associated audio device was not found\n"));
        assert_eq!(provider.opened(), vec!["Cam"]);
    }
}
