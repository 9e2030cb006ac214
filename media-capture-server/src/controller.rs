use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use media_capture_core::{CaptureDevice, CaptureError, CaptureMode, CaptureProvider, CaptureService, UsbIdTable};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::{self, Command, Reply};

/// Maps commands onto capture operations.
///
/// Device work is blocking and runs under one lock, so two clients never
/// contend for a camera.
pub struct MediaController<P: CaptureProvider> {
    service: CaptureService<P>,
    usb_ids: UsbIdTable,
    default_output_dir: PathBuf,
    device_lock: Mutex<()>,
}

impl<P: CaptureProvider> MediaController<P> {
    pub fn new(service: CaptureService<P>, usb_ids: UsbIdTable, default_output_dir: PathBuf) -> Self {
        Self {
            service,
            usb_ids,
            default_output_dir,
            device_lock: Mutex::new(()),
        }
    }

    pub fn from_config(provider: P, config: &ServerConfig, usb_ids: UsbIdTable) -> Result<Self, ServerError> {
        let service = CaptureService::new(provider, config.capture.clone())?;
        Ok(Self::new(service, usb_ids, config.output_dir()))
    }

    pub fn service(&self) -> &CaptureService<P> {
        &self.service
    }

    /// Run `command` to completion. Blocks for the length of a capture.
    pub fn handle(&self, command: &Command) -> Vec<Reply> {
        log::debug!("Received command: {:?}", command);
        if !command.uses_devices() {
            return vec![Reply::Text(protocol::UNKNOWN_COMMAND.into())];
        }

        let _guard = self.device_lock.lock();
        let result = match command {
            Command::Info => self.info(),
            Command::Photos => self.photos(),
            Command::Videos { base_path } => self.videos(base_path.as_deref(), CaptureMode::WithAudio),
            Command::SilentVideos { base_path } => self.videos(base_path.as_deref(), CaptureMode::VideoOnly),
            Command::Unknown(_) => Ok(vec![Reply::Text(protocol::UNKNOWN_COMMAND.into())]),
        };
        result.unwrap_or_else(|e| {
            log::error!("Command {:?} failed: {}", command, e);
            vec![Reply::error(e)]
        })
    }

    fn info(&self) -> Result<Vec<Reply>, CaptureError> {
        Ok(vec![Reply::Text(self.service.describe_devices(&self.usb_ids)?)])
    }

    fn photos(&self) -> Result<Vec<Reply>, CaptureError> {
        let Some(videos) = self.cameras()? else {
            return Ok(vec![Reply::Text(protocol::NO_CAMERAS.into())]);
        };
        let files = self
            .service
            .capture_photos_from(&videos)
            .into_iter()
            .map(|photo| Reply::File {
                name: photo.file_name,
                data: photo.data,
            })
            .collect();
        Ok(protocol::files_or(files, protocol::NO_PHOTOS))
    }

    fn videos(&self, base_path: Option<&Path>, mode: CaptureMode) -> Result<Vec<Reply>, CaptureError> {
        let Some(videos) = self.cameras()? else {
            return Ok(vec![Reply::Text(protocol::NO_CAMERAS.into())]);
        };
        let base_path = base_path.unwrap_or(&self.default_output_dir);
        let paths = self.service.capture_devices(&videos, base_path, mode)?;

        let files = paths.iter().map(|path| read_file_reply(path)).collect();
        Ok(protocol::files_or(files, protocol::NO_VIDEOS))
    }

    /// Enumerated cameras, or `None` when there are none.
    fn cameras(&self) -> Result<Option<Vec<CaptureDevice>>, CaptureError> {
        match self.service.video_devices() {
            Ok(videos) => Ok(Some(videos)),
            Err(CaptureError::EnumerationEmpty) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Frame a finished recording, or report why it could not be read.
fn read_file_reply(path: &Path) -> Reply {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match fs::read(path) {
        Ok(data) => Reply::File { name, data },
        Err(e) => {
            log::warn!("Unable to open {}: {}", path.display(), e);
            Reply::error(format!("Unable to open file: {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use media_capture_core::testing::{DeviceScript, FakeClock, FakeProvider};
    use media_capture_core::{CaptureConfiguration, DeviceKind};

    use super::*;

    fn controller(provider: FakeProvider, output: &Path) -> MediaController<FakeProvider> {
        let config = CaptureConfiguration {
            duration_secs: 1,
            fps: 5,
            ..Default::default()
        };
        let service = CaptureService::new(provider, config)
            .unwrap()
            .with_clock(Arc::new(FakeClock::new()));
        MediaController::new(service, UsbIdTable::default(), output.to_path_buf())
    }

    #[test]
    fn unknown_command_touches_no_device() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(FakeProvider::new().with_video("Cam", "usb#vid_1"), dir.path());
        let replies = ctl.handle(&Command::parse("format_disk"));
        assert_eq!(replies, vec![Reply::Text("Unknown command.".into())]);
        assert!(ctl.service().provider().opened().is_empty());
    }

    #[test]
    fn no_cameras_reply() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(FakeProvider::new(), dir.path());
        for line in ["get_photo_from_all", "get_video_from_all", "get_svideo_from_all"] {
            assert_eq!(ctl.handle(&Command::parse(line)), vec![Reply::Text(protocol::NO_CAMERAS.into())]);
        }
        assert_eq!(
            ctl.handle(&Command::Info),
            vec![Reply::Text("No cameras found.\n".into())]
        );
    }

    #[test]
    fn videos_go_to_default_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(FakeProvider::new().with_video("Cam", "usb#vid_1"), dir.path());
        let replies = ctl.handle(&Command::SilentVideos { base_path: None });
        assert_eq!(replies.len(), 1);
        assert!(matches!(&replies[0], Reply::File { name, data } if name == "video_camera_0.avi" && !data.is_empty()));
        assert!(dir.path().join("video_camera_0.avi").exists());
    }

    #[test]
    fn empty_photos_not_framed() {
        let dir = tempfile::tempdir().unwrap();
        let mut script = DeviceScript::video();
        script.sample_sizes = vec![0];
        let provider = FakeProvider::new().with_device(DeviceKind::Video, "Cam", "usb#vid_1", script);
        let ctl = controller(provider, dir.path());
        assert_eq!(
            ctl.handle(&Command::Photos),
            vec![Reply::Text(protocol::NO_PHOTOS.into())]
        );
    }

    #[test]
    fn failed_recordings_reply_no_videos() {
        let dir = tempfile::tempdir().unwrap();
        let mut script = DeviceScript::video();
        script.fail_open = true;
        let provider = FakeProvider::new().with_device(DeviceKind::Video, "Cam", "usb#vid_1", script);
        let ctl = controller(provider, dir.path());
        assert_eq!(
            ctl.handle(&Command::Videos { base_path: None }),
            vec![Reply::Text(protocol::NO_VIDEOS.into())]
        );
    }

    #[test]
    fn errors_are_reported_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            FakeProvider::new().with_enumerate_error(CaptureError::EnumerationFailed("MFEnumDeviceSources".into()));
        let ctl = controller(provider, dir.path());
        let replies = ctl.handle(&Command::Photos);
        assert!(matches!(&replies[0], Reply::Text(t) if t.starts_with("ERROR: ")));
    }

    #[test]
    fn each_command_enumerates_cameras_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(FakeProvider::new().with_video("Cam", "usb#vid_1"), dir.path());

        ctl.handle(&Command::Photos);
        assert_eq!(ctl.service().provider().enumerations(), vec![DeviceKind::Video]);

        ctl.handle(&Command::Videos { base_path: None });
        assert_eq!(
            ctl.service().provider().enumerations(),
            vec![DeviceKind::Video, DeviceKind::Video, DeviceKind::Audio]
        );
    }

    #[test]
    fn audio_enumeration_failure_still_sends_videos() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::new()
            .with_video("Cam", "usb#vid_1")
            .with_kind_enumerate_error(DeviceKind::Audio, CaptureError::EnumerationFailed("audio".into()));
        let ctl = controller(provider, dir.path());
        let replies = ctl.handle(&Command::Videos { base_path: None });
        assert!(matches!(&replies[..], [Reply::File { name, .. }] if name == "video_camera_0.avi"));
    }
}
