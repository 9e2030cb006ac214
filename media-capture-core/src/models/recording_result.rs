use std::path::PathBuf;

/// Result of one device's completed capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub device_name: String,
    pub frames_written: u64,
    pub audio_buffers_written: u64,
    pub audio_bytes_written: u64,
    /// Whether an audio stream was declared on the container.
    pub has_audio: bool,
    /// Length of the video stream according to its presentation clock.
    pub duration_secs: f64,
    /// SHA-256 hex digest of the finalized file.
    pub checksum: String,
}

/// A single still frame grabbed from one camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub file_name: String,
    pub data: Vec<u8>,
}
