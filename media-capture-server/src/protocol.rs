//! Text commands and response framing.
//!
//! A command is one line of space-separated tokens. Replies are either raw
//! UTF-8 text or framed files:
//!
//! ```text
//! FILE:<name>:<byteLength>\n<exactly byteLength bytes>
//! ```

use std::path::PathBuf;

pub const UNKNOWN_COMMAND: &str = "Unknown command.";
pub const NO_CAMERAS: &str = "No cameras found.";
pub const NO_PHOTOS: &str = "No photos captured.";
pub const NO_VIDEOS: &str = "No videos recorded.";

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get_info_from_all`
    Info,
    /// `get_photo_from_all`
    Photos,
    /// `get_video_from_all [basePath]`
    Videos { base_path: Option<PathBuf> },
    /// `get_svideo_from_all [basePath]`
    SilentVideos { base_path: Option<PathBuf> },
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().unwrap_or_default();
        let base_path = tokens.next().map(PathBuf::from);

        match name {
            "get_info_from_all" => Self::Info,
            "get_photo_from_all" => Self::Photos,
            "get_video_from_all" => Self::Videos { base_path },
            "get_svideo_from_all" => Self::SilentVideos { base_path },
            _ => Self::Unknown(line.trim().to_string()),
        }
    }

    /// Whether the command touches devices.
    pub fn uses_devices(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

/// One unit written back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    File { name: String, data: Vec<u8> },
}

impl Reply {
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::Text(format!("ERROR: {}", message))
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.as_bytes().to_vec(),
            Self::File { name, data } => {
                let mut out = file_header(name, data.len()).into_bytes();
                out.extend_from_slice(data);
                out
            }
        }
    }
}

pub fn file_header(name: &str, len: usize) -> String {
    format!("FILE:{}:{}\n", name, len)
}

/// Drop empty files; if nothing is left, reply with `empty_text` instead.
pub fn files_or(files: Vec<Reply>, empty_text: &str) -> Vec<Reply> {
    let kept: Vec<Reply> = files
        .into_iter()
        .filter(|reply| match reply {
            Reply::File { name, data } if data.is_empty() => {
                log::warn!("Not sending empty file {}", name);
                false
            }
            _ => true,
        })
        .collect();
    if kept.is_empty() {
        vec![Reply::Text(empty_text.to_string())]
    } else {
        kept
    }
}
