use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::identity::DeviceIdentity;

/// Kind of capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Video,
    Audio,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// A capture device discovered by one enumeration pass.
///
/// Carries no platform handle. Backends resolve the handle again from
/// `symbolic_link` when a reader is opened, so a `CaptureDevice` can be
/// cloned and passed around freely after the pass has been released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub kind: DeviceKind,
    /// Position in the enumeration pass that produced this device.
    pub index: usize,
    pub name: String,
    /// Platform-specific symbolic identifier, e.g.
    /// `\\?\usb#vid_046d&pid_085b&mi_00#...`. May be empty.
    pub symbolic_link: String,
}

impl CaptureDevice {
    pub fn new(kind: DeviceKind, index: usize, name: impl Into<String>, symbolic_link: impl Into<String>) -> Self {
        Self {
            kind,
            index,
            name: name.into(),
            symbolic_link: symbolic_link.into(),
        }
    }

    /// Vendor/product codes parsed from the symbolic identifier.
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::parse(&self.symbolic_link)
    }
}
