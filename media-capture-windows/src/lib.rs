//! # media-capture-windows
//!
//! Windows Media Foundation backend for media-capture-kit.
//!
//! Provides:
//! - `MediaFoundationProvider`: `CaptureProvider` over Media Foundation
//! - `DeviceEnumerator`: video/audio capture sources via `MFEnumDeviceSources`
//! - `MfSourceReader`: synchronous `IMFSourceReader` per device
//! - `MfSinkWriter`: AVI sink writer
//! - `MfRuntime`: COM + Media Foundation lifetime guard
//!
//! ## Usage
//! ```ignore
//! use media_capture_core::{CaptureConfiguration, CaptureMode, CaptureService};
//! use media_capture_windows::MediaFoundationProvider;
//!
//! let service = CaptureService::new(MediaFoundationProvider::new(), CaptureConfiguration::default())?;
//! let files = service.capture_all_devices("captures".as_ref(), CaptureMode::WithAudio)?;
//! ```

#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod media_type;
#[cfg(target_os = "windows")]
pub mod provider;
#[cfg(target_os = "windows")]
pub mod runtime;
#[cfg(target_os = "windows")]
pub mod sink_writer;
#[cfg(target_os = "windows")]
pub mod source_reader;

#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use provider::MediaFoundationProvider;
#[cfg(target_os = "windows")]
pub use runtime::MfRuntime;
#[cfg(target_os = "windows")]
pub use sink_writer::MfSinkWriter;
#[cfg(target_os = "windows")]
pub use source_reader::MfSourceReader;
