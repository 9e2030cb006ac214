//! # media-capture-core
//!
//! Platform-agnostic synchronized video+audio capture core.
//!
//! Provides device identity parsing, camera/microphone pairing, format
//! negotiation, the per-frame sample pump, batch session orchestration, the
//! device report, and a portable AVI muxer. Platform backends (Windows Media
//! Foundation) implement the `CaptureProvider` trait and plug into the
//! generic `CaptureService`.
//!
//! ## Architecture
//!
//! ```text
//! media-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, SampleReader, MediaWriter, Clock
//! ├── models/       ← CaptureError, CaptureConfiguration, CaptureDevice, MediaFormat, Sample
//! ├── catalog/      ← DeviceIdentity, pairing, UsbIdTable, device report
//! ├── processing/   ← AVI header layout
//! ├── session/      ← negotiation, SamplePump, CaptureService
//! ├── storage/      ← AviWriter, checksum
//! └── testing/      ← FakeProvider, FakeClock (feature = "testing")
//! ```

pub mod catalog;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types at crate root for convenience.
pub use catalog::identity::DeviceIdentity;
pub use catalog::pairing::{are_linked, audio_devices_or_none, find_linked_audio};
pub use catalog::report::describe_all_devices;
pub use catalog::usb_ids::UsbIdTable;
pub use models::config::{CaptureConfiguration, FileNaming, Pacing};
pub use models::device::{CaptureDevice, DeviceKind};
pub use models::error::CaptureError;
pub use models::format::{AudioFormat, Codec, MediaFormat, VideoFormat};
pub use models::recording_result::{Photo, RecordingResult};
pub use models::sample::{Sample, TICKS_PER_SECOND};
pub use session::negotiation::StreamLayout;
pub use session::pump::{PumpSettings, PumpStats, SamplePump};
pub use session::service::{CaptureMode, CaptureService};
pub use storage::avi_writer::AviWriter;
pub use traits::capture_provider::CaptureProvider;
pub use traits::clock::{Clock, SystemClock};
pub use traits::media_writer::{MediaWriter, StreamIndex};
pub use traits::sample_reader::{ReadOutcome, SampleReader};
