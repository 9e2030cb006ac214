//! Scripted devices and a virtual clock.
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! downstream crates that want to drive a `CaptureService` without hardware.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::device::{CaptureDevice, DeviceKind};
use crate::models::error::CaptureError;
use crate::models::format::{AudioFormat, Codec, MediaFormat, VideoFormat};
use crate::models::sample::Sample;
use crate::storage::avi_writer::AviWriter;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::clock::Clock;
use crate::traits::media_writer::{MediaWriter, StreamIndex};
use crate::traits::sample_reader::{ReadOutcome, SampleReader};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Virtual clock: `sleep` advances time instantly.
#[derive(Debug)]
pub struct FakeClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: AtomicUsize,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: AtomicUsize::new(0),
        }
    }

    /// Move time forward without counting a sleep.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }

    /// Number of non-zero sleeps requested so far.
    pub fn sleep_count(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }

    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}

// ---------------------------------------------------------------------------
// Devices and readers
// ---------------------------------------------------------------------------

/// Behavior of one scripted device.
#[derive(Debug, Clone)]
pub struct DeviceScript {
    pub native_formats: Vec<MediaFormat>,
    /// `open_reader` fails with `DeviceOpenFailure`.
    pub fail_open: bool,
    /// `set_format` fails with `FormatRejected`.
    pub reject_format: bool,
    /// `NoData` answers before each delivered sample.
    pub pending_reads: u32,
    /// Payload sizes, cycled sample by sample.
    pub sample_sizes: Vec<usize>,
    /// After this many samples every read answers `NoData`.
    pub stall_after: Option<u64>,
    /// Virtual time each delivered sample costs, cycled.
    pub read_costs: Vec<Duration>,
}

impl DeviceScript {
    pub fn video() -> Self {
        Self {
            native_formats: vec![
                MediaFormat::Video(VideoFormat::new(1920, 1080, 30, Codec::Mjpg)),
                MediaFormat::Video(VideoFormat::new(640, 480, 30, Codec::Yuy2)),
            ],
            fail_open: false,
            reject_format: false,
            pending_reads: 0,
            sample_sizes: vec![1024],
            stall_after: None,
            read_costs: Vec::new(),
        }
    }

    pub fn audio() -> Self {
        Self {
            native_formats: vec![MediaFormat::Audio(AudioFormat::pcm(48000, 2, 16))],
            fail_open: false,
            reject_format: false,
            pending_reads: 0,
            // 20 ms of 48 kHz stereo 16-bit
            sample_sizes: vec![3840],
            stall_after: None,
            read_costs: Vec::new(),
        }
    }
}

struct FakeDevice {
    device: CaptureDevice,
    script: DeviceScript,
}

/// Provider over a fixed set of scripted devices.
///
/// Writers default to the real AVI muxer. Readers bump a shared counter while
/// alive, so tests can check that every reader was released.
pub struct FakeProvider {
    devices: Vec<FakeDevice>,
    enumerate_errors: Vec<(DeviceKind, CaptureError)>,
    finalize_failures: Vec<String>,
    clock: Option<Arc<FakeClock>>,
    live_readers: Arc<AtomicUsize>,
    opened: Arc<Mutex<Vec<String>>>,
    enumerations: Mutex<Vec<DeviceKind>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            enumerate_errors: Vec::new(),
            finalize_failures: Vec::new(),
            clock: None,
            live_readers: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(Mutex::new(Vec::new())),
            enumerations: Mutex::new(Vec::new()),
        }
    }

    /// Add a camera with the default video script.
    pub fn with_video(self, name: &str, symbolic_link: &str) -> Self {
        self.with_device(DeviceKind::Video, name, symbolic_link, DeviceScript::video())
    }

    /// Add a microphone with the default audio script.
    pub fn with_audio(self, name: &str, symbolic_link: &str) -> Self {
        self.with_device(DeviceKind::Audio, name, symbolic_link, DeviceScript::audio())
    }

    pub fn with_device(mut self, kind: DeviceKind, name: &str, symbolic_link: &str, script: DeviceScript) -> Self {
        let index = self.devices.iter().filter(|d| d.device.kind == kind).count();
        self.devices.push(FakeDevice {
            device: CaptureDevice::new(kind, index, name, symbolic_link),
            script,
        });
        self
    }

    /// Every `enumerate` call fails with `error`.
    pub fn with_enumerate_error(self, error: CaptureError) -> Self {
        self.with_kind_enumerate_error(DeviceKind::Video, error.clone())
            .with_kind_enumerate_error(DeviceKind::Audio, error)
    }

    /// `enumerate(kind)` fails with `error`; other kinds still enumerate.
    pub fn with_kind_enumerate_error(mut self, kind: DeviceKind, error: CaptureError) -> Self {
        self.enumerate_errors.push((kind, error));
        self
    }

    /// Writers for output files named `file_name` accept every sample but
    /// fail to finalize. Other outputs get the AVI muxer.
    pub fn with_failing_finalize(mut self, file_name: &str) -> Self {
        self.finalize_failures.push(file_name.to_string());
        self
    }

    /// Charge each script's `read_costs` against `clock`.
    pub fn with_clock(mut self, clock: Arc<FakeClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Readers currently alive.
    pub fn live_readers(&self) -> usize {
        self.live_readers.load(Ordering::SeqCst)
    }

    /// Names of devices opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    /// Kinds passed to `enumerate` so far, in order.
    pub fn enumerations(&self) -> Vec<DeviceKind> {
        self.enumerations.lock().clone()
    }

    fn find(&self, device: &CaptureDevice) -> Option<&FakeDevice> {
        self.devices
            .iter()
            .find(|d| d.device.kind == device.kind && d.device.index == device.index)
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureProvider for FakeProvider {
    fn enumerate(&self, kind: DeviceKind) -> Result<Vec<CaptureDevice>, CaptureError> {
        self.enumerations.lock().push(kind);
        if let Some((_, error)) = self.enumerate_errors.iter().find(|(k, _)| *k == kind) {
            return Err(error.clone());
        }
        Ok(self
            .devices
            .iter()
            .filter(|d| d.device.kind == kind)
            .map(|d| d.device.clone())
            .collect())
    }

    fn open_reader(&self, device: &CaptureDevice) -> Result<Box<dyn SampleReader>, CaptureError> {
        let fake = self
            .find(device)
            .ok_or_else(|| CaptureError::DeviceOpenFailure(format!("no such device: {}", device.name)))?;
        if fake.script.fail_open {
            return Err(CaptureError::DeviceOpenFailure(format!("{} is busy", device.name)));
        }
        self.opened.lock().push(device.name.clone());
        Ok(Box::new(FakeReader::new(
            device.kind,
            fake.script.clone(),
            self.clock.clone(),
            Arc::clone(&self.live_readers),
        )))
    }

    fn create_writer(&self, output_path: &Path) -> Result<Box<dyn MediaWriter>, CaptureError> {
        let fails = output_path
            .file_name()
            .is_some_and(|name| self.finalize_failures.iter().any(|f| name == f.as_str()));
        if fails {
            return Ok(Box::new(RecordingWriter::at(output_path).failing_finalize()));
        }
        Ok(Box::new(AviWriter::new(output_path.to_path_buf())))
    }
}

/// Reader that replays a `DeviceScript`.
pub struct FakeReader {
    kind: DeviceKind,
    script: DeviceScript,
    clock: Option<Arc<FakeClock>>,
    live: Arc<AtomicUsize>,
    active: Option<MediaFormat>,
    delivered: u64,
    pending: u32,
}

impl FakeReader {
    pub fn new(kind: DeviceKind, script: DeviceScript, clock: Option<Arc<FakeClock>>, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        let pending = script.pending_reads;
        Self {
            kind,
            script,
            clock,
            live,
            active: None,
            delivered: 0,
            pending,
        }
    }

    /// Format most recently accepted by `set_format`.
    pub fn active_format(&self) -> Option<&MediaFormat> {
        self.active.as_ref()
    }
}

impl SampleReader for FakeReader {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn native_formats(&mut self) -> Result<Vec<MediaFormat>, CaptureError> {
        Ok(self.script.native_formats.clone())
    }

    fn set_format(&mut self, format: &MediaFormat) -> Result<(), CaptureError> {
        if self.script.reject_format || format.kind() != self.kind {
            return Err(CaptureError::FormatRejected(format.to_string()));
        }
        self.active = Some(format.clone());
        Ok(())
    }

    fn read_sample(&mut self) -> Result<ReadOutcome, CaptureError> {
        if self.script.stall_after.is_some_and(|n| self.delivered >= n) {
            return Ok(ReadOutcome::NoData);
        }
        if self.pending > 0 {
            self.pending -= 1;
            return Ok(ReadOutcome::NoData);
        }
        self.pending = self.script.pending_reads;

        let n = self.delivered as usize;
        if let (Some(clock), false) = (&self.clock, self.script.read_costs.is_empty()) {
            clock.advance(self.script.read_costs[n % self.script.read_costs.len()]);
        }
        let size = match self.script.sample_sizes.len() {
            0 => 0,
            len => self.script.sample_sizes[n % len],
        };
        self.delivered += 1;
        Ok(ReadOutcome::Sample(Sample::new(self.kind, vec![(n % 251) as u8; size])))
    }
}

impl Drop for FakeReader {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// A sample as seen by `RecordingWriter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSample {
    pub stream: StreamIndex,
    pub kind: DeviceKind,
    pub len: usize,
    pub timestamp: i64,
    pub duration: i64,
}

/// Calls observed by a `RecordingWriter`.
#[derive(Debug, Clone, Default)]
pub struct WriterLog {
    pub streams: Vec<MediaFormat>,
    pub inputs: Vec<(StreamIndex, MediaFormat)>,
    pub began: bool,
    pub samples: Vec<WrittenSample>,
    pub finalize_calls: usize,
}

impl WriterLog {
    pub fn samples_of(&self, kind: DeviceKind) -> Vec<&WrittenSample> {
        self.samples.iter().filter(|s| s.kind == kind).collect()
    }
}

/// In-memory writer that records every call.
pub struct RecordingWriter {
    path: PathBuf,
    log: Arc<Mutex<WriterLog>>,
    /// `write_sample` fails once this many samples were accepted.
    fail_after: Option<usize>,
    reject_streams: bool,
    fail_finalize: bool,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::at(Path::new("memory.avi"))
    }

    /// Report `path` as the output path. Nothing is written there.
    pub fn at(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            log: Arc::new(Mutex::new(WriterLog::default())),
            fail_after: None,
            reject_streams: false,
            fail_finalize: false,
        }
    }

    pub fn failing_after(mut self, samples: usize) -> Self {
        self.fail_after = Some(samples);
        self
    }

    pub fn rejecting_streams(mut self) -> Self {
        self.reject_streams = true;
        self
    }

    /// `finalize` is counted, then fails with `FinalizeFailure`.
    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    /// Shared handle on the call log; stays readable after the writer is gone.
    pub fn log(&self) -> Arc<Mutex<WriterLog>> {
        Arc::clone(&self.log)
    }
}

impl Default for RecordingWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaWriter for RecordingWriter {
    fn add_stream(&mut self, output: &MediaFormat) -> Result<StreamIndex, CaptureError> {
        if self.reject_streams {
            return Err(CaptureError::FormatRejected(output.to_string()));
        }
        let mut log = self.log.lock();
        log.streams.push(output.clone());
        Ok(StreamIndex(log.streams.len() as u32 - 1))
    }

    fn set_input_format(&mut self, stream: StreamIndex, input: &MediaFormat) -> Result<(), CaptureError> {
        self.log.lock().inputs.push((stream, input.clone()));
        Ok(())
    }

    fn begin_writing(&mut self) -> Result<(), CaptureError> {
        self.log.lock().began = true;
        Ok(())
    }

    fn write_sample(&mut self, stream: StreamIndex, sample: Sample) -> Result<(), CaptureError> {
        let mut log = self.log.lock();
        if self.fail_after.is_some_and(|n| log.samples.len() >= n) {
            return Err(CaptureError::WriteFailure("disk full".into()));
        }
        log.samples.push(WrittenSample {
            stream,
            kind: sample.kind,
            len: sample.len(),
            timestamp: sample.timestamp,
            duration: sample.duration,
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), CaptureError> {
        self.log.lock().finalize_calls += 1;
        if self.fail_finalize {
            return Err(CaptureError::FinalizeFailure("index write failed".into()));
        }
        Ok(())
    }

    fn output_path(&self) -> &Path {
        &self.path
    }
}
