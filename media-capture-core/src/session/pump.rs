//! The per-frame capture loop.
//!
//! ```text
//! for frame in 0..total_frames:
//!     video  = read (with retries)  → stamp(video_clock, frame_duration) → write
//!     audio? = read (with retries)  → stamp(audio_clock, bytes→ticks)    → write
//!     pace
//! finalize (always)
//! ```
//!
//! Both clocks start at zero and advance independently; audio is never
//! resynchronized to video.

use std::time::{Duration, Instant};

use crate::models::config::{CaptureConfiguration, Pacing};
use crate::models::error::CaptureError;
use crate::models::format::AudioFormat;
use crate::models::sample::{Sample, TICKS_PER_SECOND};
use crate::session::negotiation::StreamLayout;
use crate::traits::clock::Clock;
use crate::traits::media_writer::{MediaWriter, StreamIndex};
use crate::traits::sample_reader::{ReadOutcome, SampleReader};

/// Loop parameters, derived from `CaptureConfiguration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpSettings {
    pub total_frames: u64,
    pub fps: u32,
    pub max_read_attempts: u32,
    pub retry_delay: Duration,
    pub pacing: Pacing,
}

impl PumpSettings {
    pub fn from_config(config: &CaptureConfiguration) -> Self {
        Self {
            total_frames: config.total_frames(),
            fps: config.fps,
            max_read_attempts: config.max_read_attempts,
            retry_delay: config.retry_delay(),
            pacing: config.pacing,
        }
    }

    pub fn frame_duration_ticks(&self) -> i64 {
        TICKS_PER_SECOND / self.fps.max(1) as i64
    }

    fn frame_budget(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.fps.max(1) as u64)
    }

    /// Wall-clock offset of the end of frame `frame` from the loop start.
    fn deadline(&self, frame: u64) -> Duration {
        Duration::from_nanos((frame + 1) * 1_000_000_000 / self.fps.max(1) as u64)
    }
}

/// Counters for one finished pump run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub frames_written: u64,
    pub audio_buffers_written: u64,
    pub audio_bytes_written: u64,
    /// Ticks where the audio read timed out and audio was skipped.
    pub audio_ticks_skipped: u64,
    /// Final value of the video presentation clock.
    pub video_clock: i64,
    /// Final value of the audio presentation clock.
    pub audio_clock: i64,
}

impl PumpStats {
    pub fn video_duration_secs(&self) -> f64 {
        self.video_clock as f64 / TICKS_PER_SECOND as f64
    }
}

/// The audio side of a session.
pub struct AudioInput<'a> {
    pub reader: &'a mut dyn SampleReader,
    pub format: AudioFormat,
}

/// Read one sample, retrying on "no data yet" and on read errors.
///
/// Sleeps `retry_delay` between attempts; gives up with `SampleTimeout`
/// after `max_attempts`.
pub fn read_with_retry(
    reader: &mut dyn SampleReader,
    max_attempts: u32,
    retry_delay: Duration,
    clock: &dyn Clock,
) -> Result<Sample, CaptureError> {
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match reader.read_sample() {
            Ok(ReadOutcome::Sample(sample)) => return Ok(sample),
            Ok(ReadOutcome::NoData) => {
                log::debug!("No {} sample yet (attempt {}/{})", reader.kind(), attempt, attempts);
            }
            Err(e) => {
                log::warn!("{} read failed (attempt {}/{}): {}", reader.kind(), attempt, attempts, e);
            }
        }
        if attempt < attempts {
            clock.sleep(retry_delay);
        }
    }
    Err(CaptureError::SampleTimeout { attempts })
}

/// Drives readers into the writer for a fixed number of frames.
pub struct SamplePump<'a> {
    settings: PumpSettings,
    clock: &'a dyn Clock,
    video: &'a mut dyn SampleReader,
    audio: Option<AudioInput<'a>>,
    writer: &'a mut dyn MediaWriter,
    layout: StreamLayout,
}

impl<'a> SamplePump<'a> {
    pub fn new(
        settings: PumpSettings,
        clock: &'a dyn Clock,
        video: &'a mut dyn SampleReader,
        audio: Option<AudioInput<'a>>,
        writer: &'a mut dyn MediaWriter,
        layout: StreamLayout,
    ) -> Self {
        Self {
            settings,
            clock,
            video,
            audio,
            writer,
            layout,
        }
    }

    /// Run the loop to completion, then finalize the writer.
    ///
    /// The writer is finalized on every path. A loop error takes precedence
    /// over a finalize error.
    pub fn run(mut self) -> Result<PumpStats, CaptureError> {
        let mut stats = PumpStats::default();
        let outcome = self.pump_frames(&mut stats);
        let finalized = self.writer.finalize();

        match (outcome, finalized) {
            (Err(e), finalized) => {
                if let Err(fe) = finalized {
                    log::warn!("Finalize after aborted capture also failed: {}", fe);
                }
                log::warn!(
                    "Capture aborted after {} of {} frames: {}",
                    stats.frames_written,
                    self.settings.total_frames,
                    e
                );
                Err(e)
            }
            (Ok(()), Err(fe)) => Err(fe),
            (Ok(()), Ok(())) => Ok(stats),
        }
    }

    fn pump_frames(&mut self, stats: &mut PumpStats) -> Result<(), CaptureError> {
        let frame_ticks = self.settings.frame_duration_ticks();
        let audio_stream = match (&self.audio, self.layout.audio) {
            (Some(_), Some(stream)) => Some(stream),
            (None, None) => None,
            _ => {
                return Err(CaptureError::Unknown(
                    "audio input and audio stream must be declared together".into(),
                ))
            }
        };
        let loop_start = self.clock.now();

        for frame in 0..self.settings.total_frames {
            let frame_start = self.clock.now();

            let mut video = read_with_retry(
                self.video,
                self.settings.max_read_attempts,
                self.settings.retry_delay,
                self.clock,
            )?;
            video.stamp(stats.video_clock, frame_ticks);
            self.writer.write_sample(self.layout.video, video)?;
            stats.video_clock += frame_ticks;
            stats.frames_written += 1;

            if let Some(stream) = audio_stream {
                self.pump_audio(stream, frame, stats)?;
            }

            self.pace(frame, loop_start, frame_start);
        }
        Ok(())
    }

    fn pump_audio(&mut self, stream: StreamIndex, frame: u64, stats: &mut PumpStats) -> Result<(), CaptureError> {
        let Some(audio) = self.audio.as_mut() else {
            return Ok(());
        };
        match read_with_retry(
            audio.reader,
            self.settings.max_read_attempts,
            self.settings.retry_delay,
            self.clock,
        ) {
            Ok(mut sample) => {
                let len = sample.len();
                let duration = audio.format.duration_ticks(len);
                sample.stamp(stats.audio_clock, duration);
                self.writer.write_sample(stream, sample)?;
                stats.audio_clock += duration;
                stats.audio_buffers_written += 1;
                stats.audio_bytes_written += len as u64;
            }
            Err(CaptureError::SampleTimeout { attempts }) => {
                log::warn!("Audio skipped for frame {} after {} attempts", frame, attempts);
                stats.audio_ticks_skipped += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn pace(&self, frame: u64, loop_start: Instant, frame_start: Instant) {
        let now = self.clock.now();
        let target = match self.settings.pacing {
            Pacing::PerFrame => frame_start + self.settings.frame_budget(),
            Pacing::Deadline => loop_start + self.settings.deadline(frame),
        };
        if let Some(remaining) = target.checked_duration_since(now) {
            self.clock.sleep(remaining);
        }
    }
}
