use super::device::DeviceKind;

/// Presentation time base: 100 ns ticks.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// One unit of media data (a video frame or an audio buffer).
///
/// Produced by a `SampleReader` and moved into a `MediaWriter`; never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub kind: DeviceKind,
    pub data: Vec<u8>,
    /// Presentation timestamp relative to stream start, in ticks.
    pub timestamp: i64,
    /// Duration in ticks.
    pub duration: i64,
}

impl Sample {
    /// A sample as delivered by a device, not yet stamped.
    pub fn new(kind: DeviceKind, data: Vec<u8>) -> Self {
        Self {
            kind,
            data,
            timestamp: 0,
            duration: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Set presentation time and duration.
    pub fn stamp(&mut self, timestamp: i64, duration: i64) {
        self.timestamp = timestamp;
        self.duration = duration;
    }
}
