//! Sample and channel primitives shared by the buffer and the detector.

use serde::{Deserialize, Serialize};

/// Number of sensor channels on the sampled surface.
pub const CHANNEL_COUNT: usize = 8;

/// Index of one sensor channel, `0..CHANNEL_COUNT`.
pub type ChannelId = usize;

/// One timestamped scalar reading on one channel.
///
/// `timestamp` is monotonic seconds since the start of the session; `value` is the
/// raw channel reading (volts for the reference hardware).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic timestamp in seconds
    pub timestamp: f64,
    /// Measured value
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub const fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((timestamp, value): (f64, f64)) -> Self {
        Self { timestamp, value }
    }
}
