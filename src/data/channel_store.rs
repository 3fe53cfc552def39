//! Multi-channel sample store.
//!
//! `ChannelStore` owns one [`SampleBuffer`] per sensor channel and is the single
//! entry point for both the ingest side (`append`) and the read side (`snapshot`,
//! `stats`, `range_query`, `interpolate_at`).
//!
//! # Memory bound
//!
//! Readable samples are bounded at `8 x capacity`; the allocation is two slots per
//! channel, `2 x 8 x capacity` samples. It is made once at construction and never
//! grows, regardless of how long the session runs: see [`ChannelStore::footprint`].

use crate::data::sample::{ChannelId, Sample, CHANNEL_COUNT};
use crate::data::sample_buffer::{SampleBuffer, SwapOutcome};
use crate::data::snapshot::Snapshot;
use crate::error::{AppResult, DaqError};
use serde::Serialize;
use tracing::{debug, info};

/// Default per-channel capacity (samples per slot).
pub const DEFAULT_CAPACITY: usize = 2048;

/// Summary of one channel's readable side, for reporting and export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelStats {
    /// Channel id
    pub channel: ChannelId,
    /// Number of readable samples
    pub count: usize,
    /// `(first, last)` timestamp, if any samples exist
    pub time_span: Option<(f64, f64)>,
    /// `(min, max)` value, if any samples exist
    pub value_range: Option<(f64, f64)>,
}

/// Allocated storage of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MemoryFootprint {
    /// Samples the store can hold without reallocating, both slots included
    pub allocated_samples: usize,
    /// `allocated_samples * size_of::<Sample>()`
    pub allocated_bytes: usize,
    /// Readable samples per channel never exceed this
    pub capacity_per_channel: usize,
}

/// Fixed set of per-channel double buffers.
#[derive(Debug)]
pub struct ChannelStore {
    buffers: [SampleBuffer; CHANNEL_COUNT],
    capacity: usize,
}

impl ChannelStore {
    /// Create a store with `capacity` samples per channel side.
    pub fn new(capacity: usize) -> AppResult<Self> {
        let buffers: [SampleBuffer; CHANNEL_COUNT] = (0..CHANNEL_COUNT)
            .map(|_| SampleBuffer::new(capacity))
            .collect::<AppResult<Vec<_>>>()?
            .try_into()
            .map_err(|_| DaqError::InvalidConfig("channel count mismatch".to_string()))?;

        info!(
            channels = CHANNEL_COUNT,
            capacity,
            bytes = (2 * CHANNEL_COUNT)
                .checked_mul(capacity)
                .and_then(|samples| samples.checked_mul(std::mem::size_of::<Sample>())),
            "ChannelStore created"
        );

        Ok(Self { buffers, capacity })
    }

    /// Per-channel, per-side capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn buffer(&self, channel: ChannelId) -> AppResult<&SampleBuffer> {
        self.buffers
            .get(channel)
            .ok_or(DaqError::InvalidChannel { channel })
    }

    /// Append one sample to one channel's active side.
    pub fn append(&self, channel: ChannelId, sample: Sample) -> AppResult<()> {
        self.buffer(channel)?.append(sample)
    }

    /// Append one frame of readings sharing a timestamp, one per channel.
    ///
    /// A rejected channel does not stop the remaining channels; the rejections are
    /// returned in channel order (empty when every sample was accepted).
    pub fn append_frame(
        &self,
        timestamp: f64,
        values: &[f64; CHANNEL_COUNT],
    ) -> Vec<(ChannelId, DaqError)> {
        self.buffers
            .iter()
            .zip(values)
            .enumerate()
            .filter_map(|(ch, (buffer, &value))| {
                buffer
                    .append(Sample::new(timestamp, value))
                    .err()
                    .map(|err| (ch, err))
            })
            .collect()
    }

    /// Swap every channel and return a consistent view of the standby sides.
    ///
    /// Channels whose swap is deferred (an older snapshot is still alive) keep
    /// their previous standby contents.
    pub fn snapshot(&self) -> Snapshot {
        let deferred = self
            .buffers
            .iter()
            .filter(|buffer| buffer.swap() == SwapOutcome::Deferred)
            .count();
        if deferred > 0 {
            debug!(deferred, "Snapshot taken with deferred channel swaps");
        }
        Snapshot::new(std::array::from_fn(|ch| self.buffers[ch].view()))
    }

    /// Per-channel count, time span and value range of the readable side.
    ///
    /// Pure read: does not swap, so appends since the last snapshot are not counted.
    /// Each channel is read through a short-lived view, so a `snapshot()` racing
    /// with this call on another thread may see that channel's swap deferred.
    pub fn stats(&self) -> [ChannelStats; CHANNEL_COUNT] {
        std::array::from_fn(|channel| {
            let view = self.buffers[channel].view();
            ChannelStats {
                channel,
                count: view.len(),
                time_span: view
                    .first()
                    .zip(view.latest())
                    .map(|(first, last)| (first.timestamp, last.timestamp)),
                value_range: view.value_range(),
            }
        })
    }

    /// Drop every buffered sample and timestamp so a new acquisition can start.
    ///
    /// Channels whose readable side is held by a live snapshot keep serving it
    /// until the next snapshot after that one is dropped.
    pub fn clear(&self) {
        let deferred = self.buffers.iter().filter(|buffer| !buffer.clear()).count();
        info!(deferred, "ChannelStore cleared");
    }

    /// Readable samples of `channel` with `t_start <= timestamp <= t_end`.
    pub fn range_query(&self, channel: ChannelId, t_start: f64, t_end: f64) -> AppResult<Vec<Sample>> {
        Ok(self.buffer(channel)?.range_query(t_start, t_end))
    }

    /// Interpolated readable value of `channel` at `t`.
    pub fn interpolate_at(&self, channel: ChannelId, t: f64) -> AppResult<f64> {
        self.buffer(channel)?.interpolate_at(t)
    }

    /// Allocated storage across all channels.
    pub fn footprint(&self) -> MemoryFootprint {
        let allocated_samples = self
            .buffers
            .iter()
            .map(SampleBuffer::allocated_samples)
            .sum::<usize>();
        MemoryFootprint {
            allocated_samples,
            allocated_bytes: allocated_samples * std::mem::size_of::<Sample>(),
            capacity_per_channel: self.capacity,
        }
    }
}
