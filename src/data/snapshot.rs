//! Consistent read-only view across all channels.

use crate::data::sample::{ChannelId, CHANNEL_COUNT};
use crate::data::sample_buffer::StandbyView;
use crate::error::{AppResult, DaqError};

/// Immutable view of every channel's standby slot, taken by
/// [`ChannelStore::snapshot`](crate::data::channel_store::ChannelStore::snapshot).
///
/// While a snapshot is alive none of its slots can become a write target, so
/// repeated reads through it always see the same samples. Drop it promptly:
/// a held snapshot defers the next swap on every channel.
#[derive(Debug)]
pub struct Snapshot {
    views: [StandbyView; CHANNEL_COUNT],
}

impl Snapshot {
    pub(crate) fn new(views: [StandbyView; CHANNEL_COUNT]) -> Self {
        Self { views }
    }

    /// View of a single channel.
    pub fn channel(&self, channel: ChannelId) -> AppResult<&StandbyView> {
        self.views
            .get(channel)
            .ok_or(DaqError::InvalidChannel { channel })
    }

    /// Channel views in channel-id order.
    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, &StandbyView)> {
        self.views.iter().enumerate()
    }

    /// Whether any channel holds at least one sample.
    pub fn has_data(&self) -> bool {
        self.views.iter().any(|view| !view.is_empty())
    }

    /// Latest value per channel, `0.0` for channels without samples.
    pub fn latest_values(&self) -> [f64; CHANNEL_COUNT] {
        std::array::from_fn(|ch| self.views[ch].latest().map_or(0.0, |s| s.value))
    }

    /// Earliest first timestamp and latest last timestamp across channels.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.views.iter().fold(None, |acc, view| {
            let (first, last) = match (view.first(), view.latest()) {
                (Some(first), Some(last)) => (first.timestamp, last.timestamp),
                _ => return acc,
            };
            Some(match acc {
                None => (first, last),
                Some((lo, hi)) => (lo.min(first), hi.max(last)),
            })
        })
    }
}
