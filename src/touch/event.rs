//! Touch detection output types.

use crate::data::sample::ChannelId;
use serde::Serialize;

/// One detected touch: a cluster of adjacent active channels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TouchEvent {
    /// Channels in the cluster, ascending
    pub channels: Vec<ChannelId>,
    /// Centroid of the channel positions weighted by smoothed value
    pub location: f64,
    /// Peak smoothed value relative to saturation, clamped to `[0, 1]`
    pub intensity: f64,
    /// Peak smoothed value in raw units
    pub peak: f64,
    /// Latest sample timestamp among the cluster's channels
    pub timestamp: f64,
}

impl TouchEvent {
    /// Lowest channel id in the cluster; events are emitted in this order.
    pub fn start_channel(&self) -> ChannelId {
        self.channels.first().copied().unwrap_or_default()
    }
}

/// Intersection of a row touch and a column touch on a row/column grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Crosspoint {
    /// Row position (0..4)
    pub row: f64,
    /// Column position (0..4)
    pub column: f64,
    /// Weaker of the two contributing intensities
    pub intensity: f64,
    /// Later of the two contributing timestamps
    pub timestamp: f64,
}
