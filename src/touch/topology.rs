//! Channel topology: which channels are physically close to each other.
//!
//! Clustering only ever asks a topology for distances and positions, so the
//! electrode layout is configuration rather than detector code.

use crate::data::sample::{ChannelId, CHANNEL_COUNT};
use crate::touch::event::{Crosspoint, TouchEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Distance metric and position map over channel ids.
pub trait Topology: Send + Sync {
    /// Distance between two channels. `f64::INFINITY` means never adjacent.
    fn distance(&self, a: ChannelId, b: ChannelId) -> f64;

    /// Position of a channel along its axis, used for centroids.
    fn position(&self, channel: ChannelId) -> f64 {
        channel as f64
    }
}

/// Channels laid out in a single line, `0..8`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearStrip;

impl Topology for LinearStrip {
    fn distance(&self, a: ChannelId, b: ChannelId) -> f64 {
        a.abs_diff(b) as f64
    }
}

/// Number of row (and column) electrodes on the grid.
pub const GRID_SIDE: usize = CHANNEL_COUNT / 2;

/// Which electrode axis a grid channel belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Channels `0..4`
    Row,
    /// Channels `4..8`
    Column,
}

/// 4x4 matrix: channels 0-3 are row electrodes, 4-7 column electrodes.
///
/// Rows and columns never cluster together; a finger shows up as one row touch
/// and one column touch, which [`crosspoints`](Self::crosspoints) pairs up.
#[derive(Clone, Copy, Debug, Default)]
pub struct RowColumnGrid;

impl RowColumnGrid {
    /// Axis of a channel.
    pub fn axis(channel: ChannelId) -> Axis {
        if channel < GRID_SIDE {
            Axis::Row
        } else {
            Axis::Column
        }
    }

    /// Every (row touch, column touch) pair as a grid location.
    ///
    /// With more than one touch per axis this includes ghost points; the
    /// electrodes alone cannot tell them apart.
    pub fn crosspoints(&self, events: &[TouchEvent]) -> Vec<Crosspoint> {
        let (rows, columns): (Vec<&TouchEvent>, Vec<&TouchEvent>) = events
            .iter()
            .partition(|event| Self::axis(event.start_channel()) == Axis::Row);

        rows.iter()
            .flat_map(|row| {
                columns.iter().map(move |column| Crosspoint {
                    row: row.location,
                    column: column.location,
                    intensity: row.intensity.min(column.intensity),
                    timestamp: row.timestamp.max(column.timestamp),
                })
            })
            .collect()
    }
}

impl Topology for RowColumnGrid {
    fn distance(&self, a: ChannelId, b: ChannelId) -> f64 {
        if Self::axis(a) == Self::axis(b) {
            a.abs_diff(b) as f64
        } else {
            f64::INFINITY
        }
    }

    fn position(&self, channel: ChannelId) -> f64 {
        (channel % GRID_SIDE) as f64
    }
}

/// Adapter turning a plain distance function into a [`Topology`].
///
/// Positions default to the channel id.
pub struct DistanceFn<F>(pub F);

impl<F> Topology for DistanceFn<F>
where
    F: Fn(ChannelId, ChannelId) -> f64 + Send + Sync,
{
    fn distance(&self, a: ChannelId, b: ChannelId) -> f64 {
        (self.0)(a, b)
    }
}

/// Named topologies selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// [`LinearStrip`]
    #[default]
    Linear,
    /// [`RowColumnGrid`]
    Grid,
}

impl TopologyKind {
    /// Shared instance of the selected topology.
    pub fn build(self) -> Arc<dyn Topology> {
        match self {
            TopologyKind::Linear => Arc::new(LinearStrip),
            TopologyKind::Grid => Arc::new(RowColumnGrid),
        }
    }
}
