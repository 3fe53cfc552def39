//! Threshold-based multi-touch detector.
//!
//! Each call to [`TouchDetector::detect`] runs one self-contained pass over a
//! [`Snapshot`]; nothing is carried over between passes.
//!
//! # Pass phases
//!
//! ```text
//! Idle -> Scanning -> Clustering -> Emitting -> Complete
//! ```
//!
//! - **Scanning**: smooth every channel with a trailing moving average of
//!   `smoothing_window` samples (fewer if fewer exist; empty channels are skipped).
//! - **Clustering**: channels above `threshold` are active; active channels whose
//!   topology distance is at most `min_separation` are merged (transitively).
//! - **Emitting**: one [`TouchEvent`] per cluster, with a value-weighted centroid
//!   and `peak / saturation` intensity clamped to `[0, 1]`.
//!
//! Events come out ordered by their lowest channel id, so identical input always
//! yields an identical sequence.
//!
//! Configuration can be changed from another thread while passes run; a change
//! applies from the next pass on.

use crate::data::sample::{ChannelId, CHANNEL_COUNT};
use crate::data::snapshot::Snapshot;
use crate::error::AppResult;
use crate::touch::config::DetectorConfig;
use crate::touch::event::TouchEvent;
use crate::touch::topology::{LinearStrip, Topology};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Smoothed state of one channel at the end of the scanning phase.
#[derive(Clone, Copy, Debug)]
struct ChannelReading {
    channel: ChannelId,
    smoothed: f64,
    timestamp: f64,
}

/// Converts buffered channel values into touch events.
pub struct TouchDetector {
    config: RwLock<DetectorConfig>,
    topology: Arc<dyn Topology>,
}

impl std::fmt::Debug for TouchDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TouchDetector")
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}

impl Default for TouchDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl TouchDetector {
    /// Detector over a [`LinearStrip`] layout.
    pub fn new(config: DetectorConfig) -> Self {
        Self::with_topology(config, Arc::new(LinearStrip))
    }

    /// Detector over a custom channel layout.
    pub fn with_topology(config: DetectorConfig, topology: Arc<dyn Topology>) -> Self {
        Self {
            config: RwLock::new(config),
            topology,
        }
    }

    /// Copy of the configuration the next pass will use.
    pub fn config(&self) -> DetectorConfig {
        *self.config.read()
    }

    /// Replace the whole configuration.
    pub fn set_config(&self, config: DetectorConfig) {
        *self.config.write() = config;
    }

    /// Update the activation threshold.
    pub fn set_threshold(&self, threshold: f64) -> AppResult<()> {
        self.config.write().set_threshold(threshold)?;
        debug!(threshold, "Touch threshold updated");
        Ok(())
    }

    /// Update the cluster separation distance.
    pub fn set_min_separation(&self, min_separation: f64) -> AppResult<()> {
        self.config.write().set_min_separation(min_separation)
    }

    /// Update the moving-average window.
    pub fn set_smoothing_window(&self, window: usize) -> AppResult<()> {
        self.config.write().set_smoothing_window(window)
    }

    /// Update the saturation value.
    pub fn set_saturation(&self, saturation: f64) -> AppResult<()> {
        self.config.write().set_saturation(saturation)
    }

    /// Run one detection pass with the current configuration.
    pub fn detect(&self, snapshot: &Snapshot) -> Vec<TouchEvent> {
        let config = self.config();
        self.detect_with(snapshot, &config)
    }

    /// Run one detection pass with an explicit configuration.
    ///
    /// Never fails: missing or short channel histories degrade to whatever
    /// samples exist, and an input with no active channel yields no events.
    pub fn detect_with(&self, snapshot: &Snapshot, config: &DetectorConfig) -> Vec<TouchEvent> {
        let readings = scan(snapshot, config.smoothing_window());

        let active: Vec<ChannelReading> = readings
            .iter()
            .flatten()
            .filter(|reading| reading.smoothed > config.threshold())
            .copied()
            .collect();
        trace!(active = active.len(), "Scanning complete");

        let clusters = cluster(&active, self.topology.as_ref(), config.min_separation());
        trace!(clusters = clusters.len(), "Clustering complete");

        let events: Vec<TouchEvent> = clusters
            .iter()
            .map(|members| emit(members, self.topology.as_ref(), config.saturation()))
            .collect();

        if !events.is_empty() {
            debug!(
                events = events.len(),
                threshold = config.threshold(),
                "Detection pass complete"
            );
        }
        events
    }

    /// Whether any smoothed channel value exceeds the threshold.
    pub fn is_touch_active(&self, snapshot: &Snapshot) -> bool {
        let config = self.config();
        scan(snapshot, config.smoothing_window())
            .iter()
            .flatten()
            .any(|reading| reading.smoothed > config.threshold())
    }

    /// Per-channel `max(0, smoothed - threshold)`; `0.0` for empty channels.
    pub fn touch_strength(&self, snapshot: &Snapshot) -> [f64; CHANNEL_COUNT] {
        let config = self.config();
        scan(snapshot, config.smoothing_window()).map(|reading| {
            reading.map_or(0.0, |r| (r.smoothed - config.threshold()).max(0.0))
        })
    }
}

fn scan(snapshot: &Snapshot, window: usize) -> [Option<ChannelReading>; CHANNEL_COUNT] {
    let mut readings = [None; CHANNEL_COUNT];
    for (channel, view) in snapshot.channels() {
        readings[channel] = view
            .trailing_mean(window)
            .zip(view.latest())
            .map(|(smoothed, latest)| ChannelReading {
                channel,
                smoothed,
                timestamp: latest.timestamp,
            });
    }
    readings
}

/// Single-linkage grouping of active channels, ordered by lowest channel id.
fn cluster(
    active: &[ChannelReading],
    topology: &dyn Topology,
    min_separation: f64,
) -> Vec<Vec<ChannelReading>> {
    // Union-find over indices into `active`
    let mut parent: Vec<usize> = (0..active.len()).collect();
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..active.len() {
        for j in (i + 1)..active.len() {
            if topology.distance(active[i].channel, active[j].channel) <= min_separation {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                if ri != rj {
                    // Keep the lower index as root so groups stay keyed by first member
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<ChannelReading>)> = Vec::new();
    for i in 0..active.len() {
        let r = root(&mut parent, i);
        match groups.iter_mut().find(|(key, _)| *key == r) {
            Some((_, members)) => members.push(active[i]),
            None => groups.push((r, vec![active[i]])),
        }
    }

    let mut clusters: Vec<Vec<ChannelReading>> = groups.into_iter().map(|(_, m)| m).collect();
    for members in &mut clusters {
        members.sort_by_key(|reading| reading.channel);
    }
    clusters.sort_by_key(|members| members.first().map_or(usize::MAX, |r| r.channel));
    clusters
}

fn emit(members: &[ChannelReading], topology: &dyn Topology, saturation: f64) -> TouchEvent {
    let weight: f64 = members.iter().map(|r| r.smoothed).sum();
    let location = if weight > 0.0 {
        members
            .iter()
            .map(|r| topology.position(r.channel) * r.smoothed)
            .sum::<f64>()
            / weight
    } else {
        members
            .first()
            .map_or(0.0, |r| topology.position(r.channel))
    };
    let peak = members
        .iter()
        .map(|r| r.smoothed)
        .fold(f64::NEG_INFINITY, f64::max);
    let timestamp = members
        .iter()
        .map(|r| r.timestamp)
        .fold(f64::NEG_INFINITY, f64::max);

    TouchEvent {
        channels: members.iter().map(|r| r.channel).collect(),
        location,
        intensity: (peak / saturation).clamp(0.0, 1.0),
        peak,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::channel_store::ChannelStore;
    use crate::touch::topology::{DistanceFn, RowColumnGrid};

    fn store_with_frames(frames: &[[f64; CHANNEL_COUNT]]) -> ChannelStore {
        let store = ChannelStore::new(64).unwrap();
        for (i, frame) in frames.iter().enumerate() {
            assert!(store.append_frame(i as f64 * 0.01, frame).is_empty());
        }
        store
    }

    #[test]
    fn test_adjacent_channels_form_one_touch() {
        let store = store_with_frames(&[[0.1, 0.1, 0.9, 0.85, 0.1, 0.1, 0.1, 0.1]]);
        let detector = TouchDetector::new(DetectorConfig::new(0.5).unwrap());

        let events = detector.detect(&store.snapshot());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channels, vec![2, 3]);
        assert!((events[0].intensity - 0.9).abs() < 1e-12);
        let expected = (2.0 * 0.9 + 3.0 * 0.85) / (0.9 + 0.85);
        assert!((events[0].location - expected).abs() < 1e-12);
    }

    #[test]
    fn test_separated_activity_forms_two_touches() {
        let store = store_with_frames(&[[0.8, 0.7, 0.1, 0.1, 0.1, 0.9, 0.6, 0.1]]);
        let detector = TouchDetector::default();

        let events = detector.detect(&store.snapshot());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].channels, vec![0, 1]);
        assert_eq!(events[1].channels, vec![5, 6]);
    }

    #[test]
    fn test_wider_separation_merges_touches() {
        let store = store_with_frames(&[[0.9, 0.1, 0.1, 0.9, 0.1, 0.1, 0.1, 0.1]]);
        let detector = TouchDetector::default();
        assert_eq!(detector.detect(&store.snapshot()).len(), 2);

        detector.set_min_separation(3.0).unwrap();
        let events = detector.detect(&store.snapshot());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channels, vec![0, 3]);
    }

    #[test]
    fn test_no_active_channel_yields_nothing() {
        let store = store_with_frames(&[[0.1; CHANNEL_COUNT]]);
        let detector = TouchDetector::default();
        let snapshot = store.snapshot();
        assert!(detector.detect(&snapshot).is_empty());
        assert!(!detector.is_touch_active(&snapshot));
    }

    #[test]
    fn test_empty_store_yields_nothing() {
        let store = ChannelStore::new(8).unwrap();
        let detector = TouchDetector::default();
        let snapshot = store.snapshot();
        assert!(detector.detect(&snapshot).is_empty());
        assert_eq!(detector.touch_strength(&snapshot), [0.0; CHANNEL_COUNT]);
    }

    #[test]
    fn test_intensity_clamped_to_saturation() {
        let store = store_with_frames(&[[0.1, 0.1, 0.1, 0.1, 5.0, 0.1, 0.1, 0.1]]);
        let detector = TouchDetector::new(
            DetectorConfig::default().with_saturation(3.3).unwrap(),
        );
        let events = detector.detect(&store.snapshot());
        assert_eq!(events[0].intensity, 1.0);
        assert_eq!(events[0].peak, 5.0);
    }

    #[test]
    fn test_smoothing_window_suppresses_spike() {
        let mut frames = vec![[0.1; CHANNEL_COUNT]; 4];
        frames.push([0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 1.3]);
        let store = store_with_frames(&frames);

        let detector = TouchDetector::default();
        assert_eq!(detector.detect(&store.snapshot()).len(), 1);

        // Mean of the last 4 on channel 7 is 0.4
        detector.set_smoothing_window(4).unwrap();
        assert!(detector.detect(&store.snapshot()).is_empty());
    }

    #[test]
    fn test_short_history_uses_available_samples() {
        let store = store_with_frames(&[[0.9; CHANNEL_COUNT]]);
        let detector =
            TouchDetector::new(DetectorConfig::default().with_smoothing_window(100).unwrap());
        let events = detector.detect(&store.snapshot());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channels.len(), CHANNEL_COUNT);
    }

    #[test]
    fn test_threshold_change_applies_to_next_pass() {
        let store = store_with_frames(&[[0.1, 0.6, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]]);
        let detector = TouchDetector::default();
        let snapshot = store.snapshot();
        assert_eq!(detector.detect(&snapshot).len(), 1);

        detector.set_threshold(0.7).unwrap();
        assert!(detector.detect(&snapshot).is_empty());

        assert!(detector.set_threshold(0.0).is_err());
        assert_eq!(detector.config().threshold(), 0.7);
    }

    #[test]
    fn test_touch_strength_relative_to_threshold() {
        let store = store_with_frames(&[[0.1, 0.75, 0.1, 0.1, 0.1, 0.1, 0.1, 0.5]]);
        let detector = TouchDetector::default();
        let strength = detector.touch_strength(&store.snapshot());
        assert!((strength[1] - 0.25).abs() < 1e-12);
        assert_eq!(strength[0], 0.0);
        assert_eq!(strength[7], 0.0);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let store = store_with_frames(&[
            [0.2, 0.6, 0.7, 0.1, 0.9, 0.1, 0.55, 0.8],
            [0.3, 0.7, 0.6, 0.2, 0.8, 0.2, 0.65, 0.9],
        ]);
        let detector =
            TouchDetector::new(DetectorConfig::default().with_smoothing_window(2).unwrap());
        let snapshot = store.snapshot();
        assert_eq!(detector.detect(&snapshot), detector.detect(&snapshot));
    }

    #[test]
    fn test_grid_topology_keeps_axes_apart() {
        let store = store_with_frames(&[[0.1, 0.1, 0.9, 0.1, 0.9, 0.1, 0.1, 0.1]]);
        let detector =
            TouchDetector::with_topology(DetectorConfig::default(), Arc::new(RowColumnGrid));

        // Channels 2 and 4 are two apart on a strip but on different grid axes
        let events = detector.detect(&store.snapshot());
        assert_eq!(events.len(), 2);
        let points = RowColumnGrid.crosspoints(&events);
        assert_eq!(points.len(), 1);
        assert_eq!((points[0].row, points[0].column), (2.0, 0.0));
    }

    #[test]
    fn test_injected_ring_topology_wraps_clusters() {
        let ring = DistanceFn(|a: usize, b: usize| {
            let d = a.abs_diff(b);
            d.min(CHANNEL_COUNT - d) as f64
        });
        let store = store_with_frames(&[[0.9, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.9]]);
        let detector = TouchDetector::with_topology(DetectorConfig::default(), Arc::new(ring));

        let events = detector.detect(&store.snapshot());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channels, vec![0, 7]);
        assert_eq!(events[0].start_channel(), 0);
    }

    #[test]
    fn test_event_timestamp_is_latest_sample() {
        let store = store_with_frames(&[[0.9; CHANNEL_COUNT], [0.9; CHANNEL_COUNT]]);
        let detector = TouchDetector::default();
        let events = detector.detect(&store.snapshot());
        assert_eq!(events[0].timestamp, 0.01);
    }
}
