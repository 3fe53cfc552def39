//! Detector configuration.
//!
//! A `DetectorConfig` can only be built or mutated through validating methods, so
//! a detector never runs a pass with a degenerate setting. Invalid values are
//! rejected with [`DaqError::InvalidConfig`] at the moment they are supplied.

use crate::error::{AppResult, DaqError};
use serde::Serialize;

/// Default activation threshold (volts on the reference hardware).
pub const DEFAULT_THRESHOLD: f64 = 0.5;
/// Default value that maps to intensity 1.0.
pub const DEFAULT_SATURATION: f64 = 1.0;

/// Validated settings for a [`TouchDetector`](crate::touch::detector::TouchDetector).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DetectorConfig {
    threshold: f64,
    min_separation: f64,
    smoothing_window: usize,
    saturation: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_separation: 1.0,
            smoothing_window: 1,
            saturation: DEFAULT_SATURATION,
        }
    }
}

impl DetectorConfig {
    /// Default configuration with a custom threshold.
    pub fn new(threshold: f64) -> AppResult<Self> {
        Self::default().with_threshold(threshold)
    }

    /// Smoothed value a channel must exceed to count as active.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Largest topology distance at which two active channels still belong to
    /// the same touch. Active channels further apart form separate touches.
    pub fn min_separation(&self) -> f64 {
        self.min_separation
    }

    /// Number of trailing samples averaged per channel.
    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    /// Smoothed value that maps to intensity 1.0.
    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    /// Builder form of [`set_threshold`](Self::set_threshold).
    pub fn with_threshold(mut self, threshold: f64) -> AppResult<Self> {
        self.set_threshold(threshold)?;
        Ok(self)
    }

    /// Builder form of [`set_min_separation`](Self::set_min_separation).
    pub fn with_min_separation(mut self, min_separation: f64) -> AppResult<Self> {
        self.set_min_separation(min_separation)?;
        Ok(self)
    }

    /// Builder form of [`set_smoothing_window`](Self::set_smoothing_window).
    pub fn with_smoothing_window(mut self, window: usize) -> AppResult<Self> {
        self.set_smoothing_window(window)?;
        Ok(self)
    }

    /// Builder form of [`set_saturation`](Self::set_saturation).
    pub fn with_saturation(mut self, saturation: f64) -> AppResult<Self> {
        self.set_saturation(saturation)?;
        Ok(self)
    }

    /// Threshold must be positive and finite.
    pub fn set_threshold(&mut self, threshold: f64) -> AppResult<()> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(DaqError::InvalidConfig(format!(
                "threshold must be positive and finite, got {threshold}"
            )));
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Separation must be finite and non-negative.
    pub fn set_min_separation(&mut self, min_separation: f64) -> AppResult<()> {
        if !(min_separation.is_finite() && min_separation >= 0.0) {
            return Err(DaqError::InvalidConfig(format!(
                "min_separation must be finite and >= 0, got {min_separation}"
            )));
        }
        self.min_separation = min_separation;
        Ok(())
    }

    /// Window must hold at least one sample.
    pub fn set_smoothing_window(&mut self, window: usize) -> AppResult<()> {
        if window == 0 {
            return Err(DaqError::InvalidConfig(
                "smoothing_window must be >= 1".to_string(),
            ));
        }
        self.smoothing_window = window;
        Ok(())
    }

    /// Saturation must be positive and finite.
    pub fn set_saturation(&mut self, saturation: f64) -> AppResult<()> {
        if !(saturation.is_finite() && saturation > 0.0) {
            return Err(DaqError::InvalidConfig(format!(
                "saturation must be positive and finite, got {saturation}"
            )));
        }
        self.saturation = saturation;
        Ok(())
    }
}
