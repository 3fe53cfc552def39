//! Session configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/touch_daq.toml` (or an explicit path)
//! 2. Environment variables prefixed with `TOUCH_DAQ_`, nested keys split on `__`
//!
//! Every section is optional; missing values fall back to the defaults below.
//!
//! # Example
//! ```no_run
//! use touch_daq::config::SessionConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::load()?;
//! config.validate()?;
//! println!("Store capacity: {}", config.store.capacity);
//! # Ok(())
//! # }
//! ```
//!
//! Override a single value from the environment:
//! `TOUCH_DAQ_DETECTOR__THRESHOLD=0.7`

use crate::data::channel_store::DEFAULT_CAPACITY;
use crate::data::sample_buffer::MAX_CAPACITY;
use crate::error::{AppResult, DaqError};
use crate::touch::config::{DetectorConfig, DEFAULT_SATURATION, DEFAULT_THRESHOLD};
use crate::touch::topology::TopologyKind;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/touch_daq.toml";

/// Top-level session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Sample store settings
    pub store: StoreConfig,
    /// Touch detector settings
    pub detector: DetectorSettings,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: String,
}

/// Sample store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Samples retained per channel
    pub capacity: usize,
}

/// Raw detector settings as written in the configuration file.
///
/// Converted into a validated [`DetectorConfig`] by
/// [`SessionConfig::detector_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Activation threshold
    pub threshold: f64,
    /// Maximum topology distance within one touch
    pub min_separation: f64,
    /// Moving-average window in samples
    pub smoothing_window: usize,
    /// Value mapping to intensity 1.0
    pub saturation: f64,
    /// Electrode layout
    pub topology: TopologyKind,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "touch_daq".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_separation: 1.0,
            smoothing_window: 1,
            saturation: DEFAULT_SATURATION,
            topology: TopologyKind::default(),
        }
    }
}

impl TryFrom<&DetectorSettings> for DetectorConfig {
    type Error = DaqError;

    fn try_from(settings: &DetectorSettings) -> AppResult<Self> {
        DetectorConfig::new(settings.threshold)?
            .with_min_separation(settings.min_separation)?
            .with_smoothing_window(settings.smoothing_window)?
            .with_saturation(settings.saturation)
    }
}

impl SessionConfig {
    /// Load configuration from `config/touch_daq.toml` and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TOUCH_DAQ_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(DaqError::InvalidConfig(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(DaqError::InvalidConfig(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        if self.store.capacity == 0 || self.store.capacity > MAX_CAPACITY {
            return Err(DaqError::InvalidConfig(format!(
                "store.capacity must be in 1..={MAX_CAPACITY}, got {}",
                self.store.capacity
            )));
        }

        self.detector_config().map(|_| ())
    }

    /// Validated detector configuration from the `[detector]` section
    pub fn detector_config(&self) -> AppResult<DetectorConfig> {
        DetectorConfig::try_from(&self.detector)
    }
}
