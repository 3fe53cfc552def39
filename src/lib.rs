//! # Touch DAQ Core Library
//!
//! This crate buffers a continuous stream of 8-channel analog readings from a
//! touch-sensitive surface and turns the buffered signal into discrete touch
//! events in near-real time.
//!
//! ## Crate Structure
//!
//! - **`data`**: the per-channel double buffer (`SampleBuffer`), the 8-channel
//!   `ChannelStore`, and the read-only `Snapshot` handed to consumers.
//! - **`touch`**: the `TouchDetector`, its validated `DetectorConfig`, channel
//!   topologies, and the `TouchEvent` output type.
//! - **`config`**: layered session configuration (TOML file + environment).
//! - **`error`**: the `DaqError` enum shared by every module.
//! - **`tracing_setup`**: subscriber initialization for binaries and tests.
//!
//! ## Data flow
//!
//! ```text
//! ingest -> ChannelStore::append -> (active slots)
//! tick   -> ChannelStore::snapshot -> Snapshot (standby slots)
//!        -> TouchDetector::detect -> Vec<TouchEvent> -> presentation / export
//! ```
//!
//! ```
//! use touch_daq::data::channel_store::ChannelStore;
//! use touch_daq::touch::{config::DetectorConfig, detector::TouchDetector};
//!
//! # fn main() -> touch_daq::error::AppResult<()> {
//! let store = ChannelStore::new(1024)?;
//! store.append_frame(0.0, &[0.1, 0.1, 0.9, 0.85, 0.1, 0.1, 0.1, 0.1]);
//!
//! let detector = TouchDetector::new(DetectorConfig::new(0.5)?);
//! let events = detector.detect(&store.snapshot());
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].channels, vec![2, 3]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod touch;
pub mod tracing_setup;

pub use data::channel_store::ChannelStore;
pub use data::sample::{ChannelId, Sample, CHANNEL_COUNT};
pub use data::snapshot::Snapshot;
pub use error::{AppResult, DaqError};
pub use touch::config::DetectorConfig;
pub use touch::detector::TouchDetector;
pub use touch::event::TouchEvent;
