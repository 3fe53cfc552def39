//! Custom error types for the sampling core.
//!
//! This module defines the primary error type, `DaqError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the small set of failures the buffering and detection core can report.
//!
//! ## Error Hierarchy
//!
//! Every core variant is a caller-input error, never a transient or environmental one:
//!
//! - **`InvalidChannel`**: a channel id outside `0..CHANNEL_COUNT` was passed to the store.
//! - **`OutOfOrderSample`**: a sample older than the last appended one was offered to a
//!   buffer. The sample is discarded and the buffer stays usable.
//! - **`NoData`**: interpolation was requested on an empty buffer.
//! - **`InvalidConfig`**: a detector or store setting failed validation. Raised when the
//!   configuration is built or mutated, never during a detection pass.
//! - **`Config`**: wraps `figment` errors raised while loading the session configuration file.
//!
//! No error is retried internally; retry or drop policy belongs to the ingest side.

use crate::data::sample::ChannelId;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Errors raised by the buffering and detection core.
#[derive(Error, Debug)]
pub enum DaqError {
    /// Channel id outside the fixed channel range
    #[error("Invalid channel {channel}: must be in 0..{max}", max = crate::data::sample::CHANNEL_COUNT)]
    InvalidChannel {
        /// Offending channel id
        channel: ChannelId,
    },

    /// Sample older than the last accepted one; the sample was discarded
    #[error("Out-of-order sample: timestamp {timestamp} precedes last appended {last}")]
    OutOfOrderSample {
        /// Timestamp of the rejected sample
        timestamp: f64,
        /// Last accepted timestamp
        last: f64,
    },

    /// Interpolation requested on an empty buffer
    #[error("No data buffered")]
    NoData,

    /// Setting rejected at configuration time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration source could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for DaqError {
    fn from(err: figment::Error) -> Self {
        DaqError::Config(Box::new(err))
    }
}

impl DaqError {
    /// Whether the caller can keep using the component that raised this error.
    ///
    /// All core failures leave the buffer or detector intact; only a broken
    /// configuration source stops a session from starting.
    pub fn can_recover(&self) -> bool {
        !matches!(self, DaqError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_channel_message_names_the_channel() {
        let err = DaqError::InvalidChannel { channel: 9 };
        assert_eq!(err.to_string(), "Invalid channel 9: must be in 0..8");
        assert!(err.can_recover());
    }

    #[test]
    fn out_of_order_message_carries_both_timestamps() {
        let err = DaqError::OutOfOrderSample {
            timestamp: 1.5,
            last: 2.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("1.5"));
        assert!(msg.contains('2'));
    }

    #[test]
    fn figment_errors_are_not_recoverable() {
        let err: DaqError = figment::Error::from("missing field `store`".to_string()).into();
        assert!(matches!(err, DaqError::Config(_)));
        assert!(!err.can_recover());
    }
}
