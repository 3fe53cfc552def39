//! Touch detection over buffered channel values.
pub mod config;
pub mod detector;
pub mod event;
pub mod topology;
