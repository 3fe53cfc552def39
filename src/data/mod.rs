//! Sample buffering: per-channel double buffers and the multi-channel store.
pub mod channel_store;
pub mod sample;
pub mod sample_buffer;
pub mod snapshot;
