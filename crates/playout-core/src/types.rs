//! Core domain types for Playout.

pub mod format;
pub mod state;
pub mod usage;

pub use format::{
    ChannelLayout, PlaybackConfig, SampleFormat, BITS_PER_SAMPLE, INTERVALS_PER_SECOND,
    INTERVAL_MS, MAX_SAMPLE_RATE,
};
pub use state::EngineState;
pub use usage::{ContentType, StreamUsage, Usage};
