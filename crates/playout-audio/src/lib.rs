//! # playout-audio
//!
//! Real-time PCM playout engine for Playout.
//!
//! Features:
//! - Dedicated render thread pacing 10 ms ticks by blocking sink writes
//! - Sink capability interface with cpal device and WAV capture backends
//! - Lock-free ring buffer between the render thread and the device callback

pub mod buffer;
pub mod control;
pub mod engine;
pub mod render;
pub mod sink;
pub mod source;

pub use control::Playout;
pub use engine::PlaybackEngine;
pub use render::{RenderExit, SessionReport};
pub use sink::{AudioSink, CpalBackend, PlayState, SinkBackend, SinkConfig, WavBackend, WriteMode};
pub use source::{FileAsset, FrameSource, MemoryAsset, OpenSource, ReaderSource};
