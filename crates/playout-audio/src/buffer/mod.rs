//! Buffers used between the render thread and the audio device.

pub mod playback;
pub mod ring;

pub use playback::PlaybackBuffer;
pub use ring::{shared_ring_buffer, RingBuffer, SharedRingBuffer};
