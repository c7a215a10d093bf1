//! Audio sink capability interface.
//!
//! The engine is written once against [`SinkBackend`] and [`AudioSink`];
//! concrete backends are picked when the engine is constructed.

use playout_core::{ChannelLayout, PlaybackConfig, Result, SampleFormat, StreamUsage};

pub mod device;
pub mod wav;

pub use device::{list_output_devices, CpalBackend};
pub use wav::WavBackend;

/// Playback state reported by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// How a sink write waits for space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Return only once every byte has been accepted (or the sink failed).
    Blocking,
    /// Accept what fits right now and return.
    NonBlocking,
}

/// Parameters a sink is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    pub playback: PlaybackConfig,
    /// Platform minimum buffering in bytes.
    pub buffer_size: usize,
    pub usage: StreamUsage,
}

/// An open output stream.
///
/// Every method reports platform faults as `Err`; none of them panic.
pub trait AudioSink: Send {
    /// Begin playback. Does not block on audio being consumed.
    fn play(&mut self) -> Result<()>;

    fn play_state(&self) -> PlayState;

    /// Write interleaved little-endian PCM. Returns the bytes accepted.
    fn write(&mut self, data: &[u8], mode: WriteMode) -> Result<usize>;

    fn stop(&mut self) -> Result<()>;

    /// Tear the stream down. Consumes the sink so it is released once.
    fn release(self: Box<Self>);
}

/// Factory for sinks of one platform output API.
pub trait SinkBackend: Send {
    fn name(&self) -> &'static str;

    /// Smallest buffer in bytes the platform can sustain for this format.
    fn min_buffer_size(
        &self,
        sample_rate: u32,
        layout: ChannelLayout,
        format: SampleFormat,
    ) -> Result<usize>;

    fn open(&self, config: &SinkConfig) -> Result<Box<dyn AudioSink>>;
}

/// Decode little-endian `i16` samples from `bytes` into `out`.
///
/// `out` is cleared first and keeps its allocation between calls. A trailing
/// odd byte is ignored.
pub(crate) fn decode_samples(bytes: &[u8], out: &mut Vec<i16>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
    );
}
