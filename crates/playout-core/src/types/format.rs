//! PCM format contract and derived interval sizes.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bits per sample. Input is always signed 16-bit PCM.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Length of one render tick in milliseconds.
pub const INTERVAL_MS: u32 = 10;

/// Number of render ticks per second.
pub const INTERVALS_PER_SECOND: u32 = 1000 / INTERVAL_MS;

/// Highest sample rate accepted by `PlaybackConfig::new`.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Sample encoding of the PCM stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Signed 16-bit little-endian, interleaved.
    #[default]
    I16,
}

impl SampleFormat {
    /// Bytes used by one sample of one channel.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::I16 => (BITS_PER_SAMPLE / 8) as usize,
        }
    }
}

/// Channel configuration of the stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    /// Parse a channel count. Only 1 and 2 are supported.
    pub fn from_count(channels: u16) -> Result<Self> {
        match channels {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(Error::InvalidConfig(format!(
                "channel count must be 1 or 2, got {other}"
            ))),
        }
    }

    pub const fn count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Immutable description of a playback session.
///
/// All interval sizes are derived from the sample rate and channel layout;
/// they never change once a session has been initialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PlaybackConfig {
    sample_rate: u32,
    layout: ChannelLayout,
    format: SampleFormat,
}

impl PlaybackConfig {
    /// Validate a sample rate and channel count.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate < INTERVALS_PER_SECOND {
            return Err(Error::InvalidConfig(format!(
                "sample rate must be at least {INTERVALS_PER_SECOND} Hz, got {sample_rate}"
            )));
        }
        if sample_rate > MAX_SAMPLE_RATE {
            return Err(Error::InvalidConfig(format!(
                "sample rate must be at most {MAX_SAMPLE_RATE} Hz, got {sample_rate}"
            )));
        }

        Ok(Self {
            sample_rate,
            layout: ChannelLayout::from_count(channels)?,
            format: SampleFormat::I16,
        })
    }

    /// Build a config from the signed integers of the control surface.
    pub fn from_raw(sample_rate: i32, channels: i32) -> Result<Self> {
        let sample_rate = u32::try_from(sample_rate).map_err(|_| {
            Error::InvalidConfig(format!("sample rate must be positive, got {sample_rate}"))
        })?;
        let channels = u16::try_from(channels).map_err(|_| {
            Error::InvalidConfig(format!("channel count must be 1 or 2, got {channels}"))
        })?;
        Self::new(sample_rate, channels)
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub const fn channels(&self) -> u16 {
        self.layout.count()
    }

    pub const fn format(&self) -> SampleFormat {
        self.format
    }

    /// Bytes in one frame (one sample for every channel).
    pub const fn bytes_per_frame(&self) -> usize {
        self.layout.count() as usize * self.format.bytes_per_sample()
    }

    /// Frames rendered per tick.
    pub const fn interval_frames(&self) -> usize {
        (self.sample_rate / INTERVALS_PER_SECOND) as usize
    }

    /// Bytes rendered per tick; always a whole number of frames.
    pub const fn interval_byte_count(&self) -> usize {
        self.bytes_per_frame() * self.interval_frames()
    }

    /// Wall-clock length of one tick.
    pub const fn interval_duration(&self) -> Duration {
        Duration::from_millis(INTERVAL_MS as u64)
    }

    /// Wall-clock duration of `bytes` of audio in this format.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let frames = bytes / self.bytes_per_frame();
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}
