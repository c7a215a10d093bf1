//! WAV capture sink using hound.
//!
//! Writes the PCM stream to a file instead of a device. When paced, a
//! blocking write sleeps until the wall clock catches up with the audio
//! written so far, so sessions last as long as they would on hardware.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use super::{decode_samples, AudioSink, PlayState, SinkBackend, SinkConfig, WriteMode};
use playout_core::{ChannelLayout, Error, PlaybackConfig, Result, SampleFormat, BITS_PER_SAMPLE};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Audio allowed to be written ahead of the wall clock when paced.
const PACING_LEAD: Duration = Duration::from_millis(20);

/// Sink backend that records to a WAV file.
#[derive(Debug, Clone)]
pub struct WavBackend {
    path: PathBuf,
    paced: bool,
}

impl WavBackend {
    /// Record to `path` as fast as the render loop produces audio.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            paced: false,
        }
    }

    /// Block writes so audio is produced at real-time speed.
    #[must_use]
    pub const fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SinkBackend for WavBackend {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn min_buffer_size(&self, _: u32, _: ChannelLayout, _: SampleFormat) -> Result<usize> {
        // Files impose no buffering constraint.
        Ok(0)
    }

    fn open(&self, config: &SinkConfig) -> Result<Box<dyn AudioSink>> {
        let playback = config.playback;
        let spec = hound::WavSpec {
            channels: playback.channels(),
            sample_rate: playback.sample_rate(),
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&self.path, spec).map_err(|e| {
            Error::AudioOutput(format!("Failed to create {}: {e}", self.path.display()))
        })?;

        info!("Recording playout to {}", self.path.display());
        debug!("WAV usage hints {:?} ignored", config.usage);

        Ok(Box::new(WavSink {
            writer: Some(writer),
            playback,
            paced: self.paced,
            state: PlayState::Stopped,
            clock: None,
            bytes_written: 0,
            scratch: Vec::with_capacity(playback.interval_byte_count() / 2),
        }))
    }
}

/// Open WAV recording.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    playback: PlaybackConfig,
    paced: bool,
    state: PlayState,
    /// When the audio written so far started playing on the emulated clock.
    clock: Option<Instant>,
    bytes_written: usize,
    scratch: Vec<i16>,
}

impl WavSink {
    fn wait_for_clock(&self) {
        let Some(start) = self.clock else {
            return;
        };
        let due = start + self.playback.duration_of(self.bytes_written);
        let now = Instant::now();
        if due > now + PACING_LEAD {
            std::thread::sleep(due - now - PACING_LEAD);
        }
    }

    fn finalize(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV file: {e}");
            }
        }
    }
}

impl AudioSink for WavSink {
    fn play(&mut self) -> Result<()> {
        if self.writer.is_none() {
            return Err(Error::AudioOutput("WAV sink already released".to_string()));
        }
        // Resume the emulated clock where the written audio ends
        let now = Instant::now();
        self.clock = Some(
            now.checked_sub(self.playback.duration_of(self.bytes_written))
                .unwrap_or(now),
        );
        self.state = PlayState::Playing;
        Ok(())
    }

    fn play_state(&self) -> PlayState {
        self.state
    }

    fn write(&mut self, data: &[u8], mode: WriteMode) -> Result<usize> {
        if self.state != PlayState::Playing {
            return Err(Error::InvalidState("Write on a stopped sink".to_string()));
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::SinkWrite("WAV sink already released".to_string()))?;

        decode_samples(data, &mut self.scratch);
        for &sample in &self.scratch {
            writer
                .write_sample(sample)
                .map_err(|e| Error::SinkWrite(format!("WAV write failed: {e}")))?;
        }

        let accepted = self.scratch.len() * 2;
        self.bytes_written += accepted;

        if self.paced && mode == WriteMode::Blocking {
            self.wait_for_clock();
        }
        Ok(accepted)
    }

    fn stop(&mut self) -> Result<()> {
        self.state = PlayState::Stopped;
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| Error::AudioOutput(format!("WAV flush failed: {e}")))?;
        }
        Ok(())
    }

    fn release(mut self: Box<Self>) {
        debug!("Releasing WAV sink after {} bytes", self.bytes_written);
        self.finalize();
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        self.finalize();
    }
}
