//! Scripted sink backend and helpers shared by the integration tests.

#![allow(dead_code)] // Not every test binary uses every helper
#![allow(clippy::unwrap_used)]

use parking_lot::Mutex;
use playout_audio::{
    AudioSink, FrameSource, OpenSource, PlaybackEngine, PlayState, ReaderSource, SinkBackend,
    SinkConfig, WriteMode,
};
use playout_core::{ChannelLayout, Error, PlaybackConfig, Result, SampleFormat};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Everything the scripted sinks were asked to do.
#[derive(Debug, Default)]
pub struct SinkLog {
    pub opens: usize,
    pub plays: usize,
    pub write_attempts: usize,
    pub writes: Vec<Vec<u8>>,
    pub stops: usize,
    pub releases: usize,
    pub last_config: Option<SinkConfig>,
}

/// Backend whose sinks record calls and fail on request.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub log: Arc<Mutex<SinkLog>>,
    pub min_buffer: usize,
    pub fail_query: bool,
    pub fail_open: bool,
    pub fail_play: bool,
    /// Report `Stopped` from `play_state` even after `play`.
    pub never_playing: bool,
    /// 1-based write attempt that returns an error.
    pub fail_write_at: Option<usize>,
    /// 1-based write attempt that only accepts half the bytes.
    pub partial_write_at: Option<usize>,
    /// Time a blocking write takes, emulating device consumption.
    pub write_delay: Duration,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> parking_lot::MutexGuard<'_, SinkLog> {
        self.log.lock()
    }
}

impl SinkBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn min_buffer_size(&self, _: u32, _: ChannelLayout, _: SampleFormat) -> Result<usize> {
        if self.fail_query {
            return Err(Error::AudioOutput("query rejected".to_string()));
        }
        Ok(self.min_buffer)
    }

    fn open(&self, config: &SinkConfig) -> Result<Box<dyn AudioSink>> {
        if self.fail_open {
            return Err(Error::AudioOutput("format rejected".to_string()));
        }
        let mut log = self.log.lock();
        log.opens += 1;
        log.last_config = Some(*config);
        drop(log);

        Ok(Box::new(ScriptedSink {
            script: self.clone(),
            state: PlayState::Stopped,
        }))
    }
}

struct ScriptedSink {
    script: ScriptedBackend,
    state: PlayState,
}

impl AudioSink for ScriptedSink {
    fn play(&mut self) -> Result<()> {
        if self.script.fail_play {
            return Err(Error::AudioOutput("play rejected".to_string()));
        }
        self.script.log.lock().plays += 1;
        if !self.script.never_playing {
            self.state = PlayState::Playing;
        }
        Ok(())
    }

    fn play_state(&self) -> PlayState {
        self.state
    }

    fn write(&mut self, data: &[u8], mode: WriteMode) -> Result<usize> {
        assert_eq!(mode, WriteMode::Blocking);
        if !self.script.write_delay.is_zero() {
            thread::sleep(self.script.write_delay);
        }

        let mut log = self.script.log.lock();
        log.write_attempts += 1;
        let attempt = log.write_attempts;

        if self.script.fail_write_at == Some(attempt) {
            return Err(Error::SinkWrite("device lost".to_string()));
        }

        let accepted = if self.script.partial_write_at == Some(attempt) {
            data.len() / 2
        } else {
            data.len()
        };
        log.writes.push(data[..accepted].to_vec());
        Ok(accepted)
    }

    fn stop(&mut self) -> Result<()> {
        self.state = PlayState::Stopped;
        self.script.log.lock().stops += 1;
        Ok(())
    }

    fn release(self: Box<Self>) {
        self.script.log.lock().releases += 1;
    }
}

pub fn cd_config() -> PlaybackConfig {
    PlaybackConfig::new(44100, 2).unwrap()
}

/// PCM where every byte of tick `i` equals `i`.
pub fn numbered_ticks(ticks: usize, tick_len: usize) -> Vec<u8> {
    (0..ticks)
        .flat_map(|i| std::iter::repeat(u8::try_from(i).unwrap()).take(tick_len))
        .collect()
}

/// Source that opens a fresh in-memory reader over `data` each session.
pub fn memory_source(data: Vec<u8>) -> impl OpenSource {
    move || -> Result<Box<dyn FrameSource>> { Ok(Box::new(ReaderSource::new(Cursor::new(data.clone())))) }
}

/// Source that never ends.
pub fn endless_source() -> impl OpenSource {
    || -> Result<Box<dyn FrameSource>> { Ok(Box::new(ReaderSource::new(std::io::repeat(0x11)))) }
}

/// Poll until the render thread has exited on its own.
pub fn wait_until_finished(engine: &PlaybackEngine, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while engine.is_playing() {
        assert!(Instant::now() < deadline, "render thread did not finish in time");
        thread::sleep(Duration::from_millis(2));
    }
}
