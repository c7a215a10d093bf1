//! Playback engine: lifecycle state machine and render thread ownership.

use crate::buffer::PlaybackBuffer;
use crate::render::{render, Session, SessionReport, RENDER_THREAD_NAME};
use crate::sink::{SinkBackend, SinkConfig};
use crate::source::OpenSource;
use playout_core::{EngineState, Error, PlaybackConfig, Result, StreamUsage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// What the render thread hands back when joined.
struct RenderOutput {
    session: Session,
    report: SessionReport,
}

/// Handle to a live render thread.
struct RenderThread {
    keep_alive: Arc<AtomicBool>,
    handle: JoinHandle<RenderOutput>,
}

/// Streams PCM from a source to an audio sink in 10 ms ticks.
///
/// The control layer owns the engine and drives it with
/// [`init`](Self::init), [`start`](Self::start) and [`stop`](Self::stop).
/// Only one stream is live per engine: `init` refuses while a sink is held
/// and `start` refuses while a render thread exists.
pub struct PlaybackEngine {
    backend: Box<dyn SinkBackend>,
    source: Box<dyn OpenSource>,
    state: EngineState,
    config: Option<PlaybackConfig>,
    /// Sink and buffer while `Ready`; moved onto the render thread while `Running`.
    session: Option<Session>,
    render: Option<RenderThread>,
    last_report: Option<SessionReport>,
}

impl PlaybackEngine {
    /// Create an engine that opens sinks from `backend` and reads `source`.
    pub fn new(backend: impl SinkBackend + 'static, source: impl OpenSource + 'static) -> Self {
        Self::from_boxed(Box::new(backend), Box::new(source))
    }

    pub fn from_boxed(backend: Box<dyn SinkBackend>, source: Box<dyn OpenSource>) -> Self {
        Self {
            backend,
            source,
            state: EngineState::Uninitialized,
            config: None,
            session: None,
            render: None,
            last_report: None,
        }
    }

    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Configuration of the current session, if initialized.
    pub const fn config(&self) -> Option<&PlaybackConfig> {
        self.config.as_ref()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Report of the most recently joined session.
    pub const fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Whether a render thread exists and has not exited yet.
    pub fn is_playing(&self) -> bool {
        self.render
            .as_ref()
            .is_some_and(|render| !render.handle.is_finished())
    }

    /// Configure the sink and size the playback buffer.
    ///
    /// Fails if a sink is already held, if the platform needs more buffering
    /// than one tick provides, or if the platform rejects the format.
    pub fn init(&mut self, config: PlaybackConfig, usage: StreamUsage) -> Result<()> {
        info!(
            "init(sample_rate={}, channels={}, usage={:?})",
            config.sample_rate(),
            config.channels(),
            usage
        );

        if !self.state.can_init() {
            warn!("init refused: sink already held in state {:?}", self.state);
            return Err(Error::AlreadyInitialized);
        }

        let buffer = PlaybackBuffer::new(config.interval_byte_count());
        debug!("Playback buffer capacity: {} bytes", buffer.capacity());

        let min_buffer = self
            .backend
            .min_buffer_size(config.sample_rate(), config.layout(), config.format())
            .inspect_err(|e| {
                error!("Failed to query minimum buffer size: {e}");
                self.state = EngineState::Error;
            })?;
        debug!("{} minimum buffer: {min_buffer} bytes", self.backend.name());

        if min_buffer > buffer.capacity() {
            warn!(
                "Minimum buffer {min_buffer} exceeds tick capacity {}",
                buffer.capacity()
            );
            return Err(Error::BufferTooSmall {
                min_buffer,
                capacity: buffer.capacity(),
            });
        }

        let sink_config = SinkConfig {
            playback: config,
            buffer_size: min_buffer,
            usage,
        };
        let sink = self.backend.open(&sink_config).inspect_err(|e| {
            error!("Failed to open {} sink: {e}", self.backend.name());
            self.state = EngineState::Error;
        })?;

        self.session = Some(Session { sink, buffer });
        self.config = Some(config);
        self.state = EngineState::Ready;
        info!("Engine ready");
        Ok(())
    }

    /// Begin playback and spawn the render thread.
    pub fn start(&mut self) -> Result<()> {
        debug!("start in state {:?}", self.state);

        if self.render.is_some() {
            warn!("start refused: render thread already active");
            return Err(Error::InvalidState("render thread already active".to_string()));
        }
        let Some(session) = self.session.as_mut() else {
            warn!("start refused: no sink");
            return Err(Error::InvalidState("engine is not initialized".to_string()));
        };

        let mut source = self.source.open().inspect_err(|e| {
            error!("Failed to open frame source: {e}");
        })?;

        session.sink.play().inspect_err(|e| {
            error!("Sink refused to play: {e}");
        })?;

        let Some(mut session) = self.session.take() else {
            return Err(Error::Internal("session vanished during start".to_string()));
        };
        let keep_alive = Arc::new(AtomicBool::new(true));
        let thread_flag = keep_alive.clone();

        let spawned = std::thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || {
                let report = render(&mut session, &mut *source, &thread_flag);
                RenderOutput { session, report }
            });

        match spawned {
            Ok(handle) => {
                self.render = Some(RenderThread { keep_alive, handle });
                self.state = EngineState::Running;
                info!("Playback started");
                Ok(())
            }
            Err(e) => {
                // The session went down with the closure; its sink is dropped.
                error!("Failed to spawn render thread: {e}");
                self.config = None;
                self.state = EngineState::Error;
                Err(Error::Internal(format!("Failed to spawn render thread: {e}")))
            }
        }
    }

    /// Signal the render thread, join it, and release the sink.
    ///
    /// Succeeds even when the loop already ended on its own.
    pub fn stop(&mut self) -> Result<()> {
        let Some(render) = self.render.take() else {
            warn!("stop refused: no active render thread");
            return Err(Error::InvalidState("no active render thread".to_string()));
        };

        debug!("Signalling render thread to stop");
        render.keep_alive.store(false, Ordering::Release);

        match render.handle.join() {
            Ok(RenderOutput { session, report }) => {
                session.sink.release();
                self.last_report = Some(report);
            }
            Err(_) => {
                error!("Render thread panicked; sink dropped with it");
            }
        }

        self.config = None;
        self.state = EngineState::Stopped;
        info!("Playback stopped");
        Ok(())
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if self.render.is_some() {
            if let Err(e) = self.stop() {
                debug!("stop on drop failed: {e}");
            }
        }
        if let Some(session) = self.session.take() {
            debug!("Releasing idle sink on drop");
            session.sink.release();
        }
    }
}
