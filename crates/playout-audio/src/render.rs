//! The render loop run on the dedicated playback thread.

use crate::buffer::PlaybackBuffer;
use crate::sink::{AudioSink, PlayState, WriteMode};
use crate::source::FrameSource;
use std::sync::atomic::{AtomicBool, Ordering};
use thread_priority::{set_current_thread_priority, ThreadPriority};
use tracing::{debug, error, info, trace, warn};

/// Name given to the render thread.
pub const RENDER_THREAD_NAME: &str = "playout-render";

/// Why a render loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderExit {
    /// The control thread cleared the keep-alive flag.
    Stopped,
    /// The source was exhausted.
    EndOfStream,
    /// The sink rejected a write; the session is over.
    SinkError,
    /// The source failed to read.
    SourceError,
    /// The sink was not playing when the thread started.
    NotPlaying,
}

/// What happened during one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Ticks whose chunk was accepted by the sink.
    pub ticks: u64,
    pub bytes_written: u64,
    /// Ticks where the source delivered less than a full chunk.
    pub short_reads: u64,
    /// Ticks where the sink accepted fewer bytes than offered.
    pub partial_writes: u64,
    pub exit: RenderExit,
}

impl SessionReport {
    const fn new() -> Self {
        Self {
            ticks: 0,
            bytes_written: 0,
            short_reads: 0,
            partial_writes: 0,
            exit: RenderExit::Stopped,
        }
    }
}

/// Sink and buffer owned by a session; moved onto the render thread while
/// it runs and handed back when it is joined.
pub(crate) struct Session {
    pub sink: Box<dyn AudioSink>,
    pub buffer: PlaybackBuffer,
}

fn elevate_priority() {
    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(()) => debug!("Render thread priority raised"),
        Err(e) => debug!("Could not raise render thread priority: {e:?}"),
    }
}

/// Pump one tick at a time from `source` through `session.buffer` into the
/// sink until stopped, exhausted, or failed.
///
/// The blocking sink write is the only suspension point and paces the loop.
pub(crate) fn render(
    session: &mut Session,
    source: &mut dyn FrameSource,
    keep_alive: &AtomicBool,
) -> SessionReport {
    let mut report = SessionReport::new();
    elevate_priority();

    if session.sink.play_state() != PlayState::Playing {
        error!("Sink is not playing; render thread exiting");
        report.exit = RenderExit::NotPlaying;
        return report;
    }

    let Session { sink, buffer } = session;
    let chunk_len = buffer.capacity();
    buffer.clear();
    info!("Render loop started, {chunk_len} bytes per tick");

    report.exit = loop {
        if !keep_alive.load(Ordering::Acquire) {
            break RenderExit::Stopped;
        }

        match buffer.load_from(source) {
            Ok(0) => {
                info!("End of stream after {} ticks", report.ticks);
                keep_alive.store(false, Ordering::Release);
                break RenderExit::EndOfStream;
            }
            Ok(read) if read < chunk_len => {
                warn!("Short read: {read} of {chunk_len} bytes, padding with silence");
                report.short_reads += 1;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Source read failed: {e}");
                keep_alive.store(false, Ordering::Release);
                break RenderExit::SourceError;
            }
        }

        match sink.write(buffer.chunk(), WriteMode::Blocking) {
            Ok(written) => {
                if written != chunk_len {
                    warn!("Sink accepted {written} of {chunk_len} bytes");
                    report.partial_writes += 1;
                }
                report.ticks += 1;
                report.bytes_written += written as u64;
                trace!("Tick {} written", report.ticks);
            }
            Err(e) => {
                error!("Sink write failed, ending session: {e}");
                keep_alive.store(false, Ordering::Release);
                break RenderExit::SinkError;
            }
        }
    };

    if let Err(e) = sink.stop() {
        error!("Failed to stop sink: {e}");
    } else {
        debug!("Sink stopped");
    }

    info!(
        "Render loop exited ({:?}) after {} ticks, {} bytes",
        report.exit, report.ticks, report.bytes_written
    );
    report
}
