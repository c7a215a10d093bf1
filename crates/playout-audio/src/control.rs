//! Integer-coded control surface for UI and CLI layers.

use crate::engine::PlaybackEngine;
use playout_core::{Error, ErrorCode, PlaybackConfig, StreamUsage};
use tracing::{debug, warn};

/// Wraps a [`PlaybackEngine`] behind `init/start/stop` calls that return
/// [`ErrorCode`]s instead of typed errors.
pub struct Playout {
    engine: PlaybackEngine,
}

impl Playout {
    pub const fn new(engine: PlaybackEngine) -> Self {
        Self { engine }
    }

    /// Configure playback. `stream_usage` is an integer stream-type hint.
    pub fn init_playout(&mut self, sample_rate: i32, channels: i32, stream_usage: i32) -> ErrorCode {
        let result = PlaybackConfig::from_raw(sample_rate, channels).and_then(|config| {
            self.engine
                .init(config, StreamUsage::from_stream_type(stream_usage))
        });
        to_code(result, ErrorCode::InitError, "initPlayout")
    }

    pub fn start_playout(&mut self) -> ErrorCode {
        to_code(self.engine.start(), ErrorCode::StartError, "startPlayout")
    }

    pub fn stop_playout(&mut self) -> ErrorCode {
        to_code(self.engine.stop(), ErrorCode::StopError, "stopPlayout")
    }

    pub const fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }
}

fn to_code(result: Result<(), Error>, failure: ErrorCode, operation: &str) -> ErrorCode {
    match result {
        Ok(()) => ErrorCode::NoError,
        Err(e) if e.is_state_error() => {
            debug!("{operation} refused with {failure}: {e}");
            failure
        }
        Err(e) => {
            warn!("{operation} failed with {failure}: {e}");
            failure
        }
    }
}
