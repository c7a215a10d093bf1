//! Error types for Playout.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using Playout's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Playout.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    #[error("Platform minimum buffer of {min_buffer} bytes exceeds interval capacity of {capacity} bytes")]
    BufferTooSmall { min_buffer: usize, capacity: usize },

    // Lifecycle errors
    #[error("Engine already holds an audio sink")]
    AlreadyInitialized,

    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    // Audio errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Audio sink write failed: {0}")]
    SinkWrite(String),

    #[error("Frame source error: {0}")]
    Source(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error comes from calling an operation in the wrong
    /// lifecycle state rather than from the platform.
    pub const fn is_state_error(&self) -> bool {
        matches!(self, Self::AlreadyInitialized | Self::InvalidState(_))
    }
}

/// Integer result codes returned by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum ErrorCode {
    #[default]
    NoError = 0,
    InitError = 1,
    StartError = 2,
    StopError = 3,
}

impl ErrorCode {
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::NoError)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.as_i32()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::NoError),
            1 => Ok(Self::InitError),
            2 => Ok(Self::StartError),
            3 => Ok(Self::StopError),
            other => Err(Error::Internal(format!("Unknown error code: {other}"))),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "NO_ERROR",
            Self::InitError => "INIT_ERROR",
            Self::StartError => "START_ERROR",
            Self::StopError => "STOP_ERROR",
        };
        f.write_str(name)
    }
}
