//! # playout-core
//!
//! Core types, error codes, and the PCM format contract shared by the
//! Playout engine and its control surface.

pub mod error;
pub mod types;

pub use error::{Error, ErrorCode, Result};
pub use types::*;
