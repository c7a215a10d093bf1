//! Engine lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the playback engine.
///
/// A sink is held exactly in `Ready` and `Running`; a render thread exists
/// exactly in `Running`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Ready,
    Running,
    Stopped,
    Error,
}

impl EngineState {
    /// Whether the engine owns an open sink in this state.
    pub const fn holds_sink(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }

    /// Whether `init` may be attempted from this state.
    pub const fn can_init(self) -> bool {
        !self.holds_sink()
    }
}
