//! Stream usage hints passed through to the audio sink.

use serde::{Deserialize, Serialize};

/// What the stream is used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Usage {
    #[default]
    Media,
    VoiceCommunication,
    NotificationRingtone,
    Alarm,
    Notification,
}

/// What kind of content the stream carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Music,
    Speech,
    Sonification,
}

/// Usage and content-type hints for the output stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct StreamUsage {
    pub usage: Usage,
    pub content: ContentType,
}

impl StreamUsage {
    /// Stream type hint for music playback.
    pub const STREAM_MUSIC: i32 = 3;

    pub const fn new(usage: Usage, content: ContentType) -> Self {
        Self { usage, content }
    }

    /// Map an integer stream-type hint onto usage attributes.
    ///
    /// Unknown values fall back to media/music.
    pub const fn from_stream_type(stream_type: i32) -> Self {
        match stream_type {
            0 => Self::new(Usage::VoiceCommunication, ContentType::Speech),
            2 => Self::new(Usage::NotificationRingtone, ContentType::Sonification),
            4 => Self::new(Usage::Alarm, ContentType::Sonification),
            5 => Self::new(Usage::Notification, ContentType::Sonification),
            _ => Self::new(Usage::Media, ContentType::Music),
        }
    }
}
