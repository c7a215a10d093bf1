//! Lifecycle and error-code behaviour of the playback engine.

#![allow(clippy::unwrap_used)]

mod common;

use common::{cd_config, endless_source, memory_source, ScriptedBackend};
use playout_audio::{PlaybackEngine, Playout};
use playout_core::{EngineState, Error, ErrorCode, StreamUsage, Usage};
use std::time::Duration;

fn playout(backend: &ScriptedBackend) -> Playout {
    Playout::new(PlaybackEngine::new(backend.clone(), endless_source()))
}

#[test]
fn test_init_then_reinit_fails() {
    let backend = ScriptedBackend::new();
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.engine().state(), EngineState::Ready);
    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::InitError);
    assert_eq!(playout.engine().state(), EngineState::Ready);
    assert_eq!(backend.log().opens, 1);
}

#[test]
fn test_init_passes_format_and_usage_to_sink() {
    let backend = ScriptedBackend {
        min_buffer: 512,
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(48000, 1, 3), ErrorCode::NoError);

    let config = backend.log().last_config.unwrap();
    assert_eq!(config.playback.sample_rate(), 48000);
    assert_eq!(config.playback.channels(), 1);
    assert_eq!(config.buffer_size, 512);
    assert_eq!(config.usage.usage, Usage::Media);
    assert_eq!(playout.engine().config().unwrap().interval_byte_count(), 960);
}

#[test]
fn test_init_accepts_min_buffer_equal_to_capacity() {
    let backend = ScriptedBackend {
        min_buffer: cd_config().interval_byte_count(),
        ..ScriptedBackend::new()
    };
    let mut engine = PlaybackEngine::new(backend, endless_source());

    assert!(engine.init(cd_config(), StreamUsage::default()).is_ok());
}

#[test]
fn test_init_rejects_min_buffer_above_capacity() {
    let backend = ScriptedBackend {
        min_buffer: cd_config().interval_byte_count() + 1,
        ..ScriptedBackend::new()
    };
    let mut engine = PlaybackEngine::new(backend.clone(), endless_source());

    let err = engine.init(cd_config(), StreamUsage::default()).unwrap_err();
    assert!(matches!(err, Error::BufferTooSmall { capacity: 1764, .. }));
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert_eq!(backend.log().opens, 0);
}

#[test]
fn test_init_rejects_bad_arguments() {
    let backend = ScriptedBackend::new();
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 3, 3), ErrorCode::InitError);
    assert_eq!(playout.init_playout(-8000, 1, 3), ErrorCode::InitError);
    assert_eq!(playout.engine().state(), EngineState::Uninitialized);
    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
}

#[test]
fn test_platform_rejection_enters_error_state() {
    let backend = ScriptedBackend {
        fail_open: true,
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::InitError);
    assert_eq!(playout.engine().state(), EngineState::Error);
    assert_eq!(playout.start_playout(), ErrorCode::StartError);
}

#[test]
fn test_failed_query_enters_error_state() {
    let backend = ScriptedBackend {
        fail_query: true,
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::InitError);
    assert_eq!(playout.engine().state(), EngineState::Error);
}

#[test]
fn test_start_before_init_fails() {
    let backend = ScriptedBackend::new();
    let mut playout = playout(&backend);

    assert_eq!(playout.start_playout(), ErrorCode::StartError);
    assert_eq!(playout.engine().state(), EngineState::Uninitialized);
}

#[test]
fn test_start_twice_fails() {
    let backend = ScriptedBackend {
        write_delay: Duration::from_millis(10),
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::NoError);
    assert_eq!(playout.engine().state(), EngineState::Running);
    assert_eq!(playout.start_playout(), ErrorCode::StartError);
    assert_eq!(playout.engine().state(), EngineState::Running);
    assert_eq!(playout.stop_playout(), ErrorCode::NoError);
    assert_eq!(backend.log().plays, 1);
}

#[test]
fn test_init_while_running_fails() {
    let backend = ScriptedBackend {
        write_delay: Duration::from_millis(5),
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::NoError);
    assert_eq!(playout.init_playout(48000, 1, 3), ErrorCode::InitError);
    assert_eq!(playout.engine().state(), EngineState::Running);
    assert_eq!(playout.stop_playout(), ErrorCode::NoError);
    assert_eq!(backend.log().opens, 1);
}

#[test]
fn test_play_failure_is_start_error() {
    let backend = ScriptedBackend {
        fail_play: true,
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::StartError);
    assert_eq!(playout.engine().state(), EngineState::Ready);
    assert!(!playout.engine().is_playing());
}

#[test]
fn test_source_open_failure_is_start_error() {
    let backend = ScriptedBackend::new();
    let missing = playout_audio::FileAsset::new("/nonexistent/playout/haidao.pcm");
    let mut playout = Playout::new(PlaybackEngine::new(backend.clone(), missing));

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::StartError);
    assert_eq!(playout.engine().state(), EngineState::Ready);
    assert_eq!(backend.log().plays, 0);
}

#[test]
fn test_stop_before_start_fails() {
    let backend = ScriptedBackend::new();
    let mut playout = playout(&backend);

    assert_eq!(playout.stop_playout(), ErrorCode::StopError);
    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.stop_playout(), ErrorCode::StopError);
    assert_eq!(playout.engine().state(), EngineState::Ready);
}

#[test]
fn test_stop_releases_sink_once() {
    let backend = ScriptedBackend {
        write_delay: Duration::from_millis(5),
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::NoError);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(playout.stop_playout(), ErrorCode::NoError);

    assert_eq!(playout.engine().state(), EngineState::Stopped);
    assert!(playout.engine().config().is_none());
    let log = backend.log();
    assert_eq!(log.releases, 1);
    assert_eq!(log.stops, 1);
    assert!(!log.writes.is_empty());
}

#[test]
fn test_repeated_stop_reports_error() {
    let backend = ScriptedBackend {
        write_delay: Duration::from_millis(5),
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::NoError);
    assert_eq!(playout.stop_playout(), ErrorCode::NoError);
    assert_eq!(playout.stop_playout(), ErrorCode::StopError);
    assert_eq!(playout.stop_playout(), ErrorCode::StopError);
    assert_eq!(backend.log().releases, 1);
}

#[test]
fn test_start_after_stop_requires_init() {
    let backend = ScriptedBackend {
        write_delay: Duration::from_millis(5),
        ..ScriptedBackend::new()
    };
    let mut playout = playout(&backend);

    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::NoError);
    assert_eq!(playout.stop_playout(), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::StartError);

    // A fresh session after re-init
    assert_eq!(playout.init_playout(44100, 2, 3), ErrorCode::NoError);
    assert_eq!(playout.start_playout(), ErrorCode::NoError);
    assert_eq!(playout.stop_playout(), ErrorCode::NoError);

    let log = backend.log();
    assert_eq!(log.opens, 2);
    assert_eq!(log.releases, 2);
}

#[test]
fn test_drop_joins_running_thread() {
    let backend = ScriptedBackend {
        write_delay: Duration::from_millis(5),
        ..ScriptedBackend::new()
    };
    {
        let mut engine = PlaybackEngine::new(backend.clone(), endless_source());
        engine.init(cd_config(), StreamUsage::default()).unwrap();
        engine.start().unwrap();
    }
    let log = backend.log();
    assert_eq!(log.stops, 1);
    assert_eq!(log.releases, 1);
}

#[test]
fn test_drop_releases_idle_sink() {
    let backend = ScriptedBackend::new();
    {
        let mut engine = PlaybackEngine::new(backend.clone(), memory_source(Vec::new()));
        engine.init(cd_config(), StreamUsage::default()).unwrap();
    }
    assert_eq!(backend.log().releases, 1);
}
