//! # Playout
//!
//! Streams a raw 16-bit PCM asset to the audio output in 10 ms ticks, or
//! captures the same stream to a WAV file.

mod asset;
mod settings;

use anyhow::{bail, Context, Result};
use clap::Parser;
use playout_audio::sink::list_output_devices;
use playout_audio::{CpalBackend, FileAsset, PlaybackEngine, Playout, SinkBackend, WavBackend};
use playout_core::ErrorCode;
use settings::{project_dirs, BackendKind, PlayoutSettings};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the control thread checks on the render thread.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Command-line arguments; each one overrides `settings.json`.
#[derive(Parser, Debug)]
#[command(name = "playout")]
#[command(about = "Stream a raw PCM asset to an audio output")]
#[command(version)]
struct Args {
    /// Raw little-endian 16-bit PCM file to play
    #[arg(required_unless_present = "list_devices")]
    asset: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(short, long)]
    rate: Option<i32>,

    /// Channel count (1 or 2)
    #[arg(short, long)]
    channels: Option<i32>,

    /// Stream-type hint (3 = music)
    #[arg(short = 'u', long)]
    usage: Option<i32>,

    /// Output backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,

    /// Output device name
    #[arg(short, long)]
    device: Option<String>,

    /// WAV file written by the wav backend
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the WAV capture as fast as possible instead of in real time
    #[arg(long)]
    unpaced: bool,

    /// Play the asset in place instead of copying it to the data directory
    #[arg(long)]
    no_copy: bool,

    /// Stop after this many seconds
    #[arg(short = 't', long)]
    seconds: Option<u64>,

    /// Store the effective settings as the new defaults
    #[arg(long)]
    save_settings: bool,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, settings: &mut PlayoutSettings) {
        if let Some(rate) = self.rate {
            settings.sample_rate = rate;
        }
        if let Some(channels) = self.channels {
            settings.channels = channels;
        }
        if let Some(usage) = self.usage {
            settings.stream_type = usage;
        }
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if self.device.is_some() {
            settings.device_name.clone_from(&self.device);
        }
        if self.output.is_some() {
            settings.wav_path.clone_from(&self.output);
        }
        if self.unpaced {
            settings.paced = false;
        }
        if self.no_copy {
            settings.copy_asset = false;
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "playout=debug,playout_app=debug,playout_audio=debug"
    } else {
        "playout=info,playout_audio=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn build_backend(settings: &PlayoutSettings) -> Box<dyn SinkBackend> {
    match settings.backend {
        BackendKind::Device => match &settings.device_name {
            Some(name) => Box::new(CpalBackend::with_device_name(name.clone())),
            None => Box::new(CpalBackend::new()),
        },
        BackendKind::Wav => {
            let path = settings
                .wav_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("playout.wav"));
            Box::new(WavBackend::new(path).paced(settings.paced))
        }
    }
}

fn resolve_asset(asset: PathBuf, settings: &PlayoutSettings) -> Result<PathBuf> {
    if !settings.copy_asset {
        return Ok(asset);
    }
    let Some(dirs) = project_dirs() else {
        warn!("No data directory on this platform, playing asset in place");
        return Ok(asset);
    };
    asset::materialize_asset(&asset, &dirs.data_dir().join("assets"))
        .with_context(|| format!("Failed to copy asset {}", asset.display()))
}

fn check(code: ErrorCode, operation: &str) -> Result<()> {
    if !code.is_ok() {
        bail!("{operation} failed: {code}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    info!("Starting Playout v{}", env!("CARGO_PKG_VERSION"));

    if args.list_devices {
        for name in list_output_devices().context("Failed to enumerate output devices")? {
            println!("{name}");
        }
        return Ok(());
    }

    let mut settings = PlayoutSettings::load().context("Failed to load settings")?;
    args.apply(&mut settings);

    if args.save_settings {
        let path = PlayoutSettings::default_path()?;
        settings.save_to(&path).context("Failed to save settings")?;
    }

    let Some(asset) = args.asset.clone() else {
        bail!("No asset given");
    };
    let asset = resolve_asset(asset, &settings)?;
    info!("Playing {}", asset.display());

    let engine = PlaybackEngine::from_boxed(build_backend(&settings), Box::new(FileAsset::new(asset)));
    let mut playout = Playout::new(engine);

    check(
        playout.init_playout(settings.sample_rate, settings.channels, settings.stream_type),
        "initPlayout",
    )?;
    check(playout.start_playout(), "startPlayout")?;

    let deadline = args
        .seconds
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    while playout.engine().is_playing() {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("Time limit reached");
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    check(playout.stop_playout(), "stopPlayout")?;

    if let Some(report) = playout.engine().last_report() {
        info!(
            "Session ended ({:?}): {} ticks, {} bytes, {} short reads, {} partial writes",
            report.exit, report.ticks, report.bytes_written, report.short_reads, report.partial_writes
        );
    }
    Ok(())
}
