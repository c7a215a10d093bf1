//! Audio device output using cpal.
//!
//! `cpal::Stream` is not `Send`, so each sink owns a device thread that
//! builds the stream and executes play/pause commands. The render thread
//! pushes samples into a lock-free ring that the device callback drains.

use super::{decode_samples, AudioSink, PlayState, SinkBackend, SinkConfig, WriteMode};
use crate::buffer::{shared_ring_buffer, SharedRingBuffer};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, SampleFormat as CpalSampleFormat, SampleRate, Stream, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use playout_core::{ChannelLayout, Error, Result, SampleFormat};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Audio kept queued ahead of the device, in milliseconds.
const DEVICE_QUEUE_MS: usize = 40;

/// How long a blocking write waits for the device to drain before giving up.
const STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound on a single condvar wait inside a blocking write.
const SPACE_WAIT: Duration = Duration::from_millis(2);

/// How long to wait for the device thread to acknowledge a command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

type Ack = Sender<std::result::Result<(), String>>;

enum DeviceCommand {
    Play(Ack),
    Pause(Ack),
    Shutdown,
}

/// Sink backend for the host's audio devices.
pub struct CpalBackend {
    device_name: Option<String>,
    /// Set while a sink from this backend is open; one stream at a time.
    in_use: Arc<AtomicBool>,
}

impl CpalBackend {
    /// Use the default output device.
    pub fn new() -> Self {
        Self {
            device_name: None,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use the output device with the given name.
    pub fn with_device_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    fn device(&self) -> Result<Device> {
        let host = cpal::default_host();

        match &self.device_name {
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No output device found".to_string())),
            Some(name) => host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
                .find(|d| d.name().is_ok_and(|n| &n == name))
                .ok_or_else(|| Error::AudioOutput(format!("Output device not found: {name}"))),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a supported device config matching the channel count and rate.
///
/// Formats are preferred in the order the stream builder handles them.
fn find_config(
    device: &Device,
    sample_rate: u32,
    layout: ChannelLayout,
) -> Result<SupportedStreamConfigRange> {
    let ranges: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(|e| Error::AudioOutput(format!("Failed to query output configs: {e}")))?
        .filter(|range| {
            range.channels() == layout.count()
                && range.min_sample_rate().0 <= sample_rate
                && range.max_sample_rate().0 >= sample_rate
        })
        .collect();

    [
        CpalSampleFormat::I16,
        CpalSampleFormat::F32,
        CpalSampleFormat::U16,
    ]
    .iter()
    .find_map(|format| ranges.iter().find(|r| r.sample_format() == *format))
    .cloned()
    .ok_or_else(|| {
        Error::AudioOutput(format!(
            "Device does not support {sample_rate} Hz with {} channel(s)",
            layout.count()
        ))
    })
}

impl SinkBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "device"
    }

    fn min_buffer_size(
        &self,
        sample_rate: u32,
        layout: ChannelLayout,
        format: SampleFormat,
    ) -> Result<usize> {
        let device = self.device()?;
        let range = find_config(&device, sample_rate, layout)?;
        let bytes_per_frame = usize::from(layout.count()) * format.bytes_per_sample();

        let min_frames = match range.buffer_size() {
            SupportedBufferSize::Range { min, .. } => *min as usize,
            SupportedBufferSize::Unknown => 0,
        };
        debug!(
            "Device minimum buffer: {} frames ({:?})",
            min_frames,
            range.sample_format()
        );
        Ok(min_frames * bytes_per_frame)
    }

    fn open(&self, config: &SinkConfig) -> Result<Box<dyn AudioSink>> {
        let device = self.device()?;

        if self
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AudioOutput(
                "Another stream is already open on this backend".to_string(),
            ));
        }

        match CpalSink::open(device, config, self.in_use.clone()) {
            Ok(sink) => Ok(Box::new(sink)),
            Err(e) => {
                self.in_use.store(false, Ordering::Release);
                Err(e)
            }
        }
    }
}

/// State shared between the sink, its device thread, and the callback.
struct Shared {
    ring: SharedRingBuffer,
    playing: AtomicBool,
    failed: AtomicBool,
    underruns: AtomicU64,
    space: Mutex<()>,
    space_available: Condvar,
}

impl Shared {
    fn new(ring_samples: usize) -> Self {
        Self {
            ring: shared_ring_buffer(ring_samples),
            playing: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            underruns: AtomicU64::new(0),
            space: Mutex::new(()),
            space_available: Condvar::new(),
        }
    }

    /// Push samples into the ring and return how many were accepted.
    ///
    /// A blocking push waits for the callback to free space until every
    /// sample is queued, playback stops, the stream fails, or no space has
    /// opened up for `stall_timeout`.
    fn push(&self, samples: &[i16], mode: WriteMode, stall_timeout: Duration) -> Result<usize> {
        let mut written = self.ring.write(samples);
        let mut last_progress = Instant::now();

        while mode == WriteMode::Blocking && written < samples.len() {
            if self.failed.load(Ordering::Acquire) {
                return Err(Error::SinkWrite("Device stream failed".to_string()));
            }
            if !self.playing.load(Ordering::Acquire) {
                break;
            }
            if last_progress.elapsed() > stall_timeout {
                return Err(Error::SinkWrite("Device stopped consuming audio".to_string()));
            }

            {
                let mut guard = self.space.lock();
                if self.ring.is_full() {
                    let _ = self.space_available.wait_for(&mut guard, SPACE_WAIT);
                }
            }

            let n = self.ring.write(&samples[written..]);
            if n > 0 {
                written += n;
                last_progress = Instant::now();
            }
        }

        Ok(written)
    }

    /// Callback side: fill `out` from the ring and zero what the ring could
    /// not supply. Returns the samples taken from the ring.
    fn drain_into(&self, out: &mut [i16]) -> usize {
        let read = self.ring.read(out);
        out[read..].fill(0);

        if read < out.len() && self.playing.load(Ordering::Relaxed) {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
        if read > 0 {
            self.space_available.notify_one();
        }
        read
    }
}

/// Open output stream on a cpal device.
pub struct CpalSink {
    shared: Arc<Shared>,
    command_tx: Sender<DeviceCommand>,
    device_thread: Option<JoinHandle<()>>,
    in_use: Arc<AtomicBool>,
    scratch: Vec<i16>,
}

impl CpalSink {
    fn open(device: Device, config: &SinkConfig, in_use: Arc<AtomicBool>) -> Result<Self> {
        let playback = config.playback;
        let range = find_config(&device, playback.sample_rate(), playback.layout())?;
        let sample_format = range.sample_format();
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let stream_config = StreamConfig {
            channels: playback.channels(),
            sample_rate: SampleRate(playback.sample_rate()),
            buffer_size: BufferSize::Default,
        };

        // Ring holds the platform minimum or DEVICE_QUEUE_MS, whichever is larger
        let interval_samples = playback.interval_byte_count() / 2;
        let queue_samples = interval_samples * DEVICE_QUEUE_MS / 10;
        let shared = Arc::new(Shared::new((config.buffer_size / 2).max(queue_samples)));

        debug!(
            "Opening {} ({:?} {:?}) with usage hints {:?}",
            device_name, stream_config, sample_format, config.usage
        );

        let (command_tx, command_rx) = bounded(4);
        let (ready_tx, ready_rx) = bounded(1);
        let thread_shared = shared.clone();

        let device_thread = std::thread::Builder::new()
            .name("playout-device".to_string())
            .spawn(move || {
                let stream = match sample_format {
                    CpalSampleFormat::I16 => {
                        build_stream::<i16>(&device, &stream_config, thread_shared)
                    }
                    CpalSampleFormat::F32 => {
                        build_stream::<f32>(&device, &stream_config, thread_shared)
                    }
                    CpalSampleFormat::U16 => {
                        build_stream::<u16>(&device, &stream_config, thread_shared)
                    }
                    other => Err(Error::AudioOutput(format!(
                        "Unsupported sample format: {other:?}"
                    ))),
                };

                match stream {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        run_device(&stream, &command_rx);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                    }
                }
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn device thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                let _ = device_thread.join();
                return Err(Error::AudioOutput(reason));
            }
            Err(_) => {
                let _ = device_thread.join();
                return Err(Error::AudioOutput(
                    "Device thread exited during setup".to_string(),
                ));
            }
        }

        info!(
            "Audio output opened: {} Hz, {} channel(s), device: {}",
            playback.sample_rate(),
            playback.channels(),
            device_name
        );

        Ok(Self {
            shared,
            command_tx,
            device_thread: Some(device_thread),
            in_use,
            scratch: Vec::with_capacity(interval_samples),
        })
    }

    /// Callbacks that found the ring short of a full device buffer.
    pub fn underruns(&self) -> u64 {
        self.shared.underruns.load(Ordering::Relaxed)
    }

    fn command(&self, make: fn(Ack) -> DeviceCommand) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.command_tx
            .send(make(ack_tx))
            .map_err(|_| Error::AudioOutput("Device thread is gone".to_string()))?;
        match ack_rx.recv_timeout(COMMAND_TIMEOUT) {
            Ok(result) => result.map_err(Error::AudioOutput),
            Err(e) => Err(Error::AudioOutput(format!(
                "Device thread did not respond: {e}"
            ))),
        }
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.device_thread.take() {
            let _ = self.command_tx.send(DeviceCommand::Shutdown);
            if handle.join().is_err() {
                error!("Device thread panicked");
            }
            self.shared.playing.store(false, Ordering::Release);
            self.in_use.store(false, Ordering::Release);
        }
    }
}

impl AudioSink for CpalSink {
    fn play(&mut self) -> Result<()> {
        if self.shared.failed.load(Ordering::Acquire) {
            return Err(Error::AudioOutput("Device stream failed".to_string()));
        }
        self.command(DeviceCommand::Play)?;
        self.shared.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn play_state(&self) -> PlayState {
        if self.shared.playing.load(Ordering::Acquire) {
            PlayState::Playing
        } else {
            PlayState::Stopped
        }
    }

    fn write(&mut self, data: &[u8], mode: WriteMode) -> Result<usize> {
        if self.shared.failed.load(Ordering::Acquire) {
            return Err(Error::SinkWrite("Device stream failed".to_string()));
        }
        if !self.shared.playing.load(Ordering::Acquire) {
            return Err(Error::InvalidState("Write on a stopped sink".to_string()));
        }

        decode_samples(data, &mut self.scratch);
        let written = self.shared.push(&self.scratch, mode, STALL_TIMEOUT)?;
        Ok(written * 2)
    }

    fn stop(&mut self) -> Result<()> {
        self.shared.playing.store(false, Ordering::Release);
        self.command(DeviceCommand::Pause)
    }

    fn release(mut self: Box<Self>) {
        debug!("Releasing device sink ({} underruns)", self.underruns());
        self.shutdown();
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Device thread body: hold the stream and apply commands until shutdown.
fn run_device(stream: &Stream, command_rx: &Receiver<DeviceCommand>) {
    while let Ok(command) = command_rx.recv() {
        match command {
            DeviceCommand::Play(ack) => {
                let _ = ack.send(
                    stream
                        .play()
                        .map_err(|e| format!("Failed to start stream: {e}")),
                );
            }
            DeviceCommand::Pause(ack) => {
                let _ = ack.send(
                    stream
                        .pause()
                        .map_err(|e| format!("Failed to pause stream: {e}")),
                );
            }
            DeviceCommand::Shutdown => break,
        }
    }
    debug!("Device thread exiting");
}

fn build_stream<T>(device: &Device, config: &StreamConfig, shared: Arc<Shared>) -> Result<Stream>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let err_shared = shared.clone();
    let err_fn = move |err| {
        error!("Audio stream error: {err}");
        err_shared.failed.store(true, Ordering::Release);
        err_shared.space_available.notify_all();
    };

    let mut temp = Vec::<i16>::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if temp.len() < data.len() {
                    temp.resize(data.len(), 0);
                }
                let out = &mut temp[..data.len()];
                shared.drain_into(out);
                for (sample, &value) in data.iter_mut().zip(out.iter()) {
                    *sample = T::from_sample(value);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))
}

/// List available output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
        .filter_map(|d| d.name().ok())
        .collect();

    if devices.is_empty() {
        warn!("No output devices found");
    }
    Ok(devices)
}
