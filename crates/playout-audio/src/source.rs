//! Sequential PCM byte sources feeding the render loop.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use bytes::{buf::Reader, Buf, Bytes};
use playout_core::{Error, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sequential reader over raw interleaved PCM.
///
/// `Ok(0)` signals the end of the stream. `Ok(n)` with `n` smaller than the
/// requested length is a short read and does not end the stream by itself.
/// There is no seeking; an exhausted source stays exhausted.
pub trait FrameSource: Send {
    fn read_frames(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Frame source over any [`Read`] implementation.
///
/// Each call keeps reading until the requested length is filled or the
/// reader reports end of stream, so a short chunk only happens when the
/// stream ends mid-tick.
pub struct ReaderSource<R> {
    reader: R,
    exhausted: bool,
}

impl<R: Read + Send> ReaderSource<R> {
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }

    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl ReaderSource<BufReader<File>> {
    /// Open a PCM file for sequential reading.
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::Source(format!("Failed to open {}: {e}", path.display()))
        })?;
        debug!("Opened PCM source {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl ReaderSource<Reader<Bytes>> {
    /// Read PCM from an in-memory asset.
    pub fn memory(data: Bytes) -> Self {
        Self::new(data.reader())
    }
}

impl<R: Read + Send> FrameSource for ReaderSource<R> {
    fn read_frames(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.exhausted {
            return Ok(0);
        }

        let mut total = 0;
        while total < buf.len() {
            match self.reader.read(&mut buf[total..]) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Source(format!("Read failed: {e}"))),
            }
        }

        Ok(total)
    }
}

/// Something that can open a fresh [`FrameSource`] for each playback session.
pub trait OpenSource: Send {
    fn open(&self) -> Result<Box<dyn FrameSource>>;
}

impl<F> OpenSource for F
where
    F: Fn() -> Result<Box<dyn FrameSource>> + Send,
{
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        self()
    }
}

/// PCM asset stored on the filesystem.
#[derive(Debug, Clone)]
pub struct FileAsset {
    path: PathBuf,
}

impl FileAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OpenSource for FileAsset {
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(ReaderSource::file(&self.path)?))
    }
}

/// PCM asset held in memory, e.g. bundled with `include_bytes!`.
#[derive(Debug, Clone)]
pub struct MemoryAsset {
    data: Bytes,
}

impl MemoryAsset {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl OpenSource for MemoryAsset {
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        // Cloning `Bytes` only bumps a refcount.
        Ok(Box::new(ReaderSource::memory(self.data.clone())))
    }
}
