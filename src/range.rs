//! Lazy references to byte ranges of archive files and streams.
//!
//! A [`ByteRange`] is a value handle `(source, offset, length)` over a
//! seekable byte source. Opening a range copies the referenced bytes into a
//! spooled temporary buffer under the source's lock, so the source position
//! is observably unchanged and repeated openings yield identical bytes.
use std::{
    fmt::{Debug, Formatter},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::ThreadId,
};

use tempfile::SpooledTempFile;

use crate::{
    error::GeneralError,
    io::{copy_limited, SeekRead, SPOOL_THRESHOLD},
};

const HANDLE_CACHE_CAPACITY: usize = 4;

/// Clonable handle over a seekable stream shared between an archive reader
/// and the byte ranges derived from it.
///
/// A given stream is not safe for concurrent use; the lock serializes
/// access so range reads do not race the reader's own position.
#[derive(Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<Box<dyn SeekRead + Send>>>,
}

impl SharedStream {
    pub fn new<S: Read + Seek + Send + 'static>(stream: S) -> Self {
        Self::from_boxed(Box::new(stream))
    }

    pub fn from_boxed(stream: Box<dyn SeekRead + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Box<dyn SeekRead + Send>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for SharedStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStream").finish_non_exhaustive()
    }
}

/// The backing of a [`ByteRange`]: a file path or a live shared stream.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// A path opened on demand through the handle cache. Paths with a
    /// `.gz` extension are read through a gzip-decompressing buffered
    /// reader, so offsets address the decompressed bytes.
    Path(PathBuf),
    /// An already-open stream shared with other ranges and the archive
    /// reader.
    Stream(SharedStream),
}

/// A lazy, clonable, restartable reference to a range of bytes.
///
/// The referenced source must remain readable for as long as the range is
/// live; the archive file or shared stream outlives all ranges derived
/// from it.
#[derive(Debug, Clone)]
pub struct ByteRange {
    source: ByteSource,
    offset: u64,
    length: Option<u64>,
}

impl ByteRange {
    /// Creates a range over `length` bytes at `offset`. An unbounded
    /// (`None`) length reads to the end of the source.
    pub fn new(source: ByteSource, offset: u64, length: Option<u64>) -> Self {
        Self {
            source,
            offset,
            length,
        }
    }

    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Materializes the referenced bytes into a spooled buffer and returns
    /// a rewindable reader over them.
    pub fn open(&self) -> Result<RangeReader, GeneralError> {
        match &self.source {
            ByteSource::Path(path) => {
                with_cached_handle(path, |stream| self.spool_from(stream))
            }
            ByteSource::Stream(shared) => {
                let mut guard = shared.lock();
                self.spool_from(&mut **guard)
            }
        }
    }

    fn spool_from(&self, stream: &mut (dyn SeekRead + Send)) -> Result<RangeReader, GeneralError> {
        let original_position = stream.stream_position()?;

        stream.seek(SeekFrom::Start(self.offset))?;

        let mut spool = SpooledTempFile::new(SPOOL_THRESHOLD);
        let length = copy_limited(stream, &mut spool, self.length)?;

        stream.seek(SeekFrom::Start(original_position))?;
        spool.seek(SeekFrom::Start(0))?;

        tracing::trace!(offset = self.offset, length, "materialized byte range");

        Ok(RangeReader { spool, length })
    }

    /// Returns the range length, measuring the source once for unbounded
    /// ranges.
    pub fn len(&self) -> Result<u64, GeneralError> {
        match self.length {
            Some(length) => Ok(length),
            None => Ok(self.open()?.len()),
        }
    }

    /// Streams the referenced bytes into the writer.
    pub fn write_to<W: Write + ?Sized>(&self, dest: &mut W) -> Result<u64, GeneralError> {
        let mut reader = self.open()?;

        Ok(std::io::copy(&mut reader, dest)?)
    }

    /// Reads the entire range into memory.
    pub fn read_all(&self) -> Result<Vec<u8>, GeneralError> {
        let mut reader = self.open()?;
        let mut buf = Vec::new();

        reader.read_to_end(&mut buf)?;

        Ok(buf)
    }
}

/// Reader over a materialized byte range.
pub struct RangeReader {
    spool: SpooledTempFile,
    length: u64,
}

impl RangeReader {
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.spool.read(buf)
    }
}

impl Seek for RangeReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.spool.seek(pos)
    }
}

struct CachedHandle {
    path: PathBuf,
    thread: ThreadId,
    stream: Box<dyn SeekRead + Send>,
}

// A handle is keyed by the opening thread so a stream is never shared
// across threads.
static HANDLE_CACHE: Mutex<Vec<CachedHandle>> = Mutex::new(Vec::new());

fn with_cached_handle<T>(
    path: &Path,
    f: impl FnOnce(&mut (dyn SeekRead + Send)) -> Result<T, GeneralError>,
) -> Result<T, GeneralError> {
    let thread = std::thread::current().id();

    let cached = {
        let mut cache = HANDLE_CACHE.lock().unwrap_or_else(PoisonError::into_inner);

        cache
            .iter()
            .position(|h| h.thread == thread && h.path == path)
            .map(|index| cache.remove(index))
    };

    let mut stream = match cached {
        Some(handle) => handle.stream,
        None => crate::io::open_archive(path, false)?,
    };

    let result = f(&mut *stream);

    // a handle that errored may be in an unknown state, so it is not
    // returned to the cache
    if result.is_ok() {
        let mut cache = HANDLE_CACHE.lock().unwrap_or_else(PoisonError::into_inner);

        while cache.len() >= HANDLE_CACHE_CAPACITY {
            cache.remove(0);
        }

        cache.push(CachedHandle {
            path: path.to_path_buf(),
            thread,
            stream,
        });
    }

    result
}

/// Closes all cached file handles.
pub fn clear_handle_cache() {
    HANDLE_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
