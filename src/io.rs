//! Stream utilities: bounded copies, pattern scanning, and random access
//! over forward-only decompressed streams.
use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use flate2::read::MultiGzDecoder;
use tempfile::SpooledTempFile;

use crate::error::{GeneralError, ProtocolError, ProtocolErrorKind};

const IO_BUFFER_LENGTH: usize = 4096;

/// Default size of a buffered block of decompressed data.
const DEFAULT_BLOCK_LENGTH: u64 = 100 * 1024 * 1024;
/// In-memory threshold before a spooled buffer is moved to disk.
pub(crate) const SPOOL_THRESHOLD: usize = 10 * 1024 * 1024;
const BLOCK_CACHE_CAPACITY: usize = 4;

/// Trait alias for seekable readers.
pub trait SeekRead: Read + Seek {}

impl<T: Read + Seek> SeekRead for T {}

/// Copies up to `limit` bytes (or to EOF when `None`) and returns the
/// number of bytes copied.
pub fn copy_limited<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    limit: Option<u64>,
) -> std::io::Result<u64> {
    let mut buf = [0u8; IO_BUFFER_LENGTH];
    let mut copied = 0u64;

    loop {
        let want = match limit {
            Some(limit) => buf.len().min((limit - copied).min(buf.len() as u64) as usize),
            None => buf.len(),
        };

        if want == 0 {
            break;
        }

        let len = reader.read(&mut buf[..want])?;

        if len == 0 {
            break;
        }

        writer.write_all(&buf[..len])?;
        copied += len as u64;
    }

    Ok(copied)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Returns the smallest offset at which `pattern` occurs at or after the
/// current stream position, within `limit` read bytes.
///
/// The stream position is left unchanged. When `inclusive` is set, the
/// returned offset includes the pattern length. A
/// [`ProtocolErrorKind::PatternNotFound`] error is returned when the limit
/// or EOF is reached without a match.
pub fn find_pattern<R: Read + Seek + ?Sized>(
    stream: &mut R,
    pattern: &[u8],
    limit: Option<u64>,
    inclusive: bool,
) -> Result<u64, GeneralError> {
    debug_assert!(!pattern.is_empty());

    let original_position = stream.stream_position()?;
    let mut window: Vec<u8> = Vec::new();
    let mut window_start = 0u64;
    let mut consumed = 0u64;
    let mut buf = [0u8; IO_BUFFER_LENGTH];

    loop {
        let want = match limit {
            Some(limit) => buf.len().min((limit - consumed).min(buf.len() as u64) as usize),
            None => buf.len(),
        };

        if want == 0 {
            break;
        }

        let len = stream.read(&mut buf[..want])?;

        if len == 0 {
            break;
        }

        consumed += len as u64;
        window.extend_from_slice(&buf[..len]);

        if let Some(index) = find_subslice(&window, pattern) {
            let mut offset = window_start + index as u64;

            if inclusive {
                offset += pattern.len() as u64;
            }

            stream.seek(SeekFrom::Start(original_position))?;
            return Ok(offset);
        }

        // The pattern may straddle two reads, so a tail shorter than the
        // pattern is carried into the next round.
        if window.len() >= pattern.len() {
            let drain = window.len() - (pattern.len() - 1);
            window.drain(..drain);
            window_start += drain as u64;
        }
    }

    stream.seek(SeekFrom::Start(original_position))?;

    Err(ProtocolError::new(ProtocolErrorKind::PatternNotFound)
        .with_position(original_position)
        .into())
}

/// A forward-only stream that can be rewound to its beginning.
pub trait RestartableRead: Read {
    /// Rewinds the stream so the next read starts at logical offset 0.
    fn restart(&mut self) -> std::io::Result<()>;
}

/// Decompressing reader over a gzip file.
///
/// Concatenated gzip members are decompressed as one continuous stream,
/// which covers both whole-archive and record-at-a-time compression.
pub struct GzipStream {
    path: PathBuf,
    decoder: MultiGzDecoder<BufReader<File>>,
}

impl GzipStream {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        Ok(Self {
            decoder: MultiGzDecoder::new(BufReader::new(file)),
            path,
        })
    }
}

impl Read for GzipStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.decoder.read(buf)
    }
}

impl RestartableRead for GzipStream {
    fn restart(&mut self) -> std::io::Result<()> {
        let file = File::open(&self.path)?;
        self.decoder = MultiGzDecoder::new(BufReader::new(file));

        Ok(())
    }
}

struct CachedBlock {
    index: u64,
    length: u64,
    spool: SpooledTempFile,
}

/// Adapts a forward-only stream into a seekable one.
///
/// Fixed-size blocks of the stream are materialized into spooled temporary
/// buffers on access and a small number of recently used blocks is kept.
/// Seeking backward past the cached blocks restarts the underlying stream
/// and reads forward again.
pub struct DiskBufferedReader<R: RestartableRead> {
    raw: R,
    raw_position: u64,
    position: u64,
    block_length: u64,
    spool_threshold: usize,
    blocks: VecDeque<CachedBlock>,
}

impl<R: RestartableRead> DiskBufferedReader<R> {
    pub fn new(raw: R) -> Self {
        Self::with_block_length(raw, DEFAULT_BLOCK_LENGTH, SPOOL_THRESHOLD)
    }

    /// Creates a reader with a custom block size and spool threshold.
    pub fn with_block_length(raw: R, block_length: u64, spool_threshold: usize) -> Self {
        debug_assert!(block_length > 0);

        Self {
            raw,
            raw_position: 0,
            position: 0,
            block_length,
            spool_threshold,
            blocks: VecDeque::new(),
        }
    }

    /// Reads up to `n` bytes without changing the stream position.
    pub fn peek(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        let original = self.position;
        let mut buf = vec![0u8; n];
        let mut total = 0;

        while total < n {
            let len = self.read(&mut buf[total..])?;

            if len == 0 {
                break;
            }

            total += len;
        }

        buf.truncate(total);
        self.position = original;

        Ok(buf)
    }

    /// Ensures the block is cached and positioned at the back of the cache.
    fn ensure_block(&mut self, index: u64) -> std::io::Result<()> {
        if let Some(at) = self.blocks.iter().position(|b| b.index == index) {
            if let Some(block) = self.blocks.remove(at) {
                self.blocks.push_back(block);
            }

            return Ok(());
        }

        self.load_block(index)
    }

    fn load_block(&mut self, index: u64) -> std::io::Result<()> {
        let target = index * self.block_length;

        if self.raw_position > target {
            tracing::debug!(index, "restarting raw stream");
            self.raw.restart()?;
            self.raw_position = 0;
        }

        // forward skip to the block boundary
        let mut scratch = [0u8; IO_BUFFER_LENGTH];
        while self.raw_position < target {
            let want = scratch
                .len()
                .min((target - self.raw_position).min(scratch.len() as u64) as usize);
            let len = self.raw.read(&mut scratch[..want])?;

            if len == 0 {
                break;
            }

            self.raw_position += len as u64;
        }

        let mut spool = SpooledTempFile::new(self.spool_threshold);
        let length = copy_limited(&mut self.raw, &mut spool, Some(self.block_length))?;
        self.raw_position += length;
        spool.seek(SeekFrom::Start(0))?;

        tracing::debug!(index, length, "buffered stream block");

        while self.blocks.len() >= BLOCK_CACHE_CAPACITY {
            self.blocks.pop_front();
        }

        self.blocks.push_back(CachedBlock {
            index,
            length,
            spool,
        });

        Ok(())
    }
}

impl<R: RestartableRead> Read for DiskBufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut total = 0;

        while total < buf.len() {
            let index = self.position / self.block_length;
            let within = self.position % self.block_length;

            self.ensure_block(index)?;

            let Some(block) = self.blocks.back_mut() else {
                break;
            };

            if within >= block.length {
                // short block: end of stream
                break;
            }

            block.spool.seek(SeekFrom::Start(within))?;
            let len = block.spool.read(&mut buf[total..])?;

            if len == 0 {
                break;
            }

            total += len;
            self.position += len as u64;
        }

        Ok(total)
    }
}

impl<R: RestartableRead> Seek for DiskBufferedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match pos {
            SeekFrom::Start(value) => self.position = value,
            SeekFrom::Current(delta) => {
                self.position = self.position.checked_add_signed(delta).ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "seek before start")
                })?;
            }
            SeekFrom::End(_delta) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "seek from end of a buffered stream",
                ));
            }
        }

        Ok(self.position)
    }
}

/// Returns whether the path has a gzip filename extension.
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "gz")
}

/// Opens an archive file as a seekable stream.
///
/// Gzip files are wrapped in a [`DiskBufferedReader`] to regain random
/// access over the decompressed bytes.
pub fn open_archive<P: AsRef<Path>>(
    path: P,
    force_gzip: bool,
) -> std::io::Result<Box<dyn SeekRead + Send>> {
    let path = path.as_ref();

    if force_gzip || is_gzip_path(path) {
        tracing::info!(?path, "opened gzip file");
        Ok(Box::new(DiskBufferedReader::new(GzipStream::open(path)?)))
    } else {
        tracing::info!(?path, "opened file");
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}
