//! Reading and writing WARC archives.
use std::{
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use flate2::write::GzEncoder;

use crate::{
    error::{GeneralError, ProtocolError, ProtocolErrorKind},
    range::{ByteSource, SharedStream},
    record::{Record, FIELD_DELIMITER},
};

/// Streaming reader over the records of a WARC file.
///
/// Records produced by the reader hold lazy byte ranges into the archive;
/// the reader (or the archive file) must outlive them.
pub struct WarcReader {
    stream: SharedStream,
    source: ByteSource,
}

impl WarcReader {
    /// Opens the archive at the path.
    ///
    /// Gzip is detected by the `.gz` filename extension, or forced with
    /// `force_gzip`. Offsets and ranges address the decompressed bytes.
    pub fn open<P: AsRef<Path>>(path: P, force_gzip: bool) -> std::io::Result<Self> {
        let path = path.as_ref();
        let stream = SharedStream::from_boxed(crate::io::open_archive(path, force_gzip)?);

        // Path-backed ranges decide gzip handling by extension, so they are
        // only usable when the extension agrees with how the archive was
        // opened.
        let source = if force_gzip && !crate::io::is_gzip_path(path) {
            ByteSource::Stream(stream.clone())
        } else {
            ByteSource::Path(path.to_path_buf())
        };

        Ok(Self { stream, source })
    }

    /// Reads from an already-open stream.
    pub fn from_stream(stream: SharedStream) -> Self {
        let source = ByteSource::Stream(stream.clone());

        Self { stream, source }
    }

    pub fn stream(&self) -> &SharedStream {
        &self.stream
    }

    /// Returns the current position in the (decompressed) archive stream.
    pub fn position(&self) -> std::io::Result<u64> {
        self.stream.lock().stream_position()
    }

    /// Reads one record and returns it along with whether more records
    /// follow.
    ///
    /// After the content block, exactly four bytes are required to be the
    /// CR LF CR LF record separator; anything else is a framing error
    /// reported with the stream offset. The end of the archive is detected
    /// by a single byte peek.
    pub fn read_record(&mut self, preserve_block: bool) -> Result<(Record, bool), GeneralError> {
        let mut guard = self.stream.lock();
        let record = Record::read(&mut **guard, &self.source, preserve_block)?;

        let position = guard.stream_position()?;
        let mut boundary = [0u8; FIELD_DELIMITER.len()];
        let mut boundary_length = 0;

        while boundary_length < boundary.len() {
            let length = guard.read(&mut boundary[boundary_length..])?;

            if length == 0 {
                break;
            }

            boundary_length += length;
        }

        if &boundary[..boundary_length] != FIELD_DELIMITER {
            tracing::debug!(?boundary, position, "wrong record separator");

            return Err(ProtocolError::new(ProtocolErrorKind::InvalidRecordBoundary)
                .with_position(position)
                .into());
        }

        let mut peek = [0u8; 1];
        let has_more = guard.read(&mut peek)? != 0;

        if has_more {
            guard.seek(SeekFrom::Current(-1))?;
        } else {
            tracing::debug!("finished reading archive");
        }

        Ok((record, has_more))
    }

    /// Returns an iterator over all remaining records.
    pub fn records(&mut self, preserve_block: bool) -> RecordIter<'_> {
        RecordIter {
            reader: self,
            preserve_block,
            finished: false,
        }
    }
}

pub struct RecordIter<'a> {
    reader: &'a mut WarcReader,
    preserve_block: bool,
    finished: bool,
}

impl Iterator for RecordIter<'_> {
    type Item = Result<Record, GeneralError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_record(self.preserve_block) {
            Ok((record, has_more)) => {
                self.finished = !has_more;
                Some(Ok(record))
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

/// An in-memory WARC file model.
///
/// Streaming operations over large archives should prefer [`WarcReader`]
/// and [`WarcWriter`]; this model retains every record.
#[derive(Debug, Default)]
pub struct WarcFile {
    pub records: Vec<Record>,
}

impl WarcFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens and reads all records of the archive at the path.
    pub fn load<P: AsRef<Path>>(
        path: P,
        force_gzip: bool,
        preserve_block: bool,
    ) -> Result<Self, GeneralError> {
        let mut reader = WarcReader::open(path, force_gzip)?;
        let mut archive = Self::new();

        for record in reader.records(preserve_block) {
            archive.records.push(record?);
        }

        tracing::info!(records = archive.records.len(), "loaded archive");

        Ok(archive)
    }

    /// Serializes every record with uniform framing.
    pub fn write_to<W: Write + ?Sized>(&mut self, dest: &mut W) -> Result<(), GeneralError> {
        for record in &mut self.records {
            record.serialize(dest)?;
        }

        Ok(())
    }
}

/// Gzip behavior of a [`WarcWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GzipMode {
    /// Write the records unchanged.
    #[default]
    None,
    /// Compress the whole output as a single gzip member.
    Whole,
    /// Compress each record as its own gzip member, also known as
    /// record-at-time compression.
    PerRecord,
}

enum Sink<W: Write> {
    Raw(W),
    Whole(Box<GzEncoder<W>>),
    PerRecord(Option<W>),
}

/// Writer that serializes records to a destination, optionally
/// gzip-compressing the stream or each record.
pub struct WarcWriter<W: Write> {
    sink: Sink<W>,
}

impl<W: Write> WarcWriter<W> {
    pub fn new(dest: W, mode: GzipMode) -> Self {
        let sink = match mode {
            GzipMode::None => Sink::Raw(dest),
            GzipMode::Whole => Sink::Whole(Box::new(GzEncoder::new(
                dest,
                flate2::Compression::default(),
            ))),
            GzipMode::PerRecord => Sink::PerRecord(Some(dest)),
        };

        Self { sink }
    }

    pub fn write_record(&mut self, record: &mut Record) -> Result<(), GeneralError> {
        match &mut self.sink {
            Sink::Raw(dest) => record.serialize(dest),
            Sink::Whole(encoder) => record.serialize(encoder.as_mut()),
            Sink::PerRecord(slot) => {
                let dest = slot.take().ok_or_else(writer_poisoned)?;
                let mut encoder = GzEncoder::new(dest, flate2::Compression::default());

                record.serialize(&mut encoder)?;

                slot.replace(encoder.finish()?);

                Ok(())
            }
        }
    }

    /// Flushes any buffered compressed data and returns the destination.
    pub fn finish(self) -> Result<W, GeneralError> {
        match self.sink {
            Sink::Raw(mut dest) => {
                dest.flush()?;
                Ok(dest)
            }
            Sink::Whole(encoder) => Ok(encoder.finish()?),
            Sink::PerRecord(slot) => slot.ok_or_else(writer_poisoned).map_err(Into::into),
        }
    }
}

fn writer_poisoned() -> GeneralError {
    std::io::Error::other("writer left in a failed state").into()
}
