//! WARC records.
use std::io::Write;

use chrono::{DateTime, Utc};

use crate::{
    block::ContentBlock,
    error::{GeneralError, ParseError, ProtocolError, ProtocolErrorKind},
    header::WarcHeader,
    io::{find_pattern, SeekRead},
    range::ByteSource,
};

/// The CR LF CR LF sequence terminating headers and separating records.
pub(crate) const FIELD_DELIMITER: &[u8] = b"\r\n\r\n";

const MAX_HEADER_LENGTH: u64 = 32768;

/// A WARC record within a WARC file.
#[derive(Debug, Clone)]
pub struct Record {
    pub header: WarcHeader,
    pub block: Option<ContentBlock>,
    /// The offset of the record within its archive, when it was read from
    /// one. Offsets address the decompressed stream for gzip archives.
    pub file_offset: Option<u64>,
}

impl Record {
    pub fn new(header: WarcHeader) -> Self {
        Self {
            header,
            block: None,
            file_offset: None,
        }
    }

    /// Parses a record at the current stream position.
    ///
    /// The content block is captured as byte ranges into `source` without
    /// reading the payload bytes. With `preserve_block`, the block is not
    /// parsed for fields, which guarantees preservation of content length
    /// and hash digests on serialization.
    pub fn read<R: SeekRead + ?Sized>(
        stream: &mut R,
        source: &ByteSource,
        preserve_block: bool,
    ) -> Result<Self, GeneralError> {
        let offset = stream.stream_position()?;

        tracing::debug!(offset, "record start");

        let header_length = match find_pattern(stream, FIELD_DELIMITER, Some(MAX_HEADER_LENGTH), true)
        {
            Ok(value) => value,
            Err(GeneralError::Protocol(error))
                if *error.kind() == ProtocolErrorKind::PatternNotFound =>
            {
                return Err(ProtocolError::new(ProtocolErrorKind::HeaderNotTerminated)
                    .with_position(offset)
                    .into());
            }
            Err(error) => return Err(error),
        };

        let mut header_bytes = vec![0u8; header_length as usize];
        stream.read_exact(&mut header_bytes)?;

        let header =
            WarcHeader::parse(&header_bytes).map_err(|error| error.with_position(offset))?;
        let length = header.content_length().map_err(|error| match error {
            GeneralError::Parse(error) => GeneralError::Parse(error.with_position(offset)),
            GeneralError::Protocol(error) => GeneralError::Protocol(error.with_position(offset)),
            error => error,
        })?;

        tracing::trace!(
            record_id = header.record_id(),
            warc_type = header.warc_type(),
            content_length = length,
            "read record header"
        );

        let content_type = header.content_type().map(str::to_string);
        let block = ContentBlock::load(
            stream,
            source,
            length,
            content_type.as_deref(),
            preserve_block,
        )?;

        let mut record = Self {
            header,
            block: Some(block),
            file_offset: Some(offset),
        };

        record.refresh_content_length()?;

        Ok(record)
    }

    /// Returns the value of `WARC-Record-ID`.
    pub fn record_id(&self) -> Option<&str> {
        self.header.record_id()
    }

    /// Returns the value of `WARC-Type`.
    pub fn warc_type(&self) -> Option<&str> {
        self.header.warc_type()
    }

    /// Returns the value of `Content-Length` as an integer.
    pub fn content_length(&self) -> Result<u64, GeneralError> {
        self.header.content_length()
    }

    /// Returns the value of `WARC-Date` as a date-time.
    pub fn date(&self) -> Result<DateTime<Utc>, ParseError> {
        self.header.warc_date()
    }

    /// Updates the header's `Content-Length` to the block's serialized
    /// length.
    ///
    /// A changed value is logged as a warning but is not an error.
    pub fn refresh_content_length(&mut self) -> Result<(), GeneralError> {
        let Some(block) = &self.block else {
            return Ok(());
        };

        let length = block.len()?;
        let declared = self.header.content_length().ok();

        if declared != Some(length) {
            tracing::warn!(
                record_id = self.record_id(),
                ?declared,
                length,
                "content block length adjusted"
            );
            self.header.set_content_length(length);
        }

        Ok(())
    }

    /// Writes the serialized record: header, block, and the trailing
    /// record separator.
    pub fn serialize<W: Write + ?Sized>(&mut self, dest: &mut W) -> Result<(), GeneralError> {
        self.refresh_content_length()?;

        self.header.serialize(&mut *dest)?;

        if let Some(block) = &self.block {
            block.write_to(dest)?;
        }

        dest.write_all(FIELD_DELIMITER)?;

        Ok(())
    }
}
