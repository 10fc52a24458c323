//! Content blocks of WARC records.
use std::io::{SeekFrom, Write};

use crate::{
    error::{GeneralError, ProtocolErrorKind},
    fields::{Fields, HttpHeader},
    io::{find_pattern, SeekRead},
    range::{ByteRange, ByteSource},
};

use crate::record::FIELD_DELIMITER;

/// The opaque portion of a WARC record.
///
/// A block is either raw bytes or, for field-structured media types, a
/// parsed fields section followed by a payload.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Binary(BinaryBlock),
    Fields(FieldsBlock),
}

impl ContentBlock {
    /// Captures the content block at the current stream position.
    ///
    /// The payload bytes are not read; the stream is advanced past the
    /// block and byte ranges into `source` are recorded instead. With
    /// `preserve_block`, every block is captured as raw bytes which
    /// guarantees bit-identical serialization.
    pub fn load<R: SeekRead + ?Sized>(
        stream: &mut R,
        source: &ByteSource,
        length: u64,
        content_type: Option<&str>,
        preserve_block: bool,
    ) -> Result<Self, GeneralError> {
        if preserve_block {
            return Ok(Self::Binary(BinaryBlock::load(stream, source, length)?));
        }

        match content_type {
            Some(value) if value.starts_with("application/http") => Ok(Self::Fields(
                FieldsBlock::load(stream, source, length, FieldsKind::Http)?,
            )),
            Some(value) if value.starts_with("application/warc-fields") => Ok(Self::Fields(
                FieldsBlock::load(stream, source, length, FieldsKind::Warc)?,
            )),
            _ => Ok(Self::Binary(BinaryBlock::load(stream, source, length)?)),
        }
    }

    /// Returns the length the block will have when serialized.
    pub fn len(&self) -> Result<u64, GeneralError> {
        match self {
            Self::Binary(block) => block.range().len(),
            Self::Fields(block) => block.len(),
        }
    }

    pub fn is_empty(&self) -> Result<bool, GeneralError> {
        Ok(self.len()? == 0)
    }

    /// A byte range over the raw block bytes as they appear in the file.
    ///
    /// For field-structured blocks this is the retained binary view, not
    /// the re-serialized fields and payload.
    pub fn binary_range(&self) -> &ByteRange {
        match self {
            Self::Binary(block) => block.range(),
            Self::Fields(block) => block.binary_range(),
        }
    }

    /// The payload byte range of a field-structured block.
    pub fn payload_range(&self) -> Option<&ByteRange> {
        match self {
            Self::Binary(_) => None,
            Self::Fields(block) => Some(block.payload_range()),
        }
    }

    pub fn as_fields(&self) -> Option<&FieldsBlock> {
        if let Self::Fields(block) = self {
            Some(block)
        } else {
            None
        }
    }

    pub fn as_fields_mut(&mut self) -> Option<&mut FieldsBlock> {
        if let Self::Fields(block) = self {
            Some(block)
        } else {
            None
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryBlock> {
        if let Self::Binary(block) = self {
            Some(block)
        } else {
            None
        }
    }

    /// Writes the serialized block bytes.
    pub fn write_to<W: Write + ?Sized>(&self, dest: &mut W) -> Result<u64, GeneralError> {
        match self {
            Self::Binary(block) => block.range().write_to(dest),
            Self::Fields(block) => block.write_to(dest),
        }
    }
}

/// A content block of opaque bytes.
#[derive(Debug, Clone)]
pub struct BinaryBlock {
    range: ByteRange,
}

impl BinaryBlock {
    pub fn new(range: ByteRange) -> Self {
        Self { range }
    }

    fn load<R: SeekRead + ?Sized>(
        stream: &mut R,
        source: &ByteSource,
        length: u64,
    ) -> Result<Self, GeneralError> {
        let offset = stream.stream_position()?;
        let range = ByteRange::new(source.clone(), offset, Some(length));

        stream.seek(SeekFrom::Start(offset + length))?;

        tracing::debug!(length, "binary content block");

        Ok(Self { range })
    }

    pub fn range(&self) -> &ByteRange {
        &self.range
    }
}

/// The kind of fields a structured block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldsKind {
    Warc,
    Http,
}

/// The fields section of a structured block.
#[derive(Debug, Clone)]
pub enum BlockFields {
    Warc(Fields),
    Http(HttpHeader),
}

impl BlockFields {
    pub fn as_warc(&self) -> Option<&Fields> {
        if let Self::Warc(fields) = self {
            Some(fields)
        } else {
            None
        }
    }

    pub fn as_http(&self) -> Option<&HttpHeader> {
        if let Self::Http(header) = self {
            Some(header)
        } else {
            None
        }
    }

    /// The plain field list, regardless of a leading status line.
    pub fn fields(&self) -> &Fields {
        match self {
            Self::Warc(fields) => fields,
            Self::Http(header) => &header.fields,
        }
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        match self {
            Self::Warc(fields) => fields,
            Self::Http(header) => &mut header.fields,
        }
    }

    fn serialize<W: Write>(&self, buf: W) -> std::io::Result<()> {
        match self {
            Self::Warc(fields) => fields.serialize(buf),
            Self::Http(header) => header.serialize(buf),
        }
    }
}

/// A content block structured as fields and a payload.
///
/// The block also retains a binary view over its original file bytes so
/// digests can be verified after the fields have been parsed or mutated.
#[derive(Debug, Clone)]
pub struct FieldsBlock {
    fields: BlockFields,
    payload: ByteRange,
    binary: ByteRange,
}

impl FieldsBlock {
    fn load<R: SeekRead + ?Sized>(
        stream: &mut R,
        source: &ByteSource,
        length: u64,
        kind: FieldsKind,
    ) -> Result<Self, GeneralError> {
        let offset = stream.stream_position()?;
        let binary = ByteRange::new(source.clone(), offset, Some(length));

        // A block without the deliminator is all fields and no payload.
        let field_length = match find_pattern(stream, FIELD_DELIMITER, Some(length), true) {
            Ok(value) => value,
            Err(GeneralError::Protocol(error))
                if *error.kind() == ProtocolErrorKind::PatternNotFound =>
            {
                length
            }
            Err(error) => return Err(error),
        };

        let mut field_bytes = vec![0u8; field_length as usize];
        stream.read_exact(&mut field_bytes)?;

        let text = String::from_utf8_lossy(&field_bytes);
        let fields = match kind {
            FieldsKind::Warc => BlockFields::Warc(Fields::parse(&text)?),
            FieldsKind::Http => BlockFields::Http(HttpHeader::parse(&text)?),
        };

        let payload_length = length - field_length;
        let payload = ByteRange::new(source.clone(), offset + field_length, Some(payload_length));

        stream.seek(SeekFrom::Start(offset + length))?;

        tracing::debug!(field_length, payload_length, "content block with fields");

        Ok(Self {
            fields,
            payload,
            binary,
        })
    }

    pub fn fields(&self) -> &BlockFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut BlockFields {
        &mut self.fields
    }

    /// Replaces the payload byte range.
    pub fn set_payload(&mut self, payload: ByteRange) {
        self.payload = payload;
    }

    pub fn payload_range(&self) -> &ByteRange {
        &self.payload
    }

    pub fn binary_range(&self) -> &ByteRange {
        &self.binary
    }

    /// The serialized length: fields, the separating empty line, then the
    /// payload.
    pub fn len(&self) -> Result<u64, GeneralError> {
        let mut fields_buf = Vec::new();
        self.fields.serialize(&mut fields_buf)?;

        Ok(fields_buf.len() as u64 + 2 + self.payload.len()?)
    }

    pub fn write_to<W: Write + ?Sized>(&self, dest: &mut W) -> Result<u64, GeneralError> {
        let mut fields_buf = Vec::new();
        self.fields.serialize(&mut fields_buf)?;

        dest.write_all(&fields_buf)?;
        dest.write_all(b"\r\n")?;

        let payload_length = self.payload.write_to(dest)?;

        Ok(fields_buf.len() as u64 + 2 + payload_length)
    }
}
