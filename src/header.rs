//! WARC headers
use std::io::Write;

use chrono::{DateTime, Utc};

use crate::{
    error::{GeneralError, ParseError, ParseErrorKind, ProtocolError, ProtocolErrorKind},
    fields::Fields,
};

/// Data structure for representing a WARC header.
#[derive(Debug, Clone)]
pub struct WarcHeader {
    /// The version string, the text after "WARC/" such as "1.1".
    pub version: String,
    /// The name-value fields of the header.
    pub fields: Fields,
}

impl WarcHeader {
    /// Create a new empty header.
    ///
    /// The version and fields will be empty.
    pub fn empty() -> Self {
        Self {
            version: String::new(),
            fields: Fields::new(),
        }
    }

    /// Parses a WARC header from the given bytes.
    ///
    /// The input must span the version line, the field lines, and the
    /// terminating empty line.
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(input)?;

        let (version_line, field_text) = text
            .split_once("\r\n")
            .ok_or_else(|| ParseError::new(ParseErrorKind::IncompleteInput))?;

        if !version_line.starts_with("WARC") {
            return Err(ParseError::new(ParseErrorKind::NotWarcHeader)
                .with_snippet(version_line.chars().take(32).collect::<String>()));
        }

        crate::parse::validate_version(version_line.as_bytes())?;

        Ok(Self {
            version: version_line[5..].to_string(),
            fields: Fields::parse(field_text)?,
        })
    }

    /// Returns the value of `WARC-Record-ID`.
    pub fn record_id(&self) -> Option<&str> {
        self.fields.get("WARC-Record-ID")
    }

    /// Returns the value of `WARC-Type`.
    pub fn warc_type(&self) -> Option<&str> {
        self.fields.get("WARC-Type")
    }

    /// Returns the value of `Content-Type`.
    pub fn content_type(&self) -> Option<&str> {
        self.fields.get("Content-Type")
    }

    /// Returns the value of `Content-Length` as an integer.
    ///
    /// An absent field is a protocol error; a malformed value is a parse
    /// error.
    pub fn content_length(&self) -> Result<u64, GeneralError> {
        match self.fields.get_u64("Content-Length") {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(ParseError::new(ParseErrorKind::InvalidContentLength)
                .with_source(error)
                .into()),
            None => Err(ProtocolError::new(ProtocolErrorKind::MissingContentLength).into()),
        }
    }

    /// Sets the value of `Content-Length` as an integer.
    pub fn set_content_length(&mut self, value: u64) {
        self.fields.set("Content-Length", value.to_string());
    }

    /// Returns the value of `WARC-Date` as a date-time.
    pub fn warc_date(&self) -> Result<DateTime<Utc>, ParseError> {
        let value = self
            .fields
            .get("WARC-Date")
            .ok_or_else(|| ParseError::new(ParseErrorKind::Syntax))?;

        Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
    }

    /// Write the WARC header as serialized bytes.
    pub fn serialize<W: Write>(&self, mut buf: W) -> std::io::Result<()> {
        buf.write_all(b"WARC/")?;
        buf.write_all(self.version.as_bytes())?;
        buf.write_all(b"\r\n")?;
        self.fields.serialize(&mut buf)?;
        buf.write_all(b"\r\n")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_parse_serialize() {
        let data = "WARC/1.1\r\n\
            WARC-Record-ID: <example:123456>\r\n\
            Content-Length: 0\r\n\
            \r\n";
        let header = WarcHeader::parse(data.as_bytes()).unwrap();

        assert_eq!(&header.version, "1.1");
        assert_eq!(header.fields.len(), 2);
        assert_eq!(header.record_id(), Some("<example:123456>"));
        assert_eq!(header.content_length().unwrap(), 0);

        let mut buf = Vec::new();

        header.serialize(&mut buf).unwrap();

        assert_eq!(&buf, data.as_bytes());
    }

    #[test]
    fn test_header_accessors() {
        let data = "WARC/0.18\r\n\
            WARC-Type: warcinfo\r\n\
            WARC-Date: 2008-04-30T20:48:25Z\r\n\
            Content-Length: 400\r\n\
            \r\n";
        let header = WarcHeader::parse(data.as_bytes()).unwrap();

        assert_eq!(&header.version, "0.18");
        assert_eq!(header.warc_type(), Some("warcinfo"));
        assert_eq!(header.content_length().unwrap(), 400);

        let date = header.warc_date().unwrap();
        assert_eq!(date.to_rfc3339(), "2008-04-30T20:48:25+00:00");
    }

    #[test]
    fn test_header_not_warc() {
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

        assert!(WarcHeader::parse(data).is_err());
    }

    #[test]
    fn test_header_set_content_length() {
        let mut header = WarcHeader::empty();
        header.set_content_length(42);

        assert_eq!(header.content_length().unwrap(), 42);
    }

    #[test]
    fn test_header_content_length_errors() {
        let mut header = WarcHeader::empty();

        let error = header.content_length().unwrap_err();
        assert!(matches!(
            error.as_protocol().map(|e| e.kind()),
            Some(&ProtocolErrorKind::MissingContentLength)
        ));

        header.fields.set("Content-Length", "12b");
        assert!(header.content_length().unwrap_err().is_parse());
    }
}
