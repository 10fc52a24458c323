//! Content extraction from WARC files.
//!
//! This module maps archived URLs to safe filesystem paths and decodes
//! HTTP response bodies for casual viewing of the WARC contents.
use std::io::Read;

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use sha1::{Digest as _, Sha1};

use crate::{
    error::{GeneralError, ParseError, ProtocolError, ProtocolErrorKind},
    fields::Fields,
};

/// Returns the first 6 lowercase hex characters of the SHA-1 of the text.
///
/// Used both for index placeholders of empty path components and for
/// renaming files that block directory creation.
pub fn short_digest(text: &str) -> String {
    let digest = Sha1::digest(text.as_bytes());

    HEXLOWER.encode(digest.as_slice())[..6].to_string()
}

fn is_unsafe_filename_char(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

fn sanitize_component(component: &str) -> String {
    if component.is_empty() {
        return format!("_index_{}", short_digest(component));
    }

    component
        .chars()
        .map(|c| if is_unsafe_filename_char(c) { '_' } else { c })
        .collect()
}

/// Whether the raw (unparsed) URL path contains `.` or `..` segments.
///
/// WHATWG URL parsing resolves dot segments away, so they must be rejected
/// on the raw text before parsing.
fn has_dot_segments(url: &str) -> bool {
    let rest = url.splitn(2, "://").nth(1).unwrap_or(url);
    let path = rest
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    path.split('/').skip(1).any(|c| c == "." || c == "..")
}

/// Splits a URL into sanitized filename components.
///
/// The components are the authority followed by the path segments, with
/// the query string appended to the final segment. Unsafe filename
/// characters become `_`; an empty component becomes an index placeholder
/// derived from its SHA-1. URLs whose paths contain `.` or `..`
/// components are rejected.
pub fn split_url_to_filename(url: &str) -> Result<Vec<String>, GeneralError> {
    if has_dot_segments(url) {
        return Err(ProtocolError::new(ProtocolErrorKind::PathTraversal).into());
    }

    let parsed = url::Url::parse(url).map_err(ParseError::from)?;

    let mut netloc = parsed.host_str().unwrap_or_default().to_string();

    if let Some(port) = parsed.port() {
        netloc.push(':');
        netloc.push_str(&port.to_string());
    }

    let mut segments: Vec<String> = match parsed.path_segments() {
        Some(segments) => segments.map(str::to_string).collect(),
        None => vec![parsed.path().to_string()],
    };

    if let Some(query) = parsed.query() {
        match segments.last_mut() {
            Some(last) => {
                last.push('?');
                last.push_str(query);
            }
            None => segments.push(format!("?{}", query)),
        }
    }

    let mut components = vec![sanitize_component(&netloc)];
    components.extend(segments.iter().map(|s| sanitize_component(s)));

    Ok(components)
}

/// A parsed HTTP response message.
///
/// The input is the full raw content block bytes of a `response` record.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub fields: Fields,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn parse(input: &[u8]) -> Result<Self, GeneralError> {
        let mut header_buf = [httparse::EMPTY_HEADER; 64];
        let mut response = httparse::Response::new(&mut header_buf);

        let header_length = match response.parse(input) {
            Ok(httparse::Status::Complete(length)) => length,
            Ok(httparse::Status::Partial) => {
                return Err(
                    ProtocolError::new(ProtocolErrorKind::MalformedHttpMessage).into(),
                );
            }
            Err(error) => {
                return Err(ProtocolError::new(ProtocolErrorKind::MalformedHttpMessage)
                    .with_source(error)
                    .into());
            }
        };

        let status = response
            .code
            .ok_or_else(|| ProtocolError::new(ProtocolErrorKind::MalformedHttpMessage))?;
        let reason = response.reason.unwrap_or_default().to_string();

        let mut fields = Fields::new();

        for header in response.headers.iter() {
            fields.append(header.name, String::from_utf8_lossy(header.value));
        }

        Ok(Self {
            status,
            reason,
            fields,
            body: input[header_length..].to_vec(),
        })
    }

    /// The raw message body bytes, still transfer- and content-encoded.
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the message body, honoring `Transfer-Encoding: chunked` and
    /// then `Content-Encoding` (gzip or deflate).
    pub fn decode_body(&self) -> Result<Vec<u8>, GeneralError> {
        let body = match self.fields.get("Transfer-Encoding") {
            None => self.body.clone(),
            Some(value) if value.eq_ignore_ascii_case("identity") => self.body.clone(),
            Some(value) if value.eq_ignore_ascii_case("chunked") => decode_chunked(&self.body)?,
            Some(value) => {
                tracing::debug!(value, "unsupported transfer encoding");
                return Err(
                    ProtocolError::new(ProtocolErrorKind::UnsupportedTransferEncoding).into(),
                );
            }
        };

        match self.fields.get("Content-Encoding") {
            None => Ok(body),
            Some(value) if value.eq_ignore_ascii_case("identity") => Ok(body),
            Some(value)
                if value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("x-gzip") =>
            {
                let mut output = Vec::new();
                GzDecoder::new(body.as_slice()).read_to_end(&mut output)?;
                Ok(output)
            }
            Some(value) if value.eq_ignore_ascii_case("deflate") => {
                // served both as zlib-wrapped and raw deflate in the wild
                let mut output = Vec::new();

                match ZlibDecoder::new(body.as_slice()).read_to_end(&mut output) {
                    Ok(_) => Ok(output),
                    Err(_) => {
                        output.clear();
                        DeflateDecoder::new(body.as_slice()).read_to_end(&mut output)?;
                        Ok(output)
                    }
                }
            }
            Some(value) => {
                tracing::debug!(value, "unsupported content encoding");
                Err(ProtocolError::new(ProtocolErrorKind::UnsupportedContentEncoding).into())
            }
        }
    }

    /// Returns the `Last-Modified` date when present and well-formed.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        let value = self.fields.get("Last-Modified")?;

        DateTime::parse_from_rfc2822(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn chunked_error() -> GeneralError {
    ProtocolError::new(ProtocolErrorKind::InvalidChunkedEncoding).into()
}

/// Decodes a complete chunked transfer coding buffer. Trailer fields are
/// ignored.
fn decode_chunked(input: &[u8]) -> Result<Vec<u8>, GeneralError> {
    let mut output = Vec::new();
    let mut at = 0usize;

    loop {
        let line_end = input[at..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(chunked_error)?;

        let size_line = std::str::from_utf8(&input[at..at + line_end])
            .map_err(|_| chunked_error())?;
        // chunk extensions follow a ';'
        let size_text = size_line.split(';').next().unwrap_or_default().trim();
        let size =
            usize::from_str_radix(size_text, 16).map_err(|_| chunked_error())?;

        at += line_end + 2;

        if size == 0 {
            return Ok(output);
        }

        let data_end = at.checked_add(size).ok_or_else(chunked_error)?;

        if data_end.checked_add(2).map_or(true, |end| end > input.len()) {
            return Err(chunked_error());
        }

        output.extend_from_slice(&input[at..data_end]);

        if &input[data_end..data_end + 2] != b"\r\n" {
            return Err(chunked_error());
        }

        at = data_end + 2;
    }
}
