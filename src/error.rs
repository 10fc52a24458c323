//! Error representations
use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::Utf8Error,
    string::FromUtf8Error,
};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GeneralError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GeneralError {
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(..))
    }

    pub fn as_parse(&self) -> Option<&ParseError> {
        if let Self::Parse(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(..))
    }

    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        if let Self::Protocol(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(..))
    }

    pub fn as_io(&self) -> Option<&std::io::Error> {
        if let Self::Io(v) = self {
            Some(v)
        } else {
            None
        }
    }
}

/// Error for parsing.
#[derive(Debug, thiserror::Error)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Box<ParseContext>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            context: Default::default(),
            source: None,
        }
    }

    pub fn other(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::new(ParseErrorKind::Other).with_source(error)
    }

    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.context.file = Some(path.into());
        self
    }

    pub fn with_position(mut self, value: u64) -> Self {
        self.context.position = Some(value);
        self
    }

    pub fn with_snippet<S: Into<String>>(mut self, value: S) -> Self {
        self.context.snippet = Some(value.into());
        self
    }

    pub fn with_source<T: Into<Box<dyn std::error::Error + Send + Sync>>>(
        mut self,
        source: T,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn file(&self) -> Option<&Path> {
        self.context.file.as_deref()
    }

    pub fn position(&self) -> Option<u64> {
        self.context.position
    }

    pub fn snippet(&self) -> Option<&String> {
        self.context.snippet.as_ref()
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error: {}", self.kind)?;

        if let Some(file) = self.file() {
            write!(f, " file '{:?}'", file)?;
        }

        if let Some(position) = self.position() {
            write!(f, " position {}", position)?;
        }

        if let Some(snippet) = self.snippet() {
            write!(f, " near '{}'", snippet)?;
        }

        Ok(())
    }
}

impl<T: std::fmt::Debug> From<nom::Err<nom::error::Error<&[T]>>> for ParseError {
    fn from(value: nom::Err<nom::error::Error<&[T]>>) -> Self {
        match value {
            nom::Err::Incomplete(_needed) => ParseError::new(ParseErrorKind::IncompleteInput),
            nom::Err::Error(error) | nom::Err::Failure(error) => {
                ParseError::new(ParseErrorKind::Syntax)
                    .with_position(error.input.len() as u64)
                    .with_snippet(format!(
                        "{:?}",
                        &error.input[error.input.len().saturating_sub(10)..]
                    ))
                    .with_source(nom::error::Error::new(error.input.len(), error.code))
            }
        }
    }
}

impl From<FromUtf8Error> for ParseError {
    fn from(value: FromUtf8Error) -> Self {
        ParseError::new(ParseErrorKind::InvalidUtf8)
            .with_position(value.utf8_error().valid_up_to() as u64)
    }
}

impl From<Utf8Error> for ParseError {
    fn from(value: Utf8Error) -> Self {
        ParseError::new(ParseErrorKind::InvalidUtf8).with_position(value.valid_up_to() as u64)
    }
}

impl From<chrono::ParseError> for ParseError {
    fn from(value: chrono::ParseError) -> Self {
        ParseError::new(ParseErrorKind::Syntax).with_source(value)
    }
}

impl From<url::ParseError> for ParseError {
    fn from(value: url::ParseError) -> Self {
        ParseError::new(ParseErrorKind::Syntax).with_source(value)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    IncompleteInput,
    Syntax,
    InvalidUtf8,
    /// A header line that does not begin with "WARC".
    NotWarcHeader,
    /// A field line without a name-value deliminator.
    MalformedFieldLine,
    InvalidContentLength,
    Other,
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompleteInput => write!(f, "incomplete input"),
            Self::Syntax => write!(f, "syntax error"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
            Self::NotWarcHeader => write!(f, "not a WARC header"),
            Self::MalformedFieldLine => write!(f, "malformed field line"),
            Self::InvalidContentLength => write!(f, "invalid content length"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Default)]
struct ParseContext {
    file: Option<PathBuf>,
    position: Option<u64>,
    snippet: Option<String>,
}

/// Error for violations of the WARC and related formats.
#[derive(Debug, thiserror::Error)]
pub struct ProtocolError {
    kind: ProtocolErrorKind,
    position: Option<u64>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProtocolError {
    pub fn new(kind: ProtocolErrorKind) -> Self {
        Self {
            kind,
            position: None,
            source: None,
        }
    }

    pub fn other(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::new(ProtocolErrorKind::Other).with_source(error)
    }

    pub fn with_position(mut self, value: u64) -> Self {
        self.position = Some(value);
        self
    }

    pub fn with_source<T: Into<Box<dyn std::error::Error + Send + Sync>>>(
        mut self,
        source: T,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> &ProtocolErrorKind {
        &self.kind
    }

    pub fn position(&self) -> Option<u64> {
        self.position
    }
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "protocol error: {}", self.kind)?;

        if let Some(position) = self.position {
            write!(f, " position {}", position)?;
        }

        Ok(())
    }
}

impl From<ProtocolErrorKind> for ProtocolError {
    fn from(value: ProtocolErrorKind) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolErrorKind {
    /// Header deliminator not found within the permitted length.
    HeaderNotTerminated,
    /// The four bytes after a content block were not CR LF CR LF.
    InvalidRecordBoundary,
    MissingContentLength,
    PatternNotFound,
    UnsupportedDigest,
    InvalidBaseEncodedValue,
    UnsupportedTransferEncoding,
    UnsupportedContentEncoding,
    InvalidChunkedEncoding,
    MalformedHttpMessage,
    PathTraversal,
    Other,
}

impl Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Self::HeaderNotTerminated => "header not terminated",
            Self::InvalidRecordBoundary => "invalid record boundary",
            Self::MissingContentLength => "missing content length",
            Self::PatternNotFound => "pattern not found",
            Self::UnsupportedDigest => "unsupported digest",
            Self::InvalidBaseEncodedValue => "invalid base encoded value",
            Self::UnsupportedTransferEncoding => "unsupported transfer encoding",
            Self::UnsupportedContentEncoding => "unsupported content encoding",
            Self::InvalidChunkedEncoding => "invalid chunked encoding",
            Self::MalformedHttpMessage => "malformed HTTP message",
            Self::PathTraversal => "path traversal",
            Self::Other => "other",
        };

        f.write_str(value)
    }
}
