//! WARC and HTTP-style name-value field lists
use std::io::Write;

use crate::error::{ParseError, ParseErrorKind};

/// Data structure for name-value field lines.
///
/// This is an insertion-ordered multimap where names are ASCII
/// case-insensitive. Duplicate names are preserved.
///
/// No validation is performed on whether the names or values are valid
/// field tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pairs: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear()
    }

    /// Appends a name-value pair to the end of the list.
    pub fn append<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Assigns a value to a name as a mutable mapping.
    ///
    /// All other occurrences of the name are removed and the new pair takes
    /// the position of the first removed occurrence. If the name was not
    /// present, the pair is appended.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();

        match self.index_of(&name) {
            Some(index) => {
                self.remove(&name);
                self.pairs.insert(index, (name, value.into()));
            }
            None => self.pairs.push((name, value.into())),
        }
    }

    /// Removes all occurrences of the name.
    pub fn remove(&mut self, name: &str) {
        self.pairs
            .retain(|(n, _v)| !n.eq_ignore_ascii_case(name));
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.pairs
            .iter()
            .any(|(n, _v)| n.eq_ignore_ascii_case(name))
    }

    /// Returns the value of the first occurrence of the name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _v)| n.eq_ignore_ascii_case(name))
            .map(|(_n, v)| v.as_str())
    }

    /// Returns the value if the name is present, otherwise an empty string.
    pub fn get_or_default(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// Returns the values of all occurrences of the name in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter_map(move |(n, v)| {
            if n.eq_ignore_ascii_case(name) {
                Some(v.as_str())
            } else {
                None
            }
        })
    }

    /// Returns the index of the first occurrence of the name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.pairs
            .iter()
            .position(|(n, _v)| n.eq_ignore_ascii_case(name))
    }

    pub fn count(&self, name: &str) -> usize {
        self.get_all(name).count()
    }

    pub fn get_u64(&self, name: &str) -> Option<Result<u64, std::num::ParseIntError>> {
        self.get(name).map(crate::parse::parse_u64_strict)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses named field lines.
    ///
    /// Lines are deliminated by CR LF. A value is stripped of leading
    /// whitespace. Continuation lines beginning with a space or tab are
    /// joined to the previous value with their first character removed.
    /// A blank line terminates parsing.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut fields = Fields::new();
        let mut lines = input.split("\r\n").peekable();

        while let Some(line) = lines.next() {
            if line.is_empty() {
                break;
            }

            let (name, value) = line.split_once(':').ok_or_else(|| {
                ParseError::new(ParseErrorKind::MalformedFieldLine)
                    .with_snippet(line.chars().take(32).collect::<String>())
            })?;

            let mut value = value.trim_start().to_string();

            while let Some(next) = lines.peek() {
                if next.starts_with(' ') || next.starts_with('\t') {
                    value.push_str(&next[1..]);
                    lines.next();
                } else {
                    break;
                }
            }

            fields.append(name, value);
        }

        Ok(fields)
    }

    /// Writes the fields as serialized lines.
    ///
    /// No continuation lines are produced.
    pub fn serialize<W: Write>(&self, mut buf: W) -> std::io::Result<()> {
        for (name, value) in &self.pairs {
            buf.write_all(name.as_bytes())?;

            if value.is_empty() {
                buf.write_all(b":\r\n")?;
            } else {
                buf.write_all(b": ")?;
                buf.write_all(value.as_bytes())?;
                buf.write_all(b"\r\n")?;
            }
        }

        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Fields {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

/// [`Fields`] prefixed with a HTTP status or request line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeader {
    /// The start line such as "HTTP/1.1 200 OK".
    pub status: String,
    pub fields: Fields,
}

impl HttpHeader {
    pub fn new<S: Into<String>>(status: S) -> Self {
        Self {
            status: status.into(),
            fields: Fields::new(),
        }
    }

    /// Returns the numeric status code, the second whitespace-deliminated
    /// token of the status line.
    pub fn status_code(&self) -> Result<u16, ParseError> {
        let token = self
            .status
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| {
                ParseError::new(ParseErrorKind::Syntax).with_snippet(self.status.as_str())
            })?;

        token
            .parse()
            .map_err(|e| ParseError::new(ParseErrorKind::Syntax).with_source(e))
    }

    /// Parses a status line followed by named field lines.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let (status, remain) = input.split_once("\r\n").ok_or_else(|| {
            ParseError::new(ParseErrorKind::IncompleteInput)
                .with_snippet(input.chars().take(32).collect::<String>())
        })?;

        Ok(Self {
            status: status.to_string(),
            fields: Fields::parse(remain)?,
        })
    }

    pub fn serialize<W: Write>(&self, mut buf: W) -> std::io::Result<()> {
        buf.write_all(self.status.as_bytes())?;
        buf.write_all(b"\r\n")?;
        self.fields.serialize(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_create() {
        let mut f = Fields::from_iter([("n1", "v1")]);

        assert!(!f.is_empty());
        assert_eq!(f.len(), 1);
        assert!(f.contains_name("n1"));
        assert_eq!(f.get("n1"), Some("v1"));

        f.clear();

        assert!(f.is_empty());
        assert_eq!(f.get("n1"), None);
    }

    #[test]
    fn test_fields_case_insensitive() {
        let f = Fields::from_iter([("Animal", "kitten"), ("ANIMAL", "puppy")]);

        assert_eq!(f.get("animal"), Some("kitten"));
        assert_eq!(f.get("aNiMaL"), f.get("ANIMAL"));
        assert_eq!(f.count("animal"), 2);
    }

    #[test]
    fn test_fields_set_replaces_at_first_occurrence() {
        let mut f = Fields::new();
        f.append("My-Name", "a");
        f.set("Animal", "kitten");
        f.append("my-name", "b");

        assert_eq!(f.count("my-name"), 2);
        assert_eq!(f.get("my-name"), Some("a"));

        f.set("my-name", "c");

        assert_eq!(f.count("my-name"), 1);
        assert_eq!(
            f.iter().collect::<Vec<_>>(),
            vec![("my-name", "c"), ("Animal", "kitten")]
        );
    }

    #[test]
    fn test_fields_parse_duplicates_in_order() {
        let f = Fields::parse("n1: v1\r\nn2: v2-0\r\nn2: v2-1\r\n").unwrap();

        assert_eq!(
            f.iter().collect::<Vec<_>>(),
            vec![("n1", "v1"), ("n2", "v2-0"), ("n2", "v2-1")]
        );
    }

    #[test]
    fn test_fields_parse_folding() {
        let input = "WARC-Type: response\r\n\
            Multiline: The quick brown fox\r\n \
            jumps\r\n\
            \tover\n   the lazy dog.\r\n\
            Content-LENGTH: 10\r\n";
        let f = Fields::parse(input).unwrap();

        assert_eq!(f.get("warc-type"), Some("response"));
        assert_eq!(
            f.get("multiline"),
            Some("The quick brown foxjumpsover\n   the lazy dog.")
        );
        assert_eq!(f.get("content-length"), Some("10"));
    }

    #[test]
    fn test_fields_parse_keeps_trailing_whitespace() {
        let f = Fields::parse("Non-ASCII:    \u{f0}\u{eb}ARCHIVE#:>\u{de}   \r\n").unwrap();

        assert_eq!(f.get("non-ascii"), Some("\u{f0}\u{eb}ARCHIVE#:>\u{de}   "));
    }

    #[test]
    fn test_fields_parse_malformed_line() {
        assert!(Fields::parse("no deliminator here\r\n").is_err());
    }

    #[test]
    fn test_fields_parse_blank_line_terminates() {
        let f = Fields::parse("n1: v1\r\n\r\nn2: v2\r\n").unwrap();

        assert_eq!(f.len(), 1);
    }

    #[test]
    fn test_fields_serialize() {
        let f = Fields::from_iter([("n1", "v1"), ("n2", "")]);
        let mut buf = Vec::new();

        f.serialize(&mut buf).unwrap();

        assert_eq!(&buf, b"n1: v1\r\nn2:\r\n");
    }

    #[test]
    fn test_fields_parse_serialize_preserves_order() {
        let input = "b: 2\r\na: 1\r\nb: 3\r\n";
        let f = Fields::parse(input).unwrap();
        let mut buf = Vec::new();

        f.serialize(&mut buf).unwrap();

        assert_eq!(buf, input.as_bytes());
    }

    #[test]
    fn test_http_header() {
        let h = HttpHeader::parse(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\n",
        )
        .unwrap();

        assert_eq!(h.status, "HTTP/1.1 200 OK");
        assert_eq!(h.status_code().unwrap(), 200);
        assert_eq!(h.fields.get("content-type"), Some("text/html"));

        let mut buf = Vec::new();
        h.serialize(&mut buf).unwrap();

        assert!(buf.starts_with(b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n"));
    }

    #[test]
    fn test_http_header_bad_status() {
        let h = HttpHeader::new("HTTP/1.1");

        assert!(h.status_code().is_err());
    }
}
