//! WARC conformance and integrity verification.
use std::{collections::HashSet, fmt::Display, str::FromStr};

use data_encoding::HEXLOWER;

use crate::{
    digest::{hash_range, Digest},
    error::GeneralError,
    record::Record,
};

const RECORD_TYPES_WITH_URI: &[&str] = &[
    "response",
    "resource",
    "request",
    "revisit",
    "conversion",
    "continuation",
];

/// Whether a problem is a clear violation or an advisory finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Major,
    Minor,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ProblemKind {
    RequiredFieldMissing(String),
    ProhibitedField(String),
    WhitespaceInField(String),
    DuplicateRecordId(String),
    BadDigestField(String),
    BlockDigestMismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },
    PayloadDigestMismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },
    MissingContentType,
    UnseenConcurrentTarget(String),
}

impl Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequiredFieldMissing(name) => write!(f, "required field missing: {}", name),
            Self::ProhibitedField(name) => write!(f, "prohibited field: {}", name),
            Self::WhitespaceInField(name) => write!(f, "whitespace in field: {}", name),
            Self::DuplicateRecordId(id) => write!(f, "duplicate record ID: {}", id),
            Self::BadDigestField(value) => write!(f, "bad digest field: {}", value),
            Self::BlockDigestMismatch {
                algorithm,
                expected,
                actual,
            } => write!(
                f,
                "block digest mismatch: {} expected {} actual {}",
                algorithm, expected, actual
            ),
            Self::PayloadDigestMismatch {
                algorithm,
                expected,
                actual,
            } => write!(
                f,
                "payload digest mismatch: {} expected {} actual {}",
                algorithm, expected, actual
            ),
            Self::MissingContentType => write!(f, "content type should be declared"),
            Self::UnseenConcurrentTarget(id) => {
                write!(f, "concurrent record not seen before this record: {}", id)
            }
        }
    }
}

/// A conformance problem found in a record.
#[derive(Debug, Clone)]
pub struct Problem {
    record_id: String,
    kind: ProblemKind,
    severity: Severity,
    section: Option<&'static str>,
}

impl Problem {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn kind(&self) -> &ProblemKind {
        &self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The ISO 28500 section the rule comes from, when applicable.
    pub fn section(&self) -> Option<&'static str> {
        self.section
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({}", self.record_id, self.kind, self.severity)?;

        if let Some(section) = self.section {
            write!(f, ", ISO 28500 \u{a7}{}", section)?;
        }

        write!(f, ")")
    }
}

/// Checks WARC records for specification conformance and integrity.
///
/// Problems are accumulated and never abort verification; I/O errors from
/// the underlying archive do propagate.
pub struct Verifier {
    seen_ids: HashSet<String>,
    problems: Vec<Problem>,
}

impl Verifier {
    pub fn new() -> Self {
        Self {
            seen_ids: HashSet::new(),
            problems: Vec::new(),
        }
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn problem_count(&self) -> usize {
        self.problems.len()
    }

    pub fn major_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|p| p.severity == Severity::Major)
            .count()
    }

    /// Forgets seen record IDs.
    ///
    /// ID uniqueness and reference ordering are scoped to one archive;
    /// call this between archives. Accumulated problems are kept.
    pub fn start_archive(&mut self) {
        self.seen_ids.clear();
    }

    /// Runs all checks against one record.
    pub fn check_record(&mut self, record: &Record) -> Result<(), GeneralError> {
        self.mandatory_fields(record);
        self.record_id(record);
        self.concurrent_to(record);
        self.refers_to(record);
        self.target_uri(record);
        self.filename(record);
        self.profile(record);
        self.segment(record);
        self.continuation_content_type(record);
        self.warcinfo_id(record);
        self.block_digest(record)?;
        self.payload_digest(record)?;

        if let Some(id) = record.record_id() {
            self.seen_ids.insert(id.to_string());
        }

        Ok(())
    }

    fn add_problem(
        &mut self,
        record: &Record,
        kind: ProblemKind,
        severity: Severity,
        section: Option<&'static str>,
    ) {
        let problem = Problem {
            record_id: record.header.fields.get_or_default("WARC-Record-ID").to_string(),
            kind,
            severity,
            section,
        };

        tracing::debug!(%problem, "verification problem");
        self.problems.push(problem);
    }

    fn require_field(
        &mut self,
        record: &Record,
        name: &str,
        section: Option<&'static str>,
    ) {
        if !record.header.fields.contains_name(name) {
            self.add_problem(
                record,
                ProblemKind::RequiredFieldMissing(name.to_string()),
                Severity::Major,
                section,
            );
        }
    }

    fn prohibit_field(
        &mut self,
        record: &Record,
        name: &str,
        section: Option<&'static str>,
    ) {
        if record.header.fields.contains_name(name) {
            self.add_problem(
                record,
                ProblemKind::ProhibitedField(name.to_string()),
                Severity::Major,
                section,
            );
        }
    }

    fn is_any_type(record: &Record, types: &[&str]) -> bool {
        types.contains(&record.header.fields.get_or_default("WARC-Type"))
    }

    fn mandatory_fields(&mut self, record: &Record) {
        for name in ["WARC-Record-ID", "Content-Length", "WARC-Date", "WARC-Type"] {
            self.require_field(record, name, None);
        }
    }

    fn record_id(&mut self, record: &Record) {
        let Some(id) = record.record_id() else {
            return;
        };

        if id.chars().any(char::is_whitespace) {
            self.add_problem(
                record,
                ProblemKind::WhitespaceInField("WARC-Record-ID".to_string()),
                Severity::Major,
                Some("5.2"),
            );
        }

        if self.seen_ids.contains(id) {
            self.add_problem(
                record,
                ProblemKind::DuplicateRecordId(id.to_string()),
                Severity::Major,
                None,
            );
        }
    }

    fn concurrent_to(&mut self, record: &Record) {
        if Self::is_any_type(record, &["warcinfo", "conversion", "continuation"]) {
            self.prohibit_field(record, "WARC-Concurrent-To", Some("5.7"));
            return;
        }

        let unseen: Vec<String> = record
            .header
            .fields
            .get_all("WARC-Concurrent-To")
            .filter(|target| !self.seen_ids.contains(*target))
            .map(str::to_string)
            .collect();

        for target in unseen {
            self.add_problem(
                record,
                ProblemKind::UnseenConcurrentTarget(target),
                Severity::Minor,
                None,
            );
        }
    }

    fn refers_to(&mut self, record: &Record) {
        if Self::is_any_type(record, &["warcinfo", "response", "request", "continuation"]) {
            self.prohibit_field(record, "WARC-Refers-To", Some("5.11"));
        }
    }

    fn target_uri(&mut self, record: &Record) {
        if Self::is_any_type(record, RECORD_TYPES_WITH_URI) {
            self.require_field(record, "WARC-Target-URI", Some("5.12"));
        }

        if let Some(uri) = record.header.fields.get("WARC-Target-URI") {
            if uri.chars().any(char::is_whitespace) {
                self.add_problem(
                    record,
                    ProblemKind::WhitespaceInField("WARC-Target-URI".to_string()),
                    Severity::Major,
                    Some("5.12"),
                );
            }
        }
    }

    fn filename(&mut self, record: &Record) {
        if !Self::is_any_type(record, &["warcinfo"]) {
            self.prohibit_field(record, "WARC-Filename", Some("5.15"));
        }
    }

    fn profile(&mut self, record: &Record) {
        if Self::is_any_type(record, &["revisit"]) {
            self.require_field(record, "WARC-Profile", Some("5.16"));
        }
    }

    fn segment(&mut self, record: &Record) {
        if Self::is_any_type(record, &["continuation"]) {
            self.require_field(record, "WARC-Segment-Origin-ID", Some("5.19"));
            self.require_field(record, "WARC-Segment-Total-Length", Some("5.20"));
        } else {
            self.prohibit_field(record, "WARC-Segment-Origin-ID", Some("5.19"));
            self.prohibit_field(record, "WARC-Segment-Total-Length", Some("5.20"));
        }
    }

    fn continuation_content_type(&mut self, record: &Record) {
        if !Self::is_any_type(record, &["continuation"]) {
            return;
        }

        let length = match record.header.fields.get_u64("Content-Length") {
            Some(Ok(value)) => value,
            _ => return,
        };

        if length > 0 && !record.header.fields.contains_name("Content-Type") {
            self.add_problem(
                record,
                ProblemKind::MissingContentType,
                Severity::Minor,
                Some("5.6"),
            );
        }
    }

    fn warcinfo_id(&mut self, record: &Record) {
        if Self::is_any_type(record, &["warcinfo"]) {
            self.prohibit_field(record, "WARC-Warcinfo-ID", Some("5.14"));
        }
    }

    fn block_digest(&mut self, record: &Record) -> Result<(), GeneralError> {
        let values: Vec<String> = record
            .header
            .fields
            .get_all("WARC-Block-Digest")
            .map(str::to_string)
            .collect();

        for value in values {
            let digest = match Digest::from_str(&value) {
                Ok(digest) => digest,
                Err(_error) => {
                    self.add_problem(
                        record,
                        ProblemKind::BadDigestField(value),
                        Severity::Major,
                        Some("5.8"),
                    );
                    continue;
                }
            };

            let Some(block) = &record.block else {
                continue;
            };

            let actual = hash_range(digest.algorithm(), block.binary_range())?;

            if actual != digest.value() {
                self.add_problem(
                    record,
                    ProblemKind::BlockDigestMismatch {
                        algorithm: digest.algorithm().to_string(),
                        expected: HEXLOWER.encode(digest.value()),
                        actual: HEXLOWER.encode(&actual),
                    },
                    Severity::Major,
                    Some("5.8"),
                );
            }
        }

        Ok(())
    }

    fn payload_digest(&mut self, record: &Record) -> Result<(), GeneralError> {
        let values: Vec<String> = record
            .header
            .fields
            .get_all("WARC-Payload-Digest")
            .map(str::to_string)
            .collect();

        for value in values {
            let digest = match Digest::from_str(&value) {
                Ok(digest) => digest,
                Err(_error) => {
                    self.add_problem(
                        record,
                        ProblemKind::BadDigestField(value),
                        Severity::Major,
                        Some("5.9"),
                    );
                    continue;
                }
            };

            // a block read as opaque bytes has no payload to hash
            let Some(payload) = record.block.as_ref().and_then(|b| b.payload_range()) else {
                continue;
            };

            let actual = hash_range(digest.algorithm(), payload)?;

            if actual != digest.value() {
                self.add_problem(
                    record,
                    ProblemKind::PayloadDigestMismatch {
                        algorithm: digest.algorithm().to_string(),
                        expected: HEXLOWER.encode(digest.value()),
                        actual: HEXLOWER.encode(&actual),
                    },
                    Severity::Major,
                    Some("5.9"),
                );
            }
        }

        Ok(())
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        range::{ByteSource, SharedStream},
        record::Record,
    };

    use super::*;

    fn read_single(data: &[u8]) -> Record {
        let shared = SharedStream::new(Cursor::new(data.to_vec()));
        let source = ByteSource::Stream(shared.clone());
        let mut guard = shared.lock();

        Record::read(&mut **guard, &source, false).unwrap()
    }

    fn record_with(extra_fields: &str, warc_type: &str) -> Record {
        let body = "x";
        let data = format!(
            "WARC/1.0\r\n\
            WARC-Type: {}\r\n\
            WARC-Record-ID: <urn:test:1>\r\n\
            WARC-Date: 2013-02-12T00:00:00Z\r\n\
            {}Content-Length: {}\r\n\
            \r\n\
            {}\r\n\r\n",
            warc_type,
            extra_fields,
            body.len(),
            body
        );

        read_single(data.as_bytes())
    }

    #[test]
    fn test_clean_record() {
        let record = record_with("WARC-Target-URI: urn:example:a\r\n", "resource");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert_eq!(verifier.problem_count(), 0);
    }

    #[test]
    fn test_mandatory_fields() {
        let record = read_single(b"WARC/1.0\r\nContent-Length: 0\r\n\r\n\r\n\r\n");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        let missing: Vec<_> = verifier
            .problems()
            .iter()
            .filter(|p| matches!(p.kind(), ProblemKind::RequiredFieldMissing(_)))
            .collect();

        assert_eq!(missing.len(), 3);
    }

    #[test]
    fn test_record_id_whitespace() {
        let data = b"WARC/1.0\r\n\
            WARC-Type: metadata\r\n\
            WARC-Record-ID: <urn:test:1 2>\r\n\
            WARC-Date: 2013-02-12T00:00:00Z\r\n\
            Content-Length: 0\r\n\
            \r\n\
            \r\n\r\n";
        let record = read_single(data);
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier
            .problems()
            .iter()
            .any(|p| matches!(p.kind(), ProblemKind::WhitespaceInField(n) if n == "WARC-Record-ID")));
    }

    #[test]
    fn test_duplicate_record_id() {
        let record = record_with("WARC-Target-URI: urn:example:a\r\n", "resource");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();
        verifier.check_record(&record).unwrap();

        assert_eq!(verifier.problem_count(), 1);
        assert!(matches!(
            verifier.problems()[0].kind(),
            ProblemKind::DuplicateRecordId(_)
        ));

        // a new archive starts a fresh ID scope
        verifier.start_archive();
        verifier.check_record(&record).unwrap();
        assert_eq!(verifier.problem_count(), 1);
    }

    #[test]
    fn test_concurrent_to_rules() {
        let record = record_with("WARC-Concurrent-To: <urn:test:0>\r\n", "warcinfo");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(matches!(
            verifier.problems()[0].kind(),
            ProblemKind::ProhibitedField(n) if n == "WARC-Concurrent-To"
        ));
        assert_eq!(verifier.problems()[0].section(), Some("5.7"));

        let record = record_with(
            "WARC-Concurrent-To: <urn:test:0>\r\nWARC-Target-URI: urn:example:a\r\n",
            "request",
        );
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(matches!(
            verifier.problems()[0].kind(),
            ProblemKind::UnseenConcurrentTarget(_)
        ));
        assert_eq!(verifier.problems()[0].severity(), Severity::Minor);
    }

    #[test]
    fn test_refers_to_prohibited() {
        let record = record_with(
            "WARC-Refers-To: <urn:test:0>\r\nWARC-Target-URI: urn:example:a\r\n",
            "response",
        );
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier
            .problems()
            .iter()
            .any(|p| matches!(p.kind(), ProblemKind::ProhibitedField(n) if n == "WARC-Refers-To")));
    }

    #[test]
    fn test_target_uri_required_and_whitespace() {
        let record = record_with("", "response");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier.problems().iter().any(
            |p| matches!(p.kind(), ProblemKind::RequiredFieldMissing(n) if n == "WARC-Target-URI")
        ));

        let record = record_with("WARC-Target-URI: urn:example:a b\r\n", "resource");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier.problems().iter().any(
            |p| matches!(p.kind(), ProblemKind::WhitespaceInField(n) if n == "WARC-Target-URI")
        ));
    }

    #[test]
    fn test_filename_only_on_warcinfo() {
        let record = record_with("WARC-Filename: crawl.warc\r\n", "metadata");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier
            .problems()
            .iter()
            .any(|p| matches!(p.kind(), ProblemKind::ProhibitedField(n) if n == "WARC-Filename")));

        let record = record_with("WARC-Filename: crawl.warc\r\n", "warcinfo");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert_eq!(verifier.problem_count(), 0);
    }

    #[test]
    fn test_revisit_requires_profile() {
        let record = record_with("WARC-Target-URI: urn:example:a\r\n", "revisit");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier
            .problems()
            .iter()
            .any(|p| matches!(p.kind(), ProblemKind::RequiredFieldMissing(n) if n == "WARC-Profile")));
    }

    #[test]
    fn test_segment_rules() {
        let record = record_with("WARC-Target-URI: urn:example:a\r\n", "continuation");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        let missing: Vec<_> = verifier
            .problems()
            .iter()
            .filter(|p| matches!(p.kind(), ProblemKind::RequiredFieldMissing(_)))
            .collect();

        assert_eq!(missing.len(), 2);

        let record = record_with("WARC-Segment-Origin-ID: <urn:test:0>\r\n", "metadata");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier.problems().iter().any(
            |p| matches!(p.kind(), ProblemKind::ProhibitedField(n) if n == "WARC-Segment-Origin-ID")
        ));
    }

    #[test]
    fn test_continuation_content_type() {
        let record = record_with(
            "WARC-Target-URI: urn:example:a\r\n\
            WARC-Segment-Origin-ID: <urn:test:0>\r\n\
            WARC-Segment-Total-Length: 100\r\n",
            "continuation",
        );
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        let minor: Vec<_> = verifier
            .problems()
            .iter()
            .filter(|p| matches!(p.kind(), ProblemKind::MissingContentType))
            .collect();

        assert_eq!(minor.len(), 1);
        assert_eq!(minor[0].severity(), Severity::Minor);
    }

    #[test]
    fn test_warcinfo_id_prohibited_on_warcinfo() {
        let record = record_with("WARC-Warcinfo-ID: <urn:test:0>\r\n", "warcinfo");
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier.problems().iter().any(
            |p| matches!(p.kind(), ProblemKind::ProhibitedField(n) if n == "WARC-Warcinfo-ID")
        ));

        let record = record_with(
            "WARC-Warcinfo-ID: <urn:test:0>\r\nWARC-Target-URI: urn:example:a\r\n",
            "resource",
        );
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert_eq!(verifier.problem_count(), 0);
    }

    #[test]
    fn test_digest_problems() {
        let record = record_with(
            "WARC-Target-URI: urn:example:a\r\n\
            WARC-Block-Digest: nonsense\r\n",
            "resource",
        );
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier
            .problems()
            .iter()
            .any(|p| matches!(p.kind(), ProblemKind::BadDigestField(_))));

        // sha1 of "y" declared over a block containing "x"
        let record = record_with(
            "WARC-Target-URI: urn:example:a\r\n\
            WARC-Block-Digest: sha1:95cb0bfd2977c761298d9624e4b4d4c72a39974a\r\n",
            "resource",
        );
        let mut verifier = Verifier::new();

        verifier.check_record(&record).unwrap();

        assert!(verifier
            .problems()
            .iter()
            .any(|p| matches!(p.kind(), ProblemKind::BlockDigestMismatch { .. })));
    }
}
