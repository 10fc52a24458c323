//! Deterministic WARC content for the integration tests.
use rand::RngCore;
use rand_xoshiro::{rand_core::SeedableRng, Xoshiro256PlusPlus};

use warckit::digest::{AlgorithmName, Digest, Hasher};

pub const WARC_DATE: &str = "2013-02-12T03:01:20Z";

pub fn digest_field(algorithm: AlgorithmName, data: &[u8]) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);

    Digest::new(algorithm, hasher.finish()).to_string()
}

/// Serializes one complete record: header, block, record separator.
pub fn record_bytes(
    warc_type: &str,
    id: &str,
    extra_fields: &[(&str, &str)],
    content_type: Option<&str>,
    block: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(b"WARC/1.0\r\n");
    buf.extend_from_slice(format!("WARC-Type: {}\r\n", warc_type).as_bytes());
    buf.extend_from_slice(format!("WARC-Record-ID: {}\r\n", id).as_bytes());
    buf.extend_from_slice(format!("WARC-Date: {}\r\n", WARC_DATE).as_bytes());

    for (name, value) in extra_fields {
        buf.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }

    if let Some(content_type) = content_type {
        buf.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }

    buf.extend_from_slice(format!("Content-Length: {}\r\n", block.len()).as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(block);
    buf.extend_from_slice(b"\r\n\r\n");

    buf
}

/// An HTTP response message block with a computed Content-Length header.
pub fn http_response_block(headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut buf = b"HTTP/1.1 200 OK\r\n".to_vec();

    for (name, value) in headers {
        buf.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }

    buf.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(body);

    buf
}

fn http_response_record(number: u32, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let block = http_response_block(headers, body);

    record_bytes(
        "response",
        &format!("<urn:test:record-{}>", number),
        &[
            ("WARC-Target-URI", url),
            (
                "WARC-Block-Digest",
                &digest_field(AlgorithmName::Sha1, &block),
            ),
            (
                "WARC-Payload-Digest",
                &digest_field(AlgorithmName::Sha1, body),
            ),
        ],
        Some("application/http; msgtype=response"),
        &block,
    )
}

/// Generates an eight-record archive exercising every block flavor.
///
/// The records carry correct digests, so verification reports no
/// problems.
pub fn generate_archive() -> Vec<u8> {
    let mut archive = Vec::new();

    let info_block = b"software: warckit/0.1\r\nformat: WARC File Format 1.0\r\n\r\n".to_vec();
    archive.extend_from_slice(&record_bytes(
        "warcinfo",
        "<urn:test:record-0>",
        &[("WARC-Filename", "at.warc")],
        Some("application/warc-fields"),
        &info_block,
    ));

    archive.extend_from_slice(&http_response_record(
        1,
        "http://example.com/",
        &[
            ("Content-Type", "text/html"),
            ("Last-Modified", "Wed, 01 Jan 2020 00:00:00 GMT"),
        ],
        b"<html><body>front page</body></html>",
    ));

    let request_block = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec();
    archive.extend_from_slice(&record_bytes(
        "request",
        "<urn:test:record-2>",
        &[
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Concurrent-To", "<urn:test:record-1>"),
        ],
        Some("application/http; msgtype=request"),
        &request_block,
    ));

    archive.extend_from_slice(&http_response_record(
        3,
        "http://example.com/assets",
        &[("Content-Type", "text/plain")],
        b"assets listing",
    ));

    archive.extend_from_slice(&http_response_record(
        4,
        "http://example.com/assets/logo.png",
        &[("Content-Type", "image/png")],
        b"\x89PNG not really",
    ));

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(1234567);
    let mut resource_data = vec![0u8; 4096];
    rng.fill_bytes(&mut resource_data);

    archive.extend_from_slice(&record_bytes(
        "resource",
        "<urn:test:record-5>",
        &[
            ("WARC-Target-URI", "urn:example:resource"),
            (
                "WARC-Block-Digest",
                &digest_field(AlgorithmName::Sha1, &resource_data),
            ),
        ],
        None,
        &resource_data,
    ));

    let metadata_block = b"fetchTimeMs: 337\r\n".to_vec();
    archive.extend_from_slice(&record_bytes(
        "metadata",
        "<urn:test:record-6>",
        &[("WARC-Target-URI", "http://example.com/")],
        Some("application/warc-fields"),
        &metadata_block,
    ));

    archive.extend_from_slice(&http_response_record(
        7,
        "http://example.com/index.php?article=Main_Page",
        &[("Content-Type", "text/html")],
        b"<html><body>article</body></html>",
    ));

    archive
}

/// [`generate_archive`] plus a ninth record whose block digest does not
/// match its content.
pub fn generate_archive_with_bad_digest() -> Vec<u8> {
    let mut archive = generate_archive();

    archive.extend_from_slice(&record_bytes(
        "resource",
        "<urn:test:record-8>",
        &[
            ("WARC-Target-URI", "urn:example:broken"),
            (
                "WARC-Block-Digest",
                &digest_field(AlgorithmName::Sha1, b"different content"),
            ),
        ],
        None,
        b"actual content",
    ));

    archive
}
