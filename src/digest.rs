//! WARC related hashing functions.
use std::{fmt::Display, io::Read, str::FromStr};

use data_encoding::{BASE32, BASE64, HEXLOWER, HEXLOWER_PERMISSIVE};
use digest::Digest as _;

use crate::{
    error::{GeneralError, ProtocolError, ProtocolErrorKind},
    range::ByteRange,
    record::Record,
};

/// Name of a standardized hashing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AlgorithmName {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl AlgorithmName {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// The digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl Display for AlgorithmName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.to_ascii_lowercase();
        let label = remove_compatibility_label(&label);

        match label {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),

            _ => Err(ProtocolError::new(ProtocolErrorKind::UnsupportedDigest)),
        }
    }
}

fn remove_compatibility_label(label: &str) -> &str {
    match label {
        "sha-1" => "sha1",
        "sha-224" => "sha224",
        "sha-256" => "sha256",
        "sha-384" => "sha384",
        "sha-512" => "sha512",
        _ => label,
    }
}

/// Data structure for a hash digest value and the algorithm that produced it.
///
/// Corresponds to the `algorithm:encoded-digest` format of the
/// `WARC-Block-Digest` and `WARC-Payload-Digest` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    algorithm: AlgorithmName,
    value: Vec<u8>,
}

impl Digest {
    pub fn new(algorithm: AlgorithmName, value: Vec<u8>) -> Self {
        Self { algorithm, value }
    }

    pub fn algorithm(&self) -> AlgorithmName {
        self.algorithm
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl FromStr for Digest {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, encoded) = s.split_once(':').unwrap_or((s, ""));
        let algorithm: AlgorithmName = label.parse()?;
        let value = decode_value(algorithm.output_len(), encoded)?;

        Ok(Self { algorithm, value })
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.algorithm {
            AlgorithmName::Sha1 => write!(
                f,
                "{}:{}",
                self.algorithm.as_str(),
                BASE32.encode(&self.value)
            ),
            _ => write!(
                f,
                "{}:{}",
                self.algorithm.as_str(),
                HEXLOWER.encode(&self.value)
            ),
        }
    }
}

/// Decodes an encoded digest value.
///
/// Base64, base32, and base16 are tried in order; the first decoding that
/// succeeds with the algorithm's expected digest length is accepted.
fn decode_value(expected_len: usize, value: &str) -> Result<Vec<u8>, ProtocolError> {
    if let Ok(decoded) = BASE64.decode(value.as_bytes()) {
        if decoded.len() == expected_len {
            return Ok(decoded);
        }
    }

    if let Ok(decoded) = BASE32.decode(value.to_ascii_uppercase().as_bytes()) {
        if decoded.len() == expected_len {
            return Ok(decoded);
        }
    }

    if let Ok(decoded) = HEXLOWER_PERMISSIVE.decode(value.as_bytes()) {
        if decoded.len() == expected_len {
            return Ok(decoded);
        }
    }

    Err(ProtocolError::new(
        ProtocolErrorKind::InvalidBaseEncodedValue,
    ))
}

enum HasherImpl {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha224(sha2::Sha224),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
}

impl HasherImpl {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(digest) => digest.update(data),
            Self::Sha1(digest) => digest.update(data),
            Self::Sha224(digest) => digest.update(data),
            Self::Sha256(digest) => digest.update(data),
            Self::Sha384(digest) => digest.update(data),
            Self::Sha512(digest) => digest.update(data),
        }
    }

    fn finish(self) -> Vec<u8> {
        match self {
            Self::Md5(digest) => digest.finalize().to_vec(),
            Self::Sha1(digest) => digest.finalize().to_vec(),
            Self::Sha224(digest) => digest.finalize().to_vec(),
            Self::Sha256(digest) => digest.finalize().to_vec(),
            Self::Sha384(digest) => digest.finalize().to_vec(),
            Self::Sha512(digest) => digest.finalize().to_vec(),
        }
    }
}

/// Hashing function abstraction.
pub struct Hasher {
    algorithm: AlgorithmName,
    inner: HasherImpl,
}

impl Hasher {
    pub fn new(algorithm: AlgorithmName) -> Self {
        let inner = Self::make_impl(algorithm);

        Self { algorithm, inner }
    }

    fn make_impl(algorithm: AlgorithmName) -> HasherImpl {
        match &algorithm {
            AlgorithmName::Md5 => HasherImpl::Md5(md5::Md5::new()),
            AlgorithmName::Sha1 => HasherImpl::Sha1(sha1::Sha1::new()),
            AlgorithmName::Sha224 => HasherImpl::Sha224(sha2::Sha224::new()),
            AlgorithmName::Sha256 => HasherImpl::Sha256(sha2::Sha256::new()),
            AlgorithmName::Sha384 => HasherImpl::Sha384(sha2::Sha384::new()),
            AlgorithmName::Sha512 => HasherImpl::Sha512(sha2::Sha512::new()),
        }
    }

    pub fn algorithm(&self) -> AlgorithmName {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finish(&mut self) -> Vec<u8> {
        let inner = std::mem::replace(&mut self.inner, Self::make_impl(self.algorithm));

        inner.finish()
    }
}

/// Hashes the bytes of a byte range.
pub fn hash_range(algorithm: AlgorithmName, range: &ByteRange) -> Result<Vec<u8>, GeneralError> {
    let mut hasher = Hasher::new(algorithm);
    let mut reader = range.open()?;
    let mut buf = [0u8; 4096];

    loop {
        let length = reader.read(&mut buf)?;

        if length == 0 {
            break;
        }

        hasher.update(&buf[..length]);
    }

    Ok(hasher.finish())
}

/// Verifies the `WARC-Block-Digest` of a record.
///
/// The digest is computed over the block's raw file bytes (the binary view
/// for field-structured blocks). `None` is returned when the record has no
/// digest field or no block.
pub fn verify_block_digest(record: &Record) -> Result<Option<bool>, GeneralError> {
    let Some(value) = record.header.fields.get("WARC-Block-Digest") else {
        return Ok(None);
    };
    let Some(block) = &record.block else {
        return Ok(None);
    };

    let digest = Digest::from_str(value)?;
    let actual = hash_range(digest.algorithm(), block.binary_range())?;

    Ok(Some(actual == digest.value))
}

/// Verifies the `WARC-Payload-Digest` of a record.
///
/// The digest is computed over exactly the payload byte range. `None` is
/// returned when the record has no digest field or the block has no
/// parsed payload.
pub fn verify_payload_digest(record: &Record) -> Result<Option<bool>, GeneralError> {
    let Some(value) = record.header.fields.get("WARC-Payload-Digest") else {
        return Ok(None);
    };
    let Some(payload) = record.block.as_ref().and_then(|b| b.payload_range()) else {
        return Ok(None);
    };

    let digest = Digest::from_str(value)?;
    let actual = hash_range(digest.algorithm(), payload)?;

    Ok(Some(actual == digest.value))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::range::{ByteSource, SharedStream};

    use super::*;

    #[test]
    fn test_parse_md5() {
        let digest = Digest::from_str("md5:b1946ac92492d2347c6235b4d2611184").unwrap();
        assert_eq!(digest.algorithm, AlgorithmName::Md5);
        assert_eq!(
            &digest.value,
            b"\xb1\x94j\xc9$\x92\xd24|b5\xb4\xd2a\x11\x84"
        );

        let digest = Digest::from_str("MD5:WGKGVSJESLJDI7DCGW2NEYIRQQ======").unwrap();
        assert_eq!(digest.algorithm, AlgorithmName::Md5);
        assert_eq!(
            &digest.value,
            b"\xb1\x94j\xc9$\x92\xd24|b5\xb4\xd2a\x11\x84"
        );
    }

    #[test]
    fn test_parse_sha1() {
        let digest = Digest::from_str("Sha-1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N").unwrap();
        assert_eq!(digest.algorithm, AlgorithmName::Sha1);
        assert_eq!(
            &digest.value,
            b"\xaa\xf4\xc6\x1d\xdc\xc5\xe8\xa2\xda\xbe\xde\x0f;H,\xd9\xae\xa9CM"
        );

        let digest = Digest::from_str("sha1:aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d").unwrap();
        assert_eq!(digest.algorithm, AlgorithmName::Sha1);
        assert_eq!(
            &digest.value,
            b"\xaa\xf4\xc6\x1d\xdc\xc5\xe8\xa2\xda\xbe\xde\x0f;H,\xd9\xae\xa9CM"
        );
    }

    #[test]
    fn test_parse_base64() {
        let digest = Digest::from_str("sha1:qvTGHdzF6KLavt4PO0gs2a6pQ00=").unwrap();

        assert_eq!(digest.algorithm, AlgorithmName::Sha1);
        assert_eq!(
            &digest.value,
            b"\xaa\xf4\xc6\x1d\xdc\xc5\xe8\xa2\xda\xbe\xde\x0f;H,\xd9\xae\xa9CM"
        );
    }

    #[test]
    fn test_parse_unknown_algorithm() {
        let error = Digest::from_str("whirlpool:00").unwrap_err();

        assert_eq!(*error.kind(), ProtocolErrorKind::UnsupportedDigest);
    }

    #[test]
    fn test_parse_bad_value() {
        let error = Digest::from_str("sha1:zz!!").unwrap_err();

        assert_eq!(*error.kind(), ProtocolErrorKind::InvalidBaseEncodedValue);
    }

    #[test]
    fn test_to_string() {
        let digest = Digest::new(
            AlgorithmName::Sha1,
            b"\xaa\xf4\xc6\x1d\xdc\xc5\xe8\xa2\xda\xbe\xde\x0f;H,\xd9\xae\xa9CM".to_vec(),
        );

        assert_eq!(digest.to_string(), "sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N");
    }

    #[test]
    fn test_hash_sha1() {
        let mut hasher = Hasher::new(AlgorithmName::Sha1);

        hasher.update("abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq".as_bytes());

        let output = hasher.finish();

        assert_eq!(
            &output,
            b"\x84\x98>D\x1c;\xd2n\xba\xaeJ\xa1\xf9Q)\xe5\xe5Fp\xf1"
        )
    }

    #[test]
    fn test_verify_block_digest() {
        // sha1 of "Hello world!"
        let record_bytes = b"WARC/1.0\r\n\
            WARC-Type: resource\r\n\
            WARC-Record-ID: <urn:test:1>\r\n\
            WARC-Block-Digest: sha1:2ef7bde608ce5404e97d5f042f95f89f1c232871\r\n\
            Content-Length: 12\r\n\
            \r\n\
            Hello world!\r\n\r\n";

        let shared = SharedStream::new(Cursor::new(record_bytes.to_vec()));
        let source = ByteSource::Stream(shared.clone());

        let record = {
            let mut guard = shared.lock();
            Record::read(&mut **guard, &source, false).unwrap()
        };

        assert_eq!(verify_block_digest(&record).unwrap(), Some(true));
        assert_eq!(verify_payload_digest(&record).unwrap(), None);
    }

    #[test]
    fn test_verify_block_digest_mismatch() {
        let record_bytes = b"WARC/1.0\r\n\
            WARC-Type: resource\r\n\
            WARC-Record-ID: <urn:test:1>\r\n\
            WARC-Block-Digest: sha1:2ef7bde608ce5404e97d5f042f95f89f1c232872\r\n\
            Content-Length: 12\r\n\
            \r\n\
            Hello world!\r\n\r\n";

        let shared = SharedStream::new(Cursor::new(record_bytes.to_vec()));
        let source = ByteSource::Stream(shared.clone());

        let record = {
            let mut guard = shared.lock();
            Record::read(&mut **guard, &source, false).unwrap()
        };

        assert_eq!(verify_block_digest(&record).unwrap(), Some(false));
    }
}
