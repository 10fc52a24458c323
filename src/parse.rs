//! Parsing utilities.
use nom::{
    bytes::complete::{tag, take_while},
    combinator::{all_consuming, recognize},
    sequence::pair,
    IResult,
};

use crate::error::ParseError;

pub fn version(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let tag = tag("WARC/");
    let digits = take_while(|c: u8| c.is_ascii_digit() || c == b'.');

    recognize(pair(tag, digits))(input)
}

/// Returns whether the value is a well-formed WARC version string
/// such as "WARC/1.1".
pub fn validate_version(value: &[u8]) -> Result<(), ParseError> {
    match all_consuming(version)(value) {
        Ok((_input, _output)) => Ok(()),
        Err(error) => Err(error.into()),
    }
}

/// Parse a value into a `u64`.
///
/// Unlike [`str::parse()`], only ASCII digits are permitted. Use of std
/// library parsing functions may lead to security issues.
pub fn parse_u64_strict(value: &str) -> Result<u64, std::num::ParseIntError> {
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return "?".parse();
    }

    value.parse()
}
