//! Warckit: WARC archive tool
//!
//! This crate provides both a library API and a binary CLI application
//! for reading, writing, splitting, concatenating, extracting from, and
//! verifying Web ARChive (WARC) files as defined by ISO 28500.
//!
//! The streaming engine reads records without materializing their content
//! blocks: a parsed [`record::Record`] holds lazy [`range::ByteRange`]
//! references into the archive, which can be opened repeatedly and
//! independently of the reader's own position. Gzip archives (whole-stream
//! or record-at-a-time compressed) are read through a disk-buffered
//! seekable adapter so the same byte ranges work over them.
//!
//! The main entrypoints are [`warc::WarcReader`] and [`warc::WarcWriter`].

pub mod block;
pub mod digest;
pub mod error;
pub mod extract;
pub mod fields;
pub mod header;
pub mod io;
pub mod parse;
pub mod range;
pub mod record;
pub mod tool;
pub mod verify;
pub mod warc;

#[cfg(feature = "bin")]
#[doc(hidden)]
pub mod app;
