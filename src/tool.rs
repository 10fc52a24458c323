//! File operations behind the splitting and extraction tools.
use std::{
    fs::{File, FileTimes},
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::{
    block::ContentBlock,
    error::GeneralError,
    extract::{short_digest, split_url_to_filename, HttpResponse},
    record::Record,
    warc::{GzipMode, WarcWriter},
};

/// Strips `.gz` and `.warc` suffixes from an archive filename.
pub fn strip_warc_extension(name: &str) -> &str {
    let name = name.strip_suffix(".gz").unwrap_or(name);

    name.strip_suffix(".warc").unwrap_or(name)
}

/// The filename a record receives when an archive is split.
pub fn split_filename(stem: &str, order: u64, gzip: bool) -> String {
    if gzip {
        format!("{}.{:08}.warc.gz", stem, order)
    } else {
        format!("{}.{:08}.warc", stem, order)
    }
}

/// Writes one record as its own single-record archive file and returns
/// the path.
pub fn split_record(
    record: &mut Record,
    out_dir: &Path,
    stem: &str,
    order: u64,
    gzip: bool,
) -> Result<PathBuf, GeneralError> {
    let path = out_dir.join(split_filename(stem, order, gzip));
    let file = File::create(&path)?;

    let mode = if gzip { GzipMode::Whole } else { GzipMode::None };
    let mut writer = WarcWriter::new(file, mode);

    writer.write_record(record)?;
    writer.finish()?;

    tracing::debug!(?path, "wrote record file");

    Ok(path)
}

/// Extracts the decoded HTTP body of a `response` record into a directory
/// tree derived from the archived URL.
///
/// Records that are not status-200 HTTP responses (or whose blocks were
/// not parsed as HTTP messages) are skipped and `None` is returned. When
/// the response carries a `Last-Modified` date, the file's mtime is set
/// to it.
pub fn extract_record(record: &Record, out_dir: &Path) -> Result<Option<PathBuf>, GeneralError> {
    if record.warc_type() != Some("response") {
        return Ok(None);
    }

    let Some(block) = record.block.as_ref().and_then(ContentBlock::as_fields) else {
        return Ok(None);
    };

    if block.fields().as_http().is_none() {
        return Ok(None);
    }

    let Some(url) = record.header.fields.get("WARC-Target-URI") else {
        return Ok(None);
    };

    let raw = block.binary_range().read_all()?;
    let response = HttpResponse::parse(&raw)?;

    if response.status != 200 {
        tracing::debug!(status = response.status, url, "skipping non-200 response");
        return Ok(None);
    }

    let components = split_url_to_filename(url)?;
    let body = response.decode_body()?;

    let path = prepare_output_path(out_dir, &components)?;

    std::fs::write(&path, &body)?;

    if let Some(modified) = response.last_modified() {
        let times = FileTimes::new().set_modified(SystemTime::from(modified));

        if let Ok(file) = File::options().write(true).open(&path) {
            let _ = file.set_times(times);
        }
    }

    tracing::info!(?path, url, "extracted file");

    Ok(Some(path))
}

/// Builds the destination path, creating parent directories.
///
/// An existing file where a directory is needed is renamed with a short
/// suffix derived from its basename's SHA-1. An existing directory where
/// the file is to be written diverts the file the same way.
fn prepare_output_path(out_dir: &Path, components: &[String]) -> Result<PathBuf, GeneralError> {
    let mut dir = out_dir.to_path_buf();

    let Some((basename, parents)) = components.split_last() else {
        return Err(std::io::Error::other("no path components for record").into());
    };

    for component in parents {
        dir.push(component);

        if dir.is_file() {
            let renamed = dir.with_file_name(format!("{}_{}", component, short_digest(component)));

            tracing::warn!(?dir, ?renamed, "renaming file that blocks a directory");
            std::fs::rename(&dir, &renamed)?;
        }

        if !dir.is_dir() {
            std::fs::create_dir(&dir)?;
        }
    }

    let mut path = dir.join(basename);

    if path.is_dir() {
        let diverted = format!("{}_{}", basename, short_digest(basename));

        tracing::warn!(?path, diverted, "output path is a directory");
        path = dir.join(diverted);
    }

    Ok(path)
}
