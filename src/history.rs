//! Read-only queries over the checksum history.

use crate::digest::Algorithm;
use crate::store::{ChecksumStore, Digests};
use crate::timestamp::FILE_NAME_TIMESTAMP_FORMAT;
use crate::walk::key_relative_to_root;
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

fn map_io_error(path: &Path, e: std::io::Error) -> HistoryError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        HistoryError::PermissionDenied(path.to_path_buf())
    } else {
        HistoryError::Io(e)
    }
}

/// Last good state of a file that has failed verification at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastKnownGood<'a> {
    Seen {
        path: &'a str,
        timestamp: &'a str,
        digests: &'a Digests,
    },
    NeverOk {
        path: &'a str,
    },
}

/// Reports, for every record with a WRONG entry, its most recent OK entry.
pub fn find_last_known_good(store: &ChecksumStore) -> Vec<LastKnownGood<'_>> {
    store
        .iter()
        .filter(|(_, record)| record.has_wrong())
        .map(|(path, record)| match record.last_ok() {
            Some((timestamp, digests)) => LastKnownGood::Seen {
                path,
                timestamp,
                digests,
            },
            None => LastKnownGood::NeverOk { path },
        })
        .collect()
}

/// Writes `<digest>  <path>` lines for every record with a baseline for
/// `algorithm`. Returns the number of lines written.
pub fn export_plain_list<W: Write>(
    store: &ChecksumStore,
    algorithm: Algorithm,
    root: &Path,
    out: &mut W,
) -> std::io::Result<usize> {
    let mut written = 0;
    for (key, record) in store.iter() {
        if let Some(digest) = record.baseline(algorithm.as_str()) {
            writeln!(out, "{}  {}", digest, key_relative_to_root(key, root))?;
            written += 1;
        }
    }
    Ok(written)
}

pub fn plain_checksum_file_name(algorithm: Algorithm, at: NaiveDateTime) -> String {
    format!(
        "plain_checksums_{}.{}",
        at.format(FILE_NAME_TIMESTAMP_FORMAT),
        algorithm
    )
}

/// Writes the plain export into `root` atomically and returns its path and
/// line count.
pub fn write_plain_checksum_file(
    store: &ChecksumStore,
    algorithm: Algorithm,
    root: &Path,
    at: NaiveDateTime,
) -> Result<(PathBuf, usize), HistoryError> {
    let path = root.join(plain_checksum_file_name(algorithm, at));

    let mut temp_file =
        tempfile::NamedTempFile::new_in(root).map_err(|e| map_io_error(root, e))?;

    let written = {
        let mut writer = std::io::BufWriter::new(temp_file.as_file_mut());
        let written = export_plain_list(store, algorithm, root, &mut writer)
            .map_err(|e| map_io_error(&path, e))?;
        writer.flush().map_err(|e| map_io_error(&path, e))?;
        written
    };

    temp_file
        .persist(&path)
        .map_err(|e| map_io_error(&path, e.error))?;

    Ok((path, written))
}
