//! Recursive enumeration of the files below a scan root.

use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    /// Path usable for opening the file (root joined with the relative path).
    pub path: PathBuf,
    /// Database key: the path relative to the root, `/`-separated.
    pub key: String,
}

/// Lists every non-directory entry below `root`, sorted by path.
///
/// Symlinks are not followed into directories, but a symlink to a file is
/// listed like the file itself. `exclude` is skipped when an entry's path is
/// exactly equal to it. Unreadable directories are logged and skipped.
///
/// The whole listing is collected before returning, so files created while
/// the caller processes it (such as temporary database files) are never seen.
pub fn list_files(root: &Path, exclude: &Path) -> Vec<TreeFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
            continue;
        }

        let path = entry.path();
        if path == exclude {
            continue;
        }

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        files.push(TreeFile {
            path: path.to_path_buf(),
            key: relative_key(relative),
        });
    }

    files
}

/// Converts a relative path to its database key.
pub fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Database key for `key` with a leading `root` removed.
///
/// Keys written by older tools carry the scan root as given on their command
/// line. Keys without that prefix are returned unchanged.
pub fn key_relative_to_root(key: &str, root: &Path) -> String {
    match Path::new(key).strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative_key(relative),
        _ => key.to_string(),
    }
}
