use md5::Md5;
use sha2::digest::Output;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("File modified during checksumming: {0}")]
    ConcurrentModification(PathBuf),
    #[error("Failed to run {tool}: {source}")]
    ToolSpawn {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("{tool} produced no digest for {path}")]
    ToolOutput { tool: String, path: PathBuf },
}

/// Supported checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha256,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Md5, Algorithm::Sha256];

    /// Name used on the command line and as the key in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha256 => "sha256",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    /// Binary invoked by the system backend unless overridden.
    pub fn default_tool(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5sum",
            Algorithm::Sha256 => "sha256sum",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the digest of a single file.
///
/// Implementations report failures as errors; callers decide whether a
/// failure is fatal. The scan engine records failed digests as absent.
pub trait DigestProvider {
    fn compute(&self, path: &Path, algorithm: Algorithm) -> Result<String, DigestError>;
}

/// Hashes files in-process with the RustCrypto hashers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDigest;

impl DigestProvider for BuiltinDigest {
    fn compute(&self, path: &Path, algorithm: Algorithm) -> Result<String, DigestError> {
        match algorithm {
            Algorithm::Md5 => digest_file::<Md5>(path),
            Algorithm::Sha256 => digest_file::<Sha256>(path),
        }
    }
}

fn map_open_error(path: &Path, e: std::io::Error) -> DigestError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        DigestError::PermissionDenied(path.to_path_buf())
    } else {
        DigestError::Io(e)
    }
}

/// Computes the hex digest of a file with concurrent modification detection.
///
/// # Behavior
/// - Records the file's modification time before reading
/// - Reads the file in chunks and feeds them to the hasher
/// - Verifies the modification time hasn't changed after reading
///
/// # Errors
/// - `DigestError::Io`: File doesn't exist or other I/O errors
/// - `DigestError::PermissionDenied`: Insufficient permissions to read the file
/// - `DigestError::ConcurrentModification`: File was detected as being modified while
///   hashing. The absence of this error is *not* a guarantee that the file was
///   *not* modified.
fn digest_file<D: Digest>(path: &Path) -> Result<String, DigestError>
where
    Output<D>: std::fmt::LowerHex,
{
    let metadata_before = std::fs::metadata(path).map_err(|e| map_open_error(path, e))?;
    let mtime_before = metadata_before.modified().map_err(DigestError::Io)?;

    let mut file = File::open(path).map_err(|e| map_open_error(path, e))?;
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(DigestError::Io)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let mtime_after = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(DigestError::Io)?;

    if mtime_before != mtime_after {
        return Err(DigestError::ConcurrentModification(path.to_path_buf()));
    }

    let digest = format!("{:x}", hasher.finalize());
    debug!("Digest of {} is {}", path.display(), digest);
    Ok(digest)
}

/// Delegates hashing to an external tool such as `md5sum`.
///
/// The digest is the first whitespace-delimited token the tool prints.
#[derive(Debug, Clone)]
pub struct SystemToolDigest {
    md5_tool: String,
    sha256_tool: String,
}

impl SystemToolDigest {
    pub fn new(md5_tool: impl Into<String>, sha256_tool: impl Into<String>) -> Self {
        SystemToolDigest {
            md5_tool: md5_tool.into(),
            sha256_tool: sha256_tool.into(),
        }
    }

    fn tool_for(&self, algorithm: Algorithm) -> &str {
        match algorithm {
            Algorithm::Md5 => &self.md5_tool,
            Algorithm::Sha256 => &self.sha256_tool,
        }
    }
}

impl Default for SystemToolDigest {
    fn default() -> Self {
        SystemToolDigest::new(
            Algorithm::Md5.default_tool(),
            Algorithm::Sha256.default_tool(),
        )
    }
}

impl DigestProvider for SystemToolDigest {
    fn compute(&self, path: &Path, algorithm: Algorithm) -> Result<String, DigestError> {
        let tool = self.tool_for(algorithm);

        // The path is passed as its own argument, so no shell quoting is needed.
        let output = Command::new(tool)
            .arg(path)
            .output()
            .map_err(|source| DigestError::ToolSpawn {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(DigestError::ToolFailed {
                tool: tool.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let digest = stdout
            .split_whitespace()
            .next()
            .ok_or_else(|| DigestError::ToolOutput {
                tool: tool.to_string(),
                path: path.to_path_buf(),
            })?;

        debug!("{} reported {} for {}", tool, digest, path.display());
        Ok(digest.to_string())
    }
}
