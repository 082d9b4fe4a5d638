//! Source file fingerprints for change detection.
//!
//! A fingerprint pairs a file's modification time with a SHA-256 hash of its
//! bytes. The two halves are deliberately exposed as separate operations on
//! [`SourceProbe`]: the build compares modification times first and only
//! reads file contents when the clocks disagree, so a no-op rebuild costs one
//! `stat` per file.
//!
//! ## Keys
//!
//! Fingerprints are keyed by the path relative to the content root, with `/`
//! separators on every platform. Moving the whole project directory therefore
//! keeps the manifest valid.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Component, Path};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a source file at the time it was inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// Content-root-relative key, see [`source_key`].
    pub path: String,
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_ns: u64,
    /// SHA-256 of the file contents, hex encoded.
    pub content_hash: String,
}

/// Filesystem access needed to fingerprint a source file.
///
/// The production implementation is [`FsProbe`]. Tests substitute probes
/// that count calls to check that unchanged files are never hashed.
pub trait SourceProbe: Sync {
    /// Modification time of `path` in nanoseconds since the Unix epoch.
    fn modified(&self, path: &Path) -> io::Result<u64>;

    /// Hex-encoded SHA-256 of the contents of `path`.
    fn content_hash(&self, path: &Path) -> io::Result<String>;
}

/// [`SourceProbe`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl SourceProbe for FsProbe {
    fn modified(&self, path: &Path) -> io::Result<u64> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(nanos_since_epoch(modified))
    }

    fn content_hash(&self, path: &Path) -> io::Result<String> {
        hash_file(path)
    }
}

/// Compute the full fingerprint of `path`, keyed relative to `content_root`.
pub fn fingerprint(
    probe: &impl SourceProbe,
    content_root: &Path,
    path: &Path,
) -> io::Result<FileFingerprint> {
    let mtime_ns = probe.modified(path)?;
    let content_hash = probe.content_hash(path)?;
    Ok(FileFingerprint {
        path: source_key(content_root, path),
        mtime_ns,
        content_hash,
    })
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Manifest key for `path`: relative to `content_root`, `/`-separated.
///
/// Paths outside the content root keep their full form so they can never
/// collide with a relative key.
pub fn source_key(content_root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(content_root).unwrap_or(path);
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if relative.is_absolute() {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    }
}

/// Timestamps before the epoch collapse to zero.
fn nanos_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
