//! Build manifest for incremental rebuilds.
//!
//! The manifest remembers, for every content file that was built, the
//! fingerprint it had at that time. On the next build each file's current
//! modification time (and, when that disagrees, its content hash) is compared
//! against the stored record to decide whether it needs rendering again. See
//! [`crate::classify`] for the decision itself.
//!
//! The manifest also stores a digest of the collected static assets. Content
//! files can reference any static file, and those references are not tracked,
//! so a change in the asset set forces the whole tree to rebuild.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.mdsite-manifest.json`, so it
//! travels with the output it describes:
//!
//! ```json
//! {
//!   "version": 1,
//!   "static_digest": "9f86d0…",
//!   "content": {
//!     "blog/first.md": { "mtime_ns": 1700000000000000000, "content_hash": "2c26b4…" }
//!   }
//! }
//! ```
//!
//! Writes go to a sibling `.tmp` file that is then renamed over the manifest,
//! so an interrupted write leaves the previous manifest intact.
//!
//! ## Concurrency
//!
//! Render workers share one [`Manifest`]. The record map, the static digest
//! and the dirty flag live behind a single mutex, so an upsert is never
//! observed half-done and the map is never handed out to callers.

use crate::fingerprint::{self, FileFingerprint, SourceProbe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Name of the manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".mdsite-manifest.json";

/// Version of the manifest format. Bump this to force a full rebuild when
/// the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Stored state of one content file as of its last build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub mtime_ns: u64,
    pub content_hash: String,
}

impl From<FileFingerprint> for ManifestRecord {
    fn from(fp: FileFingerprint) -> Self {
        Self {
            mtime_ns: fp.mtime_ns,
            content_hash: fp.content_hash,
        }
    }
}

/// Serialized form of the manifest.
#[derive(Debug, Serialize, Deserialize)]
struct ManifestData {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    static_digest: Option<String>,
    #[serde(default)]
    content: BTreeMap<String, ManifestRecord>,
}

impl ManifestData {
    fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            static_digest: None,
            content: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct State {
    data: ManifestData,
    dirty: bool,
    static_changed: bool,
}

/// In-memory manifest for the duration of one build.
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    state: Mutex<State>,
}

impl Manifest {
    /// Create an empty manifest that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::from_data(path.into(), ManifestData::empty())
    }

    fn from_data(path: PathBuf, data: ManifestData) -> Self {
        Self {
            path,
            state: Mutex::new(State {
                data,
                dirty: false,
                static_changed: false,
            }),
        }
    }

    /// Load the manifest stored at `path`.
    ///
    /// A missing file is the first-build state and yields an empty manifest,
    /// as does a manifest written by a different format version. A file that
    /// exists but cannot be read or parsed is an error: silently discarding
    /// it would rebuild the whole site without saying why.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no manifest yet, starting empty");
                return Ok(Self::empty(path));
            }
            Err(source) => {
                return Err(ManifestError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let data: ManifestData =
            serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if data.version != MANIFEST_VERSION {
            tracing::info!(
                found = data.version,
                expected = MANIFEST_VERSION,
                "manifest version changed, starting empty"
            );
            return Ok(Self::empty(path));
        }
        Ok(Self::from_data(path.to_path_buf(), data))
    }

    /// Where [`write_data`](Self::write_data) saves the manifest.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored record for a content key, if that file was built before.
    pub fn get(&self, key: &str) -> Option<ManifestRecord> {
        self.state().data.content.get(key).cloned()
    }

    /// Fingerprint `path` as it is now and store it as the file's record.
    ///
    /// This is the only way records change. It runs both after a file is
    /// rendered and when only its modification time moved, so later builds
    /// can take the mtime fast path again.
    pub fn add(
        &self,
        probe: &impl SourceProbe,
        content_root: &Path,
        path: &Path,
    ) -> io::Result<FileFingerprint> {
        // Hash outside the lock; workers only contend for the insert.
        let fp = fingerprint::fingerprint(probe, content_root, path)?;
        let mut state = self.state();
        state
            .data
            .content
            .insert(fp.path.clone(), ManifestRecord::from(fp.clone()));
        state.dirty = true;
        Ok(fp)
    }

    /// Record the digest of this build's static asset collection.
    ///
    /// Returns whether the asset set changed since the previous build. A
    /// manifest with no recorded digest has nothing to compare against and
    /// reports no change.
    pub fn record_static_assets(&self, digest: &str) -> bool {
        let mut state = self.state();
        let changed = state
            .data
            .static_digest
            .as_deref()
            .is_some_and(|previous| previous != digest);
        if state.data.static_digest.as_deref() != Some(digest) {
            state.data.static_digest = Some(digest.to_string());
            state.dirty = true;
        }
        state.static_changed = changed;
        changed
    }

    /// Whether the last [`record_static_assets`](Self::record_static_assets)
    /// call saw a different asset set than the stored one.
    pub fn static_files_manifest_changed(&self) -> bool {
        self.state().static_changed
    }

    /// Whether anything was added or updated since load.
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    pub fn len(&self) -> usize {
        self.state().data.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records, ordered by key.
    pub fn records(&self) -> BTreeMap<String, ManifestRecord> {
        self.state().data.content.clone()
    }

    /// Persist the manifest, replacing the previous file atomically.
    pub fn write_data(&self) -> Result<(), ManifestError> {
        let write_err = |source| ManifestError::Write {
            path: self.path.clone(),
            source,
        };
        let json = {
            let state = self.state();
            serde_json::to_string_pretty(&state.data).map_err(|e| write_err(e.into()))?
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), "manifest written");
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking worker cannot leave a half-written record: the insert
        // happens in one call, so the data is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolve the manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}
