//! Static asset collection.
//!
//! Static files (stylesheets, images, fonts) are not rendered; they are
//! collected into `<output>/static/`. Collection runs on its own thread while
//! the build loads the manifest, and its result is joined only when the build
//! needs to know whether the asset set changed:
//!
//! ```text
//! let pending = spawn_collection(collector, options);   // returns at once
//! let manifest = Manifest::load(..)?;                    // overlaps with collection
//! let report = pending.wait()?;                          // blocks here
//! ```
//!
//! Every collector reports a one-line human summary and a digest of the
//! collected tree. The build stores the digest in the manifest and forces a
//! full rebuild when it changes, because pages are not tracked against the
//! assets they reference.
//!
//! ## Collectors
//!
//! - [`StaticDirCollector`] mirrors the project's `static/` directory,
//!   skipping files whose destination already has identical bytes and
//!   removing copies whose source is gone. Its digest covers the source set.
//! - [`CommandCollector`] runs an external command configured under
//!   `[assets] command` and digests whatever it leaves in the static root.

use crate::fingerprint::hash_file;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use walkdir::WalkDir;

/// Environment variable telling an external collector where to write.
pub const STATIC_ROOT_ENV: &str = "MDSITE_STATIC_ROOT";
/// Environment variable carrying the explicit debug setting.
pub const DEBUG_ENV: &str = "MDSITE_DEBUG";

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot walk static files: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("`{program}` exited with {status}: {stderr}")]
    Command {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("asset collection thread panicked")]
    Panicked,
}

/// Parameters handed to a collector for one build.
#[derive(Debug, Clone)]
pub struct AssetOptions {
    /// Destination directory for collected files.
    pub static_root: PathBuf,
    /// Whether collectors should produce development output. Builds always
    /// pass `false` so asset pipelines emit their production file names.
    pub debug: bool,
}

/// Result of one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReport {
    /// Human-readable summary, e.g. `Copy 2 static files, 5 unmodified`.
    pub summary: String,
    /// Digest of the collected tree (relative paths and contents).
    pub digest: String,
}

/// A static asset collection step.
pub trait AssetCollector: Send + 'static {
    fn collect(&self, options: &AssetOptions) -> Result<AssetReport, AssetError>;
}

/// Handle to a collection running on a background thread.
#[derive(Debug)]
pub struct PendingAssets {
    handle: JoinHandle<Result<AssetReport, AssetError>>,
}

impl PendingAssets {
    /// Block until the collection finishes.
    pub fn wait(self) -> Result<AssetReport, AssetError> {
        self.handle.join().map_err(|_| AssetError::Panicked)?
    }
}

/// Start `collector` on its own thread and return immediately.
pub fn spawn_collection<C: AssetCollector>(collector: C, options: AssetOptions) -> PendingAssets {
    let handle = thread::spawn(move || {
        tracing::debug!(static_root = %options.static_root.display(), "collecting static assets");
        collector.collect(&options)
    });
    PendingAssets { handle }
}

// ============================================================================
// Static directory copy
// ============================================================================

/// Copies a source directory into the static root.
#[derive(Debug, Clone)]
pub struct StaticDirCollector {
    source: PathBuf,
}

impl StaticDirCollector {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl AssetCollector for StaticDirCollector {
    fn collect(&self, options: &AssetOptions) -> Result<AssetReport, AssetError> {
        fs::create_dir_all(&options.static_root)?;
        let mut copied = 0;
        let mut unmodified = 0;
        let mut collected = Vec::new();

        if self.source.is_dir() {
            for (relative, path) in walk_files(&self.source)? {
                let hash = hash_file(&path)?;
                let dest = options.static_root.join(&relative);
                if dest.is_file() && hash_file(&dest)? == hash {
                    unmodified += 1;
                } else {
                    if let Some(parent) = dest.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(&path, &dest)?;
                    copied += 1;
                }
                collected.push((relative, hash));
            }
        } else {
            tracing::debug!(source = %self.source.display(), "no static directory");
        }

        prune_stale(&options.static_root, &collected)?;

        Ok(AssetReport {
            summary: copy_summary(copied, unmodified),
            digest: digest_entries(&collected),
        })
    }
}

/// Remove files under `static_root` that no longer have a source.
fn prune_stale(static_root: &Path, collected: &[(String, String)]) -> Result<(), AssetError> {
    let keep: HashSet<&str> = collected.iter().map(|(rel, _)| rel.as_str()).collect();
    for (relative, path) in walk_files(static_root)? {
        if !keep.contains(relative.as_str()) {
            tracing::debug!(path = %relative, "removing stale static file");
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// `Copy 1 static file, 3 unmodified`
pub fn copy_summary(copied: usize, unmodified: usize) -> String {
    let noun = if copied == 1 { "file" } else { "files" };
    if unmodified > 0 {
        format!("Copy {copied} static {noun}, {unmodified} unmodified")
    } else {
        format!("Copy {copied} static {noun}")
    }
}

// ============================================================================
// External command
// ============================================================================

/// Runs an external asset pipeline.
///
/// The command receives the static root in `MDSITE_STATIC_ROOT` and the debug
/// setting in `MDSITE_DEBUG` (`0` or `1`). Its stdout becomes the summary,
/// with a trailing `copied to '<static root>'` clause removed.
#[derive(Debug, Clone)]
pub struct CommandCollector {
    program: String,
    args: Vec<String>,
}

impl CommandCollector {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, args...]` list. `None` if the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl AssetCollector for CommandCollector {
    fn collect(&self, options: &AssetOptions) -> Result<AssetReport, AssetError> {
        fs::create_dir_all(&options.static_root)?;
        let output = Command::new(&self.program)
            .args(&self.args)
            .env(STATIC_ROOT_ENV, &options.static_root)
            .env(DEBUG_ENV, if options.debug { "1" } else { "0" })
            .output()?;

        if !output.status.success() {
            return Err(AssetError::Command {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(AssetReport {
            summary: command_summary(&stdout, &options.static_root),
            digest: digest_tree(&options.static_root)?,
        })
    }
}

fn command_summary(stdout: &str, static_root: &Path) -> String {
    let clause = format!(" copied to '{}'", static_root.display());
    let text = stdout.replace(&clause, "");
    let text = text.trim().trim_end_matches('.');
    if text.is_empty() {
        "Collect static files".to_string()
    } else {
        format!("Copy {text}")
    }
}

// ============================================================================
// Configured collector
// ============================================================================

/// The collector selected by site configuration.
#[derive(Debug, Clone)]
pub enum SiteCollector {
    StaticDir(StaticDirCollector),
    Command(CommandCollector),
}

impl SiteCollector {
    /// An `[assets] command` wins over copying `static_dir`.
    pub fn new(static_dir: &Path, command: &[String]) -> Self {
        match CommandCollector::from_argv(command) {
            Some(cmd) => Self::Command(cmd),
            None => Self::StaticDir(StaticDirCollector::new(static_dir)),
        }
    }
}

impl AssetCollector for SiteCollector {
    fn collect(&self, options: &AssetOptions) -> Result<AssetReport, AssetError> {
        match self {
            Self::StaticDir(c) => c.collect(options),
            Self::Command(c) => c.collect(options),
        }
    }
}

// ============================================================================
// Tree digest
// ============================================================================

/// Files under `root` as `(relative "/"-separated path, absolute path)`,
/// sorted by relative path.
fn walk_files(root: &Path) -> Result<Vec<(String, PathBuf)>, AssetError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            let relative = crate::fingerprint::source_key(root, entry.path());
            files.push((relative, entry.into_path()));
        }
    }
    Ok(files)
}

/// SHA-256 over `(relative path, content hash)` pairs, in the given order.
fn digest_entries(entries: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();
    for (relative, hash) in entries {
        hasher.update(relative.as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Digest of every file currently under `root`. A missing directory digests
/// like an empty one.
pub fn digest_tree(root: &Path) -> Result<String, AssetError> {
    let mut entries = Vec::new();
    if root.is_dir() {
        for (relative, path) in walk_files(root)? {
            let hash = hash_file(&path)?;
            entries.push((relative, hash));
        }
    }
    Ok(digest_entries(&entries))
}
