//! Incremental site build.
//!
//! [`build`] turns the content tree into HTML, re-rendering only files that
//! changed since the previous build:
//!
//! ```text
//! 1. Resolve + create the output directory
//! 2. Start static asset collection on a background thread
//! 3. Load the manifest from the output directory
//! 4. --force                      → every file is rebuilt
//! 5. Join asset collection; asset set changed → every file is rebuilt
//! 6. Resolve the worker count
//! 7. Walk the content directory (lazily)
//! 8. Worker pool: stat → classify → render + record, per file
//! 9. Merge per-worker counts and errors
//! 10. Save the manifest if anything changed
//! ```
//!
//! ## Failure Model
//!
//! Problems with a single file (unreadable source, render failure, output
//! write failure) become [`FileError`]s in the report; the other files still
//! build and the failed file is counted in no bucket. Problems with the build
//! as a whole (output directory, manifest, asset collection, worker pool)
//! are returned as [`BuildError`] before or after the pool runs.
//!
//! ## Parallelism
//!
//! Each build owns a [rayon](https://docs.rs/rayon) pool sized to the
//! resolved worker count; it is dropped before [`build`] returns. Workers
//! fold their own [`BuildCounts`] and error lists, merged once at the end,
//! so the hot path takes no lock except the manifest's per-record insert.

use crate::assets::{self, AssetCollector, AssetError, AssetOptions, SiteCollector};
use crate::classify::{self, Action, Outcome};
use crate::config::{self, SiteConfig};
use crate::content;
use crate::fingerprint::{self, FsProbe, SourceProbe};
use crate::manifest::{self, Manifest, ManifestError};
use crate::render::{MarkdownRenderer, RenderError, Renderer};
use rayon::iter::{ParallelBridge, ParallelIterator};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Subdirectory of the output directory that receives static assets.
pub const STATIC_SUBDIR: &str = "static";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("cannot create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("content directory not found: {0}")]
    ContentDirectory(PathBuf),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("static asset collection failed: {0}")]
    Assets(#[from] AssetError),
    #[error("cannot start render workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Per-invocation options, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Skip change detection and rebuild every file.
    pub force: bool,
    /// Raw `--threads` value; unusable values fall back to the default.
    pub threads: Option<String>,
    /// Overrides the configured output directory.
    pub output_dir: Option<PathBuf>,
}

/// Fully resolved inputs of one build.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub force: bool,
    pub threads: Option<String>,
    pub configured_threads: Option<usize>,
}

impl BuildPlan {
    pub fn resolve(root: &Path, config: &SiteConfig, options: &BuildOptions) -> Self {
        Self {
            content_dir: config.content_path(root),
            output_dir: config.output_path(root, options.output_dir.as_deref()),
            force: options.force,
            threads: options.threads.clone(),
            configured_threads: config.build.threads,
        }
    }
}

/// Why change detection was bypassed for this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceReason {
    /// `--force` on the command line.
    Flag,
    /// The static asset set changed since the last build.
    StaticAssets,
}

/// Progress notifications, sent while the build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    OutputDirectory(PathBuf),
    ManifestLoaded { records: usize },
    Forced(ForceReason),
    AssetsCollected { summary: String },
    Rendering { threads: usize },
}

/// Number of files per outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl BuildCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Create => self.created += 1,
            Outcome::Update => self.updated += 1,
            Outcome::Skip => self.skipped += 1,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            created: self.created + other.created,
            updated: self.updated + other.updated,
            skipped: self.skipped + other.skipped,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

/// Category of a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileErrorKind {
    Io,
    Render,
    Discover,
}

impl fmt::Display for FileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Io => "IoError",
            Self::Render => "RenderError",
            Self::Discover => "DiscoverError",
        })
    }
}

/// A failure confined to one content file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rendering {} failed. `{kind}: {message}`", .path.display())]
pub struct FileError {
    pub path: PathBuf,
    pub kind: FileErrorKind,
    pub message: String,
}

impl FileError {
    fn new(path: &Path, kind: FileErrorKind, message: impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            message: message.to_string(),
        }
    }

    fn io(path: &Path, err: io::Error) -> Self {
        Self::new(path, FileErrorKind::Io, err)
    }

    fn render(path: &Path, err: RenderError) -> Self {
        match err {
            RenderError::Io(io_err) => Self::io(path, io_err),
            other => Self::new(path, FileErrorKind::Render, other),
        }
    }

    fn discover(root: &Path, err: walkdir::Error) -> Self {
        let path = err.path().unwrap_or(root).to_path_buf();
        Self::new(&path, FileErrorKind::Discover, err)
    }
}

/// Result of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub counts: BuildCounts,
    /// Per-file failures, sorted by path.
    pub errors: Vec<FileError>,
    pub elapsed: Duration,
    pub assets_summary: String,
    pub threads: usize,
    pub forced: Option<ForceReason>,
    pub manifest_written: bool,
}

/// Build the site at `root` with the production collaborators.
pub fn build(
    root: &Path,
    config: &SiteConfig,
    options: &BuildOptions,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    let plan = BuildPlan::resolve(root, config, options);
    let renderer = MarkdownRenderer::new(&config.site.title);
    let collector = SiteCollector::new(&config.static_path(root), &config.assets.command);
    build_with(&plan, &FsProbe, &renderer, collector, events)
}

/// Build with explicit collaborators (allows testing with mocks).
pub fn build_with<P, R, C>(
    plan: &BuildPlan,
    probe: &P,
    renderer: &R,
    collector: C,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError>
where
    P: SourceProbe,
    R: Renderer,
    C: AssetCollector,
{
    let start = Instant::now();
    let emit = |event: BuildEvent| {
        if let Some(tx) = &events {
            // A closed channel only means nobody is listening.
            let _ = tx.send(event);
        }
    };

    let output_dir = &plan.output_dir;
    fs::create_dir_all(output_dir).map_err(|source| BuildError::OutputDirectory {
        path: output_dir.clone(),
        source,
    })?;
    emit(BuildEvent::OutputDirectory(output_dir.clone()));

    if !plan.content_dir.is_dir() {
        return Err(BuildError::ContentDirectory(plan.content_dir.clone()));
    }

    let pending = assets::spawn_collection(
        collector,
        AssetOptions {
            static_root: output_dir.join(STATIC_SUBDIR),
            debug: false,
        },
    );

    let manifest = match Manifest::load(&manifest::manifest_path(output_dir)) {
        Ok(manifest) => manifest,
        Err(err) => {
            // The collector writes into the output directory; it must be
            // finished before the caller sees the error.
            if let Err(asset_err) = pending.wait() {
                tracing::debug!(%asset_err, "asset collection failed after manifest error");
            }
            return Err(err.into());
        }
    };
    emit(BuildEvent::ManifestLoaded {
        records: manifest.len(),
    });

    let mut forced = plan.force.then_some(ForceReason::Flag);
    if let Some(reason) = forced {
        emit(BuildEvent::Forced(reason));
    }

    let assets = pending.wait()?;
    emit(BuildEvent::AssetsCollected {
        summary: assets.summary.clone(),
    });
    if manifest.record_static_assets(&assets.digest) && forced.is_none() {
        tracing::info!("static assets changed, rebuilding every page");
        forced = Some(ForceReason::StaticAssets);
        emit(BuildEvent::Forced(ForceReason::StaticAssets));
    }

    let threads = config::resolve_threads(plan.threads.as_deref(), plan.configured_threads);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("mdsite-render-{i}"))
        .build()?;
    emit(BuildEvent::Rendering { threads });
    tracing::debug!(threads, force = forced.is_some(), "rendering content");

    let worker = Worker {
        manifest: &manifest,
        probe,
        renderer,
        content_dir: &plan.content_dir,
        output_dir,
        force: forced.is_some(),
    };
    let tally = pool.install(|| {
        content::discover_content_files(&plan.content_dir)
            .par_bridge()
            .fold(Tally::default, |mut tally, entry| {
                worker.process(entry, &mut tally);
                tally
            })
            .reduce(Tally::default, Tally::merge)
    });
    drop(pool);

    let mut errors = tally.errors;
    errors.sort_by(|a, b| a.path.cmp(&b.path));

    let manifest_written = manifest.is_dirty();
    if manifest_written {
        manifest.write_data()?;
    }

    Ok(BuildReport {
        counts: tally.counts,
        errors,
        elapsed: start.elapsed(),
        assets_summary: assets.summary,
        threads,
        forced,
        manifest_written,
    })
}

/// Per-worker accumulator.
#[derive(Debug, Default)]
struct Tally {
    counts: BuildCounts,
    errors: Vec<FileError>,
}

impl Tally {
    fn merge(mut self, other: Self) -> Self {
        self.counts = self.counts.merge(other.counts);
        self.errors.extend(other.errors);
        self
    }
}

/// Everything a render worker needs, shared by reference across the pool.
struct Worker<'a, P, R> {
    manifest: &'a Manifest,
    probe: &'a P,
    renderer: &'a R,
    content_dir: &'a Path,
    output_dir: &'a Path,
    force: bool,
}

impl<P: SourceProbe, R: Renderer> Worker<'_, P, R> {
    fn process(&self, entry: Result<PathBuf, walkdir::Error>, tally: &mut Tally) {
        let result = match entry {
            Ok(path) => self.build_file(&path),
            Err(err) => Err(FileError::discover(self.content_dir, err)),
        };
        match result {
            Ok(outcome) => tally.counts.record(outcome),
            Err(err) => {
                tracing::warn!(path = %err.path.display(), kind = %err.kind, "{}", err.message);
                tally.errors.push(err);
            }
        }
    }

    fn build_file(&self, path: &Path) -> Result<Outcome, FileError> {
        let key = fingerprint::source_key(self.content_dir, path);
        let mtime_ns = self
            .probe
            .modified(path)
            .map_err(|e| FileError::io(path, e))?;
        let existing = self.manifest.get(&key);

        let decision = classify::classify(mtime_ns, existing.as_ref(), self.force, || {
            self.probe.content_hash(path)
        })
        .map_err(|e| FileError::io(path, e))?;

        match decision.action {
            Action::Render => {
                let html = self
                    .renderer
                    .render(path)
                    .map_err(|e| FileError::render(path, e))?;
                let dest = content::output_path_for(self.content_dir, self.output_dir, path);
                write_output(&dest, &html).map_err(|e| FileError::io(path, e))?;
                self.record(path)?;
            }
            Action::Refresh => self.record(path)?,
            Action::Nothing => {}
        }

        tracing::debug!(path = %key, outcome = ?decision.outcome, action = ?decision.action, "classified");
        Ok(decision.outcome)
    }

    fn record(&self, path: &Path) -> Result<(), FileError> {
        self.manifest
            .add(self.probe, self.content_dir, path)
            .map(|_| ())
            .map_err(|e| FileError::io(path, e))
    }
}

fn write_output(dest: &Path, html: &str) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, html)
}
