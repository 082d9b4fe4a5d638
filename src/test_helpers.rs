//! Shared test utilities for the mdsite test suite.
//!
//! Provides a throwaway project layout and test doubles for every build
//! collaborator:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = SiteFixture::with_pages(3);
//! let probe = CountingProbe::default();
//! let report = build_with(&site.plan(false, Some("2")), &probe,
//!     &StubRenderer::new(), FixedCollector::new("v1"), None).unwrap();
//! assert_eq!(probe.hash_calls(), 3); // new files are hashed once, when recorded
//! ```
//!
//! Doubles guard their state with `Mutex`/atomics (not `RefCell`) so they are
//! `Sync` and work inside the rayon pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use crate::assets::{AssetCollector, AssetError, AssetOptions, AssetReport, copy_summary};
use crate::build::BuildPlan;
use crate::fingerprint::{FsProbe, SourceProbe};
use crate::manifest::{self, Manifest};
use crate::render::{RenderError, Renderer};

// =========================================================================
// Project fixture
// =========================================================================

/// A temporary project: `<tmp>/content` with pages, `<tmp>/output` for the
/// generated site.
pub struct SiteFixture {
    tmp: TempDir,
    pub content: PathBuf,
    pub output: PathBuf,
}

impl SiteFixture {
    /// Project with `count` pages named `page-000.md`, `page-001.md`, …
    pub fn with_pages(count: usize) -> Self {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let output = tmp.path().join("output");
        fs::create_dir_all(&content).unwrap();
        let site = Self {
            tmp,
            content,
            output,
        };
        for i in 0..count {
            site.write_page(&format!("page-{i:03}.md"), &format!("# Page {i}\n\nBody {i}."));
        }
        site
    }

    /// A second project with byte-identical content files.
    pub fn clone_content(&self) -> Self {
        let other = Self::with_pages(0);
        for entry in walkdir::WalkDir::new(&self.content) {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let rel = entry.path().strip_prefix(&self.content).unwrap();
                let body = fs::read_to_string(entry.path()).unwrap();
                other.write_page(rel.to_str().unwrap(), &body);
            }
        }
        other
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Write (or overwrite) a content file, creating parent directories.
    pub fn write_page(&self, rel: &str, body: &str) {
        let path = self.content.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    /// Move a content file's mtime ten seconds forward without touching its
    /// bytes. Returns the new mtime as the probe reports it.
    pub fn bump_mtime(&self, rel: &str) -> u64 {
        let path = self.content.join(rel);
        let current = fs::metadata(&path).unwrap().modified().unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(current + Duration::from_secs(10))
            .unwrap();
        FsProbe.modified(&path).unwrap()
    }

    pub fn plan(&self, force: bool, threads: Option<&str>) -> BuildPlan {
        BuildPlan {
            content_dir: self.content.clone(),
            output_dir: self.output.clone(),
            force,
            threads: threads.map(str::to_string),
            configured_threads: None,
        }
    }

    pub fn load_manifest(&self) -> Manifest {
        Manifest::load(&manifest::manifest_path(&self.output)).unwrap()
    }
}

// =========================================================================
// Probe double
// =========================================================================

/// Filesystem probe that counts how often each operation runs.
#[derive(Default)]
pub struct CountingProbe {
    stats: AtomicUsize,
    hashes: AtomicUsize,
}

impl CountingProbe {
    pub fn stat_calls(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    pub fn hash_calls(&self) -> usize {
        self.hashes.load(Ordering::SeqCst)
    }
}

impl SourceProbe for CountingProbe {
    fn modified(&self, path: &Path) -> io::Result<u64> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        FsProbe.modified(path)
    }

    fn content_hash(&self, path: &Path) -> io::Result<String> {
        self.hashes.fetch_add(1, Ordering::SeqCst);
        FsProbe.content_hash(path)
    }
}

// =========================================================================
// Renderer double
// =========================================================================

/// Renders the raw source inside `<pre>`, recording every call. Optionally
/// fails for one file name.
#[derive(Default)]
pub struct StubRenderer {
    fail_on: Option<String>,
    rendered: Mutex<Vec<PathBuf>>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(file_name: &str) -> Self {
        Self {
            fail_on: Some(file_name.to_string()),
            ..Self::default()
        }
    }

    /// Files rendered so far, sorted.
    pub fn rendered(&self) -> Vec<PathBuf> {
        let mut paths = self.rendered.lock().unwrap().clone();
        paths.sort();
        paths
    }
}

impl Renderer for StubRenderer {
    fn render(&self, source: &Path) -> Result<String, RenderError> {
        self.rendered.lock().unwrap().push(source.to_path_buf());
        let name = source.file_name().unwrap().to_string_lossy();
        if self.fail_on.as_deref() == Some(name.as_ref()) {
            return Err(RenderError::Template(format!("cannot render {name}")));
        }
        let body = fs::read_to_string(source)?;
        Ok(format!("<pre>{body}</pre>"))
    }
}

// =========================================================================
// Asset collector double
// =========================================================================

/// Collector that copies nothing and reports a fixed digest.
#[derive(Clone)]
pub struct FixedCollector {
    digest: Option<String>,
}

impl FixedCollector {
    pub fn new(digest: &str) -> Self {
        Self {
            digest: Some(digest.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { digest: None }
    }
}

impl AssetCollector for FixedCollector {
    fn collect(&self, _options: &AssetOptions) -> Result<AssetReport, AssetError> {
        match &self.digest {
            Some(digest) => Ok(AssetReport {
                summary: copy_summary(0, 0),
                digest: digest.clone(),
            }),
            None => Err(AssetError::Io(io::Error::other("collector offline"))),
        }
    }
}
