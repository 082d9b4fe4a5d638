//! # mdsite
//!
//! An incremental static site builder. A directory of Markdown files becomes
//! a directory of HTML pages, and a second build only re-renders the pages
//! whose sources changed.
//!
//! # Architecture: Fingerprint, Classify, Render
//!
//! ```text
//! content/**/*.md ──▶ stat ──▶ classify ──▶ render ──▶ output/**/index.html
//!                               ▲     │
//!                               │     ▼
//!                     output/.mdsite-manifest.json
//! ```
//!
//! Every build loads a manifest recording each page's last-built
//! modification time and content hash. A page whose mtime matches is skipped
//! without reading it; a page whose mtime moved but whose bytes are the same
//! is skipped too, and only its stored mtime advances. Everything else is
//! rendered on a worker pool.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`build`] | Orchestrates one build: assets, manifest, worker pool, report |
//! | [`classify`] | Per-file skip / create / update decision |
//! | [`manifest`] | Persisted fingerprints and static asset digest |
//! | [`fingerprint`] | mtime + SHA-256 identity of a source file |
//! | [`content`] | Content discovery and output path mapping |
//! | [`render`] | Markdown → HTML via pulldown-cmark and Maud |
//! | [`assets`] | Static asset collection on a background thread |
//! | [`config`] | `mdsite.toml` loading, validation and thread resolution |
//! | [`output`] | CLI progress and summary formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## mtime First, Hash Second
//!
//! Comparing modification times costs one `stat`. Hashing costs a full read.
//! Trusting the clock when it agrees with the last build keeps no-op builds
//! proportional to the number of files, not their size. The hash fallback
//! catches `git checkout` and restores, which rewrite mtimes without
//! changing content.
//!
//! ## Assets Force Everything
//!
//! Pages may reference any stylesheet or image, and those references are not
//! tracked. When the collected asset tree differs from the last build, every
//! page is rebuilt rather than guessing which ones care.
//!
//! ## One Failure, One Line
//!
//! A page that fails to render is reported and left out of the manifest, so
//! the next build retries it. It never stops the other pages from building.

pub mod assets;
pub mod build;
pub mod classify;
pub mod config;
pub mod content;
pub mod fingerprint;
pub mod logging;
pub mod manifest;
pub mod output;
pub mod render;

#[cfg(test)]
pub(crate) mod test_helpers;
