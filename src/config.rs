//! Site configuration module.
//!
//! Handles loading and validating `mdsite.toml`. The file lives in the
//! project root and is sparse: every key has a default, so a project only
//! lists what it changes.
//!
//! ## Project Layout
//!
//! ```text
//! my-site/
//! ├── mdsite.toml          # Site configuration (optional)
//! ├── content/             # Markdown pages
//! │   ├── index.md
//! │   └── blog/
//! │       └── first.md
//! ├── static/              # Copied to output/static/
//! │   └── style.css
//! └── output/              # Generated site (+ .mdsite-manifest.json)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_dir = "content"   # Markdown sources, relative to the project root
//! static_dir = "static"     # Static assets copied to <output>/static
//!
//! [site]
//! title = "My Site"         # Appended to every page <title>
//!
//! [output]
//! path = "output"           # Where the site is written (--output overrides)
//!
//! [build]
//! threads = 4               # Render workers (omit for auto, --threads overrides)
//!
//! [assets]
//! command = []              # External asset pipeline, e.g. ["npm", "run", "assets"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file in the project root.
pub const CONFIG_FILENAME: &str = "mdsite.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `mdsite.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Content directory, relative to the project root.
    pub content_dir: String,
    /// Static asset directory, relative to the project root.
    pub static_dir: String,
    /// Site-wide presentation settings.
    pub site: SiteSection,
    /// Output location.
    pub output: OutputConfig,
    /// Render worker settings.
    pub build: BuildConfig,
    /// Static asset collection settings.
    pub assets: AssetsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            static_dir: "static".to_string(),
            site: SiteSection::default(),
            output: OutputConfig::default(),
            build: BuildConfig::default(),
            assets: AssetsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "content_dir must not be empty".into(),
            ));
        }
        if self.output.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.path must not be empty".into(),
            ));
        }
        if self.build.threads == Some(0) {
            return Err(ConfigError::Validation(
                "build.threads must be at least 1".into(),
            ));
        }
        if self
            .assets
            .command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "assets.command must start with a program name".into(),
            ));
        }
        Ok(())
    }

    /// Absolute-or-root-relative content directory.
    pub fn content_path(&self, root: &Path) -> PathBuf {
        root.join(&self.content_dir)
    }

    pub fn static_path(&self, root: &Path) -> PathBuf {
        root.join(&self.static_dir)
    }

    /// Output directory: the explicit override if given, else `output.path`.
    /// Relative paths resolve against the project root.
    pub fn output_path(&self, root: &Path, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(dir) => root.join(dir),
            None => root.join(&self.output.path),
        }
    }
}

/// Site-wide presentation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Appended to every page title.
    pub title: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "output".to_string(),
        }
    }
}

/// Render worker settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Number of render workers. When absent, derived from the CPU count.
    pub threads: Option<usize>,
}

/// Static asset collection settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// External command (`[program, args...]`) that collects static assets.
    /// Empty means copy `static_dir` into `<output>/static`.
    pub command: Vec<String>,
}

// =============================================================================
// Thread count
// =============================================================================

/// Default render worker count: half the hardware threads minus one, at
/// least one. Leaves headroom for the asset step and the rest of the machine.
pub fn default_threads() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    threads_for_cores(cores)
}

fn threads_for_cores(cores: usize) -> usize {
    (cores / 2).saturating_sub(1).max(1)
}

/// Resolve the effective worker count.
///
/// - `explicit` (from `--threads`) wins when it parses as a positive integer
/// - otherwise `configured` (`build.threads`) if set
/// - otherwise [`default_threads`]
///
/// An unusable `explicit` value is logged and ignored, never an error.
pub fn resolve_threads(explicit: Option<&str>, configured: Option<usize>) -> usize {
    if let Some(raw) = explicit {
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => return n,
            _ => tracing::warn!(value = raw, "ignoring invalid thread count"),
        }
    }
    configured
        .filter(|&n| n > 0)
        .unwrap_or_else(default_threads)
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse and validate `mdsite.toml` text. Missing keys take their defaults.
pub fn parse_config(text: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `mdsite.toml` in the project root, or the defaults when
/// there is no such file.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    let config = match fs::read_to_string(&config_path) {
        Ok(text) => parse_config(&text)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => SiteConfig::default(),
        Err(err) => return Err(err.into()),
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Returns a fully-commented stock `mdsite.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mdsite configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Markdown sources, relative to this file.
content_dir = "content"

# Static assets, copied to <output>/static on every build.
static_dir = "static"

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
# Appended to every page <title>.
title = "My Site"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Where the generated site goes. `build --output DIR` overrides this.
path = "output"

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# Number of render workers.
# Omit to auto-detect (= half the CPU threads minus one, at least 1).
# `build --threads N` overrides this.
# threads = 4

# ---------------------------------------------------------------------------
# Static assets
# ---------------------------------------------------------------------------
[assets]
# External command that collects static assets instead of copying
# static_dir. It receives MDSITE_STATIC_ROOT (destination) and
# MDSITE_DEBUG (always 0 for builds) in its environment.
command = []
"##
}
