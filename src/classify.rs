//! Per-file rebuild decision.
//!
//! Given a file's current modification time, its stored manifest record and
//! whether the build is forced, [`classify`] decides how the file is counted
//! and what happens to it:
//!
//! | Situation                          | Outcome  | Action    |
//! |------------------------------------|----------|-----------|
//! | forced, record present             | `Update` | `Render`  |
//! | forced, no record                  | `Create` | `Render`  |
//! | no record                          | `Create` | `Render`  |
//! | same mtime                         | `Skip`   | `Nothing` |
//! | mtime moved, same content hash     | `Skip`   | `Refresh` |
//! | mtime moved, content changed       | `Update` | `Render`  |
//!
//! The content hash is computed lazily and only for the last two rows, so an
//! untouched file never has its bytes read.

use crate::manifest::ManifestRecord;
use std::io;

/// How a file is counted in the build summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Skip,
    Create,
    Update,
}

/// What the build does with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Render the file and store its new fingerprint.
    Render,
    /// Content is unchanged; store the newer mtime without rendering.
    Refresh,
    /// Leave the output and the manifest alone.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    pub action: Action,
}

impl Decision {
    const fn new(outcome: Outcome, action: Action) -> Self {
        Self { outcome, action }
    }
}

/// Decide what to do with one content file.
///
/// `content_hash` is called at most once, and only when the modification
/// time differs from the stored record.
pub fn classify<F>(
    current_mtime_ns: u64,
    existing: Option<&ManifestRecord>,
    force: bool,
    content_hash: F,
) -> io::Result<Decision>
where
    F: FnOnce() -> io::Result<String>,
{
    let Some(record) = existing else {
        return Ok(Decision::new(Outcome::Create, Action::Render));
    };
    if force {
        return Ok(Decision::new(Outcome::Update, Action::Render));
    }
    if current_mtime_ns == record.mtime_ns {
        return Ok(Decision::new(Outcome::Skip, Action::Nothing));
    }
    if content_hash()? == record.content_hash {
        return Ok(Decision::new(Outcome::Skip, Action::Refresh));
    }
    Ok(Decision::new(Outcome::Update, Action::Render))
}
