//! Content discovery and output path mapping.
//!
//! Every `*.md` file under the content directory is a page. Hidden files and
//! directories (names starting with `.`) are ignored so editor swap files and
//! VCS metadata never become pages.
//!
//! ## Output Layout
//!
//! Pages are written as directory indexes so URLs stay extension-free:
//!
//! ```text
//! content/index.md          →  output/index.html
//! content/about.md          →  output/about/index.html
//! content/blog/index.md     →  output/blog/index.html
//! content/blog/first.md     →  output/blog/first/index.html
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File extension of content files.
pub const CONTENT_EXTENSION: &str = "md";

const INDEX_STEM: &str = "index";

/// Lazily walk `root` for content files.
///
/// The walk is single-pass: directory entries are read as the iterator is
/// consumed. Entries that cannot be read are yielded as errors so the caller
/// can report them per file instead of aborting.
pub fn discover_content_files(
    root: &Path,
) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + Send + use<> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && is_content_file(entry.path()) => {
                Some(Ok(entry.into_path()))
            }
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
}

/// Whether `path` has the content file extension.
pub fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CONTENT_EXTENSION))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Where the rendered HTML for `source` goes.
pub fn output_path_for(content_root: &Path, output_root: &Path, source: &Path) -> PathBuf {
    let relative = source.strip_prefix(content_root).unwrap_or(source);
    let parent = relative.parent().unwrap_or(Path::new(""));
    let stem = relative.file_stem().unwrap_or_default();

    let dir = if stem == INDEX_STEM {
        output_root.join(parent)
    } else {
        output_root.join(parent).join(stem)
    };
    dir.join("index.html")
}
