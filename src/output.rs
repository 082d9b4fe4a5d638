//! CLI output formatting for the build command.
//!
//! # Output Format
//!
//! ```text
//! Start generating the static site...
//!
//! ✔ Use /home/me/site/output
//! ✔ Load manifest
//! ✔ Force update because --force
//! ✔ Copy 2 static files, 5 unmodified
//! → Create HTML files (use 3 threads)
//! ✔ Create 1 HTML files, 40 unmodified, 2 updated
//! ✖ Rendering content/broken.md failed. `IoError: stream did not contain valid UTF-8`
//! ✔ Update manifest
//!
//! Static site output completed in 0.0421s
//! ```
//!
//! Progress lines come from [`BuildEvent`]s as the build runs; the summary
//! block comes from the final [`BuildReport`].
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` and are pure, for testability.
//! `print_*` wrappers write them to stdout.

use crate::build::{BuildCounts, BuildEvent, BuildReport, ForceReason};

const SUCCESS: &str = "\u{2714}";
const FAILURE: &str = "\u{2716}";
const PENDING: &str = "\u{2192}";

/// First line of every build.
pub const BANNER: &str = "Start generating the static site...";

/// Format a single progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    let line = match event {
        BuildEvent::OutputDirectory(dir) => format!("{SUCCESS} Use {}", dir.display()),
        BuildEvent::ManifestLoaded { .. } => format!("{SUCCESS} Load manifest"),
        BuildEvent::Forced(ForceReason::Flag) => {
            format!("{SUCCESS} Force update because --force")
        }
        BuildEvent::Forced(ForceReason::StaticAssets) => {
            format!("{SUCCESS} Force update because static file(s) updated")
        }
        BuildEvent::AssetsCollected { summary } => format!("{SUCCESS} {summary}"),
        BuildEvent::Rendering { threads } => {
            format!("{PENDING} Create HTML files (use {})", pluralize(*threads, "thread"))
        }
    };
    vec![line]
}

/// `Create <n> HTML files, <n> unmodified, <n> updated`
pub fn format_counts(counts: &BuildCounts) -> String {
    format!(
        "Create {} HTML files, {} unmodified, {} updated",
        counts.created, counts.skipped, counts.updated
    )
}

/// Format the end-of-build block: summary, each error once, manifest
/// status, and elapsed time.
pub fn format_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!("{SUCCESS} {}", format_counts(&report.counts))];
    for error in &report.errors {
        lines.push(format!("{FAILURE} {error}"));
    }
    if report.manifest_written {
        lines.push(format!("{SUCCESS} Update manifest"));
    }
    lines.push(String::new());
    lines.push(format!(
        "Static site output completed in {:.4}s",
        report.elapsed.as_secs_f64()
    ));
    lines
}

/// Print the end-of-build block to stdout.
pub fn print_build_report(report: &BuildReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

/// Format a fatal error.
pub fn format_fatal(error: &dyn std::error::Error) -> String {
    format!("{FAILURE} {error}")
}

fn pluralize(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
