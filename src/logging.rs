//! Tracing initialization.
//!
//! Library code logs through `tracing` macros; the binary installs a
//! subscriber once at startup. Diagnostics go to stderr so they never mix
//! with the progress lines on stdout.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter, e.g. `MDSITE_LOG=mdsite=debug`.
pub const LOG_ENV: &str = "MDSITE_LOG";

const DEFAULT_FILTER: &str = "mdsite=warn";

static INIT: Once = Once::new();

/// Install the global subscriber. Safe to call more than once.
///
/// Falls back to `mdsite=warn` if `MDSITE_LOG` is unset or invalid.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true),
            )
            .with(filter)
            .init();
    });
}
