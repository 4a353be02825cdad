//! Logging and tracing configuration
//!
//! Logs go to stderr so that `--json` output on stdout stays machine readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset: INFO for this crate, WARN for dependencies.
const DEFAULT_FILTER: &str = "nbverify=info,warn";

/// Initialize tracing for the CLI (stderr logging)
///
/// `verbose` raises this crate's level to DEBUG unless `RUST_LOG` says otherwise.
pub fn init_cli(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("nbverify=debug,warn")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    // try_init: integration tests may install a subscriber more than once
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
